fn main() {
    for var in ["TARGET", "PROFILE"] {
        if let Ok(value) = std::env::var(var) {
            println!("cargo:rustc-env=LIPC_BUILD_{var}={value}");
        }
        println!("cargo:rerun-if-env-changed={var}");
    }
}
