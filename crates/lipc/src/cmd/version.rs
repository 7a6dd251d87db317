use serde::Serialize;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, print_pretty, OutputFormat};

#[derive(Serialize)]
struct BuildInfo {
    name: &'static str,
    version: &'static str,
    target: String,
    profile: &'static str,
    os: &'static str,
    arch: &'static str,
    git_hash: &'static str,
}

impl BuildInfo {
    fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            target: target_triple(),
            profile: option_env!("LIPC_BUILD_PROFILE").unwrap_or("unknown"),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
        }
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.to_string()),
            ("version", self.version.to_string()),
            ("target", self.target.clone()),
            ("profile", self.profile.to_string()),
            ("platform", format!("{} ({})", self.os, self.arch)),
            ("git_hash", self.git_hash.to_string()),
        ]
    }
}

pub fn run(args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    let info = BuildInfo::current();
    if !args.extended {
        println!("{} {}", info.name, info.version);
        return Ok(SUCCESS);
    }

    match format {
        OutputFormat::Json => print_json(&info),
        OutputFormat::Table | OutputFormat::Pretty => print_pretty(&info.fields()),
        OutputFormat::Raw => println!("{}", info.version),
    }
    Ok(SUCCESS)
}

fn target_triple() -> String {
    if let Some(target) = option_env!("LIPC_BUILD_TARGET") {
        return target.to_string();
    }
    format!(
        "{}-unknown-{}",
        std::env::consts::ARCH,
        std::env::consts::OS
    )
}
