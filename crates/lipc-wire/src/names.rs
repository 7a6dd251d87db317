//! Name and path syntax rules of the bus protocol.

/// Maximum length of any bus, interface, member or error name.
pub const MAX_NAME_LEN: usize = 255;

/// `/`, or `/`-separated non-empty elements of `[A-Za-z0-9_]`.
pub fn is_valid_object_path(path: &str) -> bool {
    if path == "/" {
        return true;
    }
    let Some(rest) = path.strip_prefix('/') else {
        return false;
    };
    rest.split('/').all(|element| {
        !element.is_empty() && element.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
    })
}

/// Two or more `.`-separated elements, none starting with a digit.
pub fn is_valid_interface_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return false;
    }
    let mut elements = 0;
    for element in name.split('.') {
        if !is_identifier(element) {
            return false;
        }
        elements += 1;
    }
    elements >= 2
}

/// A single identifier, no dots.
pub fn is_valid_member_name(name: &str) -> bool {
    name.len() <= MAX_NAME_LEN && is_identifier(name)
}

/// Error names follow the interface name rules.
pub fn is_valid_error_name(name: &str) -> bool {
    is_valid_interface_name(name)
}

/// Well-known (`com.example.Service`) or unique (`:1.42`) bus name.
pub fn is_valid_bus_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return false;
    }
    let (unique, body) = match name.strip_prefix(':') {
        Some(rest) => (true, rest),
        None => (false, name),
    };

    let mut elements = 0;
    for element in body.split('.') {
        let mut bytes = element.bytes();
        let Some(first) = bytes.next() else {
            return false;
        };
        if !unique && first.is_ascii_digit() {
            return false;
        }
        if !std::iter::once(first)
            .chain(bytes)
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            return false;
        }
        elements += 1;
    }
    elements >= 2
}

fn is_identifier(element: &str) -> bool {
    let mut bytes = element.bytes();
    match bytes.next() {
        Some(first) if first.is_ascii_alphabetic() || first == b'_' => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
