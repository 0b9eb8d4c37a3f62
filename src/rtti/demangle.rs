// Mon Oct 19 2026 - Alex

use msvc_demangler::DemangleFlags;

const VFTABLE_PREFIX: &str = "??_7";
const VFTABLE_SUFFIX: &str = "6B@";

/// Fragments dropped anywhere in a name. A postfix ` const` qualifier
/// (`std::pair<int const, int>`) goes through `strip_postfix_const`, which
/// leaves identifiers such as `const_iterator` alone.
const NOISE: [&str; 4] = [
    "::`vftable'",
    "const ",
    "::`anonymous namespace'",
    "`anonymous namespace'::",
];

/// Finds the bare type symbol inside an RTTI name.
///
/// `.?AVFoo@@` and `?AVFoo@@` come from type descriptors, `??_7Foo@@6B@` is an
/// already decorated vftable symbol.
pub fn extract_symbol(raw: &str) -> Option<&str> {
    if let Some(rest) = raw.strip_prefix(VFTABLE_PREFIX) {
        return Some(rest.strip_suffix(VFTABLE_SUFFIX).unwrap_or(rest));
    }
    if raw.starts_with(".?A") {
        return raw.get(4..);
    }
    if raw.starts_with("?A") {
        return raw.get(3..);
    }
    None
}

/// Removes decoration fragments until none is left.
pub fn strip_decorations(demangled: &str) -> String {
    let mut name = demangled.to_string();
    loop {
        let before = name.len();
        for fragment in NOISE {
            name = name.replace(fragment, "");
        }
        name = strip_postfix_const(&name);
        if name.len() == before {
            return name.trim().to_string();
        }
    }
}

fn strip_postfix_const(name: &str) -> String {
    const QUALIFIER: &str = " const";

    let mut out = String::with_capacity(name.len());
    let mut rest = name;
    while let Some(pos) = rest.find(QUALIFIER) {
        let after = &rest[pos + QUALIFIER.len()..];
        out.push_str(&rest[..pos]);
        if after.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
            out.push_str(QUALIFIER);
        }
        rest = after;
    }
    out.push_str(rest);
    out
}

/// Turns an MSVC RTTI type name into a readable class name. Falls back to the
/// raw string when the name can't be undecorated.
pub fn demangle_type_name(raw: &str) -> String {
    let Some(symbol) = extract_symbol(raw).filter(|s| !s.is_empty()) else {
        log::warn!("Unrecognized mangled name pattern: {}", raw);
        return raw.to_string();
    };

    let wrapped = format!("{}{}{}", VFTABLE_PREFIX, symbol, VFTABLE_SUFFIX);
    match msvc_demangler::demangle(&wrapped, DemangleFlags::llvm()) {
        Ok(demangled) => {
            let name = strip_decorations(&demangled);
            if name.is_empty() {
                raw.to_string()
            } else {
                name
            }
        }
        Err(e) => {
            log::warn!("Failed to demangle {}: {}", raw, e);
            raw.to_string()
        }
    }
}
