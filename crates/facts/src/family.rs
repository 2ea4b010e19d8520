//! Platform naming and family mapping
//!
//! Distribution ids from os-release are normalised to platform names, and
//! each platform belongs to one family (`debian`, `rhel`, `fedora`, ...).
//! Family names are what provider bindings usually match on.

/// Normalise an os-release `ID` into a platform name
pub fn platform_name(id: &str) -> String {
    match id {
        "rhel" => "redhat",
        "ol" => "oracle",
        "amzn" => "amazon",
        "sles" | "sles_sap" => "suse",
        "opensuse-leap" => "opensuseleap",
        "opensuse-tumbleweed" => "opensuse",
        "archarm" => "arch",
        "linuxmint" => "linuxmint",
        other => other,
    }
    .to_string()
}

/// Family for a platform, falling back to the nearest `ID_LIKE` ancestor
/// with a known family. Unknown platforms are their own family.
pub fn platform_family(platform: &str, id_like: &[String]) -> String {
    std::iter::once(platform)
        .chain(id_like.iter().map(String::as_str))
        .find_map(known_family)
        .unwrap_or(platform)
        .to_string()
}

fn known_family(platform: &str) -> Option<&'static str> {
    let family = match platform {
        "debian" | "ubuntu" | "linuxmint" | "raspbian" | "pop" | "kali" | "elementary" => "debian",
        "redhat" | "rhel" | "centos" | "rocky" | "almalinux" | "oracle" | "scientific"
        | "cloudlinux" | "xenserver" | "clearos" => "rhel",
        "amazon" => "amazon",
        "fedora" | "pidora" | "arista_eos" => "fedora",
        "suse" | "opensuse" | "opensuseleap" | "sled" => "suse",
        "arch" | "manjaro" | "endeavouros" => "arch",
        "alpine" => "alpine",
        "gentoo" => "gentoo",
        "slackware" => "slackware",
        "exherbo" => "exherbo",
        "mac_os_x" => "mac_os_x",
        "windows" => "windows",
        "freebsd" => "freebsd",
        "openbsd" => "openbsd",
        "netbsd" => "netbsd",
        "dragonfly" => "dragonflybsd",
        "solaris2" | "smartos" | "omnios" | "openindiana" | "nexentacore" => "solaris2",
        _ => return None,
    };
    Some(family)
}

/// `os` fact for a Rust target OS name
pub fn os_name(target_os: &str) -> &str {
    match target_os {
        "macos" => "darwin",
        "solaris" | "illumos" => "solaris2",
        other => other,
    }
}
