// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

// Escaping of strings for use in unit names and unit file text.

use std::fmt::Write;

use crate::generator::DeviceError;

const UNIT_NAME_MAX: usize = 256;

fn push_hex_escape(acc: &mut String, byte: u8) {
    // Writing to a String can not fail.
    let _ = write!(acc, r"\x{byte:02x}");
}

fn escape_into(acc: &mut String, s: &str) {
    for (i, byte) in s.bytes().enumerate() {
        match byte {
            b'/' => acc.push('-'),
            b'.' if i == 0 => push_hex_escape(acc, byte),
            b if b.is_ascii_alphanumeric() || matches!(b, b':' | b'_' | b'.') => {
                acc.push(char::from(b))
            }
            b => push_hex_escape(acc, b),
        }
    }
}

/// Escape an arbitrary string so that it can be embedded in a unit name.
pub fn unit_name_escape(s: &str) -> String {
    let mut acc = String::with_capacity(s.len());
    escape_into(&mut acc, s);
    acc
}

/// Build the instance name of a template unit, e.g.
/// "systemd-cryptsetup@<escaped>.service".
pub fn unit_name_build(prefix: &str, escaped_instance: &str, suffix: &str) -> String {
    format!("{prefix}@{escaped_instance}{suffix}")
}

/// True if path is absolute and has no "." or ".." components.
fn path_is_normalized(path: &str) -> bool {
    path.starts_with('/') && !path.split('/').any(|part| part == "." || part == "..")
}

/// Convert an absolute path to the name of the unit for it, e.g.
/// "/dev/mapper/home" with suffix ".device" becomes
/// "dev-mapper-home.device".
pub fn unit_name_from_path(path: &str, suffix: &str) -> Result<String, DeviceError> {
    if !path_is_normalized(path) {
        return Err(DeviceError::InvalidUnitPath(path.to_owned()));
    }

    let simplified = path
        .split('/')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    let mut name = if simplified.is_empty() {
        "-".to_string()
    } else {
        unit_name_escape(&simplified)
    };
    name.push_str(suffix);

    if name.len() > UNIT_NAME_MAX {
        return Err(DeviceError::InvalidUnitPath(path.to_owned()));
    }
    Ok(name)
}

/// Escape "%" so that unit file specifier expansion leaves s unchanged.
pub fn specifier_escape(s: &str) -> String {
    s.replace('%', "%%")
}

/// C style escaping: quotes, backslash and control characters become
/// backslash sequences, other bytes outside printable ASCII become octal.
pub fn cescape(s: &str) -> String {
    let mut acc = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            0x07 => acc.push_str(r"\a"),
            0x08 => acc.push_str(r"\b"),
            0x0c => acc.push_str(r"\f"),
            b'\n' => acc.push_str(r"\n"),
            b'\r' => acc.push_str(r"\r"),
            b'\t' => acc.push_str(r"\t"),
            0x0b => acc.push_str(r"\v"),
            b'\\' => acc.push_str(r"\\"),
            b'"' => acc.push_str("\\\""),
            b'\'' => acc.push_str(r"\'"),
            b if !(b' '..0x7f).contains(&b) => {
                let _ = write!(acc, r"\{b:03o}");
            }
            b => acc.push(char::from(b)),
        }
    }
    acc
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_unit_name_escape() {
        assert_eq!(unit_name_escape("home"), "home");
        assert_eq!(unit_name_escape("luks-1234"), r"luks\x2d1234");
        assert_eq!(unit_name_escape(".hidden"), r"\x2ehidden");
        assert_eq!(unit_name_escape("a.b_c:d"), "a.b_c:d");
        assert_eq!(unit_name_escape("a/b c"), r"a-b\x20c");
        assert_eq!(unit_name_escape("ü"), r"\xc3\xbc");
    }

    #[test]
    fn test_unit_name_from_path() {
        assert_eq!(
            unit_name_from_path("/dev/sda1", ".device").unwrap(),
            "dev-sda1.device"
        );
        assert_eq!(
            unit_name_from_path("/dev/disk/by-uuid/1111-2222", ".device").unwrap(),
            r"dev-disk-by\x2duuid-1111\x2d2222.device"
        );
        assert_eq!(
            unit_name_from_path("//run//systemd/", ".mount").unwrap(),
            "run-systemd.mount"
        );
        assert_eq!(unit_name_from_path("/", ".mount").unwrap(), "-.mount");

        assert!(unit_name_from_path("relative/path", ".device").is_err());
        assert!(unit_name_from_path("/dev/../etc", ".device").is_err());
        assert!(unit_name_from_path("/dev/./sda", ".device").is_err());
        assert!(unit_name_from_path(&format!("/{}", "a".repeat(300)), ".device").is_err());
    }

    #[test]
    fn test_unit_name_build() {
        assert_eq!(
            unit_name_build("systemd-cryptsetup", r"luks\x2d1234", ".service"),
            r"systemd-cryptsetup@luks\x2d1234.service"
        );
    }

    #[test]
    fn test_specifier_escape() {
        assert_eq!(specifier_escape("100%"), "100%%");
        assert_eq!(specifier_escape("plain"), "plain");
    }

    #[test]
    fn test_cescape() {
        assert_eq!(cescape("home"), "home");
        assert_eq!(cescape("a b\tc\\"), r"a b\tc\\");
        assert_eq!(cescape("q'\""), "q\\'\\\"");
        assert_eq!(cescape("\u{1}ü"), r"\001\303\274");
    }

    proptest! {
        #[test]
        /// Escaped unit names only contain characters valid in unit names.
        fn escaped_names_are_valid(s in "\\PC*") {
            let escaped = unit_name_escape(&s);
            prop_assert!(escaped
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || ":-_.\\".contains(c)));
            prop_assert!(!escaped.starts_with('.'));
        }
    }
}
