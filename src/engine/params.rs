// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

// Interpretation of the luks.* kernel command line switches.

use log::warn;

use crate::{
    engine::{
        cmdline::{parse_boolean, BootParam},
        identifier::{is_valid_id128, LUKS_NAME_PREFIX},
        store::DeviceStore,
    },
    units::resolve_node,
};

/// Global settings collected from the kernel command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    /// luks=: generate nothing at all when false.
    pub enabled: bool,
    /// luks.crypttab=: ignore the crypttab file when false.
    pub read_crypttab: bool,
    /// Set once any switch names a device explicitly. Crypttab lines with
    /// no matching record are then skipped.
    pub whitelist: bool,
    pub default_options: Option<String>,
    pub default_keyfile: Option<String>,
}

impl Default for Policy {
    fn default() -> Policy {
        Policy {
            enabled: true,
            read_crypttab: true,
            whitelist: false,
            default_options: None,
            default_keyfile: None,
        }
    }
}

/// Apply every switch in order. Later switches overwrite what earlier ones
/// set for the same field.
pub fn apply_boot_params<'a, I>(policy: &mut Policy, store: &mut DeviceStore, params: I)
where
    I: IntoIterator<Item = &'a BootParam>,
{
    for param in params {
        apply_boot_param(policy, store, &param.key, param.value.as_deref());
    }
}

/// Apply one switch. Malformed values are warned about and skipped;
/// switches not starting with "luks" belong to someone else.
pub fn apply_boot_param(
    policy: &mut Policy,
    store: &mut DeviceStore,
    key: &str,
    value: Option<&str>,
) {
    match key {
        "luks" => set_switch(key, value, &mut policy.enabled),
        "luks.crypttab" => set_switch(key, value, &mut policy.read_crypttab),
        "luks.uuid" => {
            let Some(value) = require_value(key, value) else {
                return;
            };
            let identifier = value.strip_prefix(LUKS_NAME_PREFIX).unwrap_or(value);
            store.get_or_create(identifier).create = true;
            policy.whitelist = true;
        }
        "luks.options" => {
            let Some(value) = require_value(key, value) else {
                return;
            };
            match split_assignment(value, is_hex_or_dash) {
                Some((identifier, options)) if !identifier.is_empty() && !options.is_empty() => {
                    store.get_or_create(identifier).options = Some(options.to_owned());
                }
                _ => policy.default_options = Some(value.to_owned()),
            }
        }
        "luks.key" => {
            let Some(value) = require_value(key, value) else {
                return;
            };
            match split_assignment(value, is_alnum_or_dash) {
                Some(("", _)) => {
                    warn!("Failed to parse {key}={value} kernel command line switch. UUID is missing, ignoring.");
                }
                Some((identifier, keyspec)) => {
                    let (key_file, key_device) = match keyspec.rsplit_once(':') {
                        Some((file, device)) => (file, Some(device.to_owned())),
                        None => (keyspec, None),
                    };
                    let record = store.get_or_create(identifier);
                    record.key_file = Some(key_file.to_owned());
                    record.key_device = key_device;
                }
                None => policy.default_keyfile = Some(value.to_owned()),
            }
        }
        "luks.hdr" => {
            if let Some((identifier, path)) = device_assignment(key, value) {
                store.get_or_create(identifier).header_device = Some(resolve_node(path));
            }
        }
        "luks.data" => {
            if let Some((identifier, path)) = device_assignment(key, value) {
                store.get_or_create(identifier).data_device = Some(resolve_node(path));
            }
        }
        "luks.name" => {
            let Some(value) = require_value(key, value) else {
                return;
            };
            match split_assignment(value, is_hex_or_dash) {
                Some((identifier, name)) if !identifier.is_empty() && !name.is_empty() => {
                    let record = store.get_or_create(identifier);
                    record.create = true;
                    record.name = Some(name.to_owned());
                    policy.whitelist = true;
                }
                _ => warn!("Failed to parse luks name switch {value}. Ignoring."),
            }
        }
        _ => (),
    }
}

fn set_switch(key: &str, value: Option<&str>, switch: &mut bool) {
    match value.map_or(Some(true), parse_boolean) {
        Some(b) => *switch = b,
        None => warn!(
            "Failed to parse {}= kernel command line switch {}. Ignoring.",
            key,
            value.unwrap_or_default()
        ),
    }
}

fn require_value<'a>(key: &str, value: Option<&'a str>) -> Option<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            warn!("Missing argument for {key}= kernel command line switch, ignoring.");
            None
        }
    }
}

fn is_hex_or_dash(c: char) -> bool {
    c.is_ascii_hexdigit() || c == '-'
}

fn is_alnum_or_dash(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-'
}

/// Split "<token>=<rest>" where token is the longest prefix whose
/// characters satisfy accept. None if that prefix is not followed by "=".
fn split_assignment(value: &str, accept: fn(char) -> bool) -> Option<(&str, &str)> {
    let n = value.find(|c| !accept(c)).unwrap_or(value.len());
    value[n..].strip_prefix('=').map(|rest| (&value[..n], rest))
}

/// Parse "<id128>=<path>" for switches that must name a device by a valid
/// 128 bit identifier.
fn device_assignment<'a>(key: &str, value: Option<&'a str>) -> Option<(&'a str, &'a str)> {
    let value = require_value(key, value)?;
    match split_assignment(value, is_alnum_or_dash) {
        Some((identifier, path)) if is_valid_id128(identifier) => Some((identifier, path)),
        _ => {
            warn!("Failed to parse {key}= kernel command line switch. UUID is invalid, ignoring.");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "2222aaaa2222aaaa2222aaaa2222aaaa";

    fn apply(params: &[(&str, Option<&str>)]) -> (Policy, DeviceStore) {
        let mut policy = Policy::default();
        let mut store = DeviceStore::new();
        for (key, value) in params {
            apply_boot_param(&mut policy, &mut store, key, *value);
        }
        (policy, store)
    }

    #[test]
    fn test_switches() {
        let (policy, _) = apply(&[("luks", Some("no")), ("luks.crypttab", Some("0"))]);
        assert!(!policy.enabled);
        assert!(!policy.read_crypttab);

        let (policy, _) = apply(&[("luks", Some("no")), ("luks", None)]);
        assert!(policy.enabled);

        let (policy, _) = apply(&[("luks", Some("perhaps"))]);
        assert_eq!(policy, Policy::default());
    }

    #[test]
    fn test_uuid_enables_whitelist() {
        let (policy, store) = apply(&[("luks.uuid", Some(&format!("luks-{ID}")))]);
        assert!(policy.whitelist);
        assert!(store.get(ID).unwrap().create);

        let (policy, store) = apply(&[("luks.uuid", None), ("luks.uuid", Some(""))]);
        assert!(!policy.whitelist);
        assert!(store.is_empty());
    }

    #[test]
    fn test_options() {
        let (policy, store) = apply(&[
            ("luks.options", Some(&format!("{ID}=discard,nofail"))),
            ("luks.options", Some("discard")),
        ]);
        assert_eq!(
            store.get(ID).unwrap().options.as_deref(),
            Some("discard,nofail")
        );
        assert!(!store.get(ID).unwrap().create);
        assert_eq!(policy.default_options.as_deref(), Some("discard"));
        assert!(!policy.whitelist);
    }

    #[test]
    fn test_key() {
        let (policy, store) = apply(&[
            ("luks.key", Some("abcd1234=keyfile:keydev")),
            ("luks.key", Some("ef01=/etc/key")),
            ("luks.key", Some("/boot/default.key")),
        ]);
        let record = store.get("abcd1234").unwrap();
        assert_eq!(record.key_file.as_deref(), Some("keyfile"));
        assert_eq!(record.key_device.as_deref(), Some("keydev"));

        let record = store.get("ef01").unwrap();
        assert_eq!(record.key_file.as_deref(), Some("/etc/key"));
        assert_eq!(record.key_device, None);

        assert_eq!(policy.default_keyfile.as_deref(), Some("/boot/default.key"));
    }

    #[test]
    fn test_key_splits_at_last_colon() {
        let (_, store) = apply(&[("luks.key", Some("abcd=/a:b:LABEL=keys"))]);
        let record = store.get("abcd").unwrap();
        assert_eq!(record.key_file.as_deref(), Some("/a:b"));
        assert_eq!(record.key_device.as_deref(), Some("LABEL=keys"));
    }

    #[test]
    fn test_key_overwrites_key_device() {
        let (_, store) = apply(&[
            ("luks.key", Some("abcd=/a:/dev/sdb1")),
            ("luks.key", Some("abcd=/b")),
        ]);
        let record = store.get("abcd").unwrap();
        assert_eq!(record.key_file.as_deref(), Some("/b"));
        assert_eq!(record.key_device, None);
    }

    #[test]
    fn test_hdr_and_data() {
        let (_, store) = apply(&[
            ("luks.hdr", Some(&format!("{ID}=UUID=1234"))),
            ("luks.data", Some(&format!("{ID}=/dev/sdc"))),
        ]);
        let record = store.get(ID).unwrap();
        assert_eq!(
            record.header_device.as_deref(),
            Some("/dev/disk/by-uuid/1234")
        );
        assert_eq!(record.data_device.as_deref(), Some("/dev/sdc"));
        assert!(!record.create);
    }

    #[test]
    fn test_hdr_invalid_uuid_is_ignored() {
        let (policy, store) = apply(&[
            ("luks.hdr", Some("3333=notahex")),
            ("luks.hdr", Some("/dev/sdb")),
            ("luks.data", Some("3333333333333333333333333333333g=/dev/sdc")),
        ]);
        assert!(store.is_empty());
        assert_eq!(policy, Policy::default());
    }

    #[test]
    fn test_name() {
        let (policy, store) = apply(&[("luks.name", Some(&format!("{ID}=home")))]);
        let record = store.get(ID).unwrap();
        assert_eq!(record.mapped_name(), "home");
        assert!(record.create);
        assert!(policy.whitelist);

        let (policy, store) = apply(&[("luks.name", Some("home"))]);
        assert!(store.is_empty());
        assert!(!policy.whitelist);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let (policy, store) = apply(&[("root", Some("/dev/sda1")), ("luksx", None)]);
        assert_eq!(policy, Policy::default());
        assert!(store.is_empty());
    }
}
