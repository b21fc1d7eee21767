// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt;

use crate::{
    generator::{consts::RANDOM_SEED_SERVICE, DeviceError},
    units::{
        escape::{specifier_escape, unit_name_from_path},
        node::resolve_node,
    },
};

const RANDOM_SOURCES: [&str; 3] = ["/dev/urandom", "/dev/random", "/dev/hw_random"];

/// What a key, header or backing device reference points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathTarget {
    /// A node below /dev, with the name of its device unit.
    BlockDevice { node: String, unit: String },
    /// Anything else, which must be reachable through some mount.
    RegularFile(String),
    /// A kernel random number source.
    RandomSource,
    /// "-", "none" or /dev/null: nothing to wait for.
    None,
}

/// Classify a reference as found in crypttab or on the kernel command
/// line.
pub fn classify(reference: &str) -> Result<PathTarget, DeviceError> {
    if matches!(reference, "-" | "none") {
        return Ok(PathTarget::None);
    }
    if RANDOM_SOURCES.contains(&reference) {
        return Ok(PathTarget::RandomSource);
    }

    let node = resolve_node(reference);
    if node == "/dev/null" {
        Ok(PathTarget::None)
    } else if node.starts_with("/dev/") {
        let unit = unit_name_from_path(&node, ".device")?;
        Ok(PathTarget::BlockDevice { node, unit })
    } else {
        Ok(PathTarget::RegularFile(reference.to_owned()))
    }
}

/// One dependency line in the [Unit] section of a generated unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependency {
    After(String),
    Before(String),
    Requires(String),
    BindsTo(String),
    RequiresMountsFor(String),
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Dependency::After(ref unit) => write!(f, "After={unit}"),
            Dependency::Before(ref unit) => write!(f, "Before={unit}"),
            Dependency::Requires(ref unit) => write!(f, "Requires={unit}"),
            Dependency::BindsTo(ref unit) => write!(f, "BindsTo={unit}"),
            Dependency::RequiresMountsFor(ref path) => write!(f, "RequiresMountsFor={path}"),
        }
    }
}

impl PathTarget {
    /// The dependencies a unit reading from this target needs.
    pub fn dependencies(&self) -> Vec<Dependency> {
        match *self {
            PathTarget::BlockDevice { ref unit, .. } => vec![
                Dependency::After(unit.clone()),
                Dependency::Requires(unit.clone()),
            ],
            PathTarget::RegularFile(ref path) => {
                vec![Dependency::RequiresMountsFor(specifier_escape(path))]
            }
            PathTarget::RandomSource => vec![Dependency::After(RANDOM_SEED_SERVICE.to_owned())],
            PathTarget::None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("-").unwrap(), PathTarget::None);
        assert_eq!(classify("none").unwrap(), PathTarget::None);
        assert_eq!(classify("/dev/null").unwrap(), PathTarget::None);
        assert_eq!(classify("/dev/urandom").unwrap(), PathTarget::RandomSource);
        assert_eq!(classify("/dev/hw_random").unwrap(), PathTarget::RandomSource);
        assert_eq!(
            classify("UUID=abcd").unwrap(),
            PathTarget::BlockDevice {
                node: "/dev/disk/by-uuid/abcd".to_string(),
                unit: r"dev-disk-by\x2duuid-abcd.device".to_string(),
            }
        );
        assert_eq!(
            classify("/etc/keys/home.key").unwrap(),
            PathTarget::RegularFile("/etc/keys/home.key".to_string())
        );
        assert_matches!(classify("/dev/../etc/key"), Err(DeviceError::InvalidUnitPath(_)));
    }

    #[test]
    fn test_dependencies() {
        assert_eq!(
            classify("/dev/sdb1")
                .unwrap()
                .dependencies()
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>(),
            vec!["After=dev-sdb1.device", "Requires=dev-sdb1.device"]
        );
        assert_eq!(
            classify("/srv/100%.key").unwrap().dependencies(),
            vec![Dependency::RequiresMountsFor("/srv/100%%.key".to_string())]
        );
        assert_eq!(
            PathTarget::RandomSource.dependencies(),
            vec![Dependency::After("systemd-random-seed.service".to_string())]
        );
        assert!(PathTarget::None.dependencies().is_empty());
    }
}
