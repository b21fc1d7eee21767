// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{
    env,
    path::{Path, PathBuf},
};

use log::warn;

use crate::{
    engine::parse_boolean,
    generator::consts::{
        CRYPTTAB_ENV, CRYPTTAB_PATH, INITRD_RELEASE_PATH, IN_INITRD_ENV, RUNTIME_DIR,
    },
};

/// Where the generator reads from and writes to for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Normal priority generator output directory.
    pub dest: PathBuf,
    /// The crypttab file to read.
    pub crypttab: PathBuf,
    /// Parent of the private mount points for key and header devices.
    pub runtime_dir: PathBuf,
    /// Whether "rd." prefixed kernel command line keys apply.
    pub in_initrd: bool,
}

impl GeneratorConfig {
    /// A configuration with the built in defaults and no initrd handling.
    pub fn new(dest: &Path) -> GeneratorConfig {
        GeneratorConfig {
            dest: dest.to_owned(),
            crypttab: PathBuf::from(CRYPTTAB_PATH),
            runtime_dir: PathBuf::from(RUNTIME_DIR),
            in_initrd: false,
        }
    }

    /// Build a configuration for dest, honoring the environment overrides
    /// systemd passes to generators.
    pub fn from_env(dest: &Path) -> GeneratorConfig {
        let mut config = GeneratorConfig::new(dest);
        if let Some(crypttab) = env::var_os(CRYPTTAB_ENV) {
            config.crypttab = PathBuf::from(crypttab);
        }
        config.in_initrd = detect_initrd();
        config
    }
}

fn detect_initrd() -> bool {
    match env::var(IN_INITRD_ENV) {
        Ok(value) => match parse_boolean(&value) {
            Some(b) => b,
            None => {
                warn!(
                    "Failed to parse ${}={}, falling back to {}",
                    IN_INITRD_ENV, value, INITRD_RELEASE_PATH
                );
                Path::new(INITRD_RELEASE_PATH).exists()
            }
        },
        Err(_) => Path::new(INITRD_RELEASE_PATH).exists(),
    }
}
