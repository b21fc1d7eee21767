// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fs::create_dir_all;

use log::{debug, info};

use crate::{
    engine::{
        apply_boot_params, cmdline_requests, parse_cmdline, read_crypttab,
        resolve_crypttab_entry, DeviceStore, Policy,
    },
    generator::{GeneratorConfig, GeneratorError, GeneratorResult},
    units::{GeneratorDir, UnitEmitter},
};

/// One generation pass: interpret the kernel command line, emit units for
/// crypttab, then for the devices only the command line asked for.
pub fn run(config: &GeneratorConfig, cmdline: &str) -> GeneratorResult<()> {
    let mut policy = Policy::default();
    let mut store = DeviceStore::new();
    apply_boot_params(
        &mut policy,
        &mut store,
        &parse_cmdline(cmdline, config.in_initrd),
    );

    if !policy.enabled {
        info!("Disabled, exiting.");
        return Ok(());
    }

    create_dir_all(&config.dest).map_err(|err| {
        GeneratorError::Chained(
            format!("Failed to create directory {}", config.dest.display()),
            Box::new(GeneratorError::from(err)),
        )
    })?;

    let mut sink = GeneratorDir::new(&config.dest);
    let mut emitter = UnitEmitter::new(config, &mut sink)?;

    if policy.read_crypttab {
        for entry in read_crypttab(&config.crypttab) {
            if let Some(request) = resolve_crypttab_entry(&policy, &mut store, &entry) {
                emitter.emit(&request)?;
            }
        }
    } else {
        debug!("Not reading {}", config.crypttab.display());
    }

    for request in cmdline_requests(&policy, &store) {
        emitter.emit(&request)?;
    }

    Ok(())
}
