// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

// Combine crypttab lines with what the kernel command line asked for.

use log::info;

use crate::{
    engine::{
        crypttab::CrypttabEntry,
        identifier::{candidate_identifier, UUID_TAG},
        params::Policy,
        store::DeviceStore,
    },
    generator::consts::FALLBACK_OPTIONS,
    units::DeviceRequest,
};

/// Turn a crypttab line into a device request, applying any options set
/// for the same device on the kernel command line. Returns None if the
/// line must be skipped.
///
/// A matching record is marked as handled whether or not the line is
/// emitted afterwards, so the sweep never picks it up again.
pub fn resolve_crypttab_entry(
    policy: &Policy,
    store: &mut DeviceStore,
    entry: &CrypttabEntry,
) -> Option<DeviceRequest> {
    let record = candidate_identifier(&entry.name, &entry.device)
        .and_then(|identifier| store.get_mut(identifier));

    let options = match record {
        Some(record) => {
            record.create = false;
            record.options.clone().or_else(|| entry.options.clone())
        }
        None if policy.whitelist => {
            info!(
                "Not creating device '{}' because it was not specified on the kernel command line.",
                entry.name
            );
            return None;
        }
        None => entry.options.clone(),
    };

    Some(DeviceRequest {
        name: entry.name.clone(),
        device: entry.device.clone(),
        key_device: None,
        header_device: None,
        key_file: entry.key_file.clone(),
        options,
    })
}

/// Device requests for every record created on the kernel command line
/// that no crypttab line has claimed.
pub fn cmdline_requests(policy: &Policy, store: &DeviceStore) -> Vec<DeviceRequest> {
    store
        .iter()
        .filter(|record| record.create)
        .map(|record| DeviceRequest {
            name: record.mapped_name(),
            device: record
                .data_device
                .clone()
                .unwrap_or_else(|| format!("{}{}", UUID_TAG, record.identifier())),
            key_device: record.key_device.clone(),
            header_device: record.header_device.clone(),
            key_file: record
                .key_file
                .clone()
                .or_else(|| policy.default_keyfile.clone()),
            options: Some(
                record
                    .options
                    .clone()
                    .or_else(|| policy.default_options.clone())
                    .unwrap_or_else(|| FALLBACK_OPTIONS.to_owned()),
            ),
        })
        .collect()
}
