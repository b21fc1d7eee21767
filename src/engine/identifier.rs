// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

// Helpers for the identifiers devices are keyed by.

use std::path::Path;

use uuid::Uuid;

pub const LUKS_NAME_PREFIX: &str = "luks-";
pub const UUID_TAG: &str = "UUID=";
pub const BY_UUID_DIR: &str = "/dev/disk/by-uuid";

/// True if s is a 128 bit identifier written as 32 hex digits, either
/// plain or in the dashed 8-4-4-4-12 form.
pub fn is_valid_id128(s: &str) -> bool {
    matches!(s.len(), 32 | 36) && Uuid::try_parse(s).is_ok()
}

/// The key identifiers are compared by. Hex digits match regardless of
/// case.
pub fn identifier_key(identifier: &str) -> String {
    identifier.to_ascii_lowercase()
}

/// The device mapper name a device gets when none was requested.
pub fn default_mapped_name(identifier: &str) -> String {
    format!("{LUKS_NAME_PREFIX}{identifier}")
}

/// Pick the identifier a crypttab line refers to: the value of a "UUID="
/// reference, the last component of a path below /dev/disk/by-uuid, or the
/// name with its "luks-" prefix removed, in that order.
pub fn candidate_identifier<'a>(name: &'a str, device: &'a str) -> Option<&'a str> {
    device
        .strip_prefix(UUID_TAG)
        .or_else(|| by_uuid_component(device))
        .or_else(|| name.strip_prefix(LUKS_NAME_PREFIX))
}

fn by_uuid_component(device: &str) -> Option<&str> {
    let rest = Path::new(device)
        .strip_prefix(BY_UUID_DIR)
        .ok()?
        .to_str()?;
    if rest.is_empty() {
        None
    } else {
        Some(rest)
    }
}
