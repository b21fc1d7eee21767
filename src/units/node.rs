// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

// Mapping of fstab style device references to udev device nodes.

use std::fmt::Write;

const TAGS: [(&str, &str); 4] = [
    ("LABEL=", "by-label"),
    ("UUID=", "by-uuid"),
    ("PARTUUID=", "by-partuuid"),
    ("PARTLABEL=", "by-partlabel"),
];

/// Encode a tag value the way udev names the symlinks under /dev/disk.
fn encode_devnode_name(value: &str) -> String {
    value.chars().fold(String::new(), |mut acc, c| {
        if !c.is_ascii() || c.is_ascii_alphanumeric() || "#+-.:=@_".contains(c) {
            acc.push(c);
        } else {
            let _ = write!(acc, r"\x{:02x}", u32::from(c));
        }
        acc
    })
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Turn a device reference like "UUID=..." or "LABEL=..." into the path of
/// the udev symlink for it. Any other reference is returned unchanged.
pub fn resolve_node(reference: &str) -> String {
    TAGS.iter()
        .find_map(|(tag, dir)| {
            reference.strip_prefix(tag).map(|value| {
                format!("/dev/disk/{}/{}", dir, encode_devnode_name(unquote(value)))
            })
        })
        .unwrap_or_else(|| reference.to_owned())
}
