// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use indexmap::IndexMap;

use crate::engine::identifier::{default_mapped_name, identifier_key};

/// Everything learned about one encrypted device from the kernel command
/// line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceRecord {
    identifier: String,
    pub key_file: Option<String>,
    pub key_device: Option<String>,
    pub header_device: Option<String>,
    pub data_device: Option<String>,
    pub name: Option<String>,
    pub options: Option<String>,
    /// Emit this device even if no crypttab line refers to it.
    pub create: bool,
}

impl DeviceRecord {
    fn new(identifier: &str) -> DeviceRecord {
        DeviceRecord {
            identifier: identifier.to_owned(),
            ..Default::default()
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The device mapper name, "luks-<identifier>" if none was requested.
    pub fn mapped_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| default_mapped_name(&self.identifier))
    }
}

/// Device records keyed by identifier. Lookups ignore the case of the
/// identifier; iteration follows the order in which records were created.
#[derive(Debug, Default)]
pub struct DeviceStore {
    records: IndexMap<String, DeviceRecord>,
}

impl DeviceStore {
    pub fn new() -> DeviceStore {
        DeviceStore::default()
    }

    /// Return the record for identifier, creating an empty one if there is
    /// none yet.
    pub fn get_or_create(&mut self, identifier: &str) -> &mut DeviceRecord {
        self.records
            .entry(identifier_key(identifier))
            .or_insert_with(|| DeviceRecord::new(identifier))
    }

    pub fn get(&self, identifier: &str) -> Option<&DeviceRecord> {
        self.records.get(&identifier_key(identifier))
    }

    pub fn get_mut(&mut self, identifier: &str) -> Option<&mut DeviceRecord> {
        self.records.get_mut(&identifier_key(identifier))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.records.values()
    }
}
