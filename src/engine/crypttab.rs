// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{fs, io::ErrorKind, path::Path};

use log::{debug, error};

/// One line of a crypttab file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrypttabEntry {
    /// 1-based line number in the file.
    pub line: usize,
    pub name: String,
    pub device: String,
    pub key_file: Option<String>,
    pub options: Option<String>,
}

/// Parse crypttab contents. Blank lines and comments are skipped, as are
/// lines without 2 to 4 fields, which are reported.
pub fn parse_crypttab(contents: &str, source: &Path) -> Vec<CrypttabEntry> {
    contents
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let line_no = index + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields.as_slice() {
                [name, device, rest @ ..] if rest.len() <= 2 => Some(CrypttabEntry {
                    line: line_no,
                    name: (*name).to_owned(),
                    device: (*device).to_owned(),
                    key_file: rest.first().map(|s| (*s).to_owned()),
                    options: rest.get(1).map(|s| (*s).to_owned()),
                }),
                _ => {
                    error!("Failed to parse {}:{}, ignoring.", source.display(), line_no);
                    None
                }
            }
        })
        .collect()
}

/// Read and parse the crypttab file at path. A missing or unreadable file
/// yields no entries.
pub fn read_crypttab(path: &Path) -> Vec<CrypttabEntry> {
    match fs::read(path) {
        Ok(bytes) => parse_crypttab(&String::from_utf8_lossy(&bytes), path),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("{} does not exist, no devices to set up from it", path.display());
            Vec::new()
        }
        Err(err) => {
            error!("Failed to open {}: {}", path.display(), err);
            Vec::new()
        }
    }
}
