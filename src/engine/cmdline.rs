// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

// Reading and splitting the kernel command line.

use std::{env, fs};

use crate::generator::{
    consts::{PROC_CMDLINE_ENV, PROC_CMDLINE_PATH},
    GeneratorError, GeneratorResult,
};

const INITRD_PREFIX: &str = "rd.";

/// One kernel command line switch. A switch given without "=" has no value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootParam {
    pub key: String,
    pub value: Option<String>,
}

/// Read the kernel command line, preferring $SYSTEMD_PROC_CMDLINE over
/// /proc/cmdline.
pub fn read_kernel_cmdline() -> GeneratorResult<String> {
    if let Ok(cmdline) = env::var(PROC_CMDLINE_ENV) {
        return Ok(cmdline);
    }
    fs::read_to_string(PROC_CMDLINE_PATH).map_err(|err| {
        GeneratorError::Chained(
            format!("Failed to read kernel command line from {PROC_CMDLINE_PATH}"),
            Box::new(GeneratorError::from(err)),
        )
    })
}

/// Split a command line into words. Whitespace separates words except
/// inside single or double quotes; the quotes themselves are dropped.
fn split_words(cmdline: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut quote = None;

    for c in cmdline.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => word.push(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            None => {
                word.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(word);
    }
    words
}

/// Parse the command line into switches, in the order given.
///
/// Keys with an "rd." prefix are only meant for the initrd: there the
/// prefix is stripped, elsewhere they are dropped.
pub fn parse_cmdline(cmdline: &str, in_initrd: bool) -> Vec<BootParam> {
    split_words(cmdline)
        .into_iter()
        .filter_map(|word| {
            let (key, value) = match word.split_once('=') {
                Some((key, value)) => (key.to_owned(), Some(value.to_owned())),
                None => (word, None),
            };
            let key = match key.strip_prefix(INITRD_PREFIX) {
                Some(stripped) if in_initrd => stripped.to_owned(),
                Some(_) => return None,
                None => key,
            };
            Some(BootParam { key, value })
        })
        .collect()
}

/// Parse a boolean the way systemd does.
pub fn parse_boolean(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "yes" | "y" | "true" | "t" | "on" => Some(true),
        "0" | "no" | "n" | "false" | "f" | "off" => Some(false),
        _ => None,
    }
}
