// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

// Classification and filtering of comma separated crypttab options.

use itertools::Itertools;

/// Split an option string into its non-empty words.
fn words(options: Option<&str>) -> impl Iterator<Item = &str> {
    options
        .unwrap_or_default()
        .split(',')
        .filter(|word| !word.is_empty())
}

/// The value of word if it is "name=value".
fn option_value<'a>(word: &'a str, name: &str) -> Option<&'a str> {
    word.strip_prefix(name)?.strip_prefix('=')
}

/// True if word is the flag name, alone or with a value.
fn option_matches(word: &str, name: &str) -> bool {
    word == name || option_value(word, name).is_some()
}

/// True if any of names appears among the options.
pub fn test_option(options: Option<&str>, names: &[&str]) -> bool {
    words(options).any(|word| names.iter().any(|name| option_matches(word, name)))
}

/// True if the last of yes and no to appear, alone or with a value, is yes.
pub fn test_yes_no_option(options: Option<&str>, yes: &str, no: &str) -> bool {
    words(options)
        .filter(|word| option_matches(word, yes) || option_matches(word, no))
        .last()
        .is_some_and(|word| option_matches(word, yes))
}

/// Result of removing every "name=value" option with one of a set of names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredOptions {
    /// The value of the last matching option.
    pub value: Option<String>,
    /// The remaining options, comma separated.
    pub remaining: String,
}

impl FilteredOptions {
    pub fn found(&self) -> bool {
        self.value.is_some()
    }
}

pub fn filter_options(options: Option<&str>, names: &[&str]) -> FilteredOptions {
    let mut value = None;
    let remaining = words(options)
        .filter(|word| {
            match names.iter().find_map(|name| option_value(word, name)) {
                Some(v) => {
                    value = Some(v.to_owned());
                    false
                }
                None => true,
            }
        })
        .join(",");
    FilteredOptions { value, remaining }
}

/// Append "name=value" to an option string.
pub fn append_option(options: &str, name: &str, value: &str) -> String {
    if options.is_empty() {
        format!("{name}={value}")
    } else {
        format!("{options},{name}={value}")
    }
}

/// The flags of a crypttab entry that shape the generated units.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceFlags {
    pub noauto: bool,
    pub nofail: bool,
    pub tmp: bool,
    pub swap: bool,
    pub netdev: bool,
}

impl DeviceFlags {
    pub fn classify(options: Option<&str>) -> DeviceFlags {
        DeviceFlags {
            noauto: test_yes_no_option(options, "noauto", "auto"),
            nofail: test_yes_no_option(options, "nofail", "fail"),
            tmp: test_option(options, &["tmp"]),
            swap: test_option(options, &["swap"]),
            netdev: test_option(options, &["_netdev"]),
        }
    }
}
