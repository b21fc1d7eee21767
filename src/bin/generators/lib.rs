// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{
    env,
    error::Error,
    fs::OpenOptions,
    io::Write,
    path::PathBuf,
    str::FromStr,
};

use clap::ArgMatches;
use env_logger::{Builder, Target};
use log::{Level, LevelFilter};
use strum_macros::EnumString;

use cryptsetup_generator::generator::consts::{GENERATOR_NAME, LOG_TARGET_ENV};

const KMSG_PATH: &str = "/dev/kmsg";

/// Where log messages go, as selected by $SYSTEMD_LOG_TARGET.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
enum LogTarget {
    #[strum(serialize = "console")]
    Console,
    #[strum(
        serialize = "kmsg",
        serialize = "auto",
        serialize = "journal-or-kmsg",
        serialize = "syslog-or-kmsg"
    )]
    Kmsg,
    #[strum(serialize = "null")]
    Null,
}

/// The three output directories systemd passes to generators, or None if
/// the generator was run without arguments.
pub fn get_generator_args(
    matches: &ArgMatches,
) -> Result<Option<(PathBuf, PathBuf, PathBuf)>, String> {
    let dirs: Vec<PathBuf> = matches
        .get_many::<PathBuf>("dirs")
        .map(|dirs| dirs.cloned().collect())
        .unwrap_or_default();
    match <[PathBuf; 3]>::try_from(dirs) {
        Ok([normal_dir, early_dir, late_dir]) => Ok(Some((normal_dir, early_dir, late_dir))),
        Err(dirs) if dirs.is_empty() => Ok(None),
        Err(dirs) => Err(format!(
            "This program takes zero or three arguments, {} given.",
            dirs.len()
        )),
    }
}

/// Syslog priority of a log level.
fn priority(level: Level) -> u8 {
    match level {
        Level::Error => 3,
        Level::Warn => 4,
        Level::Info => 6,
        Level::Debug | Level::Trace => 7,
    }
}

/// Set up logging to the kernel log buffer, falling back to stderr when it
/// can not be opened. The level is log_level if given, otherwise taken from
/// $RUST_LOG, otherwise info.
pub fn setup_logger(log_level: Option<LevelFilter>) -> Result<(), Box<dyn Error>> {
    let mut builder = Builder::new();
    builder.filter_level(LevelFilter::Info);
    if let Some(log_level) = log_level {
        builder.filter_level(log_level);
    } else if let Ok(s) = env::var("RUST_LOG") {
        builder.parse_filters(&s);
    }

    let target = env::var(LOG_TARGET_ENV)
        .ok()
        .and_then(|s| LogTarget::from_str(&s).ok())
        .unwrap_or(LogTarget::Kmsg);

    match target {
        LogTarget::Kmsg => {
            if let Ok(kmsg) = OpenOptions::new().write(true).open(KMSG_PATH) {
                builder
                    .target(Target::Pipe(Box::new(kmsg)))
                    .format(|buf, record| {
                        writeln!(
                            buf,
                            "<{}>{}: {}",
                            priority(record.level()),
                            GENERATOR_NAME,
                            record.args()
                        )
                    });
            } else {
                builder.target(Target::Stderr);
            }
        }
        LogTarget::Console => {
            builder.target(Target::Stderr);
        }
        LogTarget::Null => {
            builder.filter_level(LevelFilter::Off);
        }
    }

    builder.try_init()?;
    Ok(())
}
