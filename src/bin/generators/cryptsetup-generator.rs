// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{path::PathBuf, process};

use clap::{error::ErrorKind, value_parser, Arg, ArgAction, Command};
use log::{error, LevelFilter};
use nix::sys::stat::{umask, Mode};

use cryptsetup_generator::{
    engine::read_kernel_cmdline,
    generator::{
        consts::{DEFAULT_DEST, GENERATOR_NAME},
        run, GeneratorConfig,
    },
};

mod lib;

fn parse_args() -> Command {
    Command::new(GENERATOR_NAME)
        .about("Generate systemd units for encrypted block devices")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("log_level")
                .long("log-level")
                .value_parser(value_parser!(LevelFilter))
                .help("Sets level for generation of log messages."),
        )
        .arg(
            Arg::new("dirs")
                .num_args(0..)
                .action(ArgAction::Append)
                .value_parser(value_parser!(PathBuf))
                .help("Normal, early and late priority output directories"),
        )
}

fn main() {
    let mut cmd = parse_args();
    let matches = cmd.get_matches_mut();

    let dest = match lib::get_generator_args(&matches) {
        Ok(Some((normal_dir, _, _))) => normal_dir,
        Ok(None) => PathBuf::from(DEFAULT_DEST),
        Err(msg) => cmd.error(ErrorKind::WrongNumberOfValues, msg).exit(),
    };

    if let Err(err) = lib::setup_logger(matches.get_one::<LevelFilter>("log_level").copied()) {
        eprintln!("{GENERATOR_NAME}: failed to set up logging: {err}");
        process::exit(1);
    }

    umask(Mode::from_bits_truncate(0o022));

    let config = GeneratorConfig::from_env(&dest);
    if let Err(err) = read_kernel_cmdline().and_then(|cmdline| run(&config, &cmdline)) {
        error!("systemd generator failed with error: {err}");
        process::exit(1);
    }
}
