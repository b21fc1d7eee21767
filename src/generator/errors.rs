// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{error::Error, fmt, io};

pub type GeneratorResult<T> = Result<T, GeneratorError>;

/// Errors that abort the whole generation pass.
#[derive(Debug)]
pub enum GeneratorError {
    Msg(String),
    Chained(String, Box<GeneratorError>),
    Io(io::Error),
    Nix(nix::Error),
    Regex(regex::Error),
}

impl fmt::Display for GeneratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            GeneratorError::Msg(ref s) => write!(f, "{s}"),
            GeneratorError::Chained(ref s, ref err) => write!(f, "{s}; {err}"),
            GeneratorError::Io(ref err) => write!(f, "IO error: {err}"),
            GeneratorError::Nix(ref err) => write!(f, "Nix error: {err}"),
            GeneratorError::Regex(ref err) => write!(f, "Regex error: {err}"),
        }
    }
}

impl Error for GeneratorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            GeneratorError::Msg(_) => None,
            GeneratorError::Chained(_, ref err) => Some(err.as_ref()),
            GeneratorError::Io(ref err) => Some(err),
            GeneratorError::Nix(ref err) => Some(err),
            GeneratorError::Regex(ref err) => Some(err),
        }
    }
}

impl From<io::Error> for GeneratorError {
    fn from(err: io::Error) -> GeneratorError {
        GeneratorError::Io(err)
    }
}

impl From<nix::Error> for GeneratorError {
    fn from(err: nix::Error) -> GeneratorError {
        GeneratorError::Nix(err)
    }
}

impl From<regex::Error> for GeneratorError {
    fn from(err: regex::Error) -> GeneratorError {
        GeneratorError::Regex(err)
    }
}

/// Reasons a single device is skipped. None of these stop the pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Both "tmp" and "swap" were requested for the same device.
    TmpAndSwap(String),
    /// A key device was given without a key file to read from it.
    MissingKeyFile(String),
    /// A header device was given without a "header=" option.
    MissingHeaderPath(String),
    /// A path could not be turned into a unit name.
    InvalidUnitPath(String),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DeviceError::TmpAndSwap(ref name) => {
                write!(f, "Device '{name}' cannot be both 'tmp' and 'swap'")
            }
            DeviceError::MissingKeyFile(ref name) => write!(
                f,
                "Key device is specified for '{name}', but path to the password file is missing"
            ),
            DeviceError::MissingHeaderPath(ref name) => write!(
                f,
                "Header device is specified for '{name}', but path to the header file is missing"
            ),
            DeviceError::InvalidUnitPath(ref path) => {
                write!(f, "Failed to generate unit name from path '{path}'")
            }
        }
    }
}

impl Error for DeviceError {}
