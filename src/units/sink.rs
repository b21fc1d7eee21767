// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{
    fs::{create_dir_all, OpenOptions, Permissions},
    io::{self, Write},
    os::unix::fs::{symlink, PermissionsExt},
    path::{Path, PathBuf},
};

use log::debug;
use strum_macros::AsRefStr;
use tempfile::NamedTempFile;

use crate::generator::{consts::GENERATOR_NAME, GeneratorError, GeneratorResult};

/// The kind of dependency a link expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Relation {
    Wants,
    Requires,
}

/// anchor wants or requires unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitLink {
    pub anchor: String,
    pub relation: Relation,
    pub unit: String,
}

/// A configuration fragment for an existing unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropIn {
    pub unit: String,
    pub priority: u8,
    pub name: String,
    pub contents: String,
}

/// Destination of generated units.
pub trait UnitSink {
    /// Write a new unit file. A unit that already exists is an error.
    fn write_unit(&mut self, name: &str, contents: &str) -> GeneratorResult<()>;

    fn add_link(&mut self, link: &UnitLink) -> GeneratorResult<()>;

    /// Write a drop-in, replacing any previous one of the same name.
    fn write_drop_in(&mut self, drop_in: &DropIn) -> GeneratorResult<()>;
}

pub fn generated_header() -> String {
    format!("# Automatically generated by {GENERATOR_NAME}\n\n")
}

fn chain(msg: String, err: io::Error) -> GeneratorError {
    GeneratorError::Chained(msg, Box::new(GeneratorError::from(err)))
}

/// A generator output directory on disk.
#[derive(Debug)]
pub struct GeneratorDir {
    dest: PathBuf,
}

impl GeneratorDir {
    pub fn new(dest: &Path) -> GeneratorDir {
        GeneratorDir {
            dest: dest.to_owned(),
        }
    }
}

impl UnitSink for GeneratorDir {
    fn write_unit(&mut self, name: &str, contents: &str) -> GeneratorResult<()> {
        let path = self.dest.join(name);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|err| {
                if err.kind() == io::ErrorKind::AlreadyExists {
                    chain(
                        format!(
                            "Failed to create unit file {}, as it already exists. Duplicate entry in crypttab?",
                            path.display()
                        ),
                        err,
                    )
                } else {
                    chain(format!("Failed to create unit file {}", path.display()), err)
                }
            })?;
        file.write_all(generated_header().as_bytes())
            .and_then(|_| file.write_all(contents.as_bytes()))
            .and_then(|_| file.flush())
            .map_err(|err| chain(format!("Failed to write unit file {}", path.display()), err))?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    fn add_link(&mut self, link: &UnitLink) -> GeneratorResult<()> {
        let dir = self
            .dest
            .join(format!("{}.{}", link.anchor, link.relation.as_ref()));
        create_dir_all(&dir)
            .map_err(|err| chain(format!("Failed to create directory {}", dir.display()), err))?;

        let to = dir.join(&link.unit);
        match symlink(Path::new("..").join(&link.unit), &to) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(err) => Err(chain(
                format!("Failed to create symlink {}", to.display()),
                err,
            )),
        }
    }

    fn write_drop_in(&mut self, drop_in: &DropIn) -> GeneratorResult<()> {
        let dir = self.dest.join(format!("{}.d", drop_in.unit));
        create_dir_all(&dir)
            .map_err(|err| chain(format!("Failed to create directory {}", dir.display()), err))?;

        let path = dir.join(format!("{:02}-{}.conf", drop_in.priority, drop_in.name));
        let mut file = NamedTempFile::new_in(&dir)
            .map_err(|err| chain(format!("Failed to create drop-in in {}", dir.display()), err))?;
        file.write_all(drop_in.contents.as_bytes())
            .and_then(|_| file.as_file().set_permissions(Permissions::from_mode(0o644)))
            .map_err(|err| chain(format!("Failed to write drop-in {}", path.display()), err))?;
        file.persist(&path)
            .map_err(|err| chain(format!("Failed to write drop-in {}", path.display()), err.error))?;
        Ok(())
    }
}
