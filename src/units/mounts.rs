// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

// Mount units for devices that hold a key file or a detached header.

use std::{
    fs::DirBuilder,
    os::unix::fs::DirBuilderExt,
    path::Path,
};

use nix::{errno::Errno, sys::stat::Mode, unistd::mkdir};
use strum_macros::AsRefStr;

use crate::{
    generator::{DeviceError, GeneratorError, GeneratorResult},
    units::{
        escape::{cescape, unit_name_from_path},
        node::resolve_node,
    },
};

/// Why an auxiliary device is mounted. The string form prefixes the mount
/// point directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum MountRole {
    #[strum(serialize = "keydev")]
    KeyDevice,
    #[strum(serialize = "hdrdev")]
    HeaderDevice,
}

impl MountRole {
    /// Key devices are only read. Header devices are mounted writable
    /// since LUKS2 header recovery writes to them.
    fn read_only(self) -> bool {
        match self {
            MountRole::KeyDevice => true,
            MountRole::HeaderDevice => false,
        }
    }
}

/// A mount unit that makes an auxiliary device available below the
/// runtime directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryMount {
    pub role: MountRole,
    pub unit: String,
    pub what: String,
    pub mount_point: String,
}

impl AuxiliaryMount {
    /// Plan the mount of device for the encrypted device called name.
    pub fn plan(
        role: MountRole,
        runtime_dir: &Path,
        name: &str,
        device: &str,
    ) -> Result<AuxiliaryMount, DeviceError> {
        let mount_point = runtime_dir
            .join(format!("{}-{}", role.as_ref(), cescape(name)))
            .to_str()
            .map(|s| s.to_owned())
            .ok_or_else(|| DeviceError::InvalidUnitPath(runtime_dir.display().to_string()))?;
        let unit = unit_name_from_path(&mount_point, ".mount")?;
        Ok(AuxiliaryMount {
            role,
            unit,
            what: resolve_node(device),
            mount_point,
        })
    }

    /// The path of file relative to the mount point.
    pub fn path_of(&self, file: &str) -> String {
        format!(
            "{}/{}",
            self.mount_point.trim_end_matches('/'),
            file.trim_start_matches('/')
        )
    }

    pub fn render(&self) -> String {
        format!(
            "[Unit]\n\
             DefaultDependencies=no\n\
             \n\
             [Mount]\n\
             What={}\n\
             Where={}\n\
             Options={}\n",
            self.what,
            self.mount_point,
            if self.role.read_only() { "ro" } else { "rw" },
        )
    }
}

fn mkdir_private(path: &Path) -> GeneratorResult<()> {
    match mkdir(path, Mode::S_IRWXU) {
        Ok(()) | Err(Errno::EEXIST) => Ok(()),
        Err(err) => Err(GeneratorError::Chained(
            format!("Failed to create directory {}", path.display()),
            Box::new(GeneratorError::from(err)),
        )),
    }
}

/// Create the private runtime directory and the mount point in it.
pub fn create_mount_point(runtime_dir: &Path, mount: &AuxiliaryMount) -> GeneratorResult<()> {
    if let Some(parent) = runtime_dir.parent() {
        DirBuilder::new()
            .recursive(true)
            .mode(0o755)
            .create(parent)
            .map_err(|err| {
                GeneratorError::Chained(
                    format!("Failed to create directory {}", parent.display()),
                    Box::new(GeneratorError::from(err)),
                )
            })?;
    }
    mkdir_private(runtime_dir)?;
    mkdir_private(Path::new(&mount.mount_point))
}
