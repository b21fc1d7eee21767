// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt::Write;

use crate::{
    generator::consts::{
        MKE2FS_PATH, MKSWAP_PATH, SYSTEMD_CRYPTSETUP_PATH, UMOUNT_PATH, UMOUNT_TARGET,
    },
    units::deps::Dependency,
};

/// Commands run after the device has been attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostAction {
    /// Create an ext2 file system on the mapped device.
    MakeFilesystem,
    /// Format the mapped device as swap.
    MakeSwap,
    /// Unmount an auxiliary mount point.
    Unmount(String),
}

impl PostAction {
    fn command(&self, escaped_name: &str) -> String {
        match *self {
            PostAction::MakeFilesystem => {
                format!("{MKE2FS_PATH} '/dev/mapper/{escaped_name}'")
            }
            PostAction::MakeSwap => format!("{MKSWAP_PATH} '/dev/mapper/{escaped_name}'"),
            PostAction::Unmount(ref mount_point) => format!("{UMOUNT_PATH} {mount_point}"),
        }
    }
}

/// The systemd-cryptsetup@.service instance for one device. Every string
/// is already specifier escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUnit {
    pub name: String,
    pub source_path: String,
    pub escaped_name: String,
    pub escaped_device: String,
    pub escaped_key_file: Option<String>,
    pub escaped_options: String,
    pub dependencies: Vec<Dependency>,
    pub post_actions: Vec<PostAction>,
}

impl ServiceUnit {
    pub fn render(&self) -> String {
        let mut text = format!(
            "[Unit]\n\
             Description=Cryptography Setup for %I\n\
             Documentation=man:crypttab(5) man:systemd-cryptsetup-generator(8) man:systemd-cryptsetup@.service(8)\n\
             SourcePath={}\n\
             DefaultDependencies=no\n\
             Conflicts={}\n\
             IgnoreOnIsolate=true\n",
            self.source_path, UMOUNT_TARGET,
        );
        for dependency in &self.dependencies {
            let _ = writeln!(text, "{dependency}");
        }

        // The helper enforces its own timeout, and keys cached in the
        // kernel keyring are shared between instances.
        let _ = write!(
            text,
            "\n[Service]\n\
             Type=oneshot\n\
             RemainAfterExit=yes\n\
             TimeoutSec=0\n\
             KeyringMode=shared\n\
             ExecStart={cryptsetup} attach '{name}' '{device}' '{key}' '{options}'\n\
             ExecStop={cryptsetup} detach '{name}'\n",
            cryptsetup = SYSTEMD_CRYPTSETUP_PATH,
            name = self.escaped_name,
            device = self.escaped_device,
            key = self.escaped_key_file.as_deref().unwrap_or_default(),
            options = self.escaped_options,
        );
        for action in &self.post_actions {
            let _ = writeln!(text, "ExecStartPost={}", action.command(&self.escaped_name));
        }
        text
    }
}
