// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

pub const GENERATOR_NAME: &str = "cryptsetup-generator";

pub const DEFAULT_DEST: &str = "/tmp";
pub const CRYPTTAB_PATH: &str = "/etc/crypttab";
pub const RUNTIME_DIR: &str = "/run/systemd/cryptsetup";
pub const PROC_CMDLINE_PATH: &str = "/proc/cmdline";
pub const INITRD_RELEASE_PATH: &str = "/etc/initrd-release";

pub const CRYPTTAB_ENV: &str = "SYSTEMD_CRYPTTAB";
pub const PROC_CMDLINE_ENV: &str = "SYSTEMD_PROC_CMDLINE";
pub const IN_INITRD_ENV: &str = "SYSTEMD_IN_INITRD";
pub const LOG_TARGET_ENV: &str = "SYSTEMD_LOG_TARGET";

pub const SYSTEMD_CRYPTSETUP_PATH: &str = "/usr/lib/systemd/systemd-cryptsetup";
pub const MKE2FS_PATH: &str = "/sbin/mke2fs";
pub const MKSWAP_PATH: &str = "/sbin/mkswap";
pub const UMOUNT_PATH: &str = "/bin/umount";

pub const CRYPTSETUP_PRE_TARGET: &str = "cryptsetup-pre.target";
pub const CRYPTSETUP_TARGET: &str = "cryptsetup.target";
pub const REMOTE_FS_PRE_TARGET: &str = "remote-fs-pre.target";
pub const REMOTE_CRYPTSETUP_TARGET: &str = "remote-cryptsetup.target";
pub const UMOUNT_TARGET: &str = "umount.target";
pub const RANDOM_SEED_SERVICE: &str = "systemd-random-seed.service";

/// Template the per-device services are instantiated from.
pub const CRYPTSETUP_TEMPLATE: &str = "systemd-cryptsetup";

/// Option string used for command line devices when nothing else applies.
pub const FALLBACK_OPTIONS: &str = "timeout=0";
