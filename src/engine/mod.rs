// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

pub use self::{
    cmdline::{parse_boolean, parse_cmdline, read_kernel_cmdline, BootParam},
    crypttab::{parse_crypttab, read_crypttab, CrypttabEntry},
    identifier::{candidate_identifier, default_mapped_name, is_valid_id128},
    merge::{cmdline_requests, resolve_crypttab_entry},
    params::{apply_boot_param, apply_boot_params, Policy},
    store::{DeviceRecord, DeviceStore},
};

mod cmdline;
mod crypttab;
mod identifier;
mod merge;
mod params;
mod store;
