// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

pub use self::{
    deps::{classify, Dependency, PathTarget},
    emit::{DeviceRequest, UnitEmitter, UnitPlan, UnitPlanner},
    escape::{specifier_escape, unit_name_escape, unit_name_from_path},
    mounts::{AuxiliaryMount, MountRole},
    node::resolve_node,
    options::DeviceFlags,
    service::{PostAction, ServiceUnit},
    sink::{DropIn, GeneratorDir, Relation, UnitLink, UnitSink},
};

mod deps;
mod emit;
mod escape;
mod mounts;
mod node;
mod options;
mod service;
mod sink;
