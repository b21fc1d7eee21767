// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

// Turns one resolved device into its units: classify the options, plan the
// auxiliary mounts, collect the dependencies, then render and write.

use log::{error, warn};
use regex::Regex;

use crate::{
    generator::{
        consts::{
            CRYPTSETUP_PRE_TARGET, CRYPTSETUP_TARGET, CRYPTSETUP_TEMPLATE, REMOTE_CRYPTSETUP_TARGET,
            REMOTE_FS_PRE_TARGET, UMOUNT_TARGET,
        },
        DeviceError, GeneratorConfig, GeneratorError, GeneratorResult,
    },
    units::{
        deps::{classify, Dependency, PathTarget},
        escape::{specifier_escape, unit_name_build, unit_name_escape, unit_name_from_path},
        mounts::{create_mount_point, AuxiliaryMount, MountRole},
        node::resolve_node,
        options::{append_option, filter_options, DeviceFlags},
        service::{PostAction, ServiceUnit},
        sink::{generated_header, DropIn, Relation, UnitLink, UnitSink},
    },
};

const HEADER_OPTION: &str = "header";
const DEVICE_TIMEOUT_OPTIONS: [&str; 2] =
    ["x-systemd.device-timeout", "comment=systemd.device-timeout"];

const TIMESPAN_PATTERN: &str = r"^(infinity|(\s*[0-9]+(\.[0-9]+)?\s*(usec|us|µs|μs|msec|ms|seconds|second|sec|s|minutes|minute|min|m|hours|hour|hr|h|days|day|d|weeks|week|w|months|month|M|years|year|y)?)+)$";

/// Everything needed to set up one encrypted device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceRequest {
    /// Name of the mapped device below /dev/mapper.
    pub name: String,
    /// The encrypted device, as a path or an fstab style tag.
    pub device: String,
    pub key_device: Option<String>,
    pub header_device: Option<String>,
    pub key_file: Option<String>,
    pub options: Option<String>,
}

/// The units and links generated for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitPlan {
    pub service: ServiceUnit,
    pub mounts: Vec<AuxiliaryMount>,
    pub drop_ins: Vec<DropIn>,
    pub links: Vec<UnitLink>,
}

/// Computes unit plans. Planning touches no files.
#[derive(Debug)]
pub struct UnitPlanner<'a> {
    config: &'a GeneratorConfig,
    timespan: Regex,
}

impl<'a> UnitPlanner<'a> {
    pub fn new(config: &'a GeneratorConfig) -> GeneratorResult<UnitPlanner<'a>> {
        Ok(UnitPlanner {
            config,
            timespan: Regex::new(TIMESPAN_PATTERN)?,
        })
    }

    pub fn plan(&self, request: &DeviceRequest) -> Result<UnitPlan, DeviceError> {
        let name = request.name.as_str();
        let options = request.options.as_deref();

        let flags = DeviceFlags::classify(options);
        let header = filter_options(options, &[HEADER_OPTION]);

        if flags.tmp && flags.swap {
            return Err(DeviceError::TmpAndSwap(name.to_owned()));
        }

        let escaped_name = specifier_escape(name);
        let unit_escaped_name = unit_name_escape(name);
        let node = resolve_node(&request.device);
        let service_name = unit_name_build(CRYPTSETUP_TEMPLATE, &unit_escaped_name, ".service");
        let device_unit = unit_name_from_path(&node, ".device")?;
        let mut escaped_key_file = request.key_file.as_deref().map(specifier_escape);

        if request.key_device.is_some() && request.key_file.is_none() {
            return Err(DeviceError::MissingKeyFile(name.to_owned()));
        }
        if request.header_device.is_some() && !header.found() {
            return Err(DeviceError::MissingHeaderPath(name.to_owned()));
        }

        let (pre_target, done_target) = if flags.netdev {
            (REMOTE_FS_PRE_TARGET, REMOTE_CRYPTSETUP_TARGET)
        } else {
            (CRYPTSETUP_PRE_TARGET, CRYPTSETUP_TARGET)
        };

        let mut dependencies = vec![Dependency::After(pre_target.to_owned())];
        let mut mounts = Vec::new();
        let mut post_actions = Vec::new();
        let mut effective_options = options.map(|o| o.to_owned());

        if let Some(key_device) = request.key_device.as_deref() {
            let mount =
                AuxiliaryMount::plan(MountRole::KeyDevice, &self.config.runtime_dir, name, key_device)?;
            escaped_key_file = escaped_key_file.map(|key| mount.path_of(&key));
            dependencies.push(Dependency::After(mount.unit.clone()));
            dependencies.push(Dependency::Requires(mount.unit.clone()));
            mounts.push(mount);
        }

        if let (Some(header_device), Some(header_path)) =
            (request.header_device.as_deref(), header.value.as_deref())
        {
            let mount = AuxiliaryMount::plan(
                MountRole::HeaderDevice,
                &self.config.runtime_dir,
                name,
                header_device,
            )?;
            effective_options = Some(append_option(
                &header.remaining,
                HEADER_OPTION,
                &mount.path_of(header_path),
            ));
            dependencies.push(Dependency::After(mount.unit.clone()));
            dependencies.push(Dependency::Requires(mount.unit.clone()));
            mounts.push(mount);
        }

        if !flags.nofail {
            dependencies.push(Dependency::Before(done_target.to_owned()));
        }

        if let Some(key_file) = request.key_file.as_deref() {
            dependencies.extend(classify(key_file)?.dependencies());
        }

        if request.header_device.is_none() {
            if let Some(header_path) = header.value.as_deref() {
                dependencies.extend(classify(header_path)?.dependencies());
            }
        }

        if node.starts_with("/dev/") {
            dependencies.push(Dependency::BindsTo(device_unit.clone()));
            dependencies.push(Dependency::After(device_unit.clone()));
            dependencies.push(Dependency::Before(UMOUNT_TARGET.to_owned()));
            if flags.swap {
                dependencies.push(Dependency::Before("dev-mapper-%i.swap".to_owned()));
            }
        } else {
            dependencies.push(Dependency::RequiresMountsFor(specifier_escape(&node)));
        }

        let mut drop_ins = Vec::new();
        let timeout = filter_options(effective_options.as_deref(), &DEVICE_TIMEOUT_OPTIONS);
        if let Some(span) = timeout.value.as_deref() {
            if let Some(drop_in) = self.device_timeout(&request.device, name, span)? {
                drop_ins.push(drop_in);
            }
        }

        if flags.tmp {
            post_actions.push(PostAction::MakeFilesystem);
        }
        if flags.swap {
            post_actions.push(PostAction::MakeSwap);
        }
        if let Some(mount) = mounts.iter().find(|m| m.role == MountRole::KeyDevice) {
            post_actions.push(PostAction::Unmount(mount.mount_point.clone()));
        }

        let mut links = Vec::new();
        if !flags.noauto {
            links.push(UnitLink {
                anchor: device_unit,
                relation: Relation::Wants,
                unit: service_name.clone(),
            });
            links.push(UnitLink {
                anchor: done_target.to_owned(),
                relation: if flags.nofail {
                    Relation::Wants
                } else {
                    Relation::Requires
                },
                unit: service_name.clone(),
            });
        }

        let mapped_device_unit = format!("dev-mapper-{unit_escaped_name}.device");
        links.push(UnitLink {
            anchor: mapped_device_unit.clone(),
            relation: Relation::Requires,
            unit: service_name.clone(),
        });

        // systemd-cryptsetup applies its own timeout to the password
        // prompt, so the job for the mapped device must not time out first.
        if !flags.noauto && !flags.nofail {
            drop_ins.push(DropIn {
                unit: mapped_device_unit,
                priority: 90,
                name: "device-timeout".to_owned(),
                contents: format!("{}[Unit]\nJobTimeoutSec=0\n", generated_header()),
            });
        }

        Ok(UnitPlan {
            service: ServiceUnit {
                name: service_name,
                source_path: specifier_escape(&self.config.crypttab.display().to_string()),
                escaped_name,
                escaped_device: specifier_escape(&node),
                escaped_key_file,
                escaped_options: specifier_escape(&timeout.remaining),
                dependencies,
                post_actions,
            },
            mounts,
            drop_ins,
            links,
        })
    }

    /// The drop-in giving the backing device unit the job timeout requested
    /// with x-systemd.device-timeout=, if it applies.
    fn device_timeout(
        &self,
        device: &str,
        name: &str,
        span: &str,
    ) -> Result<Option<DropIn>, DeviceError> {
        if !self.timespan.is_match(span) {
            warn!("Failed to parse timeout for {name}, ignoring: {span}");
            return Ok(None);
        }

        match classify_backing_device(device)? {
            PathTarget::BlockDevice { unit, .. } => Ok(Some(DropIn {
                unit,
                priority: 50,
                name: "device-timeout".to_owned(),
                contents: format!("{}[Unit]\nJobRunningTimeoutSec={}\n", generated_header(), span),
            })),
            _ => {
                warn!("x-systemd.device-timeout ignored for {device}");
                Ok(None)
            }
        }
    }
}

/// Unlike key files, any node below /dev or /sys is a device when it backs
/// the encrypted device.
fn classify_backing_device(device: &str) -> Result<PathTarget, DeviceError> {
    let node = resolve_node(device);
    if node.starts_with("/dev/") || node.starts_with("/sys/") {
        let unit = unit_name_from_path(&node, ".device")?;
        Ok(PathTarget::BlockDevice { node, unit })
    } else {
        Ok(PathTarget::RegularFile(node))
    }
}

/// Plans devices and writes the result to a sink.
pub struct UnitEmitter<'a> {
    planner: UnitPlanner<'a>,
    sink: &'a mut dyn UnitSink,
}

impl<'a> UnitEmitter<'a> {
    pub fn new(
        config: &'a GeneratorConfig,
        sink: &'a mut dyn UnitSink,
    ) -> GeneratorResult<UnitEmitter<'a>> {
        Ok(UnitEmitter {
            planner: UnitPlanner::new(config)?,
            sink,
        })
    }

    /// Generate the units for one device. A device that can not be set up
    /// is reported and skipped, returning false; failure to write is an
    /// error.
    pub fn emit(&mut self, request: &DeviceRequest) -> GeneratorResult<bool> {
        match self.planner.plan(request) {
            Ok(plan) => {
                self.write_plan(&plan).map_err(|err| {
                    GeneratorError::Chained(
                        format!("Failed to generate units for device '{}'", request.name),
                        Box::new(err),
                    )
                })?;
                Ok(true)
            }
            Err(err) => {
                error!("{err}. Ignoring.");
                Ok(false)
            }
        }
    }

    fn write_plan(&mut self, plan: &UnitPlan) -> GeneratorResult<()> {
        for mount in &plan.mounts {
            create_mount_point(&self.planner.config.runtime_dir, mount)?;
            self.sink.write_unit(&mount.unit, &mount.render())?;
        }
        self.sink
            .write_unit(&plan.service.name, &plan.service.render())?;
        for drop_in in &plan.drop_ins {
            self.sink.write_drop_in(drop_in)?;
        }
        for link in &plan.links {
            self.sink.add_link(link)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use assert_matches::assert_matches;

    use super::*;

    fn config() -> GeneratorConfig {
        GeneratorConfig::new(Path::new("/run/systemd/generator"))
    }

    fn request(name: &str, device: &str, key: Option<&str>, options: Option<&str>) -> DeviceRequest {
        DeviceRequest {
            name: name.to_string(),
            device: device.to_string(),
            key_file: key.map(|k| k.to_string()),
            options: options.map(|o| o.to_string()),
            ..Default::default()
        }
    }

    fn dependency_lines(plan: &UnitPlan) -> Vec<String> {
        plan.service
            .dependencies
            .iter()
            .map(|d| d.to_string())
            .collect()
    }

    #[test]
    fn test_plain_device() {
        let config = config();
        let planner = UnitPlanner::new(&config).unwrap();
        let plan = planner
            .plan(&request("home", "UUID=1111", Some("/etc/home.key"), Some("discard")))
            .unwrap();

        assert_eq!(plan.service.name, "systemd-cryptsetup@home.service");
        assert!(plan.mounts.is_empty());
        assert_eq!(
            dependency_lines(&plan),
            vec![
                "After=cryptsetup-pre.target",
                "Before=cryptsetup.target",
                "RequiresMountsFor=/etc/home.key",
                r"BindsTo=dev-disk-by\x2duuid-1111.device",
                r"After=dev-disk-by\x2duuid-1111.device",
                "Before=umount.target",
            ]
        );
        assert_eq!(plan.service.escaped_options, "discard");
        assert_eq!(
            plan.links,
            vec![
                UnitLink {
                    anchor: r"dev-disk-by\x2duuid-1111.device".to_string(),
                    relation: Relation::Wants,
                    unit: "systemd-cryptsetup@home.service".to_string(),
                },
                UnitLink {
                    anchor: "cryptsetup.target".to_string(),
                    relation: Relation::Requires,
                    unit: "systemd-cryptsetup@home.service".to_string(),
                },
                UnitLink {
                    anchor: "dev-mapper-home.device".to_string(),
                    relation: Relation::Requires,
                    unit: "systemd-cryptsetup@home.service".to_string(),
                },
            ]
        );
        assert_eq!(plan.drop_ins.len(), 1);
        assert_eq!(plan.drop_ins[0].unit, "dev-mapper-home.device");
        assert!(plan.drop_ins[0].contents.ends_with("[Unit]\nJobTimeoutSec=0\n"));
    }

    #[test]
    fn test_netdev_nofail_noauto() {
        let config = config();
        let planner = UnitPlanner::new(&config).unwrap();
        let plan = planner
            .plan(&request("remote", "/dev/sdc", Some("/dev/urandom"), Some("_netdev,nofail")))
            .unwrap();
        assert_eq!(
            dependency_lines(&plan),
            vec![
                "After=remote-fs-pre.target",
                "After=systemd-random-seed.service",
                "BindsTo=dev-sdc.device",
                "After=dev-sdc.device",
                "Before=umount.target",
            ]
        );
        assert_eq!(plan.links[1].anchor, "remote-cryptsetup.target");
        assert_eq!(plan.links[1].relation, Relation::Wants);
        assert!(plan.drop_ins.is_empty());

        let plan = planner
            .plan(&request("later", "/dev/sdc", Some("-"), Some("noauto")))
            .unwrap();
        assert_eq!(
            plan.links,
            vec![UnitLink {
                anchor: "dev-mapper-later.device".to_string(),
                relation: Relation::Requires,
                unit: "systemd-cryptsetup@later.service".to_string(),
            }]
        );
        assert!(plan.drop_ins.is_empty());
    }

    #[test]
    fn test_swap_and_image_file() {
        let config = config();
        let planner = UnitPlanner::new(&config).unwrap();
        let plan = planner
            .plan(&request("cswap", "/dev/sda3", Some("/dev/urandom"), Some("swap")))
            .unwrap();
        assert!(dependency_lines(&plan).contains(&"Before=dev-mapper-%i.swap".to_string()));
        assert_eq!(plan.service.post_actions, vec![PostAction::MakeSwap]);

        let plan = planner
            .plan(&request("img", "/var/lib/100%.img", None, None))
            .unwrap();
        assert_eq!(
            dependency_lines(&plan).last().map(|s| s.as_str()),
            Some("RequiresMountsFor=/var/lib/100%%.img")
        );
        assert_eq!(plan.service.escaped_device, "/var/lib/100%%.img");
    }

    #[test]
    fn test_tmp_and_swap_conflict() {
        let config = config();
        let planner = UnitPlanner::new(&config).unwrap();
        assert_matches!(
            planner.plan(&request("both", "/dev/sdd", None, Some("tmp,swap"))),
            Err(DeviceError::TmpAndSwap(_))
        );
    }

    #[test]
    fn test_key_device() {
        let config = config();
        let planner = UnitPlanner::new(&config).unwrap();
        let mut req = request("secure", "UUID=2222", Some("/keyfile"), None);
        req.key_device = Some("/dev/sdb1".to_string());
        let plan = planner.plan(&req).unwrap();

        assert_eq!(plan.mounts.len(), 1);
        let mount = &plan.mounts[0];
        assert_eq!(mount.mount_point, "/run/systemd/cryptsetup/keydev-secure");
        assert_eq!(
            plan.service.escaped_key_file.as_deref(),
            Some("/run/systemd/cryptsetup/keydev-secure/keyfile")
        );
        let lines = dependency_lines(&plan);
        assert_eq!(lines[1], format!("After={}", mount.unit));
        assert_eq!(lines[2], format!("Requires={}", mount.unit));
        assert_eq!(lines[4], "RequiresMountsFor=/keyfile");
        assert_eq!(
            plan.service.post_actions,
            vec![PostAction::Unmount(
                "/run/systemd/cryptsetup/keydev-secure".to_string()
            )]
        );

        req.key_file = None;
        assert_matches!(planner.plan(&req), Err(DeviceError::MissingKeyFile(_)));
    }

    #[test]
    fn test_header_device() {
        let config = config();
        let planner = UnitPlanner::new(&config).unwrap();
        let mut req = request("hdr", "/dev/sde", None, Some("header=/hdr.img,discard"));
        req.header_device = Some("/dev/sdf1".to_string());
        let plan = planner.plan(&req).unwrap();

        assert_eq!(plan.mounts.len(), 1);
        assert_eq!(plan.mounts[0].role, MountRole::HeaderDevice);
        assert_eq!(
            plan.service.escaped_options,
            "discard,header=/run/systemd/cryptsetup/hdrdev-hdr/hdr.img"
        );
        assert!(plan.service.post_actions.is_empty());

        req.options = Some("discard".to_string());
        assert_matches!(planner.plan(&req), Err(DeviceError::MissingHeaderPath(_)));
    }

    #[test]
    fn test_detached_header_on_block_device() {
        let config = config();
        let planner = UnitPlanner::new(&config).unwrap();
        let plan = planner
            .plan(&request("hdr", "/dev/sde", None, Some("header=/dev/sdg")))
            .unwrap();
        let lines = dependency_lines(&plan);
        assert!(lines.contains(&"Requires=dev-sdg.device".to_string()));
        assert_eq!(plan.service.escaped_options, "header=/dev/sdg");
    }

    #[test]
    fn test_device_timeout() {
        let config = config();
        let planner = UnitPlanner::new(&config).unwrap();
        let plan = planner
            .plan(&request(
                "slow",
                "/dev/sdh",
                None,
                Some("discard,x-systemd.device-timeout=1min 30s,nofail"),
            ))
            .unwrap();
        assert_eq!(plan.service.escaped_options, "discard,nofail");
        assert_eq!(plan.drop_ins.len(), 1);
        assert_eq!(plan.drop_ins[0].unit, "dev-sdh.device");
        assert_eq!(plan.drop_ins[0].priority, 50);
        assert!(plan.drop_ins[0]
            .contents
            .ends_with("JobRunningTimeoutSec=1min 30s\n"));

        let plan = planner
            .plan(&request("slow", "/dev/sdh", None, Some("x-systemd.device-timeout=soon,nofail")))
            .unwrap();
        assert_eq!(plan.service.escaped_options, "nofail");
        assert!(plan.drop_ins.is_empty());
    }

    #[test]
    fn test_device_timeout_sysfs_device() {
        let config = config();
        let planner = UnitPlanner::new(&config).unwrap();
        let plan = planner
            .plan(&request(
                "sys",
                "/sys/devices/virtual/block/loop0",
                None,
                Some("x-systemd.device-timeout=10s,nofail"),
            ))
            .unwrap();
        assert_eq!(plan.drop_ins.len(), 1);
        assert_eq!(
            plan.drop_ins[0].unit,
            "sys-devices-virtual-block-loop0.device"
        );

        let plan = planner
            .plan(&request(
                "img",
                "/var/lib/disk.img",
                None,
                Some("x-systemd.device-timeout=10s,nofail"),
            ))
            .unwrap();
        assert!(plan.drop_ins.is_empty());
    }
}
