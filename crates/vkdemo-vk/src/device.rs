// SPDX-License-Identifier: CEPL-1.0
use anyhow::{Context, Result};
use ash::khr::surface;
use ash::{vk, Instance};
use std::collections::BTreeSet;
use std::ffi::{c_char, CStr};
use tracing::{debug, info};
use vkdemo_render::{select_queue_families, QueueCaps, QueueFamilyIndices};

use crate::{check, vk_check};

/// First enumerated device wins; there is no ranking. Timeline semaphores are
/// core in 1.2, so anything older is rejected.
pub unsafe fn pick_first_gpu(instance: &Instance) -> Result<vk::PhysicalDevice> {
    let devices = vk_check!(instance.enumerate_physical_devices())?;
    check!(!devices.is_empty());
    let phys = devices[0];
    check!(phys != vk::PhysicalDevice::null());

    let props = instance.get_physical_device_properties(phys);
    let name = props
        .device_name_as_c_str()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    info!("GPU: {name}");

    check!(props.api_version >= vk::API_VERSION_1_2);
    Ok(phys)
}

/// Roles a family can fill. Families exposing no queues fill none.
pub fn family_caps(props: &vk::QueueFamilyProperties, present: bool) -> QueueCaps {
    let mut caps = QueueCaps::empty();
    if props.queue_count == 0 {
        return caps;
    }
    caps.set(
        QueueCaps::GRAPHICS,
        props.queue_flags.contains(vk::QueueFlags::GRAPHICS),
    );
    caps.set(
        QueueCaps::COMPUTE,
        props.queue_flags.contains(vk::QueueFlags::COMPUTE),
    );
    caps.set(QueueCaps::PRESENT, present);
    caps
}

/// Pick a family for each role in `required`.
///
/// Presentation support is only queried when `present` is given, and only for
/// families visited before every required role is found.
pub unsafe fn find_queue_families(
    instance: &Instance,
    phys: vk::PhysicalDevice,
    present: Option<(&surface::Instance, vk::SurfaceKHR)>,
    required: QueueCaps,
) -> Result<QueueFamilyIndices> {
    let families = instance.get_physical_device_queue_family_properties(phys);
    let caps = families.iter().enumerate().map(|(i, props)| {
        let can_present = present.is_some_and(|(loader, surface)| {
            loader
                .get_physical_device_surface_support(phys, i as u32, surface)
                .unwrap_or(false)
        });
        family_caps(props, can_present)
    });

    let indices = select_queue_families(caps, required);
    indices.require(required).context("queue family selection")?;
    debug!(
        "queue families: graphics={:?} compute={:?} present={:?}",
        indices.graphics, indices.compute, indices.present
    );
    Ok(indices)
}

/// One queue (priority 1.0) per family in `families`, timeline semaphores enabled.
pub unsafe fn create_logical_device(
    instance: &Instance,
    phys: vk::PhysicalDevice,
    families: &BTreeSet<u32>,
    extensions: &[&CStr],
) -> Result<ash::Device> {
    let priorities = [1.0_f32];
    let queue_infos: Vec<vk::DeviceQueueCreateInfo> = families
        .iter()
        .copied()
        .map(|family| vk::DeviceQueueCreateInfo {
            s_type: vk::StructureType::DEVICE_QUEUE_CREATE_INFO,
            queue_family_index: family,
            queue_count: 1,
            p_queue_priorities: priorities.as_ptr(),
            ..Default::default()
        })
        .collect();
    check!(!queue_infos.is_empty());

    let ext_ptrs: Vec<*const c_char> = extensions.iter().map(|e| e.as_ptr()).collect();
    let features = vk::PhysicalDeviceFeatures::default();
    let mut features12 = vk::PhysicalDeviceVulkan12Features::default().timeline_semaphore(true);

    let create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_infos)
        .enabled_extension_names(&ext_ptrs)
        .enabled_features(&features)
        .push_next(&mut features12);

    Ok(vk_check!(instance.create_device(phys, &create_info, None))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags, queue_count: u32) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count,
            ..Default::default()
        }
    }

    #[test]
    fn caps_follow_queue_flags() {
        let gfx = family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, 16);
        assert_eq!(
            family_caps(&gfx, false),
            QueueCaps::GRAPHICS | QueueCaps::COMPUTE
        );
        assert_eq!(family_caps(&gfx, true), QueueCaps::all());

        let transfer = family(vk::QueueFlags::TRANSFER, 2);
        assert_eq!(family_caps(&transfer, false), QueueCaps::empty());
        assert_eq!(family_caps(&transfer, true), QueueCaps::PRESENT);
    }

    #[test]
    fn family_without_queues_fills_nothing() {
        let empty = family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, 0);
        assert_eq!(family_caps(&empty, true), QueueCaps::empty());
    }

    #[test]
    fn typical_discrete_layout() {
        // Graphics+compute+present, compute-only, transfer-only.
        let families = [
            family(
                vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
                16,
            ),
            family(vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER, 8),
            family(vk::QueueFlags::TRANSFER, 2),
        ];
        let caps = families
            .iter()
            .enumerate()
            .map(|(i, f)| family_caps(f, i == 0));
        let idx = select_queue_families(caps, QueueCaps::all());
        assert_eq!(idx.graphics, Some(0));
        assert_eq!(idx.compute, Some(0));
        assert_eq!(idx.present, Some(0));
        assert_eq!(idx.families_for(QueueCaps::all()).len(), 1);
    }
}
