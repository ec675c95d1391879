// SPDX-License-Identifier: CEPL-1.0
use anyhow::Result;
use ash::vk;
use tracing::info;
use vkdemo_render::QueueCaps;

use crate::command;
use crate::scope::{HEADLESS_CREATION_ORDER, Owned, ResourceScope, VkDestroyer};
use crate::sync::{self, Submission};
use crate::{check, device, vk_check, Bootstrap};

#[derive(Clone, Copy, Debug)]
pub struct HeadlessCfg {
    pub signal_value: u64,
    pub timeout_ns: u64,
}

/// Graphics queue, one command buffer and one timeline semaphore; no surface.
pub struct HeadlessSubmitter {
    device: ash::Device,
    queue: vk::Queue,
    cmd: vk::CommandBuffer,
    timeline: vk::Semaphore,

    #[allow(dead_code)]
    scope: ResourceScope<VkDestroyer>,
}

impl HeadlessSubmitter {
    pub fn new(boot: &Bootstrap) -> Result<Self> {
        unsafe { build_submitter(boot) }
    }

    pub fn timeline_value(&self) -> Result<u64> {
        Ok(vk_check!(unsafe {
            self.device.get_semaphore_counter_value(self.timeline)
        })?)
    }

    /// Record an empty buffer, submit it with no waits and a single timeline
    /// signal, then block on the host until the value is reached.
    pub fn submit_once(&self, cfg: HeadlessCfg) -> Result<u64> {
        check!(cfg.signal_value > self.timeline_value()?);
        unsafe {
            command::record_empty(&self.device, self.cmd)?;
            sync::submit(
                &self.device,
                self.queue,
                &Submission {
                    cmd: self.cmd,
                    wait: &[],
                    wait_stages: &[],
                    signal: &[self.timeline],
                    signal_values: &[cfg.signal_value],
                },
                vk::Fence::null(),
            )?;
            sync::wait_timeline(&self.device, self.timeline, cfg.signal_value, cfg.timeout_ns)?;
        }
        let reached = self.timeline_value()?;
        check!(reached >= cfg.signal_value);
        info!("timeline reached {reached}");
        Ok(reached)
    }
}

unsafe fn build_submitter(boot: &Bootstrap) -> Result<HeadlessSubmitter> {
    let instance = boot.instance();
    let mut scope = ResourceScope::new(VkDestroyer::new(None));

    let phys = device::pick_first_gpu(instance)?;
    let indices = device::find_queue_families(instance, phys, None, QueueCaps::GRAPHICS)?;
    let graphics_family = indices.role(QueueCaps::GRAPHICS)?;

    let device = device::create_logical_device(
        instance,
        phys,
        &indices.families_for(QueueCaps::GRAPHICS),
        &[ash::khr::timeline_semaphore::NAME],
    )?;
    scope.adopt_device(&device);
    let queue = device.get_device_queue(graphics_family, 0);

    let cmd_pool = command::create_command_pool(&device, graphics_family)?;
    scope.push(Owned::CommandPool(cmd_pool));
    let cmd = command::allocate_primary(&device, cmd_pool)?;

    let timeline = sync::create_timeline_semaphore(&device, 0)?;
    scope.push(Owned::Semaphores(vec![timeline]));
    check!(scope.labels().eq(HEADLESS_CREATION_ORDER));

    Ok(HeadlessSubmitter {
        device,
        queue,
        cmd,
        timeline,
        scope,
    })
}

/// Program B end to end. Teardown happens when the submitter drops, after the
/// device has gone idle.
pub fn run_headless(boot: &Bootstrap, cfg: HeadlessCfg) -> Result<u64> {
    let submitter = HeadlessSubmitter::new(boot)?;
    submitter.submit_once(cfg)
}
