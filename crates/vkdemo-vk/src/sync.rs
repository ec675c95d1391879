// SPDX-License-Identifier: CEPL-1.0
use anyhow::Result;
use ash::vk;

use crate::vk_check;

pub unsafe fn create_binary_semaphore(device: &ash::Device) -> Result<vk::Semaphore> {
    let info = vk::SemaphoreCreateInfo::default();
    Ok(vk_check!(device.create_semaphore(&info, None))?)
}

pub unsafe fn create_timeline_semaphore(device: &ash::Device, initial: u64) -> Result<vk::Semaphore> {
    let mut type_info = vk::SemaphoreTypeCreateInfo::default()
        .semaphore_type(vk::SemaphoreType::TIMELINE)
        .initial_value(initial);
    let info = vk::SemaphoreCreateInfo::default().push_next(&mut type_info);
    Ok(vk_check!(device.create_semaphore(&info, None))?)
}

pub unsafe fn create_fence(device: &ash::Device, signaled: bool) -> Result<vk::Fence> {
    let flags = if signaled {
        vk::FenceCreateFlags::SIGNALED
    } else {
        vk::FenceCreateFlags::empty()
    };
    let info = vk::FenceCreateInfo::default().flags(flags);
    Ok(vk_check!(device.create_fence(&info, None))?)
}

/// The semaphores belonging to one ring slot.
#[derive(Clone, Copy, Debug)]
pub struct SlotSemaphores {
    pub image_available: vk::Semaphore,
    pub render_finished: vk::Semaphore,
    pub timeline: vk::Semaphore,
}

impl SlotSemaphores {
    pub fn handles(&self) -> [vk::Semaphore; 3] {
        [self.image_available, self.render_finished, self.timeline]
    }
}

/// Binary pairs for every slot first, then the timelines. On failure everything
/// created so far is destroyed.
pub unsafe fn create_slot_semaphores(device: &ash::Device, slots: usize) -> Result<Vec<SlotSemaphores>> {
    let mut made: Vec<vk::Semaphore> = Vec::with_capacity(slots * 3);
    let res = (|| -> Result<Vec<SlotSemaphores>> {
        let mut pairs = Vec::with_capacity(slots);
        for _ in 0..slots {
            let image_available = create_binary_semaphore(device)?;
            made.push(image_available);
            let render_finished = create_binary_semaphore(device)?;
            made.push(render_finished);
            pairs.push((image_available, render_finished));
        }
        let mut out = Vec::with_capacity(slots);
        for (image_available, render_finished) in pairs {
            let timeline = create_timeline_semaphore(device, 0)?;
            made.push(timeline);
            out.push(SlotSemaphores {
                image_available,
                render_finished,
                timeline,
            });
        }
        Ok(out)
    })();

    if res.is_err() {
        for sem in made {
            device.destroy_semaphore(sem, None);
        }
    }
    res
}

/// One queue submission. Every entry in `signal` gets the matching entry of
/// `signal_values`; binary semaphores ignore theirs.
pub struct Submission<'a> {
    pub cmd: vk::CommandBuffer,
    pub wait: &'a [vk::Semaphore],
    pub wait_stages: &'a [vk::PipelineStageFlags],
    pub signal: &'a [vk::Semaphore],
    pub signal_values: &'a [u64],
}

pub unsafe fn submit(
    device: &ash::Device,
    queue: vk::Queue,
    sub: &Submission<'_>,
    fence: vk::Fence,
) -> Result<()> {
    crate::check!(sub.wait.len() == sub.wait_stages.len());
    crate::check!(sub.signal.len() == sub.signal_values.len());

    let cmds = [sub.cmd];
    let mut timeline_info =
        vk::TimelineSemaphoreSubmitInfo::default().signal_semaphore_values(sub.signal_values);
    let submit_info = vk::SubmitInfo::default()
        .wait_semaphores(sub.wait)
        .wait_dst_stage_mask(sub.wait_stages)
        .command_buffers(&cmds)
        .signal_semaphores(sub.signal)
        .push_next(&mut timeline_info);

    vk_check!(device.queue_submit(queue, std::slice::from_ref(&submit_info), fence))?;
    Ok(())
}

/// Block until `semaphore` reaches `value`; running out of time is an error.
pub unsafe fn wait_timeline(
    device: &ash::Device,
    semaphore: vk::Semaphore,
    value: u64,
    timeout_ns: u64,
) -> Result<()> {
    let semaphores = [semaphore];
    let values = [value];
    let wait_info = vk::SemaphoreWaitInfo::default()
        .semaphores(&semaphores)
        .values(&values);
    vk_check!(device.wait_semaphores(&wait_info, timeout_ns))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn slot_handles_cover_all_three() {
        let slot = SlotSemaphores {
            image_available: vk::Semaphore::from_raw(1),
            render_finished: vk::Semaphore::from_raw(2),
            timeline: vk::Semaphore::from_raw(3),
        };
        let raw: Vec<u64> = slot.handles().iter().map(|s| s.as_raw()).collect();
        assert_eq!(raw, [1, 2, 3]);
    }
}
