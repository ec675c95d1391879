// SPDX-License-Identifier: CEPL-1.0
use anyhow::Result;
use ash::khr::{surface, swapchain as khr_swapchain};
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::info;
use vkdemo_render::{FrameRing, QueueCaps, TimelineCounter, SWAPCHAIN_IMAGE_COUNT};

use crate::check::{strict_acquire, strict_present};
use crate::command::{self, ClearPass};
use crate::scope::{Owned, ResourceScope, VkDestroyer, WINDOWED_CREATION_ORDER};
use crate::swapchain::{self, EXTENT, SURFACE_FORMAT};
use crate::sync::{self, SlotSemaphores, Submission};
use crate::{check, device, vk_check, Bootstrap};

#[derive(Clone, Copy, Debug)]
pub struct PresentCfg {
    pub clear_color: [f32; 4],
    pub timeout_ns: u64,
}

/// Windowed frame driver: surface, swapchain ring, one re-recorded command
/// buffer, per-slot semaphores and a single shared fence.
///
/// The fence is shared by every slot, so the CPU always waits for the previous
/// frame to finish on the GPU before recording the next one.
pub struct Presenter {
    device: ash::Device,
    swapchain_loader: khr_swapchain::Device,
    swapchain: vk::SwapchainKHR,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,

    render_pass: vk::RenderPass,
    framebuffers: Vec<vk::Framebuffer>,

    cmd: vk::CommandBuffer,
    slots: Vec<SlotSemaphores>,
    fence: vk::Fence,

    ring: FrameRing,
    timeline: TimelineCounter,
    cfg: PresentCfg,

    // Must stay last: owns and releases every handle above.
    #[allow(dead_code)]
    scope: ResourceScope<VkDestroyer>,
}

impl Presenter {
    pub fn new(
        boot: &Bootstrap,
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        cfg: PresentCfg,
    ) -> Result<Self> {
        unsafe { build_presenter(boot, window, display, cfg) }
    }

    /// Frames submitted so far; also the last value signalled on the timelines.
    pub fn frames(&self) -> u64 {
        self.timeline.value()
    }

    /// Acquire, throttle, record, submit, present, advance.
    pub fn render_frame(&mut self) -> Result<()> {
        let timeout = self.cfg.timeout_ns;
        let slot = self.slots[self.ring.current()];

        unsafe {
            // 1) Acquire: signals this slot's image-available semaphore.
            let image_index = vk_check!(strict_acquire(self.swapchain_loader.acquire_next_image(
                self.swapchain,
                timeout,
                slot.image_available,
                vk::Fence::null(),
            )))?;
            let image = image_index as usize;
            check!(image < self.framebuffers.len());

            // 2) Throttle: the previous submission must be done with the command buffer.
            vk_check!(self.device.wait_for_fences(&[self.fence], true, timeout))?;
            vk_check!(self.device.reset_fences(&[self.fence]))?;

            // 3) Record
            command::record_clear_pass(
                &self.device,
                self.cmd,
                &ClearPass {
                    render_pass: self.render_pass,
                    framebuffer: self.framebuffers[image],
                    extent: EXTENT,
                    color: self.cfg.clear_color,
                },
            )?;

            // 4) Submit: one counter value shared by both signal targets.
            let value = self.timeline.next_value();
            sync::submit(
                &self.device,
                self.graphics_queue,
                &Submission {
                    cmd: self.cmd,
                    wait: &[slot.image_available],
                    wait_stages: &[vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT],
                    signal: &[slot.timeline, slot.render_finished],
                    signal_values: &[value, value],
                },
                self.fence,
            )?;

            // 5) Present once rendering has finished.
            let waits = [slot.render_finished];
            let swapchains = [self.swapchain];
            let indices = [image_index];
            let present = vk::PresentInfoKHR::default()
                .wait_semaphores(&waits)
                .swapchains(&swapchains)
                .image_indices(&indices);
            vk_check!(strict_present(
                self.swapchain_loader.queue_present(self.present_queue, &present)
            ))?;
        }

        // 6) Advance
        self.ring.advance();
        Ok(())
    }
}

unsafe fn build_presenter(
    boot: &Bootstrap,
    window: &dyn HasWindowHandle,
    display: &dyn HasDisplayHandle,
    cfg: PresentCfg,
) -> Result<Presenter> {
    let instance = boot.instance();
    let dh = display.display_handle()?.as_raw();
    let wh = window.window_handle()?.as_raw();

    let surface_loader = surface::Instance::new(boot.entry(), instance);
    let mut scope = ResourceScope::new(VkDestroyer::new(Some(surface_loader.clone())));

    let surface = vk_check!(ash_window::create_surface(boot.entry(), instance, dh, wh, None))?;
    scope.push(Owned::Surface(surface));

    let phys = device::pick_first_gpu(instance)?;
    let indices = device::find_queue_families(
        instance,
        phys,
        Some((&surface_loader, surface)),
        QueueCaps::all(),
    )?;
    let graphics_family = indices.role(QueueCaps::GRAPHICS)?;
    let present_family = indices.role(QueueCaps::PRESENT)?;

    let device = device::create_logical_device(
        instance,
        phys,
        &indices.families_for(QueueCaps::all()),
        &[khr_swapchain::NAME, ash::khr::timeline_semaphore::NAME],
    )?;
    scope.adopt_device(&device);
    let graphics_queue = device.get_device_queue(graphics_family, 0);
    let present_queue = device.get_device_queue(present_family, 0);

    let swapchain_loader = khr_swapchain::Device::new(instance, &device);
    scope.adopt_swapchain_loader(&swapchain_loader);
    let swapchain =
        swapchain::create_swapchain(&surface_loader, &swapchain_loader, phys, surface)?;
    scope.push(Owned::Swapchain(swapchain));

    let images = swapchain::expect_image_count(
        vk_check!(swapchain_loader.get_swapchain_images(swapchain))?,
        SWAPCHAIN_IMAGE_COUNT,
    )?;

    let render_pass = swapchain::create_render_pass(&device, SURFACE_FORMAT.format)?;
    scope.push(Owned::RenderPass(render_pass));

    let image_views = swapchain::create_image_views(&device, &images, SURFACE_FORMAT.format)?;
    scope.push(Owned::ImageViews(image_views.clone()));

    let framebuffers = swapchain::create_framebuffers(&device, render_pass, &image_views, EXTENT)?;
    scope.push(Owned::Framebuffers(framebuffers.clone()));
    check!(images.len() == image_views.len() && image_views.len() == framebuffers.len());

    let cmd_pool = command::create_command_pool(&device, graphics_family)?;
    scope.push(Owned::CommandPool(cmd_pool));
    let cmd = command::allocate_primary(&device, cmd_pool)?;

    let slots = sync::create_slot_semaphores(&device, images.len())?;
    scope.push(Owned::Semaphores(
        slots.iter().flat_map(|s| s.handles()).collect(),
    ));

    // Signalled so the first throttle wait returns immediately.
    let fence = sync::create_fence(&device, true)?;
    scope.push(Owned::Fence(fence));
    check!(scope.labels().eq(WINDOWED_CREATION_ORDER));

    info!(
        "Vulkan swapchain ready ({}x{}, {} images, fmt {:?})",
        EXTENT.width,
        EXTENT.height,
        images.len(),
        SURFACE_FORMAT.format
    );

    Ok(Presenter {
        device,
        swapchain_loader,
        swapchain,
        graphics_queue,
        present_queue,
        render_pass,
        framebuffers,
        cmd,
        slots,
        fence,
        ring: FrameRing::new(images.len()),
        timeline: TimelineCounter::new(),
        cfg,
        scope,
    })
}
