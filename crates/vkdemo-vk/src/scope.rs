// SPDX-License-Identifier: CEPL-1.0
//! Ownership ledger for device-level objects.
//!
//! Every object is recorded the moment it is created. Dropping the scope waits
//! for the device to go idle once, then destroys each record exactly once in
//! reverse creation order. A setup that fails halfway therefore releases what
//! it already made.

use ash::khr::{surface, swapchain};
use ash::vk;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Owned {
    Surface(vk::SurfaceKHR),
    Device,
    Swapchain(vk::SwapchainKHR),
    RenderPass(vk::RenderPass),
    ImageViews(Vec<vk::ImageView>),
    Framebuffers(Vec<vk::Framebuffer>),
    /// Buffers allocated from the pool are freed with it.
    CommandPool(vk::CommandPool),
    Semaphores(Vec<vk::Semaphore>),
    Fence(vk::Fence),
}

impl Owned {
    pub fn label(&self) -> &'static str {
        match self {
            Owned::Surface(_) => "surface",
            Owned::Device => "device",
            Owned::Swapchain(_) => "swapchain",
            Owned::RenderPass(_) => "render pass",
            Owned::ImageViews(_) => "image views",
            Owned::Framebuffers(_) => "framebuffers",
            Owned::CommandPool(_) => "command pool",
            Owned::Semaphores(_) => "semaphores",
            Owned::Fence(_) => "fence",
        }
    }
}

/// Record labels, in the order the windowed presenter creates them.
pub const WINDOWED_CREATION_ORDER: [&str; 9] = [
    "surface",
    "device",
    "swapchain",
    "render pass",
    "image views",
    "framebuffers",
    "command pool",
    "semaphores",
    "fence",
];

/// Record labels, in the order the headless submitter creates them.
pub const HEADLESS_CREATION_ORDER: [&str; 3] = ["device", "command pool", "semaphores"];

pub trait Destroyer {
    /// Called once, before the first `destroy`.
    fn wait_idle(&mut self);
    fn destroy(&mut self, owned: Owned);
}

/// Releases records through the real API.
pub struct VkDestroyer {
    surface_loader: Option<surface::Instance>,
    device: Option<ash::Device>,
    swapchain_loader: Option<swapchain::Device>,
}

impl VkDestroyer {
    pub fn new(surface_loader: Option<surface::Instance>) -> Self {
        Self {
            surface_loader,
            device: None,
            swapchain_loader: None,
        }
    }
}

impl Destroyer for VkDestroyer {
    fn wait_idle(&mut self) {
        if let Some(d) = &self.device {
            unsafe { d.device_wait_idle() }.ok();
        }
    }

    fn destroy(&mut self, owned: Owned) {
        unsafe {
            match owned {
                Owned::Surface(s) => {
                    if let Some(l) = &self.surface_loader {
                        l.destroy_surface(s, None);
                    }
                }
                Owned::Device => {
                    self.swapchain_loader = None;
                    if let Some(d) = self.device.take() {
                        d.destroy_device(None);
                    }
                }
                Owned::Swapchain(sc) => {
                    if let Some(l) = &self.swapchain_loader {
                        l.destroy_swapchain(sc, None);
                    }
                }
                other => {
                    let Some(d) = &self.device else {
                        return;
                    };
                    match other {
                        Owned::RenderPass(rp) => d.destroy_render_pass(rp, None),
                        Owned::ImageViews(views) => {
                            for iv in views {
                                d.destroy_image_view(iv, None);
                            }
                        }
                        Owned::Framebuffers(fbs) => {
                            for fb in fbs {
                                d.destroy_framebuffer(fb, None);
                            }
                        }
                        Owned::CommandPool(pool) => d.destroy_command_pool(pool, None),
                        Owned::Semaphores(sems) => {
                            for s in sems {
                                d.destroy_semaphore(s, None);
                            }
                        }
                        Owned::Fence(f) => d.destroy_fence(f, None),
                        Owned::Surface(_) | Owned::Device | Owned::Swapchain(_) => {}
                    }
                }
            }
        }
    }
}

pub struct ResourceScope<D: Destroyer> {
    destroyer: D,
    owned: Vec<Owned>,
}

impl<D: Destroyer> ResourceScope<D> {
    pub fn new(destroyer: D) -> Self {
        Self {
            destroyer,
            owned: Vec::new(),
        }
    }

    pub fn push(&mut self, owned: Owned) {
        debug!("created {}", owned.label());
        self.owned.push(owned);
    }

    /// Labels of the live records, oldest first.
    pub fn labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.owned.iter().map(Owned::label)
    }
}

impl ResourceScope<VkDestroyer> {
    /// Record the logical device. Everything pushed afterwards is destroyed before it.
    pub fn adopt_device(&mut self, device: &ash::Device) {
        self.destroyer.device = Some(device.clone());
        self.push(Owned::Device);
    }

    pub fn adopt_swapchain_loader(&mut self, loader: &swapchain::Device) {
        self.destroyer.swapchain_loader = Some(loader.clone());
    }
}

impl<D: Destroyer> Drop for ResourceScope<D> {
    fn drop(&mut self) {
        if self.owned.is_empty() {
            return;
        }
        self.destroyer.wait_idle();
        while let Some(owned) = self.owned.pop() {
            debug!("destroy {}", owned.label());
            self.destroyer.destroy(owned);
        }
    }
}
