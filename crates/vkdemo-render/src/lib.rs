// SPDX-License-Identifier: CEPL-1.0
pub mod frame;
pub mod queue;

pub use frame::{FrameRing, TimelineCounter};
pub use queue::{select_queue_families, MissingQueueFamily, QueueCaps, QueueFamilyIndices};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

/// Window and swapchain extent. The window is not resizable, so this never changes.
pub const WINDOW_SIZE: RenderSize = RenderSize {
    width: 800,
    height: 600,
};

/// Swapchain images, and therefore ring slots. The driver must grant exactly this many.
pub const SWAPCHAIN_IMAGE_COUNT: u32 = 3;

pub const WINDOW_TITLE: &str = "Vulkan";
