// SPDX-License-Identifier: CEPL-1.0
pub use winit;

mod session;
pub use session::WindowSession;

use vkdemo_render::{WINDOW_SIZE, WINDOW_TITLE};
use winit::{
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, KeyEvent},
    keyboard::{Key, NamedKey},
    window::{Window, WindowAttributes},
};

/// Fixed-size, non-resizable window whose surface matches the swapchain extent.
pub fn demo_window_attributes() -> WindowAttributes {
    Window::default_attributes()
        .with_title(WINDOW_TITLE)
        .with_inner_size(PhysicalSize::new(WINDOW_SIZE.width, WINDOW_SIZE.height))
        .with_resizable(false)
        .with_position(PhysicalPosition::new(200, 200))
}

/// Shutdown is requested when Escape is released, not pressed.
pub fn is_escape_release(event: &KeyEvent) -> bool {
    event.state == ElementState::Released && event.logical_key == Key::Named(NamedKey::Escape)
}
