// SPDX-License-Identifier: CEPL-1.0

/// Everything tied to one open window, released in field order: the renderer
/// first (it owns the surface), then the window backing that surface, then the
/// instance-level bootstrap.
pub struct WindowSession<R, W, B> {
    renderer: R,
    window: W,
    #[allow(dead_code)]
    boot: B,
}

impl<R, W, B> WindowSession<R, W, B> {
    /// Parts are built bootstrap first, then window, then renderer; this takes
    /// them once all three exist.
    pub fn new(boot: B, window: W, renderer: R) -> Self {
        Self {
            renderer,
            window,
            boot,
        }
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn window(&self) -> &W {
        &self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<&'static str>>>;

    /// Logs its labels on drop, in order.
    struct Part(Log, &'static [&'static str]);

    impl Drop for Part {
        fn drop(&mut self) {
            self.0.borrow_mut().extend_from_slice(self.1);
        }
    }

    #[test]
    fn closing_releases_renderer_then_window_then_instance() {
        let log = Log::default();
        let session = WindowSession::new(
            Part(log.clone(), &["debug messenger", "instance"]),
            Part(log.clone(), &["window"]),
            Part(
                log.clone(),
                &[
                    "fence",
                    "semaphores",
                    "command pool",
                    "framebuffers",
                    "image views",
                    "render pass",
                    "swapchain",
                    "device",
                    "surface",
                ],
            ),
        );
        assert!(log.borrow().is_empty());
        drop(session);
        assert_eq!(
            log.borrow().as_slice(),
            &[
                "fence",
                "semaphores",
                "command pool",
                "framebuffers",
                "image views",
                "render pass",
                "swapchain",
                "device",
                "surface",
                "window",
                "debug messenger",
                "instance",
            ]
        );
    }

    #[test]
    fn accessors_reach_each_part() {
        let mut session = WindowSession::new("boot", 7u32, Vec::<u8>::new());
        session.renderer_mut().push(1);
        assert_eq!(session.renderer_mut().len(), 1);
        assert_eq!(*session.window(), 7);
    }
}
