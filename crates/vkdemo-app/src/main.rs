// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use vkdemo_core::{init_tracing, load_cfg, or_abort, DemoCfg};
use vkdemo_vk::{Bootstrap, PresentCfg, Presenter};

use vkdemo_platform::winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    raw_window_handle::HasDisplayHandle,
    window::{Window, WindowId},
};
use vkdemo_platform::{demo_window_attributes, is_escape_release, WindowSession};

type Session = WindowSession<Presenter, Window, Bootstrap>;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config; a missing file means defaults
    #[arg(long, default_value = "vkdemo.toml")]
    config: PathBuf,

    /// Exit after this many frames (overrides render.frame_limit)
    #[arg(long)]
    frames: Option<u64>,
}

struct App {
    cfg: DemoCfg,
    frame_limit: Option<u64>,

    session: Option<Session>,

    exiting: bool,
    frames: u32,
    last_fps_instant: std::time::Instant,
}

impl App {
    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let display = event_loop.display_handle()?.as_raw();
        let boot = Bootstrap::new(Some(display), self.cfg.render.validation)?;
        let window = event_loop.create_window(demo_window_attributes())?;

        let present_cfg = PresentCfg {
            clear_color: self.cfg.render.clear_color,
            timeout_ns: self.cfg.render.timeout_ns(),
        };
        let presenter = Presenter::new(&boot, &window, &window, present_cfg)?;
        info!("window {:?} ready", window.inner_size());

        self.session = Some(WindowSession::new(boot, window, presenter));
        Ok(())
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.exiting = true;
        self.session = None;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.is_none() && !self.exiting {
            or_abort(self.init(event_loop));
        }
        event_loop.set_control_flow(ControlFlow::Poll);
        if let Some(w) = self.session.as_ref().map(Session::window) {
            w.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(window) = self.session.as_ref().map(Session::window) {
            if window_id != window.id() {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("CloseRequested");
                self.shutdown(event_loop);
            }

            WindowEvent::KeyboardInput { event, .. } if is_escape_release(&event) => {
                info!("Escape released");
                self.shutdown(event_loop);
            }

            WindowEvent::RedrawRequested => {
                if self.exiting {
                    return;
                }
                let Some(session) = &mut self.session else {
                    return;
                };
                let presenter = session.renderer_mut();
                or_abort(presenter.render_frame());
                self.frames = self.frames.saturating_add(1);

                if self.frame_limit.is_some_and(|n| presenter.frames() >= n) {
                    info!("frame limit reached after {} frames", presenter.frames());
                    self.shutdown(event_loop);
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if self.exiting {
            return;
        }

        // Uncapped: the present mode paces us.
        if let Some(w) = self.session.as_ref().map(Session::window) {
            w.request_redraw();
        }

        let now = std::time::Instant::now();
        if now.duration_since(self.last_fps_instant).as_secs_f32() >= 1.0 {
            info!("fps ~ {}", self.frames);
            self.frames = 0;
            self.last_fps_instant = now;
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let cfg = load_cfg(&args.config);
    let event_loop: EventLoop<()> = EventLoop::new()?;

    let mut app = App {
        cfg,
        frame_limit: args.frames.or(cfg.render.frame_limit),
        session: None,
        exiting: false,
        frames: 0,
        last_fps_instant: std::time::Instant::now(),
    };

    event_loop.run_app(&mut app)?;
    Ok(())
}
