// SPDX-License-Identifier: CEPL-1.0
//! Offscreen timeline-semaphore submission: no window, no surface, no swapchain.
#![deny(unsafe_op_in_unsafe_fn)]
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use vkdemo_core::{init_tracing, load_cfg, or_abort};
use vkdemo_vk::{run_headless, Bootstrap, HeadlessCfg};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config; a missing file means defaults
    #[arg(long, default_value = "vkdemo.toml")]
    config: PathBuf,

    /// Timeline value to signal (overrides headless.signal_value)
    #[arg(long)]
    signal_value: Option<u64>,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let cfg = load_cfg(&args.config);

    let boot = or_abort(Bootstrap::new(None, cfg.render.validation));
    let run_cfg = HeadlessCfg {
        signal_value: args.signal_value.unwrap_or(cfg.headless.signal_value),
        timeout_ns: cfg.render.timeout_ns(),
    };
    let reached = or_abort(run_headless(&boot, run_cfg));
    info!("headless submission complete, timeline = {reached}");

    drop(boot);
    Ok(())
}
