// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
pub mod config;

pub use config::{load_cfg, DemoCfg, HeadlessCfg, RenderCfg};

use tracing_subscriber::{filter::LevelFilter, fmt, EnvFilter};

/// `RUST_LOG`-style directives on top of an INFO default, so the GPU name and
/// validation warnings show up without any environment set.
fn env_filter(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(directives)
}

pub fn init_tracing() {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    let _ = fmt()
        .with_env_filter(env_filter(&directives))
        .with_target(false)
        .compact()
        .try_init();
}

/// Process-wide failure policy: every error that reaches a binary is fatal.
///
/// The error chain is logged first so the failing call and its source location
/// end up in the output, then the process aborts without unwinding.
pub fn or_abort<T>(res: anyhow::Result<T>) -> T {
    match res {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("Abort. {e:#}");
            std::process::abort();
        }
    }
}
