// SPDX-License-Identifier: CEPL-1.0
use serde::Deserialize;
use std::{fs, path::Path};
use tracing::warn;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct RenderCfg {
    #[serde(default = "default_clear")]
    pub clear_color: [f32; 4],
    #[serde(default = "default_validation")]
    pub validation: bool,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub frame_limit: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessCfg {
    #[serde(default = "default_signal_value")]
    pub signal_value: u64,
}

#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq)]
pub struct DemoCfg {
    #[serde(default)]
    pub render: RenderCfg,
    #[serde(default)]
    pub headless: HeadlessCfg,
}

impl Default for RenderCfg {
    fn default() -> Self {
        RenderCfg {
            clear_color: default_clear(),
            validation: default_validation(),
            timeout_ms: default_timeout_ms(),
            frame_limit: None,
        }
    }
}

impl Default for HeadlessCfg {
    fn default() -> Self {
        HeadlessCfg {
            signal_value: default_signal_value(),
        }
    }
}

impl RenderCfg {
    /// Timeout for acquire, fence and host semaphore waits, in nanoseconds.
    pub fn timeout_ns(&self) -> u64 {
        self.timeout_ms.saturating_mul(1_000_000)
    }
}

fn default_clear() -> [f32; 4] {
    [0.0, 0.0, 0.2, 1.0]
}
fn default_validation() -> bool {
    cfg!(debug_assertions)
}
fn default_timeout_ms() -> u64 {
    10_000
}
fn default_signal_value() -> u64 {
    1
}

pub fn parse_cfg(s: &str) -> Result<DemoCfg, toml::de::Error> {
    toml::from_str::<DemoCfg>(s)
}

/// Missing file means defaults; a malformed one is reported and ignored.
pub fn load_cfg(path: &Path) -> DemoCfg {
    match fs::read_to_string(path) {
        Ok(s) => parse_cfg(&s).unwrap_or_else(|e| {
            warn!("ignoring {}: {e}", path.display());
            DemoCfg::default()
        }),
        Err(_) => DemoCfg::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = parse_cfg("").expect("empty toml parses");
        assert_eq!(cfg, DemoCfg::default());
        assert_eq!(cfg.render.clear_color, [0.0, 0.0, 0.2, 1.0]);
        assert_eq!(cfg.render.timeout_ms, 10_000);
        assert_eq!(cfg.render.frame_limit, None);
        assert_eq!(cfg.headless.signal_value, 1);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = parse_cfg(
            r#"
            [render]
            timeout_ms = 250
            frame_limit = 12
            "#,
        )
        .expect("valid toml");
        assert_eq!(cfg.render.timeout_ms, 250);
        assert_eq!(cfg.render.frame_limit, Some(12));
        assert_eq!(cfg.render.clear_color, [0.0, 0.0, 0.2, 1.0]);
        assert_eq!(cfg.headless, HeadlessCfg::default());
    }

    #[test]
    fn timeout_converts_to_nanoseconds() {
        let cfg = RenderCfg::default();
        assert_eq!(cfg.timeout_ns(), 10_000_000_000);

        let huge = RenderCfg {
            timeout_ms: u64::MAX,
            ..RenderCfg::default()
        };
        assert_eq!(huge.timeout_ns(), u64::MAX);
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(parse_cfg("[render]\nclear_color = \"blue\"").is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = load_cfg(Path::new("definitely/not/here/vkdemo.toml"));
        assert_eq!(cfg, DemoCfg::default());
    }
}
