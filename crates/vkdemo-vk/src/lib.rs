// SPDX-License-Identifier: CEPL-1.0
//! Vulkan side of both demo programs, built on `ash`.
//!
//! Setup follows the order the API requires: instance, surface, physical device,
//! logical device, swapchain, command infrastructure, synchronization objects.
//! Each step returns a typed error instead of aborting; callers pick the policy.

pub mod check;
pub mod command;
pub mod device;
pub mod instance;
pub mod scope;
pub mod swapchain;
pub mod sync;

mod headless;
mod presenter;

pub use ash;
pub use check::CheckError;
pub use headless::{run_headless, HeadlessCfg, HeadlessSubmitter};
pub use instance::Bootstrap;
pub use presenter::{PresentCfg, Presenter};
