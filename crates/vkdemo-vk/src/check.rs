// SPDX-License-Identifier: CEPL-1.0
//! Failure taxonomy for every Vulkan call and setup precondition.
//!
//! Nothing here is recoverable. Errors carry the failing call or expression and
//! its source location up to the binary, which decides to abort.

use ash::{prelude::VkResult, vk};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckError {
    #[error("{call} failed at {file}:{line}. Result = {} ({result:?})", .result.as_raw())]
    Vk {
        call: &'static str,
        file: &'static str,
        line: u32,
        result: vk::Result,
    },
    #[error("{expr} failed at {file}:{line}")]
    Invariant {
        expr: &'static str,
        file: &'static str,
        line: u32,
    },
}

/// Turn a `VkResult<T>` into `Result<T, CheckError>`, recording the call and location.
#[macro_export]
macro_rules! vk_check {
    ($call:expr) => {
        ($call).map_err(|result| $crate::check::CheckError::Vk {
            call: stringify!($call),
            file: file!(),
            line: line!(),
            result,
        })
    };
}

/// Return `CheckError::Invariant` from the enclosing function when `cond` is false.
#[macro_export]
macro_rules! check {
    ($cond:expr) => {
        if !($cond) {
            return Err($crate::check::CheckError::Invariant {
                expr: stringify!($cond),
                file: file!(),
                line: line!(),
            }
            .into());
        }
    };
}

/// `ash` reports `SUBOPTIMAL_KHR` from acquire as `Ok((index, true))`.
/// Anything but plain success counts as failure here.
pub fn strict_acquire(res: VkResult<(u32, bool)>) -> VkResult<u32> {
    match res {
        Ok((index, false)) => Ok(index),
        Ok((_, true)) => Err(vk::Result::SUBOPTIMAL_KHR),
        Err(e) => Err(e),
    }
}

/// Same as [`strict_acquire`] for present, which reports suboptimal as `Ok(true)`.
pub fn strict_present(res: VkResult<bool>) -> VkResult<()> {
    match res {
        Ok(false) => Ok(()),
        Ok(true) => Err(vk::Result::SUBOPTIMAL_KHR),
        Err(e) => Err(e),
    }
}
