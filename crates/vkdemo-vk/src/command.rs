// SPDX-License-Identifier: CEPL-1.0
use anyhow::Result;
use ash::vk;

use crate::vk_check;

/// Buffers from this pool are reset one at a time and re-recorded, never reallocated.
pub unsafe fn create_command_pool(device: &ash::Device, queue_family: u32) -> Result<vk::CommandPool> {
    let pool_info = vk::CommandPoolCreateInfo {
        s_type: vk::StructureType::COMMAND_POOL_CREATE_INFO,
        queue_family_index: queue_family,
        flags: vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
        ..Default::default()
    };
    Ok(vk_check!(device.create_command_pool(&pool_info, None))?)
}

pub unsafe fn allocate_primary(device: &ash::Device, pool: vk::CommandPool) -> Result<vk::CommandBuffer> {
    let alloc_info = vk::CommandBufferAllocateInfo {
        s_type: vk::StructureType::COMMAND_BUFFER_ALLOCATE_INFO,
        command_pool: pool,
        level: vk::CommandBufferLevel::PRIMARY,
        command_buffer_count: 1,
        ..Default::default()
    };
    let bufs = vk_check!(device.allocate_command_buffers(&alloc_info))?;
    bufs.into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("allocate_command_buffers returned no buffer"))
}

/// Color clear plus a depth/stencil value. The render pass has no depth
/// attachment, so the second value is ignored by the driver.
pub fn clear_values(color: [f32; 4]) -> [vk::ClearValue; 2] {
    [
        vk::ClearValue {
            color: vk::ClearColorValue { float32: color },
        },
        vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: 1.0,
                stencil: 0,
            },
        },
    ]
}

pub struct ClearPass {
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    pub extent: vk::Extent2D,
    pub color: [f32; 4],
}

/// Reset `cmd` and record a render pass that only clears. No draws are issued.
pub unsafe fn record_clear_pass(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    pass: &ClearPass,
) -> Result<()> {
    vk_check!(device.reset_command_buffer(cmd, vk::CommandBufferResetFlags::RELEASE_RESOURCES))?;

    let begin = vk::CommandBufferBeginInfo {
        s_type: vk::StructureType::COMMAND_BUFFER_BEGIN_INFO,
        flags: vk::CommandBufferUsageFlags::SIMULTANEOUS_USE,
        ..Default::default()
    };
    vk_check!(device.begin_command_buffer(cmd, &begin))?;

    let clears = clear_values(pass.color);
    let rp_begin = vk::RenderPassBeginInfo {
        s_type: vk::StructureType::RENDER_PASS_BEGIN_INFO,
        render_pass: pass.render_pass,
        framebuffer: pass.framebuffer,
        render_area: vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: pass.extent,
        },
        clear_value_count: clears.len() as u32,
        p_clear_values: clears.as_ptr(),
        ..Default::default()
    };

    device.cmd_begin_render_pass(cmd, &rp_begin, vk::SubpassContents::INLINE);
    device.cmd_end_render_pass(cmd);

    vk_check!(device.end_command_buffer(cmd))?;
    Ok(())
}

/// Begin and end with nothing in between; still a valid, signalling submission.
pub unsafe fn record_empty(device: &ash::Device, cmd: vk::CommandBuffer) -> Result<()> {
    let begin = vk::CommandBufferBeginInfo {
        s_type: vk::StructureType::COMMAND_BUFFER_BEGIN_INFO,
        flags: vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
        ..Default::default()
    };
    vk_check!(device.begin_command_buffer(cmd, &begin))?;
    vk_check!(device.end_command_buffer(cmd))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_values_hold_color_then_depth() {
        let values = clear_values([0.0, 0.0, 0.2, 1.0]);
        unsafe {
            assert_eq!(values[0].color.float32, [0.0, 0.0, 0.2, 1.0]);
            assert_eq!(values[1].depth_stencil.depth, 1.0);
            assert_eq!(values[1].depth_stencil.stencil, 0);
        }
    }
}
