// SPDX-License-Identifier: CEPL-1.0
use anyhow::Result;
use ash::khr::{surface, swapchain};
use ash::prelude::VkResult;
use ash::vk;
use tracing::debug;
use vkdemo_render::{SWAPCHAIN_IMAGE_COUNT, WINDOW_SIZE};

use crate::{check, vk_check};

pub const SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_UNORM,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

pub const PRESENT_MODE: vk::PresentModeKHR = vk::PresentModeKHR::FIFO;

pub const EXTENT: vk::Extent2D = vk::Extent2D {
    width: WINDOW_SIZE.width,
    height: WINDOW_SIZE.height,
};

/// Fixed format, extent, image count and present mode; nothing is negotiated
/// against the surface capabilities.
pub unsafe fn create_swapchain(
    surface_loader: &surface::Instance,
    swapchain_loader: &swapchain::Device,
    phys: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<vk::SwapchainKHR> {
    if let Ok(caps) = surface_loader.get_physical_device_surface_capabilities(phys, surface) {
        debug!(
            "surface caps: images {}..{} current {}x{}",
            caps.min_image_count,
            caps.max_image_count,
            caps.current_extent.width,
            caps.current_extent.height
        );
    }

    let swap_info = vk::SwapchainCreateInfoKHR {
        s_type: vk::StructureType::SWAPCHAIN_CREATE_INFO_KHR,
        surface,
        min_image_count: SWAPCHAIN_IMAGE_COUNT,
        image_format: SURFACE_FORMAT.format,
        image_color_space: SURFACE_FORMAT.color_space,
        image_extent: EXTENT,
        image_array_layers: 1,
        image_usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
        image_sharing_mode: vk::SharingMode::EXCLUSIVE,
        pre_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
        composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
        present_mode: PRESENT_MODE,
        clipped: vk::TRUE,
        old_swapchain: vk::SwapchainKHR::null(),
        ..Default::default()
    };

    Ok(vk_check!(swapchain_loader.create_swapchain(&swap_info, None))?)
}

/// The driver may hand back more images than requested. The frame ring is sized
/// for exactly `expected`, so any other count is fatal.
pub fn expect_image_count(images: Vec<vk::Image>, expected: u32) -> Result<Vec<vk::Image>> {
    check!(images.len() == expected as usize);
    Ok(images)
}

/// One color attachment, cleared on load and handed to the presentation engine.
pub unsafe fn create_render_pass(device: &ash::Device, format: vk::Format) -> Result<vk::RenderPass> {
    let color_att = vk::AttachmentDescription {
        format,
        samples: vk::SampleCountFlags::TYPE_1,
        load_op: vk::AttachmentLoadOp::CLEAR,
        store_op: vk::AttachmentStoreOp::STORE,
        stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
        stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
        initial_layout: vk::ImageLayout::UNDEFINED,
        final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
        ..Default::default()
    };
    let att_ref = vk::AttachmentReference {
        attachment: 0,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    };

    let subpass = vk::SubpassDescription {
        pipeline_bind_point: vk::PipelineBindPoint::GRAPHICS,
        color_attachment_count: 1,
        p_color_attachments: &att_ref,
        ..Default::default()
    };

    // Image acquisition finishes at color-attachment output; writes wait for it.
    let dependency = vk::SubpassDependency {
        src_subpass: vk::SUBPASS_EXTERNAL,
        dst_subpass: 0,
        src_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        src_access_mask: vk::AccessFlags::empty(),
        dst_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        dst_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        ..Default::default()
    };

    let rp_info = vk::RenderPassCreateInfo {
        s_type: vk::StructureType::RENDER_PASS_CREATE_INFO,
        attachment_count: 1,
        p_attachments: &color_att,
        subpass_count: 1,
        p_subpasses: &subpass,
        dependency_count: 1,
        p_dependencies: &dependency,
        ..Default::default()
    };
    Ok(vk_check!(device.create_render_pass(&rp_info, None))?)
}

/// Create one object per source. If any creation fails, the ones already made
/// are handed to `destroy` before the error is returned.
pub fn create_per_image<S, T: Copy>(
    sources: &[S],
    mut create: impl FnMut(&S) -> VkResult<T>,
    mut destroy: impl FnMut(T),
) -> VkResult<Vec<T>> {
    let mut made = Vec::with_capacity(sources.len());
    for src in sources {
        match create(src) {
            Ok(obj) => made.push(obj),
            Err(e) => {
                for obj in made.drain(..) {
                    destroy(obj);
                }
                return Err(e);
            }
        }
    }
    Ok(made)
}

pub fn image_view_info(image: vk::Image, format: vk::Format) -> vk::ImageViewCreateInfo<'static> {
    vk::ImageViewCreateInfo {
        s_type: vk::StructureType::IMAGE_VIEW_CREATE_INFO,
        image,
        view_type: vk::ImageViewType::TYPE_2D,
        format,
        components: vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        },
        subresource_range: vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        },
        ..Default::default()
    }
}

pub unsafe fn create_image_views(
    device: &ash::Device,
    images: &[vk::Image],
    format: vk::Format,
) -> Result<Vec<vk::ImageView>> {
    let views = vk_check!(create_per_image(
        images,
        |&img| device.create_image_view(&image_view_info(img, format), None),
        |view| device.destroy_image_view(view, None),
    ))?;
    Ok(views)
}

pub unsafe fn create_framebuffers(
    device: &ash::Device,
    render_pass: vk::RenderPass,
    views: &[vk::ImageView],
    extent: vk::Extent2D,
) -> Result<Vec<vk::Framebuffer>> {
    let framebuffers = vk_check!(create_per_image(
        views,
        |view| {
            let fb_info = vk::FramebufferCreateInfo {
                s_type: vk::StructureType::FRAMEBUFFER_CREATE_INFO,
                render_pass,
                attachment_count: 1,
                p_attachments: view,
                width: extent.width,
                height: extent.height,
                layers: 1,
                ..Default::default()
            };
            device.create_framebuffer(&fb_info, None)
        },
        |fb| device.destroy_framebuffer(fb, None),
    ))?;
    Ok(framebuffers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CheckError;
    use ash::vk::Handle;
    use std::cell::RefCell;

    #[test]
    fn image_count_must_match_exactly() {
        let three: Vec<vk::Image> = (1..=3).map(vk::Image::from_raw).collect();
        assert_eq!(expect_image_count(three.clone(), 3).expect("match"), three);

        for n in [0u64, 2, 4] {
            let images: Vec<vk::Image> = (1..=n).map(vk::Image::from_raw).collect();
            let err = expect_image_count(images, SWAPCHAIN_IMAGE_COUNT).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<CheckError>(),
                Some(CheckError::Invariant { .. })
            ));
        }
    }

    #[test]
    fn wrong_image_count_stops_before_views_are_made() {
        let created = RefCell::new(0usize);
        let images: Vec<vk::Image> = (1..=2).map(vk::Image::from_raw).collect();

        let result = expect_image_count(images, SWAPCHAIN_IMAGE_COUNT).map(|images| {
            create_per_image(
                &images,
                |_| {
                    *created.borrow_mut() += 1;
                    Ok(vk::ImageView::from_raw(1))
                },
                |_| {},
            )
        });

        assert!(result.is_err());
        assert_eq!(*created.borrow(), 0);
    }

    #[test]
    fn per_image_helper_cleans_up_on_partial_failure() {
        let images = [
            vk::Image::from_raw(1),
            vk::Image::from_raw(2),
            vk::Image::from_raw(3),
        ];
        let created_views = [vk::ImageView::from_raw(10), vk::ImageView::from_raw(11)];
        let create_calls = RefCell::new(0usize);
        let destroyed = RefCell::new(Vec::<vk::ImageView>::new());

        let result = create_per_image(
            &images,
            |_| {
                let mut call = create_calls.borrow_mut();
                let ret = match *call {
                    0 | 1 => Ok(created_views[*call]),
                    _ => Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY),
                };
                *call += 1;
                ret
            },
            |view| destroyed.borrow_mut().push(view),
        );

        assert_eq!(result, Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY));
        assert_eq!(*create_calls.borrow(), 3);
        assert_eq!(destroyed.borrow().as_slice(), &created_views);
    }

    #[test]
    fn per_image_helper_returns_one_object_per_source() {
        let views = [
            vk::ImageView::from_raw(100),
            vk::ImageView::from_raw(101),
            vk::ImageView::from_raw(102),
        ];
        let result = create_per_image(
            &views,
            |view| Ok(vk::Framebuffer::from_raw(view.as_raw() + 100)),
            |_fb| panic!("destroy callback should not be called on success"),
        )
        .expect("helper should succeed");

        let raw: Vec<u64> = result.iter().map(|fb| fb.as_raw()).collect();
        assert_eq!(raw, [200, 201, 202]);
    }

    #[test]
    fn image_views_are_plain_2d_color() {
        let info = image_view_info(vk::Image::from_raw(5), SURFACE_FORMAT.format);
        assert_eq!(info.view_type, vk::ImageViewType::TYPE_2D);
        assert_eq!(info.format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(info.components.r, vk::ComponentSwizzle::IDENTITY);
        assert_eq!(info.subresource_range.aspect_mask, vk::ImageAspectFlags::COLOR);
        assert_eq!(info.subresource_range.level_count, 1);
        assert_eq!(info.subresource_range.layer_count, 1);
    }

    #[test]
    fn chain_shape_is_fixed() {
        assert_eq!(EXTENT.width, 800);
        assert_eq!(EXTENT.height, 600);
        assert_eq!(PRESENT_MODE, vk::PresentModeKHR::FIFO);
        assert_eq!(SURFACE_FORMAT.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }
}
