// SPDX-License-Identifier: CEPL-1.0
use anyhow::{Context, Result};
use ash::ext::debug_utils;
use ash::{vk, Entry, Instance};
use raw_window_handle::RawDisplayHandle;
use std::ffi::{c_char, c_void, CStr};
use tracing::{error, info, warn};

use crate::{check, vk_check};

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Root of every Vulkan object: loader entry, instance and (optionally) the
/// validation messenger. Dropped last, after every device-level object.
pub struct Bootstrap {
    entry: Entry,
    instance: Instance,
    debug: Option<(debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
}

impl Drop for Bootstrap {
    fn drop(&mut self) {
        unsafe {
            if let Some((loader, messenger)) = self.debug.take() {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

impl Bootstrap {
    /// `display` adds the window-system extensions needed to create surfaces;
    /// pass `None` for a headless instance.
    pub fn new(display: Option<RawDisplayHandle>, validation: bool) -> Result<Self> {
        let entry = unsafe { Entry::load() }.context("load Vulkan loader")?;
        unsafe { create_bootstrap(entry, display, validation) }
    }

    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn has_messenger(&self) -> bool {
        self.debug.is_some()
    }

    pub fn physical_devices(&self) -> Result<Vec<vk::PhysicalDevice>> {
        Ok(vk_check!(unsafe { self.instance.enumerate_physical_devices() })?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Reported {
    Warning,
    Error,
}

fn classify(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Option<Reported> {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        Some(Reported::Warning)
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        Some(Reported::Error)
    } else {
        None
    }
}

unsafe fn lossy(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _types: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user: *mut c_void,
) -> vk::Bool32 {
    let Some(kind) = classify(severity) else {
        return vk::FALSE;
    };
    if data.is_null() {
        return vk::FALSE;
    }
    let data = &*data;
    let name = lossy(data.p_message_id_name);
    let message = lossy(data.p_message);
    match kind {
        Reported::Warning => warn!(
            "Vulkan warning ({})\n{}\n{}",
            data.message_id_number, name, message
        ),
        Reported::Error => error!(
            "Vulkan error ({})\n{}\n{}",
            data.message_id_number, name, message
        ),
    }
    // Never abort the call that triggered the message.
    vk::FALSE
}

fn messenger_info<'a>() -> vk::DebugUtilsMessengerCreateInfoEXT<'a> {
    vk::DebugUtilsMessengerCreateInfoEXT {
        s_type: vk::StructureType::DEBUG_UTILS_MESSENGER_CREATE_INFO_EXT,
        message_severity: vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
            | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
        message_type: vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
        pfn_user_callback: Some(debug_callback),
        ..Default::default()
    }
}

/// The diagnostics extension is always requested, so its absence is fatal.
fn require_extension(available: &[vk::ExtensionProperties], name: &CStr) -> Result<()> {
    let has_extension = available
        .iter()
        .any(|e| e.extension_name_as_c_str() == Ok(name));
    check!(has_extension);
    Ok(())
}

unsafe fn create_bootstrap(
    entry: Entry,
    display: Option<RawDisplayHandle>,
    validation: bool,
) -> Result<Bootstrap> {
    let app_info = vk::ApplicationInfo {
        s_type: vk::StructureType::APPLICATION_INFO,
        p_application_name: c"vkdemo".as_ptr(),
        application_version: vk::make_api_version(0, 1, 0, 0),
        p_engine_name: c"".as_ptr(),
        engine_version: vk::make_api_version(0, 1, 0, 0),
        api_version: vk::API_VERSION_1_2,
        ..Default::default()
    };

    let mut extensions: Vec<*const c_char> = match display {
        Some(dh) => ash_window::enumerate_required_extensions(dh)
            .context("enumerate_required_extensions")?
            .to_vec(),
        None => Vec::new(),
    };

    let available = vk_check!(entry.enumerate_instance_extension_properties(None))?;
    require_extension(&available, debug_utils::NAME)?;
    extensions.push(debug_utils::NAME.as_ptr());

    let mut layers: Vec<*const c_char> = Vec::new();
    if validation {
        let layer_props = vk_check!(entry.enumerate_instance_layer_properties())?;
        if layer_props
            .iter()
            .any(|l| l.layer_name_as_c_str() == Ok(VALIDATION_LAYER))
        {
            layers.push(VALIDATION_LAYER.as_ptr());
        } else {
            warn!("validation requested but {:?} is not installed", VALIDATION_LAYER);
        }
    }

    // Chained into instance creation so create/destroy of the instance itself is reported.
    let mut chained = messenger_info();
    let mut create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_extension_names(&extensions)
        .enabled_layer_names(&layers);
    if validation {
        create_info = create_info.push_next(&mut chained);
    }

    let instance = vk_check!(entry.create_instance(&create_info, None))?;
    let mut boot = Bootstrap {
        entry,
        instance,
        debug: None,
    };

    if validation {
        boot.debug = Some(create_messenger(&boot.entry, &boot.instance)?);
    }
    info!(
        "Vulkan instance ready (layers: {}, messenger: {})",
        layers.len(),
        boot.has_messenger()
    );
    Ok(boot)
}

unsafe fn create_messenger(
    entry: &Entry,
    instance: &Instance,
) -> Result<(debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
    // The destroyer is looked up now so teardown can never hit a missing pointer.
    let create = entry.get_instance_proc_addr(
        instance.handle(),
        c"vkCreateDebugUtilsMessengerEXT".as_ptr(),
    );
    check!(create.is_some());
    let destroy = entry.get_instance_proc_addr(
        instance.handle(),
        c"vkDestroyDebugUtilsMessengerEXT".as_ptr(),
    );
    check!(destroy.is_some());

    let loader = debug_utils::Instance::new(entry, instance);
    let messenger = vk_check!(loader.create_debug_utils_messenger(&messenger_info(), None))?;
    Ok((loader, messenger))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_warnings_and_errors_are_reported() {
        use vk::DebugUtilsMessageSeverityFlagsEXT as S;
        assert_eq!(classify(S::WARNING), Some(Reported::Warning));
        assert_eq!(classify(S::ERROR), Some(Reported::Error));
        assert_eq!(classify(S::INFO), None);
        assert_eq!(classify(S::VERBOSE), None);
    }

    #[test]
    fn callback_never_aborts() {
        let data = vk::DebugUtilsMessengerCallbackDataEXT {
            message_id_number: 42,
            p_message_id_name: c"VUID-test".as_ptr(),
            p_message: c"something odd".as_ptr(),
            ..Default::default()
        };
        for severity in [
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE,
            vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        ] {
            let ret = unsafe {
                debug_callback(
                    severity,
                    vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                    &data,
                    std::ptr::null_mut(),
                )
            };
            assert_eq!(ret, vk::FALSE);
        }
        let ret = unsafe {
            debug_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                std::ptr::null(),
                std::ptr::null_mut(),
            )
        };
        assert_eq!(ret, vk::FALSE);
    }

    #[test]
    fn messenger_filters_validation_warnings_and_errors() {
        let info = messenger_info();
        assert!(info.pfn_user_callback.is_some());
        assert_eq!(
            info.message_severity,
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        );
        assert_eq!(info.message_type, vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION);
    }

    fn ext(name: &CStr) -> vk::ExtensionProperties {
        let mut props = vk::ExtensionProperties::default();
        for (dst, &src) in props.extension_name.iter_mut().zip(name.to_bytes()) {
            *dst = src as c_char;
        }
        props
    }

    #[test]
    fn missing_debug_utils_is_fatal() {
        let surface_only = [ext(c"VK_KHR_surface")];
        let err = require_extension(&surface_only, debug_utils::NAME).unwrap_err();
        assert!(err.to_string().starts_with("has_extension failed at"), "{err}");

        let both = [ext(c"VK_KHR_surface"), ext(debug_utils::NAME)];
        assert!(require_extension(&both, debug_utils::NAME).is_ok());
    }
}
