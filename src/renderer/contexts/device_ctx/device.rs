use std::ffi::{c_char, CStr};
use std::sync::{Arc, Mutex};
use ash::vk;
use color_eyre::eyre::OptionExt;
use color_eyre::Result;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use crate::renderer::contexts::device_ctx::queue::{Queue, QueueFamily};

/// Logical device plus the two queues all work is submitted to.
pub struct RenderDevice {
    pub logical: Arc<ash::Device>,
    pub physical: vk::PhysicalDevice,

    // The graphics queue doubles as the present queue.
    pub graphics_queue: Queue,
    pub compute_queue: Queue,

    allocator: Option<Arc<Mutex<Allocator>>>,
}

impl RenderDevice {
    pub fn new(
        instance: &ash::Instance,
        surface: &vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
    ) -> Result<Self> {
        let (
            physical,
            graphics_family,
            compute_family,
        ) = Self::select_physical_device(instance, surface, surface_loader)?;
        log::info!(
            "queue families selected (graphics: {}, compute: {})",
            graphics_family.index,
            compute_family.index,
        );

        let (
            logical,
            graphics_queue,
            compute_queue,
        ) = Self::create_logical_device(
            instance,
            &physical,
            graphics_family,
            compute_family,
        )?;

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: logical.clone(),
            physical_device: physical,
            debug_settings: gpu_allocator::AllocatorDebugSettings {
                log_leaks_on_shutdown: true,
                ..Default::default()
            },
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })?;

        Ok(Self {
            logical: Arc::new(logical),
            physical,
            graphics_queue,
            compute_queue,
            allocator: Some(Arc::new(Mutex::new(allocator))),
        })
    }

    pub fn allocator(&self) -> Arc<Mutex<Allocator>> {
        self.allocator
            .as_ref()
            .expect("Allocator does not exist")
            .clone()
    }

    fn select_physical_device(
        instance: &ash::Instance,
        surface: &vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
    ) -> Result<(vk::PhysicalDevice, QueueFamily, QueueFamily)> {
        let devices = unsafe { instance.enumerate_physical_devices()? };

        let mut candidates = Vec::new();
        for device in devices {
            if !Self::supports_required_extensions(instance, device)? {
                continue;
            }
            let families = unsafe {
                instance.get_physical_device_queue_family_properties(device)
            }
                .into_iter()
                .enumerate()
                .map(|(index, props)| {
                    let supports_present = unsafe {
                        surface_loader
                            .get_physical_device_surface_support(
                                device,
                                index as u32,
                                *surface,
                            )
                            .unwrap_or(false)
                    };
                    QueueFamily::new(index as u32, props, supports_present)
                })
                .collect::<Vec<_>>();

            let graphics_family = families
                .iter()
                .find(|family| family.supports_graphics() && family.supports_present());
            // The compute queue must live on its own family so the
            // ownership transfer is a real cross-family handoff.
            let compute_family = families.iter().find(|family| {
                family.supports_compute()
                    && graphics_family.map(|g| g.index) != Some(family.index)
            });

            if let (
                Some(graphics_family),
                Some(compute_family),
            ) = (graphics_family, compute_family) {
                candidates.push((
                    device,
                    graphics_family.clone(),
                    compute_family.clone(),
                ));
            }
        }

        candidates
            .into_iter()
            .min_by_key(|(device, _, _)| {
                let props = unsafe {
                    instance.get_physical_device_properties(*device)
                };
                match props.device_type {
                    vk::PhysicalDeviceType::DISCRETE_GPU => 0,
                    vk::PhysicalDeviceType::INTEGRATED_GPU => 1,
                    vk::PhysicalDeviceType::VIRTUAL_GPU => 2,
                    vk::PhysicalDeviceType::CPU => 3,
                    _ => 4,
                }
            })
            .ok_or_eyre("No suitable physical device found")
    }

    fn supports_required_extensions(
        instance: &ash::Instance,
        device: vk::PhysicalDevice,
    ) -> Result<bool> {
        let supported = unsafe {
            instance.enumerate_device_extension_properties(device)?
        };
        let all_supported = Self::required_device_extensions().iter().all(|req| {
            let found = supported.iter().any(|ext| {
                ext.extension_name_as_c_str()
                    .map_or(false, |name| name == *req)
            });
            if !found {
                log::error!("Device extension not supported: {:?}", req);
            }
            found
        });
        Ok(all_supported)
    }

    fn create_logical_device(
        instance: &ash::Instance,
        physical: &vk::PhysicalDevice,
        graphics_family: QueueFamily,
        compute_family: QueueFamily,
    ) -> Result<(ash::Device, Queue, Queue)> {
        let queue_priorities = [1.0];
        let queue_create_infos = [
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(graphics_family.index)
                .queue_priorities(&queue_priorities),
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(compute_family.index)
                .queue_priorities(&queue_priorities),
        ];

        let device = {
            let enabled_extension_names = Self::required_device_extensions()
                .iter()
                .map(|ext| ext.as_ptr())
                .collect::<Vec<*const c_char>>();
            let device_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&enabled_extension_names);
            unsafe {
                instance.create_device(*physical, &device_info, None)?
            }
        };

        let graphics_queue = unsafe {
            let queue = device.get_device_queue(graphics_family.index, 0);
            Queue::new(graphics_family, queue)
        };
        let compute_queue = unsafe {
            let queue = device.get_device_queue(compute_family.index, 0);
            Queue::new(compute_family, queue)
        };

        Ok((device, graphics_queue, compute_queue))
    }

    fn required_device_extensions() -> Vec<&'static CStr> {
        vec![
            ash::khr::swapchain::NAME,

            #[cfg(target_os = "macos")]
            ash::khr::portability_subset::NAME,
        ]
    }
}

impl Drop for RenderDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = self.logical.device_wait_idle();
        }
        // The allocator returns its heap blocks before the device goes away.
        self.allocator.take();
        unsafe {
            self.logical.destroy_device(None);
        }
    }
}
