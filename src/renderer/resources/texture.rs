use std::sync::{Arc, Mutex};
use ash::vk;
use color_eyre::Result;
use gpu_allocator::vulkan::Allocator;
use crate::renderer::resources::image::Image;

/// A sampled 2D image plus the sampler the fragment shader reads it
/// through. Immutable once the upload has filled it.
pub struct Texture {
    pub image: Image,
    pub sampler: vk::Sampler,
    device: Arc<ash::Device>,
}

impl Texture {
    pub fn new(
        width: u32,
        height: u32,
        allocator: Arc<Mutex<Allocator>>,
        device: Arc<ash::Device>,
    ) -> Result<Self> {
        let image = Image::new_sampled(width, height, allocator, device.clone())?;

        let sampler = {
            let info = vk::SamplerCreateInfo::default()
                .mag_filter(vk::Filter::LINEAR)
                .min_filter(vk::Filter::LINEAR)
                .address_mode_u(vk::SamplerAddressMode::REPEAT)
                .address_mode_v(vk::SamplerAddressMode::REPEAT)
                .address_mode_w(vk::SamplerAddressMode::REPEAT);
            unsafe { device.create_sampler(&info, None)? }
        };

        Ok(Self {
            image,
            sampler,
            device,
        })
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
        }
    }
}
