use ash::vk;
use color_eyre::eyre::OptionExt;
use color_eyre::Result;
use std::sync::Arc;
use winit::window::Window;
use crate::renderer::contexts::device_ctx::device::RenderDevice;
use crate::renderer::contexts::device_ctx::swapchain::Swapchain;
use crate::renderer::resources::image::Image;

/// Window surface plus the loader that destroys it.
pub struct Surface {
    pub handle: vk::SurfaceKHR,
    pub loader: ash::khr::surface::Instance,
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_surface(self.handle, None);
        }
    }
}

/// Presentation target of the renderer: the window, its surface and
/// swapchain, the depth buffer, and the static render pass with one
/// framebuffer per swapchain image.
pub struct RenderTarget {
    pub window: Arc<Window>,
    pub surface_format: vk::SurfaceFormatKHR,
    pub surface_present_mode: vk::PresentModeKHR,
    pub render_pass: vk::RenderPass,
    pub framebuffers: Vec<vk::Framebuffer>,

    pub depth_image: Image,
    // Declared before the surface so the swapchain is destroyed first.
    pub swapchain: Swapchain,
    surface: Surface,
    device: Arc<ash::Device>,
}

impl RenderTarget {
    pub fn new(
        window: Arc<Window>,
        surface: Surface,
        instance: &ash::Instance,
        dev: &RenderDevice,
    ) -> Result<Self> {
        let surface_formats = unsafe {
            surface
                .loader
                .get_physical_device_surface_formats(dev.physical, surface.handle)?
        };
        let surface_present_modes = unsafe {
            surface
                .loader
                .get_physical_device_surface_present_modes(dev.physical, surface.handle)?
        };

        let surface_format = *surface_formats
            .iter()
            .find(|format| {
                format.format == vk::Format::B8G8R8A8_SRGB
                    && format.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
            })
            .ok_or_eyre("No suitable surface format found")?;
        let surface_present_mode = *surface_present_modes
            .iter()
            .find(|mode| **mode == vk::PresentModeKHR::MAILBOX)
            .unwrap_or(&vk::PresentModeKHR::FIFO);

        let swapchain = Swapchain::new(
            &surface.handle,
            &surface.loader,
            &surface_format,
            &surface_present_mode,
            &window,
            instance,
            dev,
        )?;

        let depth_image = Image::new_depth(
            swapchain.extent.width,
            swapchain.extent.height,
            dev.allocator(),
            dev.logical.clone(),
        )?;

        let render_pass = create_render_pass(
            &dev.logical,
            swapchain.format,
            depth_image.format,
        )?;

        let framebuffers = swapchain
            .image_views
            .iter()
            .map(|view| {
                let attachments = [*view, depth_image.view];
                let info = vk::FramebufferCreateInfo::default()
                    .render_pass(render_pass)
                    .attachments(&attachments)
                    .width(swapchain.extent.width)
                    .height(swapchain.extent.height)
                    .layers(1);
                Ok(unsafe { dev.logical.create_framebuffer(&info, None)? })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            window,
            surface_format,
            surface_present_mode,
            render_pass,
            framebuffers,

            depth_image,
            swapchain,
            surface,
            device: dev.logical.clone(),
        })
    }

    pub fn frame_count(&self) -> usize {
        self.swapchain.images.len()
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        unsafe {
            for framebuffer in self.framebuffers.drain(..) {
                self.device.destroy_framebuffer(framebuffer, None);
            }
            self.device.destroy_render_pass(self.render_pass, None);
        }
    }
}

/// Classic static render pass: color cleared and stored for present,
/// depth cleared and discarded.
fn create_render_pass(
    device: &ash::Device,
    color_format: vk::Format,
    depth_format: vk::Format,
) -> Result<vk::RenderPass> {
    let attachments = [
        vk::AttachmentDescription::default()
            .format(color_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR),
        vk::AttachmentDescription::default()
            .format(depth_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::DONT_CARE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
    ];

    let color_refs = [vk::AttachmentReference::default()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];
    let depth_ref = vk::AttachmentReference::default()
        .attachment(1)
        .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
    let subpasses = [vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs)
        .depth_stencil_attachment(&depth_ref)];

    let dependencies = [vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
        )
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
        )
        .dst_access_mask(
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        )];

    let info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpasses)
        .dependencies(&dependencies);

    Ok(unsafe { device.create_render_pass(&info, None)? })
}
