use std::sync::Arc;
use ash::vk;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use crate::renderer::contexts::device_ctx::RenderDeviceContext;
use crate::renderer::resources::buffer::Buffer;
use crate::renderer::resources::shader::{ComputeShader, GraphicsShader};
use crate::renderer::resources::texture::Texture;
use crate::renderer::shader_data::PerVertexData;

/// One immutable bound configuration: shader, layout, and the single
/// descriptor set it reads from.
pub struct Pipeline {
    pub bind_point: vk::PipelineBindPoint,
    pub handle: vk::Pipeline,
    pub layout: vk::PipelineLayout,
    pub set_layout: vk::DescriptorSetLayout,
    pub descriptor_set: vk::DescriptorSet,
}

/// Responsibilities:
/// - Build the compute and graphics pipelines
/// - Own the descriptor pool and point both sets at their resources
pub struct RenderPipelineContext {
    pub compute: Pipeline,
    pub graphics: Pipeline,
    descriptor_pool: vk::DescriptorPool,
    device: Arc<ash::Device>,
}

impl RenderPipelineContext {
    pub fn new(
        ctx: &RenderDeviceContext,
        result_buffer: &Buffer,
        texture: &Texture,
    ) -> Result<Self> {
        let device = ctx.device.logical.clone();

        let descriptor_pool = create_descriptor_pool(&device)?;
        let compute = create_compute_pipeline(&device, descriptor_pool)?;
        let graphics = create_graphics_pipeline(
            &device,
            descriptor_pool,
            ctx.target.render_pass,
            ctx.target.swapchain.extent,
        )?;

        write_storage_buffer(&device, compute.descriptor_set, 0, result_buffer);
        write_combined_image_sampler(&device, graphics.descriptor_set, 0, texture);

        Ok(Self {
            compute,
            graphics,
            descriptor_pool,
            device,
        })
    }
}

impl Drop for RenderPipelineContext {
    fn drop(&mut self) {
        unsafe {
            for pipeline in [&self.compute, &self.graphics] {
                self.device.destroy_pipeline(pipeline.handle, None);
                self.device.destroy_pipeline_layout(pipeline.layout, None);
                self.device
                    .destroy_descriptor_set_layout(pipeline.set_layout, None);
            }
            // Frees both descriptor sets with it.
            self.device.destroy_descriptor_pool(self.descriptor_pool, None);
        }
    }
}

fn create_descriptor_pool(device: &ash::Device) -> Result<vk::DescriptorPool> {
    let pool_sizes = [
        vk::DescriptorPoolSize::default()
            .ty(vk::DescriptorType::STORAGE_BUFFER)
            .descriptor_count(1),
        vk::DescriptorPoolSize::default()
            .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(1),
    ];
    let info = vk::DescriptorPoolCreateInfo::default()
        .max_sets(2)
        .pool_sizes(&pool_sizes);
    Ok(unsafe { device.create_descriptor_pool(&info, None)? })
}

/// Single-binding descriptor set layout plus a set allocated for it.
fn create_descriptor_set(
    device: &ash::Device,
    pool: vk::DescriptorPool,
    descriptor_type: vk::DescriptorType,
    stage_flags: vk::ShaderStageFlags,
) -> Result<(vk::DescriptorSetLayout, vk::DescriptorSet)> {
    let bindings = [vk::DescriptorSetLayoutBinding::default()
        .binding(0)
        .descriptor_type(descriptor_type)
        .descriptor_count(1)
        .stage_flags(stage_flags)];
    let layout_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
    let set_layout = unsafe {
        device.create_descriptor_set_layout(&layout_info, None)?
    };

    let set_layouts = [set_layout];
    let alloc_info = vk::DescriptorSetAllocateInfo::default()
        .descriptor_pool(pool)
        .set_layouts(&set_layouts);
    let descriptor_set = unsafe {
        device.allocate_descriptor_sets(&alloc_info)?[0]
    };

    Ok((set_layout, descriptor_set))
}

fn create_compute_pipeline(
    device: &Arc<ash::Device>,
    pool: vk::DescriptorPool,
) -> Result<Pipeline> {
    let (set_layout, descriptor_set) = create_descriptor_set(
        device,
        pool,
        vk::DescriptorType::STORAGE_BUFFER,
        vk::ShaderStageFlags::COMPUTE,
    )?;
    let set_layouts = [set_layout];
    let layout_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&set_layouts);
    let layout = unsafe { device.create_pipeline_layout(&layout_info, None)? };

    let shader = ComputeShader::new("pattern", device.clone())?;
    let stage = vk::PipelineShaderStageCreateInfo::default()
        .stage(vk::ShaderStageFlags::COMPUTE)
        .module(shader.comp_mod)
        .name(c"main");
    let info = vk::ComputePipelineCreateInfo::default()
        .stage(stage)
        .layout(layout);
    let handle = unsafe {
        device
            .create_compute_pipelines(vk::PipelineCache::null(), &[info], None)
            .map_err(|(_, result)| eyre!("Compute pipeline creation failed: {result}"))?[0]
    };

    Ok(Pipeline {
        bind_point: vk::PipelineBindPoint::COMPUTE,
        handle,
        layout,
        set_layout,
        descriptor_set,
    })
}

fn create_graphics_pipeline(
    device: &Arc<ash::Device>,
    pool: vk::DescriptorPool,
    render_pass: vk::RenderPass,
    extent: vk::Extent2D,
) -> Result<Pipeline> {
    let (set_layout, descriptor_set) = create_descriptor_set(
        device,
        pool,
        vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        vk::ShaderStageFlags::FRAGMENT,
    )?;
    let set_layouts = [set_layout];
    let layout_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&set_layouts);
    let layout = unsafe { device.create_pipeline_layout(&layout_info, None)? };

    let shader = GraphicsShader::new("blit", device.clone())?;
    let stages = [
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(shader.vert_mod)
            .name(c"main"),
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::FRAGMENT)
            .module(shader.frag_mod)
            .name(c"main"),
    ];

    let vertex_bindings = [vk::VertexInputBindingDescription::default()
        .binding(0)
        .stride(std::mem::size_of::<PerVertexData>() as u32)
        .input_rate(vk::VertexInputRate::VERTEX)];
    let vertex_attributes = [
        vk::VertexInputAttributeDescription::default()
            .location(0)
            .binding(0)
            .format(vk::Format::R32G32B32_SFLOAT)
            .offset(std::mem::offset_of!(PerVertexData, position) as u32),
        vk::VertexInputAttributeDescription::default()
            .location(1)
            .binding(0)
            .format(vk::Format::R32G32_SFLOAT)
            .offset(std::mem::offset_of!(PerVertexData, texcoord) as u32),
    ];
    let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
        .vertex_binding_descriptions(&vertex_bindings)
        .vertex_attribute_descriptions(&vertex_attributes);

    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(vk::PrimitiveTopology::TRIANGLE_LIST);

    let viewports = [vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }];
    let scissors = [vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    }];
    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewports(&viewports)
        .scissors(&scissors);

    let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
        .polygon_mode(vk::PolygonMode::FILL)
        .cull_mode(vk::CullModeFlags::NONE)
        .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
        .line_width(1.0);

    let multisample = vk::PipelineMultisampleStateCreateInfo::default()
        .rasterization_samples(vk::SampleCountFlags::TYPE_1);

    let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
        .depth_test_enable(true)
        .depth_write_enable(true)
        .depth_compare_op(vk::CompareOp::LESS_OR_EQUAL);

    let blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
        .color_write_mask(vk::ColorComponentFlags::RGBA)];
    let color_blend = vk::PipelineColorBlendStateCreateInfo::default()
        .attachments(&blend_attachments);

    let info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&stages)
        .vertex_input_state(&vertex_input)
        .input_assembly_state(&input_assembly)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterization)
        .multisample_state(&multisample)
        .depth_stencil_state(&depth_stencil)
        .color_blend_state(&color_blend)
        .layout(layout)
        .render_pass(render_pass)
        .subpass(0);
    let handle = unsafe {
        device
            .create_graphics_pipelines(vk::PipelineCache::null(), &[info], None)
            .map_err(|(_, result)| eyre!("Graphics pipeline creation failed: {result}"))?[0]
    };

    Ok(Pipeline {
        bind_point: vk::PipelineBindPoint::GRAPHICS,
        handle,
        layout,
        set_layout,
        descriptor_set,
    })
}

fn write_storage_buffer(
    device: &ash::Device,
    set: vk::DescriptorSet,
    binding: u32,
    buffer: &Buffer,
) {
    let buffer_info = [vk::DescriptorBufferInfo::default()
        .buffer(buffer.handle)
        .offset(0)
        .range(vk::WHOLE_SIZE)];
    let writes = [vk::WriteDescriptorSet::default()
        .dst_set(set)
        .dst_binding(binding)
        .descriptor_type(vk::DescriptorType::STORAGE_BUFFER)
        .buffer_info(&buffer_info)];
    unsafe {
        device.update_descriptor_sets(&writes, &[]);
    }
}

fn write_combined_image_sampler(
    device: &ash::Device,
    set: vk::DescriptorSet,
    binding: u32,
    texture: &Texture,
) {
    let image_info = [vk::DescriptorImageInfo::default()
        .sampler(texture.sampler)
        .image_view(texture.image.view)
        .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)];
    let writes = [vk::WriteDescriptorSet::default()
        .dst_set(set)
        .dst_binding(binding)
        .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
        .image_info(&image_info)];
    unsafe {
        device.update_descriptor_sets(&writes, &[]);
    }
}
