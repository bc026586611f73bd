use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use ash::vk;
use color_eyre::Result;
use color_eyre::eyre::WrapErr;

const SHADERS_DIR: &str = "shaders-built";

pub struct GraphicsShader {
    pub vert_mod: vk::ShaderModule,
    pub frag_mod: vk::ShaderModule,
    device: Arc<ash::Device>,
}

pub struct ComputeShader {
    pub comp_mod: vk::ShaderModule,
    device: Arc<ash::Device>,
}

impl GraphicsShader {
    pub fn new(shader_name: &str, device: Arc<ash::Device>) -> Result<Self> {
        let vert_mod = create_shader_module(
            (&format!("{}/{}.vert.spv", SHADERS_DIR, shader_name)).as_ref(),
            &device,
        )?;
        let frag_mod = create_shader_module(
            (&format!("{}/{}.frag.spv", SHADERS_DIR, shader_name)).as_ref(),
            &device,
        )?;
        Ok(Self { vert_mod, frag_mod, device })
    }
}

impl ComputeShader {
    pub fn new(shader_name: &str, device: Arc<ash::Device>) -> Result<Self> {
        let comp_mod = create_shader_module(
            (&format!("{}/{}.comp.spv", SHADERS_DIR, shader_name)).as_ref(),
            &device,
        )?;
        Ok(Self { comp_mod, device })
    }
}

impl Drop for GraphicsShader {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.vert_mod, None);
            self.device.destroy_shader_module(self.frag_mod, None);
        }
    }
}

impl Drop for ComputeShader {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.comp_mod, None);
        }
    }
}

fn create_shader_module(filepath: &Path, device: &ash::Device) -> Result<vk::ShaderModule> {
    let bytes = std::fs::read(filepath)
        .wrap_err_with(|| format!("Failed to read shader file: {:?}", filepath))?;
    let code = ash::util::read_spv(&mut Cursor::new(bytes))?;
    let info = vk::ShaderModuleCreateInfo::default().code(&code);
    Ok(unsafe { device.create_shader_module(&info, None)? })
}
