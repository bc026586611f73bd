/// Fixed parameters of the demo: the compute domain, the displayed
/// texture region, and the clear color.
pub struct RenderConfig {
    pub compute_width: u32,
    pub compute_height: u32,
    /// RGBA8 stride of the compute output.
    pub bytes_per_pixel: u32,
    /// Region of the compute result that becomes the displayed texture;
    /// may cover far less than the full output.
    pub texture_width: u32,
    pub texture_height: u32,
    pub clear_color: [f32; 4],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            compute_width: 1920,
            compute_height: 1080,
            bytes_per_pixel: 4,
            texture_width: 32,
            texture_height: 32,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl RenderConfig {
    pub fn compute_byte_len(&self) -> u64 {
        self.compute_width as u64 * self.compute_height as u64 * self.bytes_per_pixel as u64
    }
}
