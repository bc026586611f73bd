use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Data unique to each vertex passed as elements into a vertex buffer
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, Pod, Zeroable)]
pub struct PerVertexData {
    pub position: Vec3,
    pub texcoord: Vec2,
}
