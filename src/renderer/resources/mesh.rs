use crate::renderer::shader_data::PerVertexData;

/// The one piece of geometry in the scene: a fullscreen quad as two
/// triangles, interleaved position + UV, drawn non-indexed.
#[derive(Debug)]
pub struct Mesh {
    vertices: Vec<PerVertexData>,
}

impl Mesh {
    pub fn fullscreen_quad() -> Self {
        let vertices = vec![
            PerVertexData {
                position: [-1.0, -1.0, 0.0].into(),
                texcoord: [0.0, 0.0].into(),
            },
            PerVertexData {
                position: [1.0, 1.0, 0.0].into(),
                texcoord: [1.0, 1.0].into(),
            },
            PerVertexData {
                position: [-1.0, 1.0, 0.0].into(),
                texcoord: [0.0, 1.0].into(),
            },
            PerVertexData {
                position: [-1.0, -1.0, 0.0].into(),
                texcoord: [0.0, 0.0].into(),
            },
            PerVertexData {
                position: [1.0, -1.0, 0.0].into(),
                texcoord: [1.0, 0.0].into(),
            },
            PerVertexData {
                position: [1.0, 1.0, 0.0].into(),
                texcoord: [1.0, 1.0].into(),
            },
        ];

        Self { vertices }
    }

    pub fn vertices(&self) -> &[PerVertexData] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn byte_len(&self) -> u64 {
        std::mem::size_of_val(self.vertices.as_slice()) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_is_six_vertices() {
        let mesh = Mesh::fullscreen_quad();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(
            mesh.byte_len(),
            6 * std::mem::size_of::<PerVertexData>() as u64,
        );
    }

    #[test]
    fn triangles_share_the_diagonal() {
        let mesh = Mesh::fullscreen_quad();
        let v = mesh.vertices();
        // Both triangles run through (-1,-1) and (1,1).
        assert_eq!(v[0].position, v[3].position);
        assert_eq!(v[1].position, v[5].position);
    }

    #[test]
    fn texcoords_track_corners() {
        let mesh = Mesh::fullscreen_quad();
        for vertex in mesh.vertices() {
            assert_eq!(vertex.texcoord.x, (vertex.position.x + 1.0) / 2.0);
            assert_eq!(vertex.texcoord.y, (vertex.position.y + 1.0) / 2.0);
        }
    }
}
