//! Fullscreen quad geometry and its passthrough shaders.
//!
//! Two triangles cover clip space; each vertex carries a 3-float position
//! and a 2-float texture coordinate, interleaved in one buffer.

use std::rc::Rc;

use thiserror::Error;

use super::context::GraphicsContext;

/// GLSL 4.60 core vertex shader: passes position through and forwards the
/// texture coordinate as `TexCoord`.
pub const QUAD_VERTEX_SHADER: &str = include_str!("../../shaders/quad.vert");

/// GLSL 4.60 core fragment shader: samples `ourTexture` at `TexCoord`.
pub const QUAD_FRAGMENT_SHADER: &str = include_str!("../../shaders/quad.frag");

/// Floats per interleaved vertex (position xyz + texcoord uv).
pub const FLOATS_PER_VERTEX: usize = 5;

/// Number of vertices drawn per frame.
pub const QUAD_VERTEX_COUNT: i32 = 6;

/// Byte distance between consecutive vertices.
pub const VERTEX_STRIDE_BYTES: i32 = (FLOATS_PER_VERTEX * std::mem::size_of::<f32>()) as i32;

/// Byte offset of the texture coordinate within a vertex.
pub const TEXCOORD_OFFSET_BYTES: i32 = (3 * std::mem::size_of::<f32>()) as i32;

/// Attribute location of the position (`aPos`).
pub const POSITION_ATTRIBUTE: u32 = 0;

/// Attribute location of the texture coordinate (`aTexCoord`).
pub const TEXCOORD_ATTRIBUTE: u32 = 1;

#[rustfmt::skip]
pub const QUAD_VERTICES: [f32; 30] = [
    // position          // texcoord
    -1.0,  1.0, 0.0,     0.0, 1.0, // top-left
    -1.0, -1.0, 0.0,     0.0, 0.0, // bottom-left
     1.0, -1.0, 0.0,     1.0, 0.0, // bottom-right

    -1.0,  1.0, 0.0,     0.0, 1.0, // top-left
     1.0, -1.0, 0.0,     1.0, 0.0, // bottom-right
     1.0,  1.0, 0.0,     1.0, 1.0, // top-right
];

/// Errors from allocating the quad's device objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshError {
    #[error("failed to create vertex array: {0}")]
    VertexArray(String),
    #[error("failed to create vertex buffer: {0}")]
    Buffer(String),
}

/// The uploaded quad: one vertex array and its backing buffer.
///
/// Both objects are deleted exactly once on drop.
pub struct QuadMesh<C: GraphicsContext> {
    gl: Rc<C>,
    vertex_array: C::VertexArray,
    buffer: C::Buffer,
}

impl<C: GraphicsContext> QuadMesh<C> {
    /// Uploads [`QUAD_VERTICES`] once with `STATIC_DRAW` and describes the
    /// two attributes. Leaves nothing bound.
    ///
    /// # Errors
    ///
    /// Returns a `MeshError` if either object cannot be created; anything
    /// already created is deleted first.
    pub fn upload(gl: Rc<C>) -> Result<Self, MeshError> {
        let vertex_array = gl.create_vertex_array().map_err(MeshError::VertexArray)?;
        let buffer = match gl.create_buffer() {
            Ok(b) => b,
            Err(e) => {
                gl.delete_vertex_array(vertex_array);
                return Err(MeshError::Buffer(e));
            }
        };

        gl.bind_vertex_array(Some(vertex_array));
        gl.bind_array_buffer(Some(buffer));
        gl.array_buffer_data_f32(&QUAD_VERTICES, glow::STATIC_DRAW);

        gl.vertex_attrib_pointer_f32(POSITION_ATTRIBUTE, 3, VERTEX_STRIDE_BYTES, 0);
        gl.enable_vertex_attrib_array(POSITION_ATTRIBUTE);
        gl.vertex_attrib_pointer_f32(
            TEXCOORD_ATTRIBUTE,
            2,
            VERTEX_STRIDE_BYTES,
            TEXCOORD_OFFSET_BYTES,
        );
        gl.enable_vertex_attrib_array(TEXCOORD_ATTRIBUTE);

        gl.bind_array_buffer(None);
        gl.bind_vertex_array(None);

        Ok(Self {
            gl,
            vertex_array,
            buffer,
        })
    }

    /// Binds the vertex array and draws the quad as a triangle list.
    pub fn draw(&self) {
        self.gl.bind_vertex_array(Some(self.vertex_array));
        self.gl.draw_arrays(glow::TRIANGLES, 0, QUAD_VERTEX_COUNT);
    }

    pub fn vertex_array(&self) -> C::VertexArray {
        self.vertex_array
    }
}

impl<C: GraphicsContext> Drop for QuadMesh<C> {
    fn drop(&mut self) {
        self.gl.delete_vertex_array(self.vertex_array);
        self.gl.delete_buffer(self.buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::recording::{Call, RecordingContext};

    #[test]
    fn vertex_layout_constants_match_interleaving() {
        assert_eq!(VERTEX_STRIDE_BYTES, 20);
        assert_eq!(TEXCOORD_OFFSET_BYTES, 12);
        assert_eq!(
            QUAD_VERTICES.len(),
            FLOATS_PER_VERTEX * QUAD_VERTEX_COUNT as usize
        );
    }

    #[test]
    fn quad_covers_clip_space_corners() {
        let corners: Vec<(f32, f32)> = QUAD_VERTICES
            .chunks_exact(FLOATS_PER_VERTEX)
            .map(|v| (v[0], v[1]))
            .collect();
        for corner in [(-1.0, 1.0), (-1.0, -1.0), (1.0, -1.0), (1.0, 1.0)] {
            assert!(corners.contains(&corner), "missing corner {corner:?}");
        }
    }

    #[test]
    fn texcoords_follow_positions() {
        for v in QUAD_VERTICES.chunks_exact(FLOATS_PER_VERTEX) {
            assert_eq!(v[3], (v[0] + 1.0) / 2.0, "u mismatch for vertex {v:?}");
            assert_eq!(v[4], (v[1] + 1.0) / 2.0, "v mismatch for vertex {v:?}");
            assert_eq!(v[2], 0.0);
        }
    }

    #[test]
    fn passthrough_shaders_declare_expected_interface() {
        assert!(QUAD_VERTEX_SHADER.starts_with("#version 460 core"));
        assert!(QUAD_VERTEX_SHADER.contains("layout (location = 0) in vec3 aPos"));
        assert!(QUAD_VERTEX_SHADER.contains("layout (location = 1) in vec2 aTexCoord"));
        assert!(QUAD_VERTEX_SHADER.contains("out vec2 TexCoord"));
        assert!(QUAD_FRAGMENT_SHADER.contains("uniform sampler2D ourTexture"));
        assert!(QUAD_FRAGMENT_SHADER.contains("in vec2 TexCoord"));
    }

    #[test]
    fn upload_describes_both_attributes_and_unbinds() {
        let gl = Rc::new(RecordingContext::new());
        let mesh = QuadMesh::upload(gl.clone()).unwrap();

        let attribs = gl.vertex_attributes(mesh.vertex_array());
        assert_eq!(attribs.len(), 2);
        assert_eq!(attribs[0].index, POSITION_ATTRIBUTE);
        assert_eq!((attribs[0].size, attribs[0].stride, attribs[0].offset), (3, 20, 0));
        assert_eq!(attribs[1].index, TEXCOORD_ATTRIBUTE);
        assert_eq!((attribs[1].size, attribs[1].stride, attribs[1].offset), (2, 20, 12));
        assert!(attribs.iter().all(|a| a.enabled));

        assert!(gl.calls().contains(&Call::BufferData {
            floats: 30,
            usage: glow::STATIC_DRAW
        }));
        let buffer = gl
            .calls()
            .iter()
            .find_map(|c| match c {
                Call::CreateBuffer(id) => Some(*id),
                _ => None,
            })
            .unwrap();
        assert_eq!(gl.buffer_data(buffer), Some(QUAD_VERTICES.to_vec()));
        assert_eq!(gl.bound_vertex_array(), None);
    }

    #[test]
    fn draw_issues_six_vertex_triangle_list() {
        let gl = Rc::new(RecordingContext::new());
        let mesh = QuadMesh::upload(gl.clone()).unwrap();
        mesh.draw();

        let draws = gl.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].mode, glow::TRIANGLES);
        assert_eq!(draws[0].count, 6);
        assert_eq!(draws[0].vertex_array, Some(mesh.vertex_array()));
    }

    #[test]
    fn drop_releases_objects_once() {
        let gl = Rc::new(RecordingContext::new());
        drop(QuadMesh::upload(gl.clone()).unwrap());
        assert_eq!(gl.live_vertex_arrays(), 0);
        assert_eq!(gl.live_buffers(), 0);
    }

    #[test]
    fn buffer_failure_releases_vertex_array() {
        let gl = Rc::new(RecordingContext::new());
        gl.fail_buffer_creation("out of memory");
        let err = QuadMesh::upload(gl.clone()).err().unwrap();
        assert_eq!(err, MeshError::Buffer("out of memory".into()));
        assert_eq!(gl.live_vertex_arrays(), 0);
    }
}
