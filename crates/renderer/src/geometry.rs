//! Plane meshes and the pixel-space projection used to place them.
//!
//! A plane is described by its size in pixels plus the position of its
//! centre, with the window origin in the top-left corner and y growing
//! downwards.

use std::path::PathBuf;

use bytemuck::{Pod, Zeroable};
use cgmath::{Matrix4, Vector3};

/// Converts OpenGL clip depth (-1..1) into wgpu's 0..1 range.
#[rustfmt::skip]
const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Depth range covered by the pixel projection, in pixels along z.
const DEPTH_EXTENT: f32 = 1000.0;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct PlaneVertex {
    pub position: [f32; 3],
    pub texcoord: [f32; 2],
}

impl PlaneVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PlaneVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Describes a flat rectangle drawn through a shader.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneSpec {
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
    /// Centre of the plane in window pixels (x right, y down, z towards the viewer).
    pub position: [f32; 3],
    /// Vertex count along x (at least 2).
    pub columns: u32,
    /// Vertex count along y (at least 2).
    pub rows: u32,
    /// Optional image bound to the shader as `tex0`.
    pub texture: Option<PathBuf>,
}

impl PlaneSpec {
    /// A 2x2 plane of the given size centred on the origin.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            position: [0.0, 0.0, 0.0],
            columns: 2,
            rows: 2,
            texture: None,
        }
    }

    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = [x, y, z];
        self
    }

    pub fn with_resolution(mut self, columns: u32, rows: u32) -> Self {
        self.columns = columns;
        self.rows = rows;
        self
    }

    pub fn with_texture(mut self, path: impl Into<PathBuf>) -> Self {
        self.texture = Some(path.into());
        self
    }

    /// Translation that moves the locally-centred mesh to `position`.
    pub(crate) fn model_matrix(&self) -> Matrix4<f32> {
        let [x, y, z] = self.position;
        Matrix4::from_translation(Vector3::new(x, y, z))
    }
}

/// CPU-side mesh for a plane, centred on its local origin.
#[derive(Debug, Clone)]
pub(crate) struct PlaneMesh {
    pub vertices: Vec<PlaneVertex>,
    pub indices: Vec<u32>,
}

impl PlaneMesh {
    pub(crate) fn build(spec: &PlaneSpec) -> Self {
        let columns = spec.columns.max(2);
        let rows = spec.rows.max(2);
        let half_w = spec.width * 0.5;
        let half_h = spec.height * 0.5;

        let mut vertices = Vec::with_capacity((columns * rows) as usize);
        for row in 0..rows {
            let v = row as f32 / (rows - 1) as f32;
            for column in 0..columns {
                let u = column as f32 / (columns - 1) as f32;
                vertices.push(PlaneVertex {
                    position: [-half_w + u * spec.width, -half_h + v * spec.height, 0.0],
                    texcoord: [u, v],
                });
            }
        }

        let mut indices = Vec::with_capacity(((columns - 1) * (rows - 1) * 6) as usize);
        for row in 0..rows - 1 {
            for column in 0..columns - 1 {
                let top_left = row * columns + column;
                let top_right = top_left + 1;
                let bottom_left = top_left + columns;
                let bottom_right = bottom_left + 1;
                // y grows downwards in pixel space, so this order is counter-clockwise on screen.
                indices.extend_from_slice(&[
                    top_left,
                    bottom_left,
                    top_right,
                    top_right,
                    bottom_left,
                    bottom_right,
                ]);
            }
        }

        Self { vertices, indices }
    }
}

/// Orthographic projection from window pixels (top-left origin) to wgpu clip space.
pub(crate) fn pixel_projection(width: u32, height: u32) -> Matrix4<f32> {
    let width = width.max(1) as f32;
    let height = height.max(1) as f32;
    OPENGL_TO_WGPU_MATRIX
        * cgmath::ortho(0.0, width, height, 0.0, -DEPTH_EXTENT, DEPTH_EXTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector4;

    fn project(matrix: Matrix4<f32>, x: f32, y: f32, z: f32) -> Vector4<f32> {
        matrix * Vector4::new(x, y, z, 1.0)
    }

    #[test]
    fn default_plane_is_two_triangles() {
        let mesh = PlaneMesh::build(&PlaneSpec::new(1024.0, 438.0));
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 2, 1, 1, 2, 3]);
        assert_eq!(mesh.vertices[0].position, [-512.0, -219.0, 0.0]);
        assert_eq!(mesh.vertices[3].position, [512.0, 219.0, 0.0]);
        assert_eq!(mesh.vertices[0].texcoord, [0.0, 0.0]);
        assert_eq!(mesh.vertices[3].texcoord, [1.0, 1.0]);
    }

    #[test]
    fn degenerate_resolution_is_clamped() {
        let mesh = PlaneMesh::build(&PlaneSpec::new(10.0, 10.0).with_resolution(0, 1));
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 6);
    }

    #[test]
    fn denser_grid_produces_expected_counts() {
        let mesh = PlaneMesh::build(&PlaneSpec::new(100.0, 50.0).with_resolution(4, 3));
        assert_eq!(mesh.vertices.len(), 12);
        assert_eq!(mesh.indices.len(), 3 * 2 * 6);
        assert!(mesh.indices.iter().all(|&index| (index as usize) < mesh.vertices.len()));
    }

    #[test]
    fn projection_maps_window_corners_to_clip_corners() {
        let projection = pixel_projection(800, 600);
        let top_left = project(projection, 0.0, 0.0, 0.0);
        let bottom_right = project(projection, 800.0, 600.0, 0.0);
        assert!((top_left.x + 1.0).abs() < 1e-5);
        assert!((top_left.y - 1.0).abs() < 1e-5);
        assert!((bottom_right.x - 1.0).abs() < 1e-5);
        assert!((bottom_right.y + 1.0).abs() < 1e-5);
        assert!((0.0..=1.0).contains(&top_left.z));
    }

    #[test]
    fn positioned_plane_covers_top_band() {
        let spec = PlaneSpec::new(1024.0, 438.0).with_position(512.0, 219.0, 0.0);
        let transform = pixel_projection(1024, 768) * spec.model_matrix();
        let mesh = PlaneMesh::build(&spec);

        let first = mesh.vertices[0].position;
        let corner = project(transform, first[0], first[1], first[2]);
        assert!((corner.x + 1.0).abs() < 1e-5);
        assert!((corner.y - 1.0).abs() < 1e-5);

        let last = mesh.vertices[3].position;
        let corner = project(transform, last[0], last[1], last[2]);
        let expected_y = 1.0 - 2.0 * 438.0 / 768.0;
        assert!((corner.x - 1.0).abs() < 1e-5);
        assert!((corner.y - expected_y).abs() < 1e-5);
    }

    #[test]
    fn model_matrix_is_pure_translation() {
        let spec = PlaneSpec::new(1.0, 1.0).with_position(3.0, 4.0, 5.0);
        let moved = spec.model_matrix() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_eq!(moved, Vector4::new(3.0, 4.0, 5.0, 1.0));
    }
}
