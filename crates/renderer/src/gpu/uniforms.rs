use bytemuck::{Pod, Zeroable};
use cgmath::Matrix4;

use crate::stage::ShaderUniforms;

/// CPU mirror of the `PlaneParams` std140 block declared in `compile.rs`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct PlaneUniforms {
    pub transform: [[f32; 4]; 4],
    pub u_resolution: [f32; 2],
    pub u_time: f32,
    pub padding0: f32,
    pub surface: [f32; 4],
}

impl PlaneUniforms {
    pub(crate) fn new(
        transform: Matrix4<f32>,
        shader: ShaderUniforms,
        surface_width: u32,
        surface_height: u32,
    ) -> Self {
        Self {
            transform: transform.into(),
            u_resolution: shader.resolution,
            u_time: shader.time,
            padding0: 0.0,
            surface: [surface_width as f32, surface_height as f32, 0.0, 0.0],
        }
    }

    pub(crate) const SIZE: u64 = std::mem::size_of::<PlaneUniforms>() as u64;
}
