//! GPU orchestration for plane rendering.
//!
//! - `context` owns wgpu instance/device/surface wiring and rebuilds swapchain
//!   state when the window resizes.
//! - `pipeline` turns wrapped GLSL into render pipelines sharing two bind
//!   group layouts (plane uniforms, `tex0`).
//! - `texture` loads plane images and sizes the depth/MSAA targets.
//! - `uniforms` mirrors the injected `PlaneParams` block.
//! - `state` glues everything together and exposes the `GpuState` API used by
//!   `window` and `stage`.

mod context;
mod pipeline;
mod state;
mod texture;
mod uniforms;

pub(crate) use state::GpuState;
