//! Real-time plane renderer driven by user sketches.
//!
//! The crate opens a window, compiles GLSL fragment shaders for flat plane
//! meshes, and runs a lifecycle loop around a user [`Sketch`]:
//!
//! ```text
//!   RendererConfig
//!          │
//!          ▼
//!   Renderer::run ──▶ GpuState ──▶ Sketch::setup(&mut Stage)
//!                                        │
//!          ┌─────────── winit event loop ◀┘
//!          │
//!          ├─▶ input events ─▶ InputTracker ─▶ Sketch::key_* / mouse_* / ...
//!          └─▶ redraw ─▶ Sketch::update ─▶ Sketch::draw(&mut Frame) ─▶ GPU pass
//! ```
//!
//! Fragment shaders are written in desktop GLSL with `u_time`,
//! `u_resolution` and an optional `tex0` sampler; `compile` rewrites them so
//! naga can build Vulkan-style pipelines from them.

mod compile;
mod geometry;
mod gpu;
mod runtime;
mod sketch;
mod stage;
mod types;
mod window;

use anyhow::Result;

pub use geometry::PlaneSpec;
pub use runtime::{
    time_source, BoxedTimeSource, FixedTimeSource, FrameScheduler, SystemTimeSource, TimeSample,
    TimeSource,
};
pub use sketch::{dispatch, FrameInfo, InputEvent, Key, KeyInput, MouseButton, Sketch};
pub use stage::{Frame, PlaneId, ShaderId, ShaderUniforms, Stage};
pub use types::{AdapterProfile, Antialiasing, ColorSpaceMode, RendererConfig, Rgba};
pub use window::MessageSender;

/// Entry point that owns the configuration and drives a sketch until exit.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Opens the window, runs `setup`, then loops until the window closes or
    /// the sketch asks to exit. Errors from the sketch end the loop and are
    /// returned here.
    pub fn run<S: Sketch>(&self, sketch: S) -> Result<()> {
        tracing::info!(
            width = self.config.surface_size.0,
            height = self.config.surface_size.1,
            shader_dir = %self.config.shader_dir.display(),
            "starting renderer"
        );
        window::run(&self.config, sketch)
    }
}
