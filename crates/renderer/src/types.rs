use std::path::PathBuf;

/// Output color handling for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpaceMode {
    /// Match classic OpenGL framebuffers (gamma-encoded swapchain).
    #[default]
    Auto,
    /// Treat shader outputs/textures as gamma-encoded; use non-sRGB surfaces.
    Gamma,
    /// Treat shader outputs as linear and use sRGB swapchains/textures for conversion.
    Linear,
}

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    #[default]
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

/// RGBA clear color, each component in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque grey from an 8-bit level, like `ofBackground(level)`.
    pub fn grey(level: u8) -> Self {
        let value = f32::from(level) / 255.0;
        Self::new(value, value, value, 1.0)
    }

    /// Builds a color from 8-bit channels.
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            f32::from(a) / 255.0,
        )
    }

    pub(crate) fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: f64::from(self.r),
            g: f64::from(self.g),
            b: f64::from(self.b),
            a: f64::from(self.a),
        }
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Summary of the adapter the device was created on.
#[derive(Debug, Clone)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    pub max_texture_dimension: u32,
}

impl AdapterProfile {
    pub(crate) fn from_wgpu(info: &wgpu::AdapterInfo, limits: &wgpu::Limits) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
            max_texture_dimension: limits.max_texture_dimension_2d,
        }
    }

    /// True for CPU rasterizers such as llvmpipe or WARP.
    pub fn is_software(&self) -> bool {
        if matches!(self.device_type, wgpu::DeviceType::Cpu) {
            return true;
        }
        let name = self.name.to_ascii_lowercase();
        ["llvmpipe", "softpipe", "swiftshader", "lavapipe", "microsoft basic render"]
            .iter()
            .any(|needle| name.contains(needle))
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// `RendererConfig` mirrors the `[window]` table plus the CLI flags and tells
/// the runner how to open the window and where shaders live.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Window title.
    pub title: String,
    /// Directory that `Stage::load_shader` resolves shader names against.
    pub shader_dir: PathBuf,
    /// Optional FPS cap; None = render on every loop iteration.
    pub target_fps: Option<f32>,
    /// The cap was chosen by the user, so software adapters keep it.
    pub fps_from_user: bool,
    /// Present with vertical sync.
    pub vsync: bool,
    /// Open borderless fullscreen on the current monitor.
    pub fullscreen: bool,
    /// Anti-aliasing mode requested by the caller.
    pub antialiasing: Antialiasing,
    /// Desired color handling for swapchain/textures.
    pub color_space: ColorSpaceMode,
    /// Quit when Escape is pressed.
    pub exit_on_escape: bool,
    /// Freeze the clock at this many seconds instead of following wall time.
    pub fixed_time: Option<f32>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: (1024, 768),
            title: "renderer".to_string(),
            shader_dir: PathBuf::from("data"),
            target_fps: Some(60.0),
            fps_from_user: false,
            vsync: true,
            fullscreen: false,
            antialiasing: Antialiasing::default(),
            color_space: ColorSpaceMode::default(),
            exit_on_escape: true,
            fixed_time: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grey_level_maps_to_unit_range() {
        assert_eq!(Rgba::grey(0), Rgba::BLACK);
        let white = Rgba::grey(255);
        assert!((white.r - 1.0).abs() < f32::EPSILON);
        assert!((white.a - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn software_adapters_are_detected_by_name() {
        let profile = AdapterProfile {
            name: "llvmpipe (LLVM 17.0.6, 256 bits)".to_string(),
            backend: wgpu::Backend::Vulkan,
            device_type: wgpu::DeviceType::Other,
            max_texture_dimension: 8192,
        };
        assert!(profile.is_software());

        let hardware = AdapterProfile {
            name: "AMD Radeon RX 7800 XT".to_string(),
            device_type: wgpu::DeviceType::DiscreteGpu,
            ..profile
        };
        assert!(!hardware.is_software());
    }
}
