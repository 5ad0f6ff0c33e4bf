use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::geometry::PlaneSpec;
use crate::gpu::GpuState;
use crate::runtime::TimeSample;
use crate::sketch::FrameInfo;
use crate::types::{AdapterProfile, Rgba};
use crate::window::MessageSender;

/// Handle to a shader pipeline created by [`Stage::load_shader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(pub(crate) usize);

/// Handle to a plane mesh created by [`Stage::create_plane`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaneId(pub(crate) usize);

/// Values exposed to a fragment shader as `u_time` and `u_resolution`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShaderUniforms {
    pub time: f32,
    pub resolution: [f32; 2],
}

impl ShaderUniforms {
    pub fn new(time: f32, resolution: [f32; 2]) -> Self {
        Self { time, resolution }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DrawCommand {
    pub plane: PlaneId,
    pub shader: ShaderId,
    pub uniforms: ShaderUniforms,
}

/// Setup-time access to the engine: background, depth testing, shaders and planes.
pub struct Stage<'a> {
    gpu: &'a mut GpuState,
    shader_dir: &'a Path,
    messages: MessageSender,
    exit_requested: bool,
}

impl<'a> Stage<'a> {
    pub(crate) fn new(gpu: &'a mut GpuState, shader_dir: &'a Path, messages: MessageSender) -> Self {
        Self {
            gpu,
            shader_dir,
            messages,
            exit_requested: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.gpu.size().width
    }

    pub fn height(&self) -> u32 {
        self.gpu.size().height
    }

    pub fn adapter_profile(&self) -> &AdapterProfile {
        self.gpu.adapter_profile()
    }

    /// Colour every frame is cleared to before planes are drawn.
    pub fn set_background(&mut self, color: Rgba) {
        self.gpu.set_background(color);
    }

    pub fn enable_depth_test(&mut self) -> Result<()> {
        self.gpu.set_depth_test(true)
    }

    pub fn disable_depth_test(&mut self) -> Result<()> {
        self.gpu.set_depth_test(false)
    }

    /// Loads `<shader_dir>/<name>.frag` and builds a pipeline for it.
    pub fn load_shader(&mut self, name: &str) -> Result<ShaderId> {
        let paths = resolve_shader_paths(self.shader_dir, name)?;
        if let Some(vertex) = &paths.ignored_vertex {
            tracing::warn!(
                shader = name,
                path = %vertex.display(),
                "custom vertex shaders are not supported; using the built-in plane vertex stage"
            );
        }
        let id = self.gpu.load_shader(&paths.fragment)?;
        tracing::info!(shader = name, path = %paths.fragment.display(), "loaded shader");
        Ok(id)
    }

    pub fn create_plane(&mut self, spec: PlaneSpec) -> Result<PlaneId> {
        self.gpu.create_plane(spec)
    }

    /// A cloneable handle that delivers strings to `Sketch::got_message`.
    pub fn message_sender(&self) -> MessageSender {
        self.messages.clone()
    }

    /// Ends the run once setup returns.
    pub fn exit(&mut self) {
        self.exit_requested = true;
    }

    pub(crate) fn exit_requested(&self) -> bool {
        self.exit_requested
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ShaderPaths {
    pub fragment: PathBuf,
    pub ignored_vertex: Option<PathBuf>,
}

pub(crate) fn resolve_shader_paths(shader_dir: &Path, name: &str) -> Result<ShaderPaths> {
    if name.trim().is_empty() {
        bail!("shader name is empty");
    }
    let base = shader_dir.join(name);
    let base = match base.extension().and_then(|ext| ext.to_str()) {
        Some("frag") | Some("vert") => base.with_extension(""),
        _ => base,
    };
    let with_suffix = |suffix: &str| {
        let mut path = base.clone().into_os_string();
        path.push(suffix);
        PathBuf::from(path)
    };
    let fragment = with_suffix(".frag");
    if !fragment.is_file() {
        bail!("fragment shader {} does not exist", fragment.display());
    }
    let vertex = with_suffix(".vert");
    Ok(ShaderPaths {
        fragment,
        ignored_vertex: vertex.is_file().then_some(vertex),
    })
}

/// Draw-time view of the current frame. Draws are queued and encoded in order.
pub struct Frame {
    info: FrameInfo,
    shader_count: usize,
    plane_count: usize,
    commands: Vec<DrawCommand>,
    exit_requested: bool,
}

impl Frame {
    pub(crate) fn new(info: FrameInfo, shader_count: usize, plane_count: usize) -> Self {
        Self {
            info,
            shader_count,
            plane_count,
            commands: Vec::new(),
            exit_requested: false,
        }
    }

    pub fn info(&self) -> &FrameInfo {
        &self.info
    }

    /// Seconds since the runner started.
    pub fn elapsed(&self) -> f32 {
        self.info.time.seconds
    }

    pub fn frame_index(&self) -> u64 {
        self.info.time.frame_index
    }

    pub fn time(&self) -> TimeSample {
        self.info.time
    }

    pub fn width(&self) -> u32 {
        self.info.width
    }

    pub fn height(&self) -> u32 {
        self.info.height
    }

    pub fn draw_plane(
        &mut self,
        plane: PlaneId,
        shader: ShaderId,
        uniforms: ShaderUniforms,
    ) -> Result<()> {
        if plane.0 >= self.plane_count {
            bail!("unknown plane id {}", plane.0);
        }
        if shader.0 >= self.shader_count {
            bail!("unknown shader id {}", shader.0);
        }
        self.commands.push(DrawCommand {
            plane,
            shader,
            uniforms,
        });
        Ok(())
    }

    pub fn exit(&mut self) {
        self.exit_requested = true;
    }

    pub(crate) fn into_parts(self) -> (Vec<DrawCommand>, bool) {
        (self.commands, self.exit_requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        Frame::new(
            FrameInfo {
                time: TimeSample::new(1.5, 90),
                width: 1024,
                height: 768,
            },
            1,
            1,
        )
    }

    #[test]
    fn frame_exposes_time_and_size() {
        let frame = frame();
        assert_eq!(frame.elapsed(), 1.5);
        assert_eq!(frame.frame_index(), 90);
        assert_eq!((frame.width(), frame.height()), (1024, 768));
    }

    #[test]
    fn draws_are_queued_in_order() {
        let mut frame = frame();
        frame
            .draw_plane(PlaneId(0), ShaderId(0), ShaderUniforms::new(1.0, [1.0, 1.0]))
            .expect("first draw");
        frame
            .draw_plane(PlaneId(0), ShaderId(0), ShaderUniforms::new(2.0, [1.0, 1.0]))
            .expect("second draw");
        let (commands, exit) = frame.into_parts();
        assert!(!exit);
        let times: Vec<f32> = commands.iter().map(|cmd| cmd.uniforms.time).collect();
        assert_eq!(times, vec![1.0, 2.0]);
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let mut frame = frame();
        let err = frame
            .draw_plane(PlaneId(3), ShaderId(0), ShaderUniforms::default())
            .expect_err("plane 3 does not exist");
        assert!(err.to_string().contains("unknown plane id 3"));
        assert!(frame
            .draw_plane(PlaneId(0), ShaderId(1), ShaderUniforms::default())
            .is_err());
        assert!(frame.into_parts().0.is_empty());
    }

    #[test]
    fn exit_is_reported() {
        let mut frame = frame();
        frame.exit();
        assert!(frame.into_parts().1);
    }

    #[test]
    fn shader_name_resolves_to_frag_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("odyssey.frag"), "void main() {}").expect("write frag");

        let paths = resolve_shader_paths(dir.path(), "odyssey").expect("resolve");
        assert_eq!(paths.fragment, dir.path().join("odyssey.frag"));
        assert_eq!(paths.ignored_vertex, None);

        let explicit = resolve_shader_paths(dir.path(), "odyssey.frag").expect("resolve");
        assert_eq!(explicit.fragment, paths.fragment);
    }

    #[test]
    fn sibling_vertex_shader_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("odyssey.frag"), "void main() {}").expect("write frag");
        std::fs::write(dir.path().join("odyssey.vert"), "void main() {}").expect("write vert");

        let paths = resolve_shader_paths(dir.path(), "odyssey").expect("resolve");
        assert_eq!(paths.ignored_vertex, Some(dir.path().join("odyssey.vert")));
    }

    #[test]
    fn missing_shader_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = resolve_shader_paths(dir.path(), "missing").expect_err("no file");
        assert!(err.to_string().contains("missing.frag"));
        assert!(resolve_shader_paths(dir.path(), "  ").is_err());
    }
}
