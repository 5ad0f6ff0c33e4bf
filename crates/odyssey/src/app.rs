use std::path::PathBuf;

use anyhow::{Context, Result};
use democonfig::{plane_height, ClockSource, DemoConfig, VerticalAlign};
use renderer::{
    Frame, FrameInfo, PlaneId, PlaneSpec, Rgba, ShaderId, ShaderUniforms, Sketch, Stage,
};
use soundtrack::SoundPlayer;

use crate::paths::AppPaths;

/// Where the plane sits in the window, fixed at setup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneLayout {
    pub width: u32,
    pub height: u32,
    pub center: [f32; 3],
}

/// Spans the window width; the height follows `aspect` in whole steps.
pub fn plane_layout(
    window: (u32, u32),
    aspect: (u32, u32),
    align: VerticalAlign,
) -> Result<PlaneLayout> {
    let (window_width, window_height) = window;
    let width = window_width;
    let height = plane_height(window_width, aspect).map_err(anyhow::Error::msg)?;

    let x = width as f32 / 2.0;
    let mut y = height as f32 / 2.0;
    if align == VerticalAlign::Center {
        y += (window_height as f32 - height as f32) / 2.0;
    }

    Ok(PlaneLayout {
        width,
        height,
        center: [x, y, 0.0],
    })
}

struct Scene {
    plane: PlaneId,
    shader: ShaderId,
    layout: PlaneLayout,
}

/// The demo: one shaded plane and a background soundtrack.
pub struct OdysseySketch {
    config: DemoConfig,
    texture: Option<PathBuf>,
    soundtrack: PathBuf,
    scene: Option<Scene>,
    player: Option<SoundPlayer>,
}

impl OdysseySketch {
    pub fn new(config: DemoConfig, paths: &AppPaths) -> Self {
        let texture = config
            .scene
            .texture
            .as_deref()
            .map(|texture| paths.resolve_data(texture));
        let soundtrack = paths.resolve_data(&config.soundtrack.path);
        Self {
            config,
            texture,
            soundtrack,
            scene: None,
            player: None,
        }
    }

    fn load_soundtrack(&self) -> Option<SoundPlayer> {
        let settings = &self.config.soundtrack;
        if !settings.enabled {
            tracing::info!("soundtrack disabled");
            return None;
        }

        let mut player = match SoundPlayer::load(&self.soundtrack) {
            Ok(player) => player,
            Err(err) => {
                tracing::warn!(
                    path = %self.soundtrack.display(),
                    error = %err,
                    "soundtrack unavailable; continuing without audio"
                );
                return None;
            }
        };
        player.set_volume(settings.volume);
        player.set_looping(settings.looped);
        player.set_start_offset(settings.start_offset);

        if settings.autoplay {
            if let Err(err) = player.play() {
                tracing::warn!(error = %err, "failed to start soundtrack");
            }
        }
        Some(player)
    }

    fn shader_time(&self, frame: &Frame) -> f32 {
        if self.config.shader.clock == ClockSource::Soundtrack {
            if let Some(player) = self.player.as_ref().filter(|player| player.is_playing()) {
                return player.elapsed().as_secs_f32();
            }
        }
        frame.elapsed()
    }
}

impl Sketch for OdysseySketch {
    fn setup(&mut self, stage: &mut Stage<'_>) -> Result<()> {
        let [r, g, b, a] = self.config.scene.background.to_rgba8();
        stage.set_background(Rgba::from_rgba8(r, g, b, a));
        if self.config.scene.depth_test {
            stage.enable_depth_test()?;
        } else {
            stage.disable_depth_test()?;
        }

        let aspect = self
            .config
            .scene
            .aspect_ratio()
            .map_err(anyhow::Error::msg)?;
        let layout = plane_layout(
            (stage.width(), stage.height()),
            aspect,
            self.config.scene.vertical_align,
        )?;
        let [x, y, z] = layout.center;
        let mut spec = PlaneSpec::new(layout.width as f32, layout.height as f32)
            .with_position(x, y, z)
            .with_resolution(self.config.scene.columns, self.config.scene.rows);
        if let Some(texture) = &self.texture {
            spec = spec.with_texture(texture.clone());
        }
        let plane = stage.create_plane(spec)?;

        let shader = stage
            .load_shader(&self.config.shader.name)
            .with_context(|| format!("failed to load shader '{}'", self.config.shader.name))?;

        tracing::info!(
            plane_width = layout.width,
            plane_height = layout.height,
            x,
            y,
            shader = %self.config.shader.name,
            "scene ready"
        );
        self.scene = Some(Scene {
            plane,
            shader,
            layout,
        });

        self.player = self.load_soundtrack();
        Ok(())
    }

    fn update(&mut self, _info: &FrameInfo) -> Result<()> {
        if let Some(player) = &self.player {
            player.update();
        }
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame) -> Result<()> {
        let time = self.shader_time(frame);
        let Some(scene) = &self.scene else {
            return Ok(());
        };
        let uniforms = ShaderUniforms::new(
            time,
            [scene.layout.width as f32, scene.layout.height as f32],
        );
        frame.draw_plane(scene.plane, scene.shader, uniforms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn top_alignment_sits_on_the_top_edge() {
        let layout = plane_layout((1024, 768), (7, 3), VerticalAlign::Top).unwrap();
        assert_eq!(layout.width, 1024);
        assert_eq!(layout.height, 438);
        assert_eq!(layout.center, [512.0, 219.0, 0.0]);
    }

    #[test]
    fn center_alignment_centres_vertically() {
        let layout = plane_layout((1024, 768), (7, 3), VerticalAlign::Center).unwrap();
        assert_eq!(layout.height, 438);
        assert_eq!(layout.center, [512.0, 384.0, 0.0]);
    }

    #[test]
    fn square_aspect_fills_width() {
        let layout = plane_layout((600, 800), (1, 1), VerticalAlign::Top).unwrap();
        assert_eq!((layout.width, layout.height), (600, 600));
        assert_eq!(layout.center, [300.0, 300.0, 0.0]);
    }

    #[test]
    fn oversized_aspect_is_an_error() {
        assert!(plane_layout((1024, 768), (1, 5_000_000), VerticalAlign::Top).is_err());
        assert!(plane_layout((4, 768), (7, 3), VerticalAlign::Top).is_err());
    }

    #[test]
    fn relative_assets_resolve_against_data_dir() {
        let mut config = DemoConfig::default();
        config.scene.texture = Some(PathBuf::from("plane.png"));
        let paths = AppPaths::from_raw(PathBuf::from("/cfg/odyssey.toml"), PathBuf::from("/demo"));

        let sketch = OdysseySketch::new(config, &paths);

        assert_eq!(sketch.texture.as_deref(), Some(Path::new("/demo/plane.png")));
        assert_eq!(sketch.soundtrack, PathBuf::from("/demo/soundtrack.mp3"));
        assert!(sketch.scene.is_none());
        assert!(sketch.player.is_none());
    }
}
