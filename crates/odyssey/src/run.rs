use anyhow::{Context, Result};
use democonfig::{AntialiasSetting, ColorSpaceSetting, DemoConfig};
use renderer::{Antialiasing, ColorSpaceMode, Renderer, RendererConfig};
use tracing_subscriber::EnvFilter;

use crate::app::OdysseySketch;
use crate::cli::RunArgs;
use crate::paths::AppPaths;

pub fn run(args: RunArgs) -> Result<()> {
    let paths = AppPaths::discover(args.config.as_deref(), args.data_dir.as_deref())?;
    let config = resolve_config(&args, &paths)?;
    let renderer_config = build_renderer_config(&config, &args, &paths);

    tracing::info!(
        config = %paths.config_file().display(),
        data = %paths.data_dir().display(),
        shader = %config.shader.name,
        soundtrack = config.soundtrack.enabled,
        "launching odyssey"
    );

    let sketch = OdysseySketch::new(config, &paths);
    Renderer::new(renderer_config).run(sketch)
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Loads the config file (or defaults when it is absent) and layers the CLI
/// overrides on top.
pub fn resolve_config(args: &RunArgs, paths: &AppPaths) -> Result<DemoConfig> {
    let file = paths.config_file();
    let mut config = if file.is_file() {
        DemoConfig::load(file)
            .with_context(|| format!("failed to load config {}", file.display()))?
    } else if args.config.is_some() {
        anyhow::bail!("config file {} does not exist", file.display());
    } else {
        tracing::debug!(path = %file.display(), "no config file; using defaults");
        DemoConfig::default()
    };

    config.apply(&args.overrides());
    config
        .validate()
        .context("invalid configuration after applying command-line overrides")?;
    Ok(config)
}

pub fn build_renderer_config(
    config: &DemoConfig,
    args: &RunArgs,
    paths: &AppPaths,
) -> RendererConfig {
    let window = &config.window;
    RendererConfig {
        surface_size: (window.width, window.height),
        title: window.title.clone(),
        shader_dir: paths.data_dir().to_path_buf(),
        target_fps: (window.fps > 0.0).then_some(window.fps),
        fps_from_user: args.fps.is_some(),
        vsync: window.vsync,
        fullscreen: window.fullscreen,
        antialiasing: match window.antialias {
            AntialiasSetting::Auto => Antialiasing::Auto,
            AntialiasSetting::Off => Antialiasing::Off,
            AntialiasSetting::Samples(samples) => Antialiasing::Samples(samples),
        },
        color_space: match window.color_space {
            ColorSpaceSetting::Auto => ColorSpaceMode::Auto,
            ColorSpaceSetting::Gamma => ColorSpaceMode::Gamma,
            ColorSpaceSetting::Linear => ColorSpaceMode::Linear,
        },
        exit_on_escape: window.exit_on_escape,
        fixed_time: args.time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use tempfile::TempDir;

    fn paths_in(root: &TempDir) -> AppPaths {
        AppPaths::from_raw(root.path().join("odyssey.toml"), root.path().join("data"))
    }

    #[test]
    fn missing_default_file_falls_back_to_defaults() {
        let root = TempDir::new().unwrap();
        let config = resolve_config(&RunArgs::default(), &paths_in(&root)).unwrap();
        assert_eq!(config, DemoConfig::default());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let root = TempDir::new().unwrap();
        let args = RunArgs {
            config: Some(root.path().join("odyssey.toml")),
            ..RunArgs::default()
        };
        assert!(resolve_config(&args, &paths_in(&root)).is_err());
    }

    #[test]
    fn overrides_apply_on_top_of_file() {
        let root = TempDir::new().unwrap();
        fs::write(
            root.path().join("odyssey.toml"),
            "[window]\nfps = 30\n[shader]\nname = \"tunnel\"\n",
        )
        .unwrap();
        let args = RunArgs {
            shader: Some("plasma".to_string()),
            mute: true,
            ..RunArgs::default()
        };

        let config = resolve_config(&args, &paths_in(&root)).unwrap();

        assert_eq!(config.window.fps, 30.0);
        assert_eq!(config.shader.name, "plasma");
        assert!(!config.soundtrack.enabled);
    }

    #[test]
    fn override_that_breaks_validation_is_reported() {
        let root = TempDir::new().unwrap();
        let args = RunArgs {
            volume: Some(3.0),
            ..RunArgs::default()
        };
        assert!(resolve_config(&args, &paths_in(&root)).is_err());
    }

    #[test]
    fn zero_fps_means_uncapped() {
        let root = TempDir::new().unwrap();
        let mut config = DemoConfig::default();
        config.window.fps = 0.0;
        config.window.antialias = AntialiasSetting::Samples(4);
        let args = RunArgs {
            time: Some(2.5),
            ..RunArgs::default()
        };

        let renderer = build_renderer_config(&config, &args, &paths_in(&root));

        assert_eq!(renderer.target_fps, None);
        assert!(!renderer.fps_from_user);
        assert_eq!(renderer.antialiasing, Antialiasing::Samples(4));
        assert_eq!(renderer.fixed_time, Some(2.5));
        assert_eq!(renderer.shader_dir, root.path().join("data"));
        assert_eq!(renderer.surface_size, (1024, 768));
        assert_eq!(renderer.title, "Shader Odyssey");
    }
}
