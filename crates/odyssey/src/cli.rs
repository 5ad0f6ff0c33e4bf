use std::path::PathBuf;

use clap::{Parser, Subcommand};
use democonfig::{AntialiasSetting, ClockSource, ColorSpaceSetting, Overrides};

#[derive(Parser, Debug)]
#[command(
    name = "odyssey",
    author,
    version,
    about = "Shader Odyssey: a GLSL plane demo with a soundtrack",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Configuration file (defaults to `odyssey.toml` in the config directory).
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Directory that shaders, soundtracks and textures are resolved against.
    #[arg(long, value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Override the window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<SurfaceSize>,

    /// Frame rate cap (0=uncapped).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    #[arg(long, value_name = "MODE", value_parser = parse_antialias)]
    pub antialias: Option<AntialiasSetting>,

    #[arg(long, value_name = "MODE", value_parser = parse_color_space)]
    pub color_space: Option<ColorSpaceSetting>,

    /// Fragment shader name, loaded as `<data>/<NAME>.frag`.
    #[arg(long, value_name = "NAME")]
    pub shader: Option<String>,

    /// Soundtrack file (enables playback even if disabled in the config).
    #[arg(long, value_name = "FILE")]
    pub soundtrack: Option<PathBuf>,

    /// Soundtrack volume in [0, 1].
    #[arg(long, value_name = "V")]
    pub volume: Option<f32>,

    /// Disable the soundtrack.
    #[arg(long)]
    pub mute: bool,

    /// Loop the soundtrack.
    #[arg(long = "loop")]
    pub looped: bool,

    /// Which clock drives `u_time`.
    #[arg(long, value_name = "wall|soundtrack", value_parser = parse_clock)]
    pub clock: Option<ClockSource>,

    /// Freeze `u_time` at the given number of seconds.
    #[arg(long, value_name = "SECONDS")]
    pub time: Option<f32>,

    /// Open a borderless fullscreen window.
    #[arg(long)]
    pub fullscreen: bool,
}

impl RunArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            size: self.size.map(|size| (size.width, size.height)),
            fps: self.fps,
            fullscreen: self.fullscreen,
            antialias: self.antialias,
            color_space: self.color_space,
            shader: self.shader.clone(),
            clock: self.clock,
            soundtrack: self.soundtrack.clone(),
            volume: self.volume,
            mute: self.mute,
            looped: self.looped,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect the resolved configuration.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the configuration, with overrides applied, as TOML.
    Show,
    /// Print the resolved config file and data directory.
    Where,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<SurfaceSize, String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WxH format, e.g. 1920x1080".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| "invalid width in size specification".to_string())?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| "invalid height in size specification".to_string())?;

    if width == 0 || height == 0 {
        return Err("surface dimensions must be greater than zero".to_string());
    }

    Ok(SurfaceSize { width, height })
}

pub fn parse_antialias(value: &str) -> Result<AntialiasSetting, String> {
    value.parse()
}

pub fn parse_color_space(value: &str) -> Result<ColorSpaceSetting, String> {
    value.parse()
}

pub fn parse_clock(value: &str) -> Result<ClockSource, String> {
    value.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_accepts_either_separator() {
        assert_eq!(
            parse_size("1280x720"),
            Ok(SurfaceSize {
                width: 1280,
                height: 720
            })
        );
        assert_eq!(
            parse_size(" 800 X 600 "),
            Ok(SurfaceSize {
                width: 800,
                height: 600
            })
        );
        assert!(parse_size("1280").is_err());
        assert!(parse_size("0x720").is_err());
        assert!(parse_size("widex720").is_err());
    }

    #[test]
    fn flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "odyssey",
            "--size",
            "640x480",
            "--antialias",
            "4",
            "--clock",
            "soundtrack",
            "--volume",
            "0.5",
            "--loop",
            "--mute",
        ])
        .expect("valid arguments");
        assert!(cli.command.is_none());

        let overrides = cli.run.overrides();
        assert_eq!(overrides.size, Some((640, 480)));
        assert_eq!(overrides.antialias, Some(AntialiasSetting::Samples(4)));
        assert_eq!(overrides.clock, Some(ClockSource::Soundtrack));
        assert_eq!(overrides.volume, Some(0.5));
        assert!(overrides.looped);
        assert!(overrides.mute);
        assert!(!overrides.fullscreen);
    }

    #[test]
    fn bad_antialias_is_rejected() {
        let result = Cli::try_parse_from(["odyssey", "--antialias", "3"]);
        assert!(result.is_err());
    }

    #[test]
    fn config_flag_is_accepted_after_subcommand() {
        let cli = Cli::try_parse_from(["odyssey", "config", "show", "--config", "demo.toml"])
            .expect("valid arguments");
        assert!(matches!(
            cli.command,
            Some(Command::Config(ConfigCommand {
                action: ConfigAction::Show
            }))
        ));
        assert_eq!(cli.run.config, Some(PathBuf::from("demo.toml")));
    }
}
