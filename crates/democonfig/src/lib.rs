use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialise configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// The whole demo configuration. Every table and key is optional.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemoConfig {
    pub window: WindowSection,
    pub scene: SceneSection,
    pub shader: ShaderSection,
    pub soundtrack: SoundtrackSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSection {
    pub width: u32,
    pub height: u32,
    pub title: String,
    /// Frame cap; 0 renders as fast as the loop allows.
    pub fps: f32,
    pub vsync: bool,
    pub fullscreen: bool,
    pub antialias: AntialiasSetting,
    pub color_space: ColorSpaceSetting,
    pub exit_on_escape: bool,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            title: "Shader Odyssey".to_string(),
            fps: 60.0,
            vsync: true,
            fullscreen: false,
            antialias: AntialiasSetting::Auto,
            color_space: ColorSpaceSetting::Auto,
            exit_on_escape: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneSection {
    pub background: Background,
    pub depth_test: bool,
    /// Plane `width:height` ratio.
    pub aspect: String,
    pub vertical_align: VerticalAlign,
    pub columns: u32,
    pub rows: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texture: Option<PathBuf>,
}

impl Default for SceneSection {
    fn default() -> Self {
        Self {
            background: Background::Grey(0),
            depth_test: true,
            aspect: "7:3".to_string(),
            vertical_align: VerticalAlign::Top,
            columns: 2,
            rows: 2,
            texture: None,
        }
    }
}

impl SceneSection {
    /// Parses `aspect` into its integer parts.
    pub fn aspect_ratio(&self) -> Result<(u32, u32), String> {
        parse_aspect(&self.aspect)
    }
}

/// Height of a plane spanning `window_width` at `aspect`, rounded down to
/// whole aspect steps: `(window_width / w) * h`.
pub fn plane_height(window_width: u32, aspect: (u32, u32)) -> Result<u32, String> {
    let (aspect_width, aspect_height) = aspect;
    if aspect_width == 0 || aspect_height == 0 {
        return Err(format!("aspect {aspect_width}:{aspect_height} must be positive"));
    }
    let steps = u64::from(window_width / aspect_width);
    if steps == 0 {
        return Err(format!(
            "aspect width {aspect_width} exceeds the window width {window_width}"
        ));
    }
    u32::try_from(steps * u64::from(aspect_height)).map_err(|_| {
        format!("aspect {aspect_width}:{aspect_height} gives a plane height that overflows")
    })
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShaderSection {
    /// Shader basename resolved against the data directory.
    pub name: String,
    pub clock: ClockSource,
}

impl Default for ShaderSection {
    fn default() -> Self {
        Self {
            name: "odyssey".to_string(),
            clock: ClockSource::Wall,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SoundtrackSection {
    pub enabled: bool,
    pub path: PathBuf,
    pub volume: f32,
    pub looped: bool,
    pub autoplay: bool,
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub start_offset: Duration,
}

impl Default for SoundtrackSection {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("soundtrack.mp3"),
            volume: 1.0,
            looped: false,
            autoplay: true,
            start_offset: Duration::ZERO,
        }
    }
}

/// Clear colour as a grey level or explicit channels, all 0-255.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Background {
    Grey(u8),
    Rgb([u8; 3]),
    Rgba([u8; 4]),
}

impl Background {
    pub fn to_rgba8(self) -> [u8; 4] {
        match self {
            Background::Grey(level) => [level, level, level, 255],
            Background::Rgb([r, g, b]) => [r, g, b, 255],
            Background::Rgba(rgba) => rgba,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    /// Plane flush with the top edge of the window.
    #[default]
    Top,
    /// Plane centred vertically in the window.
    Center,
}

impl FromStr for VerticalAlign {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "center" | "centre" | "middle" => Ok(Self::Center),
            other => Err(format!("invalid vertical alignment '{other}'; expected top or center")),
        }
    }
}

/// Where `u_time` comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockSource {
    #[default]
    Wall,
    Soundtrack,
}

impl FromStr for ClockSource {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "wall" | "system" => Ok(Self::Wall),
            "soundtrack" | "audio" => Ok(Self::Soundtrack),
            other => Err(format!("invalid clock '{other}'; expected wall or soundtrack")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpaceSetting {
    #[default]
    Auto,
    Gamma,
    Linear,
}

impl FromStr for ColorSpaceSetting {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" | "default" => Ok(Self::Auto),
            "gamma" | "srgb-off" => Ok(Self::Gamma),
            "linear" | "srgb" => Ok(Self::Linear),
            other => Err(format!(
                "invalid color space '{other}'; expected auto, gamma or linear"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AntialiasSetting {
    #[default]
    Auto,
    Off,
    Samples(u32),
}

impl AntialiasSetting {
    fn as_label(self) -> String {
        match self {
            AntialiasSetting::Auto => "auto".to_string(),
            AntialiasSetting::Off => "off".to_string(),
            AntialiasSetting::Samples(samples) => samples.to_string(),
        }
    }
}

impl FromStr for AntialiasSetting {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "" => Err("anti-alias mode must not be empty".to_string()),
            "auto" | "max" | "default" => Ok(Self::Auto),
            "off" | "none" | "disable" | "disabled" | "0" | "1" => Ok(Self::Off),
            other => {
                let samples: u32 = other.parse().map_err(|_| {
                    format!("invalid anti-alias setting '{other}'; use auto/off or 2/4/8/16")
                })?;
                if !matches!(samples, 2 | 4 | 8 | 16) {
                    return Err(format!(
                        "unsupported sample count {samples}; supported values are 2, 4, 8, or 16"
                    ));
                }
                Ok(Self::Samples(samples))
            }
        }
    }
}

impl<'de> Deserialize<'de> for AntialiasSetting {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Str(String),
            Num(i64),
        }

        match Helper::deserialize(deserializer)? {
            Helper::Str(raw) => raw.parse().map_err(de::Error::custom),
            Helper::Num(value) if value < 0 => {
                Err(de::Error::custom("antialias value must be non-negative"))
            }
            Helper::Num(value) => value.to_string().parse().map_err(de::Error::custom),
        }
    }
}

impl Serialize for AntialiasSetting {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.as_label())
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() || v.is_infinite() {
                return Err(E::custom("duration must be a finite, non-negative number"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if duration.is_zero() {
        return serializer.serialize_str("0s");
    }
    serializer.serialize_str(&humantime::format_duration(*duration).to_string())
}

fn parse_aspect(raw: &str) -> Result<(u32, u32), String> {
    let (width, height) = raw
        .split_once(':')
        .ok_or_else(|| format!("aspect '{raw}' must look like W:H"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<u32>()
            .ok()
            .filter(|value| *value > 0)
            .ok_or_else(|| format!("aspect '{raw}' must use positive integers"))
    };
    Ok((parse(width)?, parse(height)?))
}

/// Command-line values layered on top of the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub size: Option<(u32, u32)>,
    pub fps: Option<f32>,
    pub fullscreen: bool,
    pub antialias: Option<AntialiasSetting>,
    pub color_space: Option<ColorSpaceSetting>,
    pub shader: Option<String>,
    pub clock: Option<ClockSource>,
    pub soundtrack: Option<PathBuf>,
    pub volume: Option<f32>,
    pub mute: bool,
    pub looped: bool,
}

impl DemoConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: DemoConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Applies CLI overrides. Call [`validate`](Self::validate) afterwards.
    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some((width, height)) = overrides.size {
            self.window.width = width;
            self.window.height = height;
        }
        if let Some(fps) = overrides.fps {
            self.window.fps = fps;
        }
        if overrides.fullscreen {
            self.window.fullscreen = true;
        }
        if let Some(antialias) = overrides.antialias {
            self.window.antialias = antialias;
        }
        if let Some(color_space) = overrides.color_space {
            self.window.color_space = color_space;
        }
        if let Some(shader) = &overrides.shader {
            self.shader.name = shader.clone();
        }
        if let Some(clock) = overrides.clock {
            self.shader.clock = clock;
        }
        if let Some(path) = &overrides.soundtrack {
            self.soundtrack.path = path.clone();
            self.soundtrack.enabled = true;
        }
        if let Some(volume) = overrides.volume {
            self.soundtrack.volume = volume;
        }
        if overrides.mute {
            self.soundtrack.enabled = false;
        }
        if overrides.looped {
            self.soundtrack.looped = true;
        }
    }

    /// Every problem with the configuration, in document order.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.window.width == 0 || self.window.height == 0 {
            problems.push(format!(
                "window size must be non-zero (got {}x{})",
                self.window.width, self.window.height
            ));
        }
        if !self.window.fps.is_finite() || self.window.fps < 0.0 {
            problems.push("window.fps must be >= 0".to_string());
        }

        match self.scene.aspect_ratio() {
            Ok(aspect) if self.window.width > 0 => {
                if let Err(err) = plane_height(self.window.width, aspect) {
                    problems.push(format!("scene.{err}"));
                }
            }
            Ok(_) => {}
            Err(err) => problems.push(format!("scene.{err}")),
        }
        if self.scene.columns < 2 {
            problems.push("scene.columns must be at least 2".to_string());
        }
        if self.scene.rows < 2 {
            problems.push("scene.rows must be at least 2".to_string());
        }

        if self.shader.name.trim().is_empty() {
            problems.push("shader.name must not be empty".to_string());
        }

        if !(0.0..=1.0).contains(&self.soundtrack.volume) {
            problems.push(format!(
                "soundtrack.volume must be within [0, 1] (got {})",
                self.soundtrack.volume
            ));
        }
        if self.soundtrack.enabled && self.soundtrack.path.as_os_str().is_empty() {
            problems.push("soundtrack.path must not be empty when enabled".to_string());
        }

        problems
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }
}
