use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG_DIR: &str = "ODYSSEY_CONFIG_DIR";
pub const ENV_DATA_DIR: &str = "ODYSSEY_DATA_DIR";

pub const CONFIG_FILE_NAME: &str = "odyssey.toml";
const DEFAULT_DATA_DIR: &str = "data";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "ShaderOdyssey";
const APPLICATION: &str = "Odyssey";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_file: PathBuf,
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl AppPaths {
    /// Resolves paths from explicit flags, then environment overrides, then
    /// platform defaults.
    pub fn discover(config_file: Option<&Path>, data_dir: Option<&Path>) -> Result<Self> {
        let (config_file, config_dir) = match config_file {
            Some(file) => {
                let dir = file
                    .parent()
                    .filter(|parent| !parent.as_os_str().is_empty())
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                (file.to_path_buf(), dir)
            }
            None => {
                let dir = resolve_config_dir().context("failed to resolve odyssey config directory")?;
                (dir.join(CONFIG_FILE_NAME), dir)
            }
        };

        let data_dir = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => env_override(ENV_DATA_DIR).unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        };

        Ok(Self {
            config_file,
            config_dir,
            data_dir,
        })
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Joins relative paths onto the data directory; absolute paths pass through.
    pub fn resolve_data(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }
}

#[cfg(test)]
impl AppPaths {
    pub fn from_raw(config_file: PathBuf, data_dir: PathBuf) -> Self {
        let config_dir = config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            config_file,
            config_dir,
            data_dir,
        }
    }
}

fn resolve_config_dir() -> Result<PathBuf> {
    if let Some(value) = env_override(ENV_CONFIG_DIR) {
        return Ok(value);
    }
    let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
        .ok_or_else(|| anyhow!("failed to determine user directories"))?;
    Ok(project_dirs.config_dir().to_path_buf())
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.as_os_str().is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::sync::{Mutex, OnceLock};
    use tempfile::TempDir;

    fn env_lock() -> &'static Mutex<()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    struct EnvGuard {
        key: &'static str,
        previous: Option<OsString>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &Path) -> Self {
            let previous = env::var_os(key);
            env::set_var(key, value);
            Self { key, previous }
        }

        fn clear(key: &'static str) -> Self {
            let previous = env::var_os(key);
            env::remove_var(key);
            Self { key, previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = self.previous.take() {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    #[test]
    fn env_overrides_take_precedence() {
        let _guard = env_lock().lock().unwrap();
        let root = TempDir::new().unwrap();
        let config_dir = root.path().join("config");
        let data_dir = root.path().join("data");

        let _config_guard = EnvGuard::set(ENV_CONFIG_DIR, &config_dir);
        let _data_guard = EnvGuard::set(ENV_DATA_DIR, &data_dir);

        let paths = AppPaths::discover(None, None).unwrap();

        assert_eq!(paths.config_dir(), config_dir.as_path());
        assert_eq!(paths.config_file(), config_dir.join(CONFIG_FILE_NAME));
        assert_eq!(paths.data_dir(), data_dir.as_path());
    }

    #[test]
    fn flags_beat_environment() {
        let _guard = env_lock().lock().unwrap();
        let root = TempDir::new().unwrap();
        let _config_guard = EnvGuard::set(ENV_CONFIG_DIR, &root.path().join("env-config"));
        let _data_guard = EnvGuard::set(ENV_DATA_DIR, &root.path().join("env-data"));

        let file = root.path().join("custom/demo.toml");
        let data = root.path().join("assets");
        let paths = AppPaths::discover(Some(&file), Some(&data)).unwrap();

        assert_eq!(paths.config_file(), file.as_path());
        assert_eq!(paths.config_dir(), root.path().join("custom"));
        assert_eq!(paths.data_dir(), data.as_path());
    }

    #[test]
    fn data_dir_defaults_to_local_data() {
        let _guard = env_lock().lock().unwrap();
        let _data_guard = EnvGuard::clear(ENV_DATA_DIR);

        let paths = AppPaths::discover(Some(Path::new("odyssey.toml")), None).unwrap();

        assert_eq!(paths.data_dir(), Path::new("data"));
    }

    #[test]
    fn relative_data_paths_join_data_dir() {
        let paths = AppPaths::from_raw(PathBuf::from("/etc/odyssey.toml"), PathBuf::from("/srv/demo"));
        assert_eq!(
            paths.resolve_data(Path::new("soundtrack.mp3")),
            PathBuf::from("/srv/demo/soundtrack.mp3")
        );
        assert_eq!(
            paths.resolve_data(Path::new("/music/song.mp3")),
            PathBuf::from("/music/song.mp3")
        );
    }
}
