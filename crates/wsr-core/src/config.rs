use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::error::WsrError;
use crate::manifest::{package_manager, DEFAULT_PACKAGE_MANAGER};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsrConfig {
    /// Colorize diagnostics and force color in spawned runners.
    pub color: Option<bool>,
    /// Runner used when the root package.json has no `packageManager` field.
    pub package_manager: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Flag,
    Project,
    Global,
    Default,
}

impl ConfigSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigSource::Flag => "flag",
            ConfigSource::Project => "project",
            ConfigSource::Global => "global",
            ConfigSource::Default => "default",
        }
    }
}

/// Values threaded into dispatch and the error diagnostics for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub color: bool,
    pub package_manager: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            color: true,
            package_manager: DEFAULT_PACKAGE_MANAGER.to_string(),
        }
    }
}

pub const CONFIG_FILENAME: &str = ".wsr.toml";

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILENAME)
}

pub fn resolve_user_home_dir() -> Option<PathBuf> {
    for key in ["HOME", "USERPROFILE"] {
        if let Ok(value) = std::env::var(key) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
    }
    None
}

pub fn resolve_wsr_home_dir() -> Option<PathBuf> {
    if let Ok(value) = std::env::var("WSR_HOME") {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    resolve_user_home_dir().map(|home| home.join(".wsr"))
}

pub fn global_config_path() -> Option<PathBuf> {
    resolve_wsr_home_dir().map(|home| home.join("config.toml"))
}

pub fn load_config(root: &Path) -> Result<Option<WsrConfig>, ConfigError> {
    read_config(&config_path(root))
}

pub fn load_global_config() -> Result<Option<WsrConfig>, ConfigError> {
    match global_config_path() {
        Some(path) => read_config(&path),
        None => Ok(None),
    }
}

fn read_config(path: &Path) -> Result<Option<WsrConfig>, ConfigError> {
    if !path.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(path)?;
    let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(config))
}

pub fn no_color_env() -> bool {
    std::env::var_os("NO_COLOR")
        .map(|value| !value.is_empty())
        .unwrap_or(false)
}

pub fn resolve_color_with_source(
    root: &Path,
    no_color_flag: bool,
) -> Result<(bool, ConfigSource), ConfigError> {
    if no_color_flag || no_color_env() {
        return Ok((false, ConfigSource::Flag));
    }
    if let Some(value) = load_config(root)?.and_then(|config| config.color) {
        return Ok((value, ConfigSource::Project));
    }
    if let Some(value) = load_global_config()?.and_then(|config| config.color) {
        return Ok((value, ConfigSource::Global));
    }
    Ok((true, ConfigSource::Default))
}

pub fn resolve_package_manager_fallback_with_source(
    root: &Path,
) -> Result<(String, ConfigSource), ConfigError> {
    let pick = |config: Option<WsrConfig>| {
        config
            .and_then(|config| config.package_manager)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };
    if let Some(value) = pick(load_config(root)?) {
        return Ok((value, ConfigSource::Project));
    }
    if let Some(value) = pick(load_global_config()?) {
        return Ok((value, ConfigSource::Global));
    }
    Ok((DEFAULT_PACKAGE_MANAGER.to_string(), ConfigSource::Default))
}

/// Color and runner choice for one invocation. The root package.json
/// `packageManager` field wins over any configured fallback.
pub fn resolve_run_options(root: &Path, no_color_flag: bool) -> Result<RunOptions, WsrError> {
    let (color, color_source) = resolve_color_with_source(root, no_color_flag)?;
    let (fallback, fallback_source) = resolve_package_manager_fallback_with_source(root)?;
    let package_manager = package_manager(root, &fallback)?;
    debug!(
        client = %package_manager,
        fallback_source = fallback_source.as_str(),
        color,
        color_source = color_source.as_str(),
        "run options"
    );
    Ok(RunOptions {
        color,
        package_manager,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use tempfile::TempDir;

    fn with_env_lock<T>(f: impl FnOnce() -> T) -> T {
        let _guard = crate::test_env::lock();
        f()
    }

    struct EnvGuard {
        wsr_home: Option<OsString>,
        no_color: Option<OsString>,
    }

    impl EnvGuard {
        fn capture() -> Self {
            Self {
                wsr_home: std::env::var_os("WSR_HOME"),
                no_color: std::env::var_os("NO_COLOR"),
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = self.wsr_home.as_ref() {
                std::env::set_var("WSR_HOME", value);
            } else {
                std::env::remove_var("WSR_HOME");
            }

            if let Some(value) = self.no_color.as_ref() {
                std::env::set_var("NO_COLOR", value);
            } else {
                std::env::remove_var("NO_COLOR");
            }
        }
    }

    #[test]
    fn load_config_reads_project_file() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(
            config_path(temp.path()),
            "color = false\npackage_manager = \"yarn\"\n",
        )
        .expect("config");
        let loaded = load_config(temp.path()).expect("load").expect("present");
        assert_eq!(loaded.color, Some(false));
        assert_eq!(loaded.package_manager.as_deref(), Some("yarn"));
    }

    #[test]
    fn invalid_config_reports_path() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(config_path(temp.path()), "color = [").expect("config");
        let err = load_config(temp.path()).expect_err("parse error");
        assert!(err.to_string().contains(CONFIG_FILENAME));
    }

    #[test]
    fn resolve_color_prefers_flag_then_project_then_global_then_default() {
        with_env_lock(|| {
            let _env = EnvGuard::capture();
            let root = TempDir::new().expect("root tempdir");
            let home = TempDir::new().expect("home tempdir");
            std::env::set_var("WSR_HOME", home.path());
            std::env::remove_var("NO_COLOR");

            let (value, source) = resolve_color_with_source(root.path(), false).expect("color");
            assert!(value);
            assert_eq!(source, ConfigSource::Default);

            fs::write(home.path().join("config.toml"), "color = false\n").expect("global");
            let (value, source) = resolve_color_with_source(root.path(), false).expect("color");
            assert!(!value);
            assert_eq!(source, ConfigSource::Global);

            fs::write(config_path(root.path()), "color = true\n").expect("project");
            let (value, source) = resolve_color_with_source(root.path(), false).expect("color");
            assert!(value);
            assert_eq!(source, ConfigSource::Project);

            let (value, source) = resolve_color_with_source(root.path(), true).expect("color");
            assert!(!value);
            assert_eq!(source, ConfigSource::Flag);

            std::env::set_var("NO_COLOR", "1");
            let (value, _) = resolve_color_with_source(root.path(), false).expect("color");
            assert!(!value);
        });
    }

    #[test]
    fn run_options_prefer_manifest_package_manager() {
        with_env_lock(|| {
            let _env = EnvGuard::capture();
            let root = TempDir::new().expect("root tempdir");
            let home = TempDir::new().expect("home tempdir");
            std::env::set_var("WSR_HOME", home.path());
            std::env::remove_var("NO_COLOR");
            fs::write(config_path(root.path()), "package_manager = \"yarn\"\n").expect("project");

            let options = resolve_run_options(root.path(), true).expect("options");
            assert_eq!(options.package_manager, "yarn");
            assert!(!options.color);

            fs::write(
                root.path().join("package.json"),
                r#"{"packageManager":"pnpm@9.1.0"}"#,
            )
            .expect("manifest");
            let options = resolve_run_options(root.path(), false).expect("options");
            assert_eq!(options.package_manager, "pnpm");
            assert!(options.color);
        });
    }

    #[test]
    fn package_manager_fallback_prefers_project_over_global() {
        with_env_lock(|| {
            let _env = EnvGuard::capture();
            let root = TempDir::new().expect("root tempdir");
            let home = TempDir::new().expect("home tempdir");
            std::env::set_var("WSR_HOME", home.path());

            let (value, source) =
                resolve_package_manager_fallback_with_source(root.path()).expect("pm");
            assert_eq!(value, "npm");
            assert_eq!(source.as_str(), "default");

            fs::write(home.path().join("config.toml"), "package_manager = \"yarn\"\n")
                .expect("global");
            let (value, source) =
                resolve_package_manager_fallback_with_source(root.path()).expect("pm");
            assert_eq!(value, "yarn");
            assert_eq!(source, ConfigSource::Global);

            fs::write(config_path(root.path()), "package_manager = \"bun\"\n").expect("project");
            let (value, source) =
                resolve_package_manager_fallback_with_source(root.path()).expect("pm");
            assert_eq!(value, "bun");
            assert_eq!(source, ConfigSource::Project);
        });
    }
}
