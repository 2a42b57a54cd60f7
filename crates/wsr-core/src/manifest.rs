use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

pub const PACKAGE_JSON: &str = "package.json";
pub const DENO_JSON: &str = "deno.json";
pub const DENO_JSONC: &str = "deno.jsonc";
pub const PNPM_WORKSPACE: &str = "pnpm-workspace.yaml";
pub const YARN_LOCK: &str = "yarn.lock";
pub const NPM_LOCK: &str = "package-lock.json";

pub const DEFAULT_PACKAGE_MANAGER: &str = "npm";

pub type TaskMap = IndexMap<String, String>;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Jsonc {
        path: PathBuf,
        #[source]
        source: json5::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageJson {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub scripts: Option<TaskMap>,
    /// `name@version`, e.g. `pnpm@8.6.0`
    #[serde(default)]
    pub package_manager: Option<String>,
    #[serde(default)]
    pub workspaces: Option<Workspaces>,
}

/// npm/yarn accept a bare list, yarn classic also accepts `{ packages: [...] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Workspaces {
    Globs(Vec<String>),
    Config {
        #[serde(default)]
        packages: Option<Vec<String>>,
    },
}

impl Workspaces {
    pub fn patterns(&self) -> &[String] {
        match self {
            Workspaces::Globs(globs) => globs,
            Workspaces::Config { packages } => packages.as_deref().unwrap_or(&[]),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PnpmWorkspace {
    #[serde(default)]
    pub packages: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum DenoTaskValue {
    Command(String),
    Detailed {
        command: String,
        #[allow(dead_code)]
        #[serde(default)]
        description: Option<String>,
    },
}

impl DenoTaskValue {
    fn into_command(self) -> String {
        match self {
            DenoTaskValue::Command(command) => command,
            DenoTaskValue::Detailed { command, .. } => command,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawDenoConfig {
    #[serde(default)]
    tasks: Option<IndexMap<String, DenoTaskValue>>,
}

#[derive(Debug, Clone, Default)]
pub struct DenoConfig {
    pub tasks: Option<TaskMap>,
}

impl From<RawDenoConfig> for DenoConfig {
    fn from(raw: RawDenoConfig) -> Self {
        let tasks = raw.tasks.map(|tasks| {
            tasks
                .into_iter()
                .map(|(name, value)| (name, value.into_command()))
                .collect()
        });
        DenoConfig { tasks }
    }
}

pub fn has_package_json(dir: &Path) -> bool {
    dir.join(PACKAGE_JSON).is_file()
}

pub fn deno_config_path(dir: &Path) -> Option<PathBuf> {
    [DENO_JSON, DENO_JSONC]
        .into_iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

pub fn has_deno_config(dir: &Path) -> bool {
    deno_config_path(dir).is_some()
}

/// A directory governed by either manifest convention.
pub fn is_module_dir(dir: &Path) -> bool {
    has_package_json(dir) || has_deno_config(dir)
}

pub fn read_package_json(dir: &Path) -> Result<Option<PackageJson>, ManifestError> {
    let path = dir.join(PACKAGE_JSON);
    if !path.is_file() {
        return Ok(None);
    }
    let text = read_text(&path)?;
    let pkg = serde_json::from_str(&text).map_err(|source| ManifestError::Json { path, source })?;
    Ok(Some(pkg))
}

pub fn read_deno_config(dir: &Path) -> Result<Option<DenoConfig>, ManifestError> {
    let Some(path) = deno_config_path(dir) else {
        return Ok(None);
    };
    let text = read_text(&path)?;
    let is_jsonc = path
        .extension()
        .map(|ext| ext == "jsonc")
        .unwrap_or(false);
    let raw: RawDenoConfig = if is_jsonc {
        json5::from_str(&text).map_err(|source| ManifestError::Jsonc { path, source })?
    } else {
        serde_json::from_str(&text).map_err(|source| ManifestError::Json { path, source })?
    };
    Ok(Some(raw.into()))
}

pub fn read_pnpm_workspace(dir: &Path) -> Result<Option<PnpmWorkspace>, ManifestError> {
    let path = dir.join(PNPM_WORKSPACE);
    if !path.is_file() {
        return Ok(None);
    }
    let text = read_text(&path)?;
    if text.trim().is_empty() {
        return Ok(Some(PnpmWorkspace::default()));
    }
    let workspace =
        serde_yaml::from_str(&text).map_err(|source| ManifestError::Yaml { path, source })?;
    Ok(Some(workspace))
}

/// Package manager named by the root manifest, without its version suffix.
pub fn package_manager(root: &Path, fallback: &str) -> Result<String, ManifestError> {
    let declared = read_package_json(root)?
        .and_then(|pkg| pkg.package_manager)
        .and_then(|value| {
            value
                .split('@')
                .next()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
        });
    Ok(declared.unwrap_or_else(|| fallback.to_string()))
}

fn read_text(path: &Path) -> Result<String, ManifestError> {
    fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })
}
