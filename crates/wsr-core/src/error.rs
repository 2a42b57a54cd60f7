use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::manifest::ManifestError;

#[derive(Debug, Error)]
pub enum WsrError {
    #[error("module not found")]
    NoWorkspace(PathBuf),
    #[error("module or task not found for \"{0}\"")]
    ModuleOrTaskNotFound(String),
    #[error("task not found {0}")]
    TaskNotFound(String),
    #[error("\"{0}\" is duplicated in both deno.json(c) and package.json")]
    TaskCollision(String),
    #[error("Invalid workspace pattern \"{pattern}\": {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("Failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Runner \"{program}\" not found on PATH")]
    RunnerNotFound {
        program: String,
        #[source]
        source: which::Error,
    },
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
