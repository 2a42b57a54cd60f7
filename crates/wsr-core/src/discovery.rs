use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::{debug, trace};

use crate::error::WsrError;
use crate::manifest::{has_deno_config, read_deno_config, read_package_json, read_pnpm_workspace};
use crate::module::{ModuleIndex, ModuleRecord, ROOT_SHORT_NAME};

const SKIPPED_DIR: &str = "node_modules";

/// Glob patterns declared by pnpm-workspace.yaml, or else by package.json `workspaces`.
pub fn workspace_patterns(root: &Path) -> Result<Vec<String>, WsrError> {
    if let Some(workspace) = read_pnpm_workspace(root)? {
        return Ok(workspace.packages.unwrap_or_default());
    }
    let patterns = read_package_json(root)?
        .and_then(|pkg| pkg.workspaces)
        .map(|workspaces| workspaces.patterns().to_vec())
        .unwrap_or_default();
    Ok(patterns)
}

/// Member directories of the package.json workspace. `!`-prefixed patterns exclude.
pub fn workspace_member_dirs(root: &Path) -> Result<Vec<PathBuf>, WsrError> {
    let patterns = workspace_patterns(root)?;
    let mut excludes = Vec::new();
    for pattern in patterns.iter().filter_map(|p| p.trim().strip_prefix('!')) {
        excludes.push(compile(pattern)?);
    }

    let mut members = BTreeSet::new();
    for pattern in patterns.iter().map(|p| p.trim()) {
        if pattern.is_empty() || pattern.starts_with('!') {
            continue;
        }
        for dir in expand(root, pattern)? {
            if !dir.is_dir() {
                continue;
            }
            let relative = dir.strip_prefix(root).unwrap_or(&dir);
            if excludes
                .iter()
                .any(|exclude| exclude.matches_path_with(relative, match_options()))
            {
                trace!(dir = %dir.display(), "excluded workspace member");
                continue;
            }
            members.insert(dir);
        }
    }
    Ok(members.into_iter().collect())
}

/// Every directory under `root` holding a deno.json(c), at any depth.
/// `node_modules` and dot-directories are not descended into; symlinks are not followed.
pub fn deno_module_dirs(root: &Path) -> Result<Vec<PathBuf>, WsrError> {
    let mut dirs = BTreeSet::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        if has_deno_config(&dir) {
            dirs.insert(dir.clone());
        }
        let entries = fs::read_dir(&dir).map_err(|source| scan_error(&dir, source))?;
        for entry in entries {
            let entry = entry.map_err(|source| scan_error(&dir, source))?;
            let file_type = entry
                .file_type()
                .map_err(|source| scan_error(&entry.path(), source))?;
            if !file_type.is_dir() || is_skipped_dir(&entry.file_name()) {
                continue;
            }
            pending.push(entry.path());
        }
    }
    Ok(dirs.into_iter().collect())
}

fn is_skipped_dir(name: &OsStr) -> bool {
    name == SKIPPED_DIR || name.to_string_lossy().starts_with('.')
}

fn scan_error(path: &Path, source: std::io::Error) -> WsrError {
    WsrError::Scan {
        path: path.to_path_buf(),
        source,
    }
}

/// Build the module index for a workspace root.
pub fn discover_modules(root: &Path) -> Result<ModuleIndex, WsrError> {
    let mut records: Vec<ModuleRecord> = Vec::new();
    let mut seen: BTreeSet<PathBuf> = BTreeSet::new();
    let root_record = read_root_module(root)?;
    if root_record.is_some() {
        seen.insert(root.to_path_buf());
    }

    for dir in workspace_member_dirs(root)? {
        if !seen.insert(dir.clone()) {
            continue;
        }
        records.push(read_module(dir)?);
    }

    for dir in deno_module_dirs(root)? {
        if !seen.insert(dir.clone()) {
            continue;
        }
        records.push(read_module(dir)?);
    }

    records.extend(root_record);

    debug!(root = %root.display(), modules = records.len(), "discovered modules");
    Ok(ModuleIndex::new(records))
}

fn read_module(path: PathBuf) -> Result<ModuleRecord, WsrError> {
    let mut record = ModuleRecord::new(path);
    if let Some(pkg) = read_package_json(&record.path)? {
        record.package_name = pkg.name;
        record.scripts = pkg.scripts;
    }
    if let Some(deno) = read_deno_config(&record.path)? {
        record.deno_tasks = deno.tasks;
    }
    trace!(path = %record.path.display(), kind = ?record.kind(), "module");
    Ok(record)
}

/// The `root` record exists only when the root has a package.json. A root holding
/// nothing but deno.json(c) is discovered as an ordinary module under its own name.
fn read_root_module(root: &Path) -> Result<Option<ModuleRecord>, WsrError> {
    let Some(pkg) = read_package_json(root)? else {
        return Ok(None);
    };
    let mut record = ModuleRecord::new(root.to_path_buf());
    record.short_name = ROOT_SHORT_NAME.to_string();
    record.is_root = true;
    record.package_name = Some(pkg.name.unwrap_or_else(|| ROOT_SHORT_NAME.to_string()));
    record.scripts = pkg.scripts;
    if let Some(deno) = read_deno_config(root)? {
        record.deno_tasks = deno.tasks;
    }
    Ok(Some(record))
}

fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

fn compile(pattern: &str) -> Result<Pattern, WsrError> {
    Pattern::new(pattern.trim_start_matches("./")).map_err(|source| WsrError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn expand(root: &Path, pattern: &str) -> Result<Vec<PathBuf>, WsrError> {
    let pattern = pattern.trim_start_matches("./").trim_end_matches('/');
    if pattern.is_empty() || pattern == "." {
        return Ok(vec![root.to_path_buf()]);
    }
    let query = format!("{}/{}", Pattern::escape(&root.to_string_lossy()), pattern);
    let paths = glob::glob_with(&query, match_options()).map_err(|source| WsrError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;
    let mut matches = Vec::new();
    for entry in paths {
        let path = entry.map_err(|err| {
            let path = err.path().to_path_buf();
            scan_error(&path, err.into_error())
        })?;
        matches.push(path);
    }
    Ok(matches)
}
