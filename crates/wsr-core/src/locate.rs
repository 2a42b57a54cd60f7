use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::WsrError;
use crate::manifest::{
    has_package_json, is_module_dir, read_package_json, ManifestError, NPM_LOCK, PNPM_WORKSPACE,
    YARN_LOCK,
};

/// Visit `start` and its ancestors (at most `limit` of them, nearest first)
/// until the visitor breaks.
pub fn walk_ancestors<T, E>(
    start: &Path,
    limit: Option<usize>,
    mut visit: impl FnMut(&Path) -> Result<ControlFlow<T>, E>,
) -> Result<Option<T>, E> {
    let limit = limit.unwrap_or(usize::MAX);
    for dir in start.ancestors().take(limit) {
        if let ControlFlow::Break(value) = visit(dir)? {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Nearest ancestor holding a package.json or deno.json(c).
pub fn find_context_module(start: &Path) -> Option<PathBuf> {
    let found: Result<_, std::convert::Infallible> = walk_ancestors(start, None, |dir| {
        if is_module_dir(dir) {
            return Ok(ControlFlow::Break(dir.to_path_buf()));
        }
        Ok(ControlFlow::Continue(()))
    });
    match found {
        Ok(found) => found,
        Err(never) => match never {},
    }
}

pub fn has_workspace_evidence(dir: &Path) -> Result<bool, ManifestError> {
    if !has_package_json(dir) {
        return Ok(false);
    }
    if [YARN_LOCK, NPM_LOCK, PNPM_WORKSPACE]
        .iter()
        .any(|name| dir.join(name).exists())
    {
        return Ok(true);
    }
    let declared = read_package_json(dir)?
        .and_then(|pkg| pkg.workspaces)
        .is_some();
    Ok(declared)
}

/// The nearest ancestor with workspace evidence, else the nearest module
/// directory of either kind. With `exact`, only `start` itself is inspected.
pub fn find_workspace_root(start: &Path, exact: bool) -> Result<Option<PathBuf>, ManifestError> {
    let mut fallback: Option<PathBuf> = None;
    let limit = exact.then_some(1);
    let found = walk_ancestors(start, limit, |dir| {
        if fallback.is_none() && is_module_dir(dir) {
            trace!(dir = %dir.display(), "fallback root candidate");
            fallback = Some(dir.to_path_buf());
        }
        if has_workspace_evidence(dir)? {
            return Ok(ControlFlow::Break(dir.to_path_buf()));
        }
        Ok(ControlFlow::Continue(()))
    })?;
    Ok(found.or(fallback))
}

/// The anchors one invocation resolves against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub root: PathBuf,
    pub context: Option<PathBuf>,
    pub cwd: PathBuf,
}

impl Workspace {
    pub fn locate(cwd: &Path, exact_root: bool) -> Result<Self, WsrError> {
        let cwd = cwd.canonicalize().unwrap_or_else(|_| cwd.to_path_buf());
        let context = find_context_module(&cwd);
        let root = find_workspace_root(&cwd, exact_root)?
            .or_else(|| context.clone())
            .ok_or_else(|| WsrError::NoWorkspace(cwd.clone()))?;
        debug!(root = %root.display(), "workspace root");
        match context.as_deref() {
            Some(context) if context != root => {
                let relative = context.strip_prefix(&root).unwrap_or(context);
                debug!(context = %relative.display(), "context module");
            }
            Some(_) => debug!(context = ".", "context module"),
            None => debug!("no context module"),
        }
        Ok(Self { root, context, cwd })
    }
}
