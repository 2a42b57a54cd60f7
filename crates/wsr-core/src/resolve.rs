use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::WsrError;
use crate::locate::Workspace;
use crate::module::{ModuleIndex, ModuleRecord};

/// A resolved module plus the task to run. No command means "list tasks".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContext<'a> {
    pub module: &'a ModuleRecord,
    pub command: Option<String>,
}

pub struct Resolver<'a> {
    index: &'a ModuleIndex,
    workspace: &'a Workspace,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a ModuleIndex, workspace: &'a Workspace) -> Self {
        Self { index, workspace }
    }

    pub fn context_module(&self) -> Option<&'a ModuleRecord> {
        self.workspace
            .context
            .as_deref()
            .and_then(|path| self.index.find_by_path(path))
    }

    pub fn root_module(&self) -> Option<&'a ModuleRecord> {
        self.index.root()
    }

    pub fn resolve(&self, expr: &str, cmd: Option<&str>) -> Result<ResolvedContext<'a>, WsrError> {
        if let Some(module) = self.find_module(expr) {
            return Ok(ResolvedContext {
                module,
                command: cmd.map(str::to_string),
            });
        }

        let module = self
            .find_module_with_task(expr)
            .ok_or_else(|| WsrError::ModuleOrTaskNotFound(expr.to_string()))?;
        debug!(
            task = %format!("{}#{}", module.package_name.as_deref().unwrap_or("<root>"), expr),
            "resolved bare task"
        );
        if let Some(ignored) = cmd {
            debug!(ignored, "extra argument after a bare task name is ignored");
        }
        Ok(ResolvedContext {
            module,
            command: Some(expr.to_string()),
        })
    }

    /// First module matching by package name, short name, cwd-relative path, then root-relative path.
    pub fn find_module(&self, expr: &str) -> Option<&'a ModuleRecord> {
        let modules = self.index.modules();
        if let Some(module) = modules
            .iter()
            .find(|module| module.package_name.as_deref() == Some(expr))
        {
            return Some(module);
        }
        if let Some(module) = modules.iter().find(|module| module.short_name == expr) {
            return Some(module);
        }
        if expr.starts_with('.') {
            let target = resolve_path(&self.workspace.cwd, expr);
            if let Some(module) = modules.iter().find(|module| same_path(&module.path, &target)) {
                return Some(module);
            }
        }
        let target = resolve_path(&self.workspace.root, expr);
        modules.iter().find(|module| same_path(&module.path, &target))
    }

    /// Context module first, then the root module.
    pub fn find_module_with_task(&self, task: &str) -> Option<&'a ModuleRecord> {
        self.context_module()
            .filter(|module| module.has_task(task))
            .or_else(|| self.root_module().filter(|module| module.has_task(task)))
    }
}

fn resolve_path(base: &Path, expr: &str) -> PathBuf {
    let joined = base.join(expr);
    joined
        .canonicalize()
        .unwrap_or_else(|_| normalize_lexically(&joined))
}

fn same_path(module_path: &Path, target: &Path) -> bool {
    module_path == target || normalize_lexically(module_path) == target
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}
