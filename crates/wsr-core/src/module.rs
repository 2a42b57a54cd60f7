use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::manifest::TaskMap;

pub const ROOT_SHORT_NAME: &str = "root";

/// One directory that defines tasks under either manifest convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    pub path: PathBuf,
    pub short_name: String,
    pub package_name: Option<String>,
    /// `package.json` scripts.
    pub scripts: Option<TaskMap>,
    /// `deno.json(c)` tasks.
    pub deno_tasks: Option<TaskMap>,
    pub is_root: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Package,
    Deno,
    Mixed,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSource {
    Package,
    Deno,
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskDefinition {
    Package(String),
    Deno(String),
    Both { package: String, deno: String },
}

impl TaskDefinition {
    pub fn source(&self) -> TaskSource {
        match self {
            TaskDefinition::Package(_) => TaskSource::Package,
            TaskDefinition::Deno(_) => TaskSource::Deno,
            TaskDefinition::Both { .. } => TaskSource::Both,
        }
    }

    pub fn is_collision(&self) -> bool {
        self.source() == TaskSource::Both
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEntry {
    pub name: String,
    pub definition: TaskDefinition,
}

impl ModuleRecord {
    pub fn new(path: PathBuf) -> Self {
        let short_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            path,
            short_name,
            package_name: None,
            scripts: None,
            deno_tasks: None,
            is_root: false,
        }
    }

    pub fn kind(&self) -> ModuleKind {
        match (self.scripts.is_some(), self.deno_tasks.is_some()) {
            (true, true) => ModuleKind::Mixed,
            (true, false) => ModuleKind::Package,
            (false, true) => ModuleKind::Deno,
            (false, false) => ModuleKind::Empty,
        }
    }

    /// Look up a task in both maps, tagging where it came from.
    pub fn task(&self, name: &str) -> Option<TaskDefinition> {
        let package = self.scripts.as_ref().and_then(|map| map.get(name));
        let deno = self.deno_tasks.as_ref().and_then(|map| map.get(name));
        match (package, deno) {
            (Some(package), Some(deno)) => Some(TaskDefinition::Both {
                package: package.clone(),
                deno: deno.clone(),
            }),
            (Some(package), None) => Some(TaskDefinition::Package(package.clone())),
            (None, Some(deno)) => Some(TaskDefinition::Deno(deno.clone())),
            (None, None) => None,
        }
    }

    pub fn has_task(&self, name: &str) -> bool {
        self.task(name).is_some()
    }

    /// Union of both maps: package scripts in declaration order, then deno-only tasks.
    pub fn tasks(&self) -> Vec<TaskEntry> {
        let mut names: Vec<&String> = Vec::new();
        if let Some(scripts) = &self.scripts {
            names.extend(scripts.keys());
        }
        if let Some(tasks) = &self.deno_tasks {
            let scripts = self.scripts.as_ref();
            names.extend(
                tasks
                    .keys()
                    .filter(|name| !scripts.map(|map| map.contains_key(*name)).unwrap_or(false)),
            );
        }
        names
            .into_iter()
            .filter_map(|name| {
                self.task(name).map(|definition| TaskEntry {
                    name: name.clone(),
                    definition,
                })
            })
            .collect()
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.scripts
            .iter()
            .chain(self.deno_tasks.iter())
            .flat_map(|map| map.keys().map(String::as_str))
    }
}

/// Modules sorted by short name, with short-name collision counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleIndex {
    modules: Vec<ModuleRecord>,
    short_name_counts: HashMap<String, usize>,
}

impl ModuleIndex {
    pub fn new(mut modules: Vec<ModuleRecord>) -> Self {
        modules.sort_by(|a, b| {
            a.short_name
                .cmp(&b.short_name)
                .then_with(|| a.path.cmp(&b.path))
        });
        let mut short_name_counts = HashMap::new();
        for module in &modules {
            *short_name_counts
                .entry(module.short_name.clone())
                .or_insert(0) += 1;
        }
        Self {
            modules,
            short_name_counts,
        }
    }

    pub fn modules(&self) -> &[ModuleRecord] {
        &self.modules
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.modules.iter()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn root(&self) -> Option<&ModuleRecord> {
        self.modules.iter().find(|module| module.is_root)
    }

    pub fn find_by_path(&self, path: &Path) -> Option<&ModuleRecord> {
        self.modules.iter().find(|module| module.path == path)
    }

    pub fn is_unique_short_name(&self, module: &ModuleRecord) -> bool {
        self.short_name_counts
            .get(&module.short_name)
            .copied()
            .unwrap_or(0)
            <= 1
    }
}
