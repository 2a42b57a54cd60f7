use std::fmt::Write;
use std::path::Path;

use crate::manifest::TaskMap;
use crate::module::{ModuleIndex, ModuleKind, ModuleRecord};

const MIXED: &str = "[Mixed] ";
const PACKAGE: &str = "📦 ";
const DENO: &str = "🦕 ";
const COLLISION: &str = "🔥 ";

/// Task inventory for one module, names padded to the module's longest task name.
pub fn render_module(index: &ModuleIndex, root: &Path, module: &ModuleRecord) -> String {
    let width = task_name_width(std::iter::once(module));
    let mut out = String::new();
    write_module(&mut out, index, root, module, width);
    out
}

/// Task inventory for every module in index order, names padded across the index.
pub fn render_index(index: &ModuleIndex, root: &Path) -> String {
    let width = task_name_width(index.iter());
    let mut out = String::new();
    for module in index.iter() {
        write_module(&mut out, index, root, module, width);
    }
    out
}

pub fn module_label(index: &ModuleIndex, root: &Path, module: &ModuleRecord) -> String {
    let relative = relative_path(root, &module.path);
    if !index.is_unique_short_name(module) {
        return relative;
    }
    let name = match module.package_name.as_deref() {
        Some(package) if package != module.short_name => {
            format!("{} [{}]", module.short_name, package)
        }
        _ => module.short_name.clone(),
    };
    format!("{name} <root>/{relative}")
}

fn write_module(
    out: &mut String,
    index: &ModuleIndex,
    root: &Path,
    module: &ModuleRecord,
    width: usize,
) {
    let prefix = match module.kind() {
        ModuleKind::Mixed => MIXED,
        ModuleKind::Package => PACKAGE,
        ModuleKind::Deno => DENO,
        ModuleKind::Empty => "",
    };
    let _ = writeln!(out, "{prefix}{}", module_label(index, root, module));

    let mixed = module.kind() == ModuleKind::Mixed;
    write_tasks(out, module, module.scripts.as_ref(), mixed, PACKAGE, width);
    write_tasks(out, module, module.deno_tasks.as_ref(), mixed, DENO, width);
}

/// package.json entries are written before deno.json(c) entries, so a collided
/// name shows up once in each group.
fn write_tasks(
    out: &mut String,
    module: &ModuleRecord,
    tasks: Option<&TaskMap>,
    mixed: bool,
    source_flag: &str,
    width: usize,
) {
    for (name, command) in tasks.into_iter().flatten() {
        let flag = match module.task(name) {
            Some(definition) if definition.is_collision() => COLLISION,
            _ if mixed => source_flag,
            _ => "",
        };
        write_task(out, flag, name, command, width);
    }
}

fn write_task(out: &mut String, flag: &str, name: &str, command: &str, width: usize) {
    let _ = writeln!(out, "  {flag}{name:<width$} $ {}", command.trim());
}

fn task_name_width<'a>(modules: impl Iterator<Item = &'a ModuleRecord>) -> usize {
    modules
        .flat_map(|module| module.task_names())
        .map(|name| name.chars().count())
        .max()
        .unwrap_or(0)
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .map(|relative| relative.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| path.to_string_lossy().to_string())
}
