use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use crate::config::RunOptions;
use crate::error::WsrError;
use crate::module::{ModuleRecord, TaskDefinition};

const DENO: &str = "deno";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Runner {
    PackageManager(String),
    Deno,
}

impl Runner {
    pub fn program(&self) -> &str {
        match self {
            Runner::PackageManager(name) => name,
            Runner::Deno => DENO,
        }
    }

    fn subcommand(&self) -> &'static str {
        match self {
            Runner::PackageManager(_) => "run",
            Runner::Deno => "task",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchPlan {
    pub runner: Runner,
    pub task: String,
    pub cwd: PathBuf,
    pub args: Vec<String>,
}

impl DispatchPlan {
    pub fn program(&self) -> &str {
        self.runner.program()
    }

    /// `run <task> ...` or `task <task> ...`, pass-through args appended verbatim.
    pub fn command_args(&self) -> Vec<String> {
        let mut args = vec![self.runner.subcommand().to_string(), self.task.clone()];
        args.extend(self.args.iter().cloned());
        args
    }

    pub fn display_command(&self) -> String {
        let mut words = vec![self.program().to_string()];
        words.extend(self.command_args());
        shell_words::join(words)
    }
}

/// Pick the runner for `command` in `module`. A task defined by both manifests is refused.
pub fn plan_dispatch(
    module: &ModuleRecord,
    command: &str,
    package_manager: &str,
    passthrough: &[String],
) -> Result<DispatchPlan, WsrError> {
    let runner = match module.task(command) {
        Some(TaskDefinition::Both { .. }) => {
            return Err(WsrError::TaskCollision(command.to_string()))
        }
        Some(TaskDefinition::Package(_)) => Runner::PackageManager(package_manager.to_string()),
        Some(TaskDefinition::Deno(_)) => Runner::Deno,
        None => return Err(WsrError::TaskNotFound(command.to_string())),
    };
    Ok(DispatchPlan {
        runner,
        task: command.to_string(),
        cwd: module.path.clone(),
        args: passthrough.to_vec(),
    })
}

/// Run the plan in the foreground and return the runner's exit code.
pub fn execute(plan: &DispatchPlan, options: &RunOptions) -> Result<i32, WsrError> {
    let program = plan.program();
    let resolved = which::which(program).map_err(|source| WsrError::RunnerNotFound {
        program: program.to_string(),
        source,
    })?;
    debug!(program = %resolved.display(), cwd = %plan.cwd.display(), "dispatch");

    eprintln!("$ cd {}", shell_words::quote(&plan.cwd.to_string_lossy()));
    eprintln!("$ {}", plan.display_command());

    let mut command = Command::new(&resolved);
    command.args(plan.command_args()).current_dir(&plan.cwd);
    if options.color {
        command.env("FORCE_COLOR", "1");
    }
    let status = command.status().map_err(|source| WsrError::Spawn {
        program: program.to_string(),
        source,
    })?;
    Ok(status.code().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::TaskMap;

    fn map(entries: &[(&str, &str)]) -> Option<TaskMap> {
        Some(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn mixed_module() -> ModuleRecord {
        let mut record = ModuleRecord::new(PathBuf::from("/ws/app"));
        record.scripts = map(&[("build", "tsc"), ("dup", "echo npm")]);
        record.deno_tasks = map(&[("dev", "deno run main.ts"), ("dup", "echo deno")]);
        record
    }

    #[test]
    fn package_script_uses_package_manager() {
        let plan = plan_dispatch(&mixed_module(), "build", "pnpm", &["--watch".to_string()])
            .expect("plan");
        assert_eq!(plan.runner, Runner::PackageManager("pnpm".to_string()));
        assert_eq!(plan.cwd, PathBuf::from("/ws/app"));
        assert_eq!(plan.command_args(), vec!["run", "build", "--watch"]);
        assert_eq!(plan.display_command(), "pnpm run build --watch");
    }

    #[test]
    fn deno_task_uses_deno() {
        let plan = plan_dispatch(&mixed_module(), "dev", "pnpm", &[]).expect("plan");
        assert_eq!(plan.runner, Runner::Deno);
        assert_eq!(plan.program(), "deno");
        assert_eq!(plan.command_args(), vec!["task", "dev"]);
    }

    #[test]
    fn collision_is_refused() {
        let err = plan_dispatch(&mixed_module(), "dup", "npm", &[]).expect_err("collision");
        assert!(matches!(err, WsrError::TaskCollision(ref name) if name == "dup"));
    }

    #[test]
    fn missing_task_is_reported() {
        let err = plan_dispatch(&mixed_module(), "deploy", "npm", &[]).expect_err("missing");
        assert_eq!(err.to_string(), "task not found deploy");
    }

    #[test]
    fn display_command_quotes_arguments() {
        let plan = DispatchPlan {
            runner: Runner::PackageManager("npm".to_string()),
            task: "test".to_string(),
            cwd: PathBuf::from("/ws"),
            args: vec!["--grep".to_string(), "two words".to_string()],
        };
        assert_eq!(plan.display_command(), "npm run test --grep 'two words'");
    }

    #[test]
    fn missing_runner_is_an_error() {
        let plan = DispatchPlan {
            runner: Runner::PackageManager("wsr-definitely-not-installed".to_string()),
            task: "test".to_string(),
            cwd: PathBuf::from("/"),
            args: Vec::new(),
        };
        let err = execute(&plan, &RunOptions::default()).expect_err("runner missing");
        assert!(matches!(err, WsrError::RunnerNotFound { .. }));
    }
}
