use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wsr_core::config::{no_color_env, resolve_run_options};
use wsr_core::discovery::discover_modules;
use wsr_core::dispatch::{execute, plan_dispatch};
use wsr_core::listing::{render_index, render_module};
use wsr_core::locate::Workspace;
use wsr_core::resolve::Resolver;

const EXAMPLES: &str = "\
Examples:
  $ wsr @pkg/foo test # run script in @pkg/foo
  $ wsr foo test      # run script in packages/foo (if the dirname is not duplicated)
  $ wsr foo           # list scripts in packages/foo

  $ wsr packages/foo test         # run script in packages/foo
  $ cd packages && wsr ./foo test # run script in relative target

  $ wsr root test # run script from workspace root
  $ wsr test      # run script from workspace root (if no \"test\" module exists)

  $ cd packages/foo && wsr test # prefer context task
  $ wsr foo test -- --watch     # pass arguments through to the runner";

#[derive(Parser)]
#[command(
    name = "wsr",
    version,
    about = "npm-scripts and deno task runner for monorepos",
    after_help = EXAMPLES
)]
struct Cli {
    /// Module (package name, directory name or path) or a task name
    expr: Option<String>,

    /// Task to run in the selected module; omit to list its tasks
    cmd: Option<String>,

    /// Arguments passed through to the task runner
    #[arg(last = true)]
    args: Vec<String>,

    /// Treat the current directory as the workspace root
    #[arg(short, long)]
    root: bool,

    /// Disable colored output here and in spawned runners
    #[arg(long)]
    no_color: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Errors before the config is read fall back to the flag and NO_COLOR.
    let mut color = !(cli.no_color || no_color_env());
    match run(&cli, &mut color) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            let tag = "[wsr:err]";
            if color {
                eprintln!("{}", format!("{tag} {err}").red());
            } else {
                eprintln!("{tag} {err}");
            }
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli, color: &mut bool) -> Result<i32> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    debug!(cwd = %cwd.display(), expr = ?cli.expr, cmd = ?cli.cmd, "wsr {}", wsr_core::version());
    let workspace = Workspace::locate(&cwd, cli.root)?;
    let options = resolve_run_options(&workspace.root, cli.no_color)?;
    *color = options.color;
    let index = discover_modules(&workspace.root)?;

    let Some(expr) = cli.expr.as_deref() else {
        print!("{}", render_index(&index, &workspace.root));
        return Ok(0);
    };

    let resolver = Resolver::new(&index, &workspace);
    let resolved = resolver.resolve(expr, cli.cmd.as_deref())?;
    let Some(command) = resolved.command.as_deref() else {
        print!("{}", render_module(&index, &workspace.root, resolved.module));
        return Ok(0);
    };

    let plan = plan_dispatch(
        resolved.module,
        command,
        &options.package_manager,
        &cli.args,
    )?;
    Ok(execute(&plan, &options)?)
}

fn init_tracing(verbose: bool) {
    let debug_env = std::env::var_os("DEBUG")
        .map(|value| !value.is_empty())
        .unwrap_or(false);
    let filter = if verbose || debug_env {
        EnvFilter::new("wsr=debug,wsr_core=debug")
    } else {
        EnvFilter::try_from_env("WSR_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_target(false),
        )
        .with(filter)
        .init();
}
