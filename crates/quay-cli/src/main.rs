#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use quay_engine::{CheckStatus, Context, EngineError};
use quay_tools::ToolLocator;

/// Exit code to return on success.
type CliResult = Result<i32, Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "quay", about = "A release pipeline driver for Poetry projects")]
#[command(version)]
struct Cli {
    /// Run as if started in this directory
    #[arg(short = 'C', long = "directory", global = true, value_name = "DIR")]
    directory: Option<PathBuf>,
    /// Log debug diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Install dependencies into the managed environment (`poetry install`)
    Install {
        /// Arguments to pass to poetry
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Run the project's entry point in the managed environment
    Project {
        /// Console script to run (defaults to [tool.quay].entry-point or the only script)
        #[arg(long)]
        script: Option<String>,
        /// Arguments to pass to the entry point
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Build sdist and wheel artifacts (`poetry build`)
    Build {
        /// Arguments to pass to poetry
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Validate artifacts and run a dry-run upload (`poetry publish --dry-run`)
    Publish {
        /// Repository configured in Poetry
        #[arg(long, short = 'r')]
        repository: Option<String>,
        /// Arguments to pass to poetry
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Install the built wheel as a standalone application (`pipx install --force`)
    PackageInstall {
        /// Arguments to pass to pipx
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Lint the project tree (`ruff check`)
    Lint {
        /// Arguments to pass to ruff
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Check tool and project setup
    Doctor,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match dispatch(cli) {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            let code = match err.downcast_ref::<EngineError>() {
                Some(engine) => {
                    tracing::debug!(kind = %engine.kind(), "operation failed");
                    engine.exit_code()
                }
                None => 1,
            };
            process::exit(code);
        }
    }
}

/// Debug logging with `-v`; otherwise `QUAY_LOG`, defaulting to warnings.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("QUAY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // Only fails if a subscriber is already installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

fn dispatch(cli: Cli) -> CliResult {
    let ctx = context(cli.directory)?;
    match cli.command {
        Command::Install { args } => cmd_install(&ctx, args),
        Command::Project { script, args } => cmd_project(&ctx, script, args),
        Command::Build { args } => cmd_build(&ctx, args),
        Command::Publish { repository, args } => cmd_publish(&ctx, repository, args),
        Command::PackageInstall { args } => cmd_package_install(&ctx, args),
        Command::Lint { args } => cmd_lint(&ctx, args),
        Command::Doctor => cmd_doctor(&ctx),
    }
}

/// Resolve the project root from `-C` or the current directory.
fn context(directory: Option<PathBuf>) -> Result<Context, Box<dyn Error>> {
    let root = match directory {
        Some(dir) => dir
            .canonicalize()
            .map_err(|e| format!("cannot use directory {}: {e}", dir.display()))?,
        None => std::env::current_dir()?,
    };
    Ok(Context::new(root, ToolLocator::from_env()))
}

fn cmd_install(ctx: &Context, args: Vec<String>) -> CliResult {
    quay_engine::install(ctx, &quay_engine::InstallOptions { extra_args: args })?;
    eprintln!("    Finished installing dependencies");
    Ok(0)
}

fn cmd_project(ctx: &Context, script: Option<String>, args: Vec<String>) -> CliResult {
    let options = quay_engine::RunOptions { script, args };
    Ok(quay_engine::run_project(ctx, &options)?)
}

fn cmd_build(ctx: &Context, args: Vec<String>) -> CliResult {
    let result = quay_engine::build(ctx, &quay_engine::BuildOptions { extra_args: args })?;
    eprintln!(
        "    Finished {} {} ({} artifact(s)) in {:.2}s",
        result.name,
        result.version,
        result.artifacts.len(),
        result.duration.as_secs_f64()
    );
    Ok(0)
}

fn cmd_publish(ctx: &Context, repository: Option<String>, args: Vec<String>) -> CliResult {
    let options = quay_engine::PublishOptions {
        repository,
        extra_args: args,
    };
    let result = quay_engine::publish(ctx, &options)?;
    eprintln!(
        "    Finished dry run for {}; nothing was uploaded",
        result.artifacts.join(", ")
    );
    Ok(0)
}

fn cmd_package_install(ctx: &Context, args: Vec<String>) -> CliResult {
    let options = quay_engine::PackageInstallOptions { extra_args: args };
    let result = quay_engine::package_install(ctx, &options)?;
    eprintln!("   Installed {}", result.scripts.join(", "));
    Ok(0)
}

fn cmd_lint(ctx: &Context, args: Vec<String>) -> CliResult {
    let report = quay_engine::lint(ctx, &quay_engine::LintOptions { extra_args: args })?;
    if report.findings.is_empty() {
        eprintln!("    No lint issues found");
    } else {
        eprintln!("    {} lint issue(s) reported", report.findings.len());
    }
    Ok(0)
}

fn cmd_doctor(ctx: &Context) -> CliResult {
    eprintln!("Checking environment...");
    eprintln!();

    let report = quay_engine::doctor(ctx);
    for check in &report.checks {
        match &check.status {
            CheckStatus::Ok(detail) => eprintln!("  [ok] {}: {detail}", check.label),
            CheckStatus::Warn(detail) => eprintln!("  [--] {}: {detail}", check.label),
            CheckStatus::Fail(detail) => eprintln!("  [!!] {}: {detail}", check.label),
        }
    }

    eprintln!();
    let issues = report.issues();
    if issues > 0 {
        eprintln!("{issues} issue(s) found; fix them before building");
        Err(format!("{issues} issue(s) found").into())
    } else {
        eprintln!("All checks passed");
        Ok(0)
    }
}
