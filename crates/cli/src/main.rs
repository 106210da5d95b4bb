mod report;

use std::path::{Path, PathBuf};
use std::process;

use buildsense_core::{resolve_path, BuildConfig, Orchestrator, ProcessBackend};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::runtime::Runtime;
use tracing::{debug, info};

use crate::report::{report_error, BuildSummary};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Compiler diagnostics and quick fixes for editors.
#[derive(Parser)]
#[command(
    name = "buildsense",
    version,
    about = "Compiler diagnostics and quick fixes for editors"
)]
struct Cli {
    /// Project root (default: current directory). Ignored by `lsp`, which
    /// takes the root from the editor.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Language Server Protocol server over stdio
    Lsp,

    /// Run one full build and print its diagnostics
    Build,

    /// Run one quick build of a single file and print its diagnostics
    Check {
        /// Source file, relative to the project root or absolute
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing();
    debug!(output = ?cli.output, quiet = cli.quiet, "buildsense starting");

    match cli.command {
        Commands::Lsp => {
            if let Err(e) = buildsense_lsp::run() {
                eprintln!("LSP server error: {}", e);
                process::exit(1);
            }
        }
        Commands::Build => {
            cmd_build(cli.root, cli.output, cli.quiet);
        }
        Commands::Check { file } => {
            cmd_check(cli.root, &file, cli.output, cli.quiet);
        }
    }
}

/// Log to stderr so stdout stays free for LSP traffic and build output.
/// `RUST_LOG` overrides the default filter.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("buildsense=info"));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .with(filter)
        .init();
}

fn cmd_build(root: Option<PathBuf>, output: OutputFormat, quiet: bool) {
    let root = project_root(root, output, quiet);
    let (runtime, mut orchestrator) = setup(&root, output, quiet);

    let report = runtime.block_on(orchestrator.run_full_build());
    let diagnostics: Vec<_> = orchestrator
        .store()
        .files()
        .flat_map(|(path, diagnostics)| diagnostics.iter().map(move |d| (path, d)))
        .collect();

    let summary = BuildSummary::new(&root, &report, diagnostics);
    summary.print(output, quiet);
    if summary.failed() {
        process::exit(1);
    }
}

fn cmd_check(root: Option<PathBuf>, file: &Path, output: OutputFormat, quiet: bool) {
    let root = project_root(root, output, quiet);
    let (runtime, mut orchestrator) = setup(&root, output, quiet);

    let file = resolve_path(&root, file);
    let report = runtime.block_on(orchestrator.run_quick_build(&file));
    let diagnostics: Vec<_> = orchestrator
        .store()
        .diagnostics(&file)
        .iter()
        .map(|d| (file.as_path(), d))
        .collect();

    let summary = BuildSummary::new(&root, &report, diagnostics);
    summary.print(output, quiet);
    if summary.failed() {
        process::exit(1);
    }
}

/// The absolute project root: `--root` resolved against the current
/// directory, or the current directory itself.
fn project_root(root: Option<PathBuf>, output: OutputFormat, quiet: bool) -> PathBuf {
    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            report_error(
                &format!("cannot determine current directory: {}", e),
                output,
                quiet,
            );
            process::exit(1);
        }
    };
    match root {
        Some(root) => resolve_path(&cwd, &root),
        None => cwd,
    }
}

/// Configuration, runtime and orchestrator for a one-shot build in `root`.
fn setup(
    root: &Path,
    output: OutputFormat,
    quiet: bool,
) -> (Runtime, Orchestrator<ProcessBackend>) {
    let config = match BuildConfig::load(root) {
        Ok(config) => config,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            report_error(&format!("failed to create tokio runtime: {}", e), output, quiet);
            process::exit(1);
        }
    };
    info!(
        root = %root.display(),
        build_command = %config.build_command,
        check_command = %config.quick_command(),
        "configuration loaded"
    );
    let backend = ProcessBackend::new(&config, Some(root));
    let orchestrator = Orchestrator::new(backend, config, Some(root.to_path_buf()));
    (runtime, orchestrator)
}
