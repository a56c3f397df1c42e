use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use dslpack_core::MANIFEST_FILE_NAME;
use dslpack_registry::GitPackageSource;
use dslpack_workshop::{default_workshop_root, Workshop, WorkshopLayout, WorkshopLock};
use tracing_subscriber::EnvFilter;

mod render;

use render::{
    current_output_style, render_get_outcome, render_package_line, render_status_line,
    FetchProgress,
};

const LOG_ENV_VAR: &str = "DSLPACK_LOG";

#[derive(Parser, Debug)]
#[command(name = "dslpack")]
#[command(about = "Dependency manager for git-hosted DSL packages", long_about = None)]
struct Cli {
    /// Project directory holding the workshop manifest.
    #[arg(long, default_value = ".")]
    dir: PathBuf,
    /// Shared cache and package root (defaults to $DSLPACK_ROOT or ~/.dslpack).
    #[arg(long)]
    root: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch a package and its dependencies and record them in the manifest.
    Get {
        spec: String,
        #[arg(long)]
        alias: Option<String>,
    },
    /// List required packages.
    List,
    /// Remove a stale manifest lock left by a crashed process.
    Unlock,
    /// Print the workshop root layout.
    Root,
    /// Generate shell completions.
    Completions { shell: Shell },
}

fn main() -> Result<()> {
    init_tracing();
    run_cli(Cli::parse())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn run_cli(cli: Cli) -> Result<()> {
    let style = current_output_style();

    match cli.command {
        Commands::Get { spec, alias } => {
            let layout = resolve_layout(cli.root.as_deref())?;
            let mut workshop = Workshop::open(&cli.dir, layout)?;
            let source = GitPackageSource::new();

            let mut progress = FetchProgress::new(style);
            let outcome = workshop.get(
                &source,
                &spec,
                alias.as_deref(),
                &mut |total, package, message| progress.observe(total, package, message),
            );
            progress.finish();

            let outcome = outcome.with_context(|| format!("failed to get '{spec}'"))?;
            for line in render_get_outcome(style, &outcome) {
                println!("{line}");
            }
        }
        Commands::List => {
            let layout = resolve_layout(cli.root.as_deref())?;
            let workshop = Workshop::open(&cli.dir, layout)?;
            if workshop.packages().is_empty() {
                println!("No packages required");
            }
            for package in workshop.direct() {
                println!("{}", render_package_line(package));
            }
            for package in workshop.packages().iter().filter(|package| package.indirect) {
                println!("{}", render_package_line(package));
            }
        }
        Commands::Unlock => {
            let manifest = cli.dir.join(MANIFEST_FILE_NAME);
            if WorkshopLock::force_unlock(&manifest)? {
                println!(
                    "{}",
                    render_status_line(style, "unlocked", &manifest.display().to_string())
                );
            } else {
                println!("{} is not locked", manifest.display());
            }
        }
        Commands::Root => {
            let layout = resolve_layout(cli.root.as_deref())?;
            println!("root: {}", layout.root().display());
            println!("cache: {}", layout.cache_dir().display());
            println!("packages: {}", layout.packages_dir().display());
            println!("config: {}", layout.config_path().display());
        }
        Commands::Completions { shell } => {
            write_completions(shell, &mut io::stdout())?;
        }
    }

    Ok(())
}

fn resolve_layout(root: Option<&Path>) -> Result<WorkshopLayout> {
    let root = match root {
        Some(root) => root.to_path_buf(),
        None => default_workshop_root()?,
    };
    Ok(WorkshopLayout::new(root))
}

fn write_completions<W: Write>(shell: Shell, writer: &mut W) -> Result<()> {
    let mut command = Cli::command();
    let mut generated = Vec::new();
    clap_complete::generate(shell, &mut command, "dslpack", &mut generated);
    writer
        .write_all(&generated)
        .with_context(|| "failed writing generated completion script")
}
