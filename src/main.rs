use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use gantry::config::Settings;
use gantry::invoker::Invoker;
use gantry::{glog, glog_error, Result};

/// Gantry - build task runner for client and server bundles
#[derive(Parser, Debug)]
#[command(name = "gantry")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    GANTRY_DEBUG=1     Enable debug logging (alternative to --debug)")]
pub struct Cli {
    /// Tasks to run, e.g. `build` or `client.rebuild-stylesheets` (default: `default`)
    pub tasks: Vec<String>,

    /// Settings file (default: gantry.toml in the working directory)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Project root to run in
    #[arg(short = 'C', long, default_value = ".")]
    pub cwd: PathBuf,

    /// Enable debug logging (writes to ~/.gantry/gantry.log)
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// List available tasks and exit
    #[arg(long = "tasks")]
    pub list_tasks: bool,

    /// List available tasks as JSON and exit
    #[arg(long)]
    pub tasks_json: bool,

    /// Print the effective settings as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    gantry::log::init_with_debug(cli.debug);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            glog_error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let root = std::path::absolute(&cli.cwd)?;
    let settings = Settings::load(&root, cli.config.as_deref())?;

    if cli.print_config {
        print!("{}", settings.to_toml_string()?);
        return Ok(());
    }

    let invoker = Invoker::from_settings(&settings);

    if cli.tasks_json {
        println!("{}", serde_json::to_string_pretty(&invoker.list())?);
        return Ok(());
    }
    if cli.list_tasks {
        for listing in invoker.list() {
            println!("{:<34} {}", listing.name, listing.description);
        }
        return Ok(());
    }

    glog!(
        "Using settings for {} in {}",
        settings.environment,
        root.display()
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(invoker.run(Arc::new(settings), root, &cli.tasks))
}
