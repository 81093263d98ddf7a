use clap::Parser;
use mdboard_backend::{log_bridge, run, RunOptions};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "mdboard",
    about = "Serve folders of markdown cards as kanban boards",
    version
)]
struct Cli {
    /// Folders to open (default: configured folders, or ask)
    folders: Vec<PathBuf>,

    /// Config file (default: <config dir>/mdboard/config.json)
    #[arg(long, env = "MDBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured port (0 picks a free one)
    #[arg(long)]
    port: Option<u16>,

    /// Do not watch folders for external changes
    #[arg(long)]
    no_watch: bool,

    /// Log level when RUST_LOG is unset
    #[arg(long, env = "MDBOARD_LOG")]
    log_level: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = log_bridge::init(cli.log_level.as_deref()) {
        log_bridge::write_fallback_line(&format!("failed to initialize backend logger: {}", e));
    }

    let options = RunOptions {
        folders: cli.folders,
        config: cli.config,
        port: cli.port,
        watch: !cli.no_watch,
    };
    match run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("[mdboard.main] {}", e);
            ExitCode::FAILURE
        }
    }
}
