//! Root CLI structure with global options.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Supervisor for a single frpc client process.
///
/// Paths default to the environment (`FRPC_PATH`, `FRPC_CONFIG`,
/// `FRPC_LOG_DIR`, also read from `.env`); flags override them.
#[derive(Parser, Debug)]
#[command(name = "frpcd")]
#[command(about = "Supervise an frpc client process and relay its logs")]
#[command(version)]
pub struct Cli {
    /// Path of the frpc executable
    #[arg(long = "frpc-path", global = true)]
    pub frpc_path: Option<PathBuf>,

    /// Config file passed to frpc as `-c`
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding frpc.log
    #[arg(long = "log-dir", global = true)]
    pub log_dir: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
