//! Subcommand definitions.

use clap::Subcommand;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Supervise in the foreground until Ctrl-C (default)
    Run {
        /// Do not start frpc at boot
        #[arg(long)]
        no_auto_start: bool,

        /// Do not run the connectivity monitor
        #[arg(long)]
        no_network_check: bool,
    },

    /// Start frpc
    Start,

    /// Stop frpc
    Stop,

    /// Stop then start frpc
    Restart,

    /// Show whether frpc is running
    Status {
        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the last lines of the frpc log
    Logs {
        /// Number of lines (defaults to FRPCD_LOG_SNAPSHOT_LINES)
        #[arg(short = 'n', long = "lines")]
        lines: Option<usize>,
    },

    /// Truncate the frpc log
    ClearLogs,

    /// Act as an observer on stdin/stdout: JSON requests in, JSON messages out
    Watch,
}

impl Default for Commands {
    fn default() -> Self {
        Self::Run {
            no_auto_start: false,
            no_network_check: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cli;
    use clap::Parser;

    #[test]
    fn test_logs_lines() {
        let cli = Cli::parse_from(["frpcd", "logs", "-n", "20"]);
        assert_eq!(cli.command, Some(Commands::Logs { lines: Some(20) }));
    }

    #[test]
    fn test_run_flags() {
        let cli = Cli::parse_from(["frpcd", "run", "--no-network-check"]);
        assert_eq!(
            cli.command,
            Some(Commands::Run {
                no_auto_start: false,
                no_network_check: true
            })
        );
    }

    #[test]
    fn test_clear_logs_kebab_case() {
        let cli = Cli::parse_from(["frpcd", "clear-logs"]);
        assert_eq!(cli.command, Some(Commands::ClearLogs));
    }
}
