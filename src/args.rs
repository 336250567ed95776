//! The CLI surface for the chatledger daemon.

use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::LevelFilter;

/// chatledger: records expenses from a group chat into a monthly spreadsheet
/// ledger.
///
/// The program listens for messages relayed by a chat bridge sidecar, parses
/// lines like "120 dinner" or "dinner 120", infers a category, and appends
/// one row per expense to a per-month tab of the configured spreadsheet,
/// maintaining a running monthly total. Messages are only processed when they
/// come from the single configured group chat.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// Identifier of the spreadsheet that holds the ledger, one tab per
    /// calendar month.
    #[arg(long, env = "SHEET_ID")]
    sheet_id: String,

    /// Display name of the one group chat whose messages are recorded.
    #[arg(long, env = "GROUP_NAME")]
    group_name: String,

    /// Path to the Google credentials JSON file.
    #[arg(long, env = "CREDENTIALS_PATH", default_value = "credentials.json")]
    credentials: PathBuf,

    /// Path to the chat bridge executable.
    #[arg(long, env = "BRIDGE_PATH")]
    bridge: PathBuf,

    /// Port for the liveness and pairing endpoints.
    #[arg(long, env = "PORT", default_value_t = 3001)]
    port: u16,
}

impl Args {
    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn sheet_id(&self) -> &str {
        &self.sheet_id
    }

    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    pub fn credentials(&self) -> &Path {
        &self.credentials
    }

    pub fn bridge(&self) -> &Path {
        &self.bridge
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from([
            "chatledger",
            "--sheet-id",
            "abc123",
            "--group-name",
            "Trip Expenses",
            "--bridge",
            "/usr/local/bin/wa-bridge",
        ]);
        assert_eq!(args.sheet_id(), "abc123");
        assert_eq!(args.group_name(), "Trip Expenses");
        assert_eq!(args.port(), 3001);
        assert_eq!(args.credentials(), Path::new("credentials.json"));
        assert_eq!(args.log_level(), LevelFilter::INFO);
    }
}
