//! Runtime configuration and Google credential material.

use crate::args::Args;
use crate::{utils, Result};
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Name of the environment variable that switches the app into test mode.
const TEST_MODE_VAR: &str = "CHATLEDGER_IN_TEST_MODE";

/// The resolved configuration of the app.
#[derive(Debug, Clone)]
pub struct Config {
    sheet_id: String,
    group_name: String,
    credentials_path: PathBuf,
    bridge_path: PathBuf,
    port: u16,
}

impl Config {
    pub fn from_args(args: &Args) -> Self {
        Self {
            sheet_id: args.sheet_id().to_string(),
            group_name: args.group_name().to_string(),
            credentials_path: args.credentials().to_path_buf(),
            bridge_path: args.bridge().to_path_buf(),
            port: args.port(),
        }
    }

    pub fn sheet_id(&self) -> &str {
        &self.sheet_id
    }

    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    pub fn credentials_path(&self) -> &Path {
        &self.credentials_path
    }

    pub fn bridge_path(&self) -> &Path {
        &self.bridge_path
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Selects the real Google store or the in-memory one.
///
/// This allows running the program without hitting the Google APIs. When
/// CHATLEDGER_IN_TEST_MODE is set and non-zero in length the mode will be
/// `Mode::Memory`, otherwise it will be `Mode::Google`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Google,
    Memory,
}

impl Mode {
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_VAR) {
            Ok(value) if !value.is_empty() => Mode::Memory,
            _ => Mode::Google,
        }
    }
}

/// Google credential material loaded from the credentials JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    client_id: String,
    #[serde(default)]
    client_secret: String,
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    refresh_token: String,
}

impl Credentials {
    pub async fn load(path: &Path) -> Result<Self> {
        utils::deserialize(path)
            .await
            .with_context(|| format!("Failed to load credentials from {}", path.display()))
    }

    /// Creates a sheets client from this credential material.
    pub fn client(&self) -> sheets::Client {
        sheets::Client::new(
            self.client_id.clone(),
            self.client_secret.clone(),
            String::new(), // redirect_uri (not needed for API calls)
            self.access_token.clone(),
            self.refresh_token.clone(),
        )
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_deserialize_with_missing_fields() {
        let credentials: Credentials =
            serde_json::from_str(r#"{"access_token": "tok"}"#).unwrap();
        assert_eq!(credentials.access_token, "tok");
        assert!(credentials.refresh_token().is_empty());
    }
}
