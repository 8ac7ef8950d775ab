//! Driver for the `minipro` command line tool (TL866 family programmers).
//!
//! Every operation spawns `minipro` against a scratch file:
//!
//! ```text
//! minipro -p <device> -r <file>          read
//! minipro -p <device> -w <file> [-v]     write (-v skips verification)
//! ```
//!
//! `-y` is appended when `force` is set to ignore chip ID mismatches.

use crate::config::ProgrammerConfig;
use crate::error::{AppResult, EetimeError};
use crate::hardware::capabilities::MemoryDevice;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Programmer identity written into run headers.
pub const PROGRAMMER_ID: &str = "minipro";

/// A device reached through the `minipro` executable.
#[derive(Debug, Clone)]
pub struct Minipro {
    path: PathBuf,
    device: String,
    force: bool,
}

impl Minipro {
    /// Create a driver for `device` using the executable at `path`.
    pub fn new(path: impl Into<PathBuf>, device: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            device: device.into(),
            force: false,
        }
    }

    /// Create a driver from configuration, with an explicit device name.
    pub fn from_config(config: &ProgrammerConfig, device: impl Into<String>) -> Self {
        Self::new(config.path.clone(), device).with_force(config.force)
    }

    /// Ignore chip ID mismatches.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    fn read_args(&self, file: &str) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            self.device.clone(),
            "-r".to_string(),
            file.to_string(),
        ];
        if self.force {
            args.push("-y".to_string());
        }
        args
    }

    fn write_args(&self, file: &str, verify: bool) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            self.device.clone(),
            "-w".to_string(),
            file.to_string(),
        ];
        if !verify {
            args.push("-v".to_string());
        }
        if self.force {
            args.push("-y".to_string());
        }
        args
    }

    async fn run(&self, args: &[String], quiet: bool) -> AppResult<()> {
        let command_line = format!("{} {}", self.path.display(), args.join(" "));
        tracing::debug!(command = %command_line, "Running programmer");

        let mut command = Command::new(&self.path);
        command.args(args);
        if quiet {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }
        let status = command
            .status()
            .await
            .map_err(|e| EetimeError::Programmer(format!("failed to run '{command_line}': {e}")))?;

        if status.success() {
            Ok(())
        } else {
            Err(EetimeError::Programmer(format!(
                "'{command_line}' exited with {status}"
            )))
        }
    }
}

#[async_trait]
impl MemoryDevice for Minipro {
    fn name(&self) -> &str {
        &self.device
    }

    fn programmer(&self) -> &str {
        PROGRAMMER_ID
    }

    async fn read(&self) -> AppResult<Vec<u8>> {
        let scratch = tempfile::Builder::new()
            .prefix("eetime-read-")
            .suffix(".bin")
            .tempfile()?;
        let file = scratch.path().to_string_lossy().into_owned();
        self.run(&self.read_args(&file), true).await?;
        let image = tokio::fs::read(scratch.path()).await?;
        Ok(image)
    }

    async fn write(&self, image: &[u8], verify: bool) -> AppResult<()> {
        let scratch = tempfile::Builder::new()
            .prefix("eetime-write-")
            .suffix(".bin")
            .tempfile()?;
        tokio::fs::write(scratch.path(), image).await?;
        let file = scratch.path().to_string_lossy().into_owned();
        self.run(&self.write_args(&file, verify), false).await
    }
}
