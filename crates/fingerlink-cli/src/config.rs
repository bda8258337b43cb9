//! Settings resolution: defaults, then the JSON file, then flags and env.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use fingerlink_core::{EnrollmentConfig, SerialConfig};
use fingerlink_storage::DatabaseConfig;
use serde::Deserialize;

use crate::cli::Args;

/// Contents of the `--config` file. Every section is optional.
///
/// ```json
/// {
///   "serial": { "port": "/dev/ttyAMA0" },
///   "enrollment": { "max_attempts": 5, "template_encoding": "sha256" },
///   "database": "/var/lib/fingerlink/state.db"
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub serial: SerialConfig,
    pub enrollment: EnrollmentConfig,
    pub database: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub serial: SerialConfig,
    pub enrollment: EnrollmentConfig,
    pub database: DatabaseConfig,
}

impl Settings {
    pub fn resolve(args: &Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        let mut serial = file.serial;
        if let Some(port) = &args.port {
            serial.port = port.clone();
        }
        if let Some(baud) = args.baud {
            serial.baud_rate = baud;
        }

        let mut enrollment = file.enrollment;
        if let Some(encoding) = args.encoding {
            enrollment.template_encoding = encoding;
        }
        enrollment
            .validate()
            .context("Invalid enrollment configuration")?;

        let database = match args.database.clone().or(file.database) {
            Some(path) => DatabaseConfig::new(path),
            None => DatabaseConfig::default(),
        };

        Ok(Self {
            serial,
            enrollment,
            database,
        })
    }
}
