use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fingerlink_core::{TemplateEncoding, TemplateId};

/// Fingerprint sensor enrollment and template retrieval
#[derive(Parser, Debug)]
#[command(name = "fingerlink")]
#[command(about = "Enroll, verify and download fingerprint templates over a serial sensor")]
#[command(version)]
pub struct Args {
    /// Serial port the sensor is attached to
    #[arg(long, global = true, env = "FINGERLINK_PORT")]
    pub port: Option<String>,

    /// Serial baud rate
    #[arg(long, global = true, env = "FINGERLINK_BAUD")]
    pub baud: Option<u32>,

    /// SQLite file holding the enrolled count
    #[arg(long, global = true, env = "FINGERLINK_DB")]
    pub database: Option<String>,

    /// JSON configuration file
    #[arg(short, long, global = true, env = "FINGERLINK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Template rendering in published output (hex, sha256)
    #[arg(long, global = true, env = "FINGERLINK_ENCODING")]
    pub encoding: Option<TemplateEncoding>,

    /// Use the in-process mock sensor and an in-memory count
    #[arg(long, global = true)]
    pub mock: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Enroll a finger at a template slot
    Enroll {
        /// Template slot (1-based)
        id: TemplateId,
    },

    /// Capture a finger and search the sensor library
    Verify,

    /// Download the template stored at a slot
    Download {
        /// Template slot; 0 is rejected
        id: u16,

        /// Transfer attempts before giving up
        #[arg(long)]
        attempts: Option<u8>,
    },

    /// Download every stored template
    DownloadAll {
        /// Highest number of templates to visit (defaults to sensor capacity)
        #[arg(long)]
        upper_bound: Option<u16>,

        /// Transfer attempts per template
        #[arg(long)]
        attempts: Option<u8>,
    },

    /// Publish the enrolled count
    Count,

    /// Reset the enrolled count to zero
    ResetCount,
}
