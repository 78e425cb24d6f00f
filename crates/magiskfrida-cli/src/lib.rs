//! magiskfrida - Magisk installer archives for frida-server
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
//!
//! Downloads the frida-server build for each Android platform, drops it into
//! a copy of the module template, and zips the result into an archive Magisk
//! can flash.
//!
//! # Directory Layout
//!
//! ```text
//! <base-dir>/
//! ├── base/              # Module template
//! ├── magiskfrida.toml   # Optional configuration
//! ├── downloads/         # Compressed frida-server builds
//! └── builds/            # Staging trees and finished archives
//! ```

pub mod cmd;
pub mod ui;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use magiskfrida_schema::Platform;

#[derive(Debug, Parser)]
#[command(name = "magiskfrida")]
#[command(author, version = env!("MAGISKFRIDA_VERSION"), about = "Build MagiskFrida installer archives")]
pub struct Cli {
    /// Directory holding the template, downloads and builds
    #[arg(long, global = true, env = "MAGISKFRIDA_HOME", default_value = ".")]
    pub base_dir: PathBuf,

    /// Configuration file (defaults to <base-dir>/magiskfrida.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show what would happen without making changes
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build installer archives
    Build {
        /// Platform to build (repeatable; defaults to the configured set)
        #[arg(short, long = "platform", value_name = "PLATFORM")]
        platforms: Vec<Platform>,
        /// Build this release tag instead of the latest one
        #[arg(long, value_name = "TAG")]
        release: Option<String>,
        /// Attempt every platform even after one fails
        #[arg(long)]
        keep_going: bool,
        /// Release metadata endpoint
        #[arg(long, env = "MAGISKFRIDA_RELEASE_URL")]
        release_url: Option<String>,
        /// Artifact URL pattern with {release} and {platform} placeholders
        #[arg(long, env = "MAGISKFRIDA_DOWNLOAD_URL")]
        download_url: Option<String>,
    },
    /// Print the latest upstream release
    Resolve {
        /// Release metadata endpoint
        #[arg(long, env = "MAGISKFRIDA_RELEASE_URL")]
        release_url: Option<String>,
    },
    /// Remove staging trees and archives
    Clean {
        /// Also remove downloaded artifacts
        #[arg(long)]
        downloads: bool,
    },
    /// List supported platforms
    Platforms,
}
