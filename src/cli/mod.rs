//! CLI module - Command-line interface for Marquee
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// Marquee - movie catalogue and ratings API
#[derive(Parser)]
#[command(name = "marquee")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API (default)
    Serve,

    /// Grant a permission to an existing user
    Grant {
        /// Email address of the user
        email: String,

        /// Permission code, e.g. movies:write
        permission: String,
    },

    /// Create a default config.toml in the working directory
    #[command(alias = "init")]
    InitConfig,
}

pub use commands::*;
