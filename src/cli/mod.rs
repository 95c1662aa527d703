//! CLI module - Command-line interface for Episoda
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

use crate::services::RefreshMode;

/// Episoda - episode identity resolution and artwork backfill
#[derive(Parser)]
#[command(name = "episoda")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve an episode reference and backfill missing artwork
    #[command(alias = "r")]
    Resolve {
        /// Internal episode id or `{trakt_id}-S{season}E{episode}`
        reference: String,
        /// Trigger that started the resolution
        #[arg(long, default_value = "initial", value_parser = parse_mode)]
        mode: RefreshMode,
    },

    /// Backfill artwork for every episode of a show
    #[command(alias = "b")]
    Backfill {
        /// Internal show id
        show_id: String,
    },

    /// Start the HTTP server
    #[command(alias = "web")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

fn parse_mode(raw: &str) -> Result<RefreshMode, String> {
    raw.parse()
}

pub use commands::*;
