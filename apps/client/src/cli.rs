//! Command-line interface.

use clap::{Parser, Subcommand};
use tango_core::{CardKind, Rating};

#[derive(Debug, Parser)]
#[command(name = "tango", version, about = "Local-first Japanese vocabulary reviews")]
pub struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the due and new cards for a session
    Queue {
        #[arg(long, default_value = "word")]
        kind: CardKind,
        /// Maximum number of new cards
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Grade a card
    Review {
        card_id: i64,
        /// again, hard, good or easy
        #[arg(required_unless_present = "quality")]
        rating: Option<Rating>,
        /// Legacy 0-5 quality score instead of a rating
        #[arg(long, conflicts_with = "rating", value_parser = clap::value_parser!(u8).range(0..=5))]
        quality: Option<u8>,
    },
    /// Merge local progress with the cloud
    Sync,
    /// Show or change the device identity
    Device {
        #[command(subcommand)]
        action: DeviceAction,
    },
    /// Study statistics
    Stats {
        /// Days of daily history to show (1-365)
        #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(u32).range(1..=365))]
        days: u32,
    },
    /// Import records from the legacy scheduler
    Migrate,
    /// Manage the legacy store
    Legacy {
        #[command(subcommand)]
        action: LegacyAction,
    },
    /// Clear all scheduling state and review history
    Reset,
}

#[derive(Debug, Subcommand)]
pub enum DeviceAction {
    Show,
    /// Use another device's identity and sync its history
    Adopt { token: String },
}

#[derive(Debug, Subcommand)]
pub enum LegacyAction {
    /// Delete the legacy store
    Purge,
}
