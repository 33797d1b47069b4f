//! Command-line interface definitions.

use auction_types::AuctionId;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dealer-auction")]
#[command(about = "Live dealer auctions from the terminal", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
	/// Path to configuration file. Defaults apply when omitted.
	#[arg(short, long, value_name = "FILE", env = "AUCTION_CONFIG")]
	pub config: Option<PathBuf>,

	/// Log level (trace, debug, info, warn, error)
	#[arg(long, env = "AUCTION_LOG_LEVEL", default_value = "info")]
	pub log_level: String,

	#[command(subcommand)]
	pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Follow the live listing until interrupted
	Watch,

	/// Open one auction and follow its countdown
	Detail {
		#[arg(value_parser = parse_auction_id)]
		auction_id: AuctionId,
	},

	/// Place a bid on an auction
	Bid {
		#[arg(value_parser = parse_auction_id)]
		auction_id: AuctionId,

		/// Amount in whole currency units; thousands separators are allowed
		amount: String,
	},

	/// List the bids this dealer has placed
	Bids,

	/// Exchange credentials for an access token
	Login {
		#[arg(long, env = "AUCTION_EMAIL")]
		email: String,

		#[arg(long, env = "AUCTION_PASSWORD", hide_env_values = true)]
		password: String,
	},

	/// Validate the configuration file
	Validate,
}

fn parse_auction_id(raw: &str) -> Result<AuctionId, String> {
	let trimmed = raw.trim();
	if trimmed.is_empty() {
		return Err("auction id must not be empty".to_string());
	}
	Ok(AuctionId::from(trimmed))
}
