//! Configuration types for the auction coordinator.

use auction_types::api::ListAuctionsQuery;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Complete coordinator configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AuctionConfig {
	/// Backend connection settings
	pub backend: BackendConfig,
	/// Listing refresh cadence
	pub polling: PollingConfig,
	/// Listing query parameters
	pub listing: ListingConfig,
	/// Bid submission behavior
	pub bidding: BiddingConfig,
	/// Event bus settings
	pub events: EventsConfig,
}

/// Backend REST API connection settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
	/// Base URL of the dealer API, e.g. `https://api.example.com/api`
	pub base_url: String,
	/// Version prefix prepended to auction and car endpoints
	pub api_prefix: String,
	/// Bearer token sent with every request
	pub token: Option<String>,
	/// Upper bound on any single request, in seconds
	pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
	fn default() -> Self {
		Self {
			base_url: "http://localhost:3000/api".to_string(),
			api_prefix: "/1.0".to_string(),
			token: None,
			request_timeout_secs: 15,
		}
	}
}

impl BackendConfig {
	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}
}

/// What the listing poller does when the tracked collection is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollPolicy {
	/// Poll on every tick regardless of what is tracked.
	#[default]
	Always,
	/// Skip ticks while nothing is tracked; a manual fetch that repopulates
	/// the collection resumes polling.
	SuspendWhenEmpty,
}

impl fmt::Display for PollPolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Always => write!(f, "always"),
			Self::SuspendWhenEmpty => write!(f, "suspend_when_empty"),
		}
	}
}

impl std::str::FromStr for PollPolicy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"always" => Ok(Self::Always),
			"suspend_when_empty" => Ok(Self::SuspendWhenEmpty),
			other => Err(format!("unknown poll policy '{}'", other)),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PollingConfig {
	/// Interval between listing refreshes, in seconds
	pub interval_secs: u64,
	/// Maximum random delay added to each interval, in milliseconds
	pub jitter_ms: u64,
	pub policy: PollPolicy,
}

impl Default for PollingConfig {
	fn default() -> Self {
		Self {
			interval_secs: 30,
			jitter_ms: 2_000,
			policy: PollPolicy::Always,
		}
	}
}

impl PollingConfig {
	pub fn interval(&self) -> Duration {
		Duration::from_secs(self.interval_secs)
	}

	pub fn jitter(&self) -> Duration {
		Duration::from_millis(self.jitter_ms)
	}
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListingConfig {
	pub search: String,
	pub page: u32,
	pub limit: u32,
}

impl Default for ListingConfig {
	fn default() -> Self {
		Self {
			search: String::new(),
			page: 1,
			limit: 10,
		}
	}
}

impl From<&ListingConfig> for ListAuctionsQuery {
	fn from(config: &ListingConfig) -> Self {
		Self {
			search: config.search.clone(),
			page: config.page,
			limit: config.limit,
			..Self::default()
		}
	}
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BiddingConfig {
	/// Publish a return-to-listing navigation event after an accepted bid
	pub return_to_listing_on_accept: bool,
}

impl Default for BiddingConfig {
	fn default() -> Self {
		Self {
			return_to_listing_on_accept: true,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
	/// Broadcast channel capacity
	pub capacity: usize,
}

impl Default for EventsConfig {
	fn default() -> Self {
		Self { capacity: 256 }
	}
}
