//! Common types used throughout the auction coordinator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Monetary amount in whole SAR.
pub type Amount = u64;

/// Monotonic sequence number stamped on every backend request.
pub type Sequence = u64;

/// Opaque auction identifier.
///
/// The backend sometimes serializes ids as numbers and sometimes as strings;
/// both end up here as their decimal/string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuctionId(String);

impl AuctionId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for AuctionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<&str> for AuctionId {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

impl From<String> for AuctionId {
	fn from(value: String) -> Self {
		Self(value)
	}
}

/// Formats an amount with thousands separators and the currency code,
/// e.g. `SAR 150,000`.
pub fn format_sar(amount: Amount) -> String {
	let digits = amount.to_string();
	let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
	for (i, ch) in digits.chars().enumerate() {
		if i > 0 && (digits.len() - i) % 3 == 0 {
			grouped.push(',');
		}
		grouped.push(ch);
	}
	format!("SAR {}", grouped)
}
