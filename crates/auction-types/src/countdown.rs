use serde::{Deserialize, Serialize};

pub const ENDED_TEXT: &str = "ENDED";

/// Time remaining on one auction, as shown by one view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownState {
	pub remaining_seconds: u64,
	pub display_text: String,
}

impl CountdownState {
	pub fn ended() -> Self {
		Self {
			remaining_seconds: 0,
			display_text: ENDED_TEXT.to_string(),
		}
	}

	pub fn is_expired(&self) -> bool {
		self.remaining_seconds == 0
	}
}
