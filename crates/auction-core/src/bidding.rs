//! Bid submission.
//!
//! A bid moves `Drafting → Validating → Submitting → Accepted | Rejected`.
//! Validation is synchronous and never touches the network. At most one
//! submission per auction is in flight; a second one is refused on the spot
//! rather than queued.

use crate::book::AuctionBook;
use crate::clock::Clock;
use crate::countdown::compute_remaining;
use crate::error::{bid_error, CoreError};
use crate::event_bus::EventBus;
use crate::lifecycle::ViewScope;
use crate::utils::with_timeout;
use auction_client::{AuctionBackend, GENERIC_FAILURE_MESSAGE};
use auction_config::AuctionConfig;
use auction_types::{
	format_sar, Amount, AuctionError, AuctionEvent, AuctionId, AuctionSnapshot, AuctionStatus,
	BidAttempt, BidEvent, BidReceipt, BidState, NavigationEvent, NavigationReason,
};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Parses a user-entered amount. Thousands separators are accepted.
pub fn parse_amount(raw: &str) -> Result<Amount, AuctionError> {
	let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
	if cleaned.is_empty() {
		return Err(AuctionError::InvalidAmount("an amount is required".to_string()));
	}

	let amount = cleaned.parse::<Amount>().map_err(|_| {
		AuctionError::InvalidAmount(format!("'{}' is not a whole number of SAR", raw.trim()))
	})?;
	if amount == 0 {
		return Err(AuctionError::InvalidAmount(
			"the amount must be greater than zero".to_string(),
		));
	}
	Ok(amount)
}

/// Client-side checks for a bid of `amount` on `snapshot` at `now`.
pub fn validate_bid(
	snapshot: &AuctionSnapshot,
	amount: Amount,
	now: DateTime<Utc>,
) -> Result<(), AuctionError> {
	if amount == 0 {
		return Err(AuctionError::InvalidAmount(
			"the amount must be greater than zero".to_string(),
		));
	}

	if amount <= snapshot.floor() {
		return Err(AuctionError::BelowFloor {
			amount,
			floor: snapshot.floor(),
		});
	}

	if snapshot.status == AuctionStatus::Ended
		|| compute_remaining(snapshot.end_time, now).is_expired()
	{
		return Err(AuctionError::AuctionExpired(snapshot.auction_id.clone()));
	}

	Ok(())
}

/// Holds an auction's in-flight slot; released on drop, including when the
/// submitting future is cancelled.
struct InFlightGuard {
	registry: Arc<DashMap<AuctionId, Uuid>>,
	auction_id: AuctionId,
}

impl Drop for InFlightGuard {
	fn drop(&mut self) {
		self.registry.remove(&self.auction_id);
	}
}

pub struct BidCoordinator {
	backend: Arc<dyn AuctionBackend>,
	book: Arc<AuctionBook>,
	events: EventBus,
	clock: Arc<dyn Clock>,
	in_flight: Arc<DashMap<AuctionId, Uuid>>,
	request_timeout: Duration,
	return_to_listing_on_accept: bool,
}

impl BidCoordinator {
	pub fn new(
		backend: Arc<dyn AuctionBackend>,
		book: Arc<AuctionBook>,
		events: EventBus,
		clock: Arc<dyn Clock>,
		config: &AuctionConfig,
	) -> Self {
		Self {
			backend,
			book,
			events,
			clock,
			in_flight: Arc::new(DashMap::new()),
			request_timeout: config.backend.request_timeout(),
			return_to_listing_on_accept: config.bidding.return_to_listing_on_accept,
		}
	}

	/// Runs the synchronous checks against the tracked snapshot.
	///
	/// Leaves the attempt in `Validating` on success and back in `Drafting`
	/// on failure.
	pub fn validate(&self, attempt: &mut BidAttempt) -> Result<AuctionSnapshot, AuctionError> {
		attempt.transition(BidState::Validating);

		let result = self
			.book
			.get(&attempt.auction_id)
			.ok_or_else(|| AuctionError::UnknownAuction(attempt.auction_id.clone()))
			.and_then(|snapshot| {
				validate_bid(&snapshot, attempt.amount, self.clock.now())?;
				Ok(snapshot)
			});

		if let Err(e) = &result {
			debug!("Bid on auction {} failed validation: {}", attempt.auction_id, e);
			attempt.transition(BidState::Drafting);
		}
		result
	}

	pub fn is_submitting(&self, auction_id: &AuctionId) -> bool {
		self.in_flight.contains_key(auction_id)
	}

	/// Parses raw user input and submits it.
	pub async fn submit_bid(
		&self,
		auction_id: &AuctionId,
		raw_amount: &str,
		scope: &ViewScope,
	) -> Result<BidReceipt, CoreError> {
		let amount = parse_amount(raw_amount)?;
		self.submit_amount(auction_id, amount, scope).await
	}

	/// Validates, submits and reconciles one bid.
	///
	/// Rejections carry the backend's message verbatim when it sent one.
	/// Nothing is written to the book unless the backend accepted the bid.
	#[instrument(skip(self, scope), fields(view = scope.name()))]
	pub async fn submit_amount(
		&self,
		auction_id: &AuctionId,
		amount: Amount,
		scope: &ViewScope,
	) -> Result<BidReceipt, CoreError> {
		let mut attempt = BidAttempt::new(auction_id.clone(), amount, self.clock.now());
		self.validate(&mut attempt)?;

		let _guard = match self.claim(&attempt) {
			Ok(guard) => guard,
			Err(e) => {
				attempt.transition(BidState::Drafting);
				return Err(e.into());
			}
		};

		attempt.transition(BidState::Submitting);
		info!(
			attempt_id = %attempt.attempt_id,
			"Submitting bid of {} on auction {}",
			format_sar(amount),
			auction_id
		);

		let result = with_timeout(
			self.request_timeout,
			self.backend.place_bid(auction_id, amount),
		)
		.await;

		if !scope.is_mounted() {
			return Err(scope.discarded());
		}

		match result {
			Ok(updated) => {
				attempt.transition(BidState::Accepted);
				let (sequence, entry) = self.book.apply_accepted_bid(auction_id, amount, updated);
				if entry.is_none() {
					warn!(
						"Bid on auction {} accepted but the auction is no longer tracked",
						auction_id
					);
				}
				info!(
					attempt_id = %attempt.attempt_id,
					"Bid of {} on auction {} accepted",
					format_sar(amount),
					auction_id
				);

				self.events
					.publish(AuctionEvent::Bid(BidEvent::Accepted {
						auction_id: auction_id.clone(),
						amount,
					}))
					.ok();
				if self.return_to_listing_on_accept {
					self.events
						.publish(AuctionEvent::Navigation(NavigationEvent::ReturnToListing {
							auction_id: auction_id.clone(),
							reason: NavigationReason::BidAccepted,
						}))
						.ok();
				}

				Ok(BidReceipt { attempt, sequence })
			}
			Err(e) => {
				attempt.transition(BidState::Rejected);
				let err = bid_error(e);
				warn!(
					attempt_id = %attempt.attempt_id,
					"Bid of {} on auction {} rejected: {}",
					format_sar(amount),
					auction_id,
					err
				);

				let message = match &err {
					AuctionError::BidRejected(message) => message.clone(),
					_ => GENERIC_FAILURE_MESSAGE.to_string(),
				};
				self.events
					.publish(AuctionEvent::Bid(BidEvent::Rejected {
						auction_id: auction_id.clone(),
						message,
					}))
					.ok();

				Err(err.into())
			}
		}
	}

	fn claim(&self, attempt: &BidAttempt) -> Result<InFlightGuard, AuctionError> {
		match self.in_flight.entry(attempt.auction_id.clone()) {
			Entry::Occupied(existing) => {
				debug!(
					"Bid {} refused, attempt {} still in flight on auction {}",
					attempt.attempt_id,
					existing.get(),
					attempt.auction_id
				);
				Err(AuctionError::SubmissionInProgress(attempt.auction_id.clone()))
			}
			Entry::Vacant(slot) => {
				slot.insert(attempt.attempt_id);
				Ok(InFlightGuard {
					registry: Arc::clone(&self.in_flight),
					auction_id: attempt.auction_id.clone(),
				})
			}
		}
	}
}
