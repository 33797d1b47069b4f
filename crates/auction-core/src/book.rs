//! The local auction collection.
//!
//! Every write to the book carries a sequence number taken from the book's
//! own counter, and every entry remembers the sequence that produced it.
//! That is the whole reconciliation rule:
//!
//! - a listing response older than the last applied listing is discarded;
//! - a listing response replaces the collection wholesale, except that an
//!   entry written by a *newer* request (a detail fetch or an accepted bid
//!   that happened after this listing was requested) survives;
//! - a detail response only lands if it is newer than the entry it replaces
//!   (or, for an untracked auction, newer than the last listing).
//!
//! Readers get a consistent snapshot without locking; writers swap in a new
//! state atomically.

use arc_swap::ArcSwap;
use auction_types::{Amount, AuctionId, AuctionSnapshot, Sequence};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Where an entry's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOrigin {
	/// A server response.
	Confirmed,
	/// A local bump after an accepted bid, pending the next fetch.
	Optimistic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookEntry {
	pub snapshot: AuctionSnapshot,
	pub version: Sequence,
	pub origin: EntryOrigin,
}

/// What happened to a response handed to the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
	Applied { sequence: Sequence },
	Discarded {
		sequence: Sequence,
		latest_applied: Sequence,
	},
}

impl ApplyOutcome {
	pub fn is_applied(&self) -> bool {
		matches!(self, Self::Applied { .. })
	}
}

#[derive(Debug, Clone, Default)]
struct BookState {
	entries: HashMap<AuctionId, BookEntry>,
	/// Listing order as served by the backend.
	order: Vec<AuctionId>,
	listing_sequence: Sequence,
}

pub struct AuctionBook {
	state: ArcSwap<BookState>,
	sequence: AtomicU64,
}

impl Default for AuctionBook {
	fn default() -> Self {
		Self::new()
	}
}

impl AuctionBook {
	pub fn new() -> Self {
		Self {
			state: ArcSwap::from_pointee(BookState::default()),
			sequence: AtomicU64::new(0),
		}
	}

	/// Takes the next request sequence number. Call before sending the
	/// request, not when the response arrives.
	pub fn next_sequence(&self) -> Sequence {
		self.sequence.fetch_add(1, Ordering::SeqCst) + 1
	}

	/// Replaces the collection with a listing response.
	pub fn apply_listing(
		&self,
		sequence: Sequence,
		snapshots: Vec<AuctionSnapshot>,
	) -> ApplyOutcome {
		let mut outcome = ApplyOutcome::Applied { sequence };

		self.state.rcu(|current| {
			if sequence <= current.listing_sequence {
				outcome = ApplyOutcome::Discarded {
					sequence,
					latest_applied: current.listing_sequence,
				};
				return Arc::clone(current);
			}
			outcome = ApplyOutcome::Applied { sequence };

			let mut next = BookState {
				entries: HashMap::with_capacity(snapshots.len()),
				order: Vec::with_capacity(snapshots.len()),
				listing_sequence: sequence,
			};
			for snapshot in &snapshots {
				let id = snapshot.auction_id.clone();
				let entry = match current.entries.get(&id) {
					Some(existing) if existing.version > sequence => existing.clone(),
					_ => BookEntry {
						snapshot: snapshot.clone(),
						version: sequence,
						origin: EntryOrigin::Confirmed,
					},
				};
				if next.entries.insert(id.clone(), entry).is_none() {
					next.order.push(id);
				}
			}
			Arc::new(next)
		});

		if let ApplyOutcome::Discarded { latest_applied, .. } = outcome {
			debug!(
				"Discarded listing response #{} (latest applied #{})",
				sequence, latest_applied
			);
		}
		outcome
	}

	/// Upserts one auction from a detail response.
	pub fn apply_detail(&self, sequence: Sequence, snapshot: AuctionSnapshot) -> ApplyOutcome {
		let mut outcome = ApplyOutcome::Applied { sequence };
		let id = snapshot.auction_id.clone();

		self.state.rcu(|current| {
			// An untracked auction is judged against the listing that dropped it
			let latest = current
				.entries
				.get(&id)
				.map_or(current.listing_sequence, |existing| existing.version);
			if latest >= sequence {
				outcome = ApplyOutcome::Discarded {
					sequence,
					latest_applied: latest,
				};
				return Arc::clone(current);
			}
			outcome = ApplyOutcome::Applied { sequence };

			let mut next = (**current).clone();
			let previous = next.entries.insert(
				id.clone(),
				BookEntry {
					snapshot: snapshot.clone(),
					version: sequence,
					origin: EntryOrigin::Confirmed,
				},
			);
			if previous.is_none() {
				next.order.push(id.clone());
			}
			Arc::new(next)
		});

		if let ApplyOutcome::Discarded { latest_applied, .. } = outcome {
			debug!(
				"Discarded detail response #{} for auction {} (entry is #{})",
				sequence, id, latest_applied
			);
		}
		outcome
	}

	/// Records a bid the backend accepted.
	///
	/// When the backend returned the updated auction that is stored as
	/// confirmed; otherwise the tracked entry is bumped optimistically. The
	/// new entry is stamped with a fresh sequence so only fetches requested
	/// after the acceptance can supersede it. Returns that sequence and the
	/// written entry, which is `None` if the auction is no longer tracked.
	pub fn apply_accepted_bid(
		&self,
		auction_id: &AuctionId,
		amount: Amount,
		confirmed: Option<AuctionSnapshot>,
	) -> (Sequence, Option<BookEntry>) {
		let sequence = self.next_sequence();
		let mut written = None;

		self.state.rcu(|current| {
			let Some(existing) = current.entries.get(auction_id) else {
				written = None;
				return Arc::clone(current);
			};

			let entry = match &confirmed {
				// Never let the acceptance body show less than was just accepted
				Some(snapshot) if snapshot.current_bid >= amount => BookEntry {
					snapshot: snapshot.clone(),
					version: sequence,
					origin: EntryOrigin::Confirmed,
				},
				_ => BookEntry {
					snapshot: existing.snapshot.with_accepted_bid(amount),
					version: sequence,
					origin: EntryOrigin::Optimistic,
				},
			};
			written = Some(entry.clone());

			let mut next = (**current).clone();
			next.entries.insert(auction_id.clone(), entry);
			Arc::new(next)
		});

		(sequence, written)
	}

	pub fn get(&self, auction_id: &AuctionId) -> Option<AuctionSnapshot> {
		self.entry(auction_id).map(|entry| entry.snapshot)
	}

	pub fn entry(&self, auction_id: &AuctionId) -> Option<BookEntry> {
		self.state.load().entries.get(auction_id).cloned()
	}

	/// All tracked auctions in listing order.
	pub fn snapshots(&self) -> Vec<AuctionSnapshot> {
		let state = self.state.load();
		state
			.order
			.iter()
			.filter_map(|id| state.entries.get(id))
			.map(|entry| entry.snapshot.clone())
			.collect()
	}

	pub fn len(&self) -> usize {
		self.state.load().entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Sequence of the last applied listing, 0 before the first.
	pub fn listing_sequence(&self) -> Sequence {
		self.state.load().listing_sequence
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use auction_types::api::CarRecord;
	use auction_types::AuctionStatus;
	use chrono::{Duration, Utc};

	pub(crate) fn snapshot(id: &str, current_bid: Amount, bid_count: u64) -> AuctionSnapshot {
		AuctionSnapshot {
			auction_id: AuctionId::from(id),
			end_time: Utc::now() + Duration::hours(2),
			status: AuctionStatus::Live,
			starting_bid: 100_000,
			current_bid,
			highest_bid: current_bid,
			bid_count,
			cover_image: String::new(),
			car: CarRecord::default().normalize(),
			bid_history: Vec::new(),
		}
	}

	#[test]
	fn test_listing_replaces_wholesale() {
		let book = AuctionBook::new();
		let seq = book.next_sequence();
		book.apply_listing(seq, vec![snapshot("1", 100_000, 0), snapshot("2", 120_000, 1)]);
		assert_eq!(book.len(), 2);

		let seq = book.next_sequence();
		book.apply_listing(seq, vec![snapshot("3", 100_000, 0)]);
		let ids: Vec<_> = book.snapshots().into_iter().map(|s| s.auction_id).collect();
		assert_eq!(ids, vec![AuctionId::from("3")]);
	}

	#[test]
	fn test_older_listing_is_discarded() {
		let book = AuctionBook::new();
		let first = book.next_sequence();
		let second = book.next_sequence();

		assert!(book
			.apply_listing(second, vec![snapshot("1", 130_000, 2)])
			.is_applied());
		let outcome = book.apply_listing(first, vec![snapshot("1", 110_000, 1)]);

		assert_eq!(
			outcome,
			ApplyOutcome::Discarded {
				sequence: first,
				latest_applied: second
			}
		);
		assert_eq!(book.get(&AuctionId::from("1")).unwrap().current_bid, 130_000);
	}

	#[test]
	fn test_detail_older_than_entry_is_discarded() {
		let book = AuctionBook::new();
		let detail_seq = book.next_sequence();
		let listing_seq = book.next_sequence();
		book.apply_listing(listing_seq, vec![snapshot("1", 130_000, 2)]);

		let outcome = book.apply_detail(detail_seq, snapshot("1", 110_000, 1));
		assert!(!outcome.is_applied());
		assert_eq!(book.get(&AuctionId::from("1")).unwrap().current_bid, 130_000);

		let newer = book.next_sequence();
		assert!(book.apply_detail(newer, snapshot("1", 140_000, 3)).is_applied());
		assert_eq!(book.get(&AuctionId::from("1")).unwrap().current_bid, 140_000);
	}

	#[test]
	fn test_detail_inserts_untracked_auction() {
		let book = AuctionBook::new();
		let seq = book.next_sequence();
		assert!(book.apply_detail(seq, snapshot("7", 100_000, 0)).is_applied());
		assert_eq!(book.snapshots().len(), 1);
	}

	#[test]
	fn test_late_detail_does_not_resurrect_dropped_auction() {
		let book = AuctionBook::new();
		let detail_seq = book.next_sequence();
		let listing_seq = book.next_sequence();
		book.apply_listing(listing_seq, vec![snapshot("1", 100_000, 0)]);

		assert!(!book
			.apply_detail(detail_seq, snapshot("7", 100_000, 0))
			.is_applied());
		assert!(book.get(&AuctionId::from("7")).is_none());
	}

	#[test]
	fn test_optimistic_entry_survives_older_listing_only() {
		let book = AuctionBook::new();
		let seq = book.next_sequence();
		book.apply_listing(seq, vec![snapshot("1", 140_000, 3)]);

		// A poll requested before the bid was accepted
		let in_flight_poll = book.next_sequence();

		let (_, entry) = book.apply_accepted_bid(&AuctionId::from("1"), 150_000, None);
		let entry = entry.unwrap();
		assert_eq!(entry.origin, EntryOrigin::Optimistic);
		assert_eq!(entry.snapshot.current_bid, 150_000);
		assert_eq!(entry.snapshot.bid_count, 4);

		book.apply_listing(in_flight_poll, vec![snapshot("1", 140_000, 3)]);
		let after_stale = book.entry(&AuctionId::from("1")).unwrap();
		assert_eq!(after_stale.origin, EntryOrigin::Optimistic);
		assert_eq!(after_stale.snapshot.current_bid, 150_000);

		// A poll requested after acceptance is authoritative
		let confirming_poll = book.next_sequence();
		book.apply_listing(confirming_poll, vec![snapshot("1", 150_000, 4)]);
		let confirmed = book.entry(&AuctionId::from("1")).unwrap();
		assert_eq!(confirmed.origin, EntryOrigin::Confirmed);
		assert_eq!(confirmed.snapshot.current_bid, 150_000);
		assert_eq!(confirmed.snapshot.bid_count, 4);
	}

	#[test]
	fn test_accepted_bid_prefers_server_body() {
		let book = AuctionBook::new();
		let seq = book.next_sequence();
		book.apply_listing(seq, vec![snapshot("1", 140_000, 3)]);

		let (first, entry) =
			book.apply_accepted_bid(&AuctionId::from("1"), 150_000, Some(snapshot("1", 150_000, 4)));
		let entry = entry.unwrap();
		assert_eq!(entry.version, first);
		assert_eq!(entry.origin, EntryOrigin::Confirmed);

		// A body that lags behind the accepted amount is not trusted
		let (second, entry) =
			book.apply_accepted_bid(&AuctionId::from("1"), 160_000, Some(snapshot("1", 150_000, 4)));
		let entry = entry.unwrap();
		assert!(second > first);
		assert_eq!(entry.origin, EntryOrigin::Optimistic);
		assert_eq!(entry.snapshot.current_bid, 160_000);
		assert_eq!(entry.snapshot.bid_count, 5);
	}

	#[test]
	fn test_accepted_bid_on_untracked_auction() {
		let book = AuctionBook::new();
		let (_, entry) = book.apply_accepted_bid(&AuctionId::from("404"), 1, None);
		assert!(entry.is_none());
		assert!(book.is_empty());
	}
}
