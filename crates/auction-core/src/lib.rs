//! Core coordination for dealer auctions.
//!
//! The [`AuctionBook`] holds the last applied state of every tracked
//! auction and decides which backend responses are still current. The
//! [`AuctionFetcher`] feeds it from the listing and detail endpoints, the
//! [`BidCoordinator`] validates and submits bids, and [`Countdown`] drives
//! per-auction timers. [`AuctionCoordinator`] wires them together behind
//! one event bus; every operation takes the [`ViewScope`] of the view that
//! asked for it, and results for unmounted views are dropped.

pub mod bidding;
pub mod book;
pub mod clock;
pub mod coordinator;
pub mod countdown;
pub mod error;
pub mod event_bus;
pub mod fetcher;
pub mod lifecycle;
pub mod utils;

#[cfg(test)]
mod mock;

pub use bidding::{parse_amount, validate_bid, BidCoordinator};
pub use book::{ApplyOutcome, AuctionBook, BookEntry, EntryOrigin};
pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{AuctionCoordinator, CoordinatorBuilder, DetailView, ListingView};
pub use countdown::{compute_remaining, format_remaining, Countdown, ExpiryLatch};
pub use error::CoreError;
pub use event_bus::EventBus;
pub use fetcher::AuctionFetcher;
pub use lifecycle::{ViewScope, ViewState};
