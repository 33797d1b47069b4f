//! Shared types for the dealer auction coordinator.
//!
//! Everything that crosses a crate boundary lives here: the normalized
//! auction model, the backend wire payloads that produce it, bid attempts,
//! countdown state, coordinator events and the common error type.

pub mod api;
pub mod auction;
pub mod bid;
pub mod common;
pub mod countdown;
pub mod errors;
pub mod events;

pub use auction::*;
pub use bid::*;
pub use common::*;
pub use countdown::*;
pub use errors::{AuctionError, Result};
pub use events::*;
