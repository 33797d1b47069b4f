//! Subcommand handlers.

use anyhow::{Context, Result};
use auction_client::{AuctionBackend, HttpBackend};
use auction_config::AuctionConfig;
use auction_core::{AuctionCoordinator, CoordinatorBuilder, ListingView};
use auction_types::{
	format_sar, AuctionEvent, AuctionId, BidEvent, FetchEvent, NavigationEvent, PlacedBid,
};
use futures::future;
use std::future::Future;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

fn coordinator(config: AuctionConfig) -> Result<AuctionCoordinator> {
	CoordinatorBuilder::new(config)
		.build()
		.context("Failed to build auction coordinator")
}

/// Follows the live listing, re-rendering whenever the book changes.
pub async fn watch(config: AuctionConfig, shutdown: impl Future<Output = ()>) -> Result<()> {
	let coordinator = coordinator(config)?;
	let mut events = coordinator.subscribe();
	let mut view = coordinator.open_listing().await?;
	render_listing(&coordinator, &view);

	tokio::pin!(shutdown);
	loop {
		tokio::select! {
			_ = &mut shutdown => {
				info!("Shutdown signal received, closing listing");
				break;
			}
			event = events.recv() => match event {
				Ok(AuctionEvent::Fetch(FetchEvent::ListingReplaced { sequence, count })) => {
					debug!("Listing #{} replaced with {} auctions", sequence, count);
					view.sync(coordinator.book());
					render_listing(&coordinator, &view);
				}
				Ok(AuctionEvent::Fetch(FetchEvent::FetchFailed { message })) => {
					warn!("Could not refresh auctions: {}", message);
				}
				Ok(_) => {}
				Err(RecvError::Lagged(skipped)) => debug!("Skipped {} events", skipped),
				Err(RecvError::Closed) => break,
			}
		}
	}

	view.close().await?;
	Ok(())
}

/// Opens one auction and follows its countdown until it ends or the user
/// interrupts.
pub async fn detail(
	config: AuctionConfig,
	auction_id: AuctionId,
	shutdown: impl Future<Output = ()>,
) -> Result<()> {
	let coordinator = coordinator(config)?;
	let mut events = coordinator.subscribe();
	let mut view = coordinator.open_detail(&auction_id).await?;
	let snapshot = &view.snapshot;

	let car_details = async {
		match &snapshot.car.car_id {
			Some(car_id) => coordinator.fetcher().fetch_car_details(car_id).await,
			None => Ok(None),
		}
	};
	let (car_details, placed) =
		future::join(car_details, coordinator.fetcher().fetch_placed_bids()).await;

	println!("{}", snapshot.title());
	println!(
		"  Current bid {} ({} bids, started at {})",
		format_sar(snapshot.current_bid),
		snapshot.bid_count,
		format_sar(snapshot.starting_bid)
	);
	match car_details {
		Ok(Some(details)) => println!(
			"  {} km, {}, {} ({} photos)",
			details.summary.mileage,
			details.summary.transmission,
			details.summary.location,
			details.images.len()
		),
		Ok(None) => {}
		Err(e) => warn!("Vehicle details unavailable: {}", e),
	}
	if let Ok(placed) = placed {
		for bid in placed
			.iter()
			.filter(|b| b.auction_id.as_ref() == Some(&auction_id))
		{
			println!("  Your bid: {}", placed_bid_line(bid));
		}
	}

	let mut countdown = view.countdown.subscribe();
	println!("  Ends in {}", countdown.borrow().display_text);

	let mut refresh = tokio::time::interval(coordinator.config().polling.interval());
	refresh.tick().await;

	tokio::pin!(shutdown);
	loop {
		tokio::select! {
			_ = &mut shutdown => {
				info!("Shutdown signal received, closing auction {}", auction_id);
				break;
			}
			_ = refresh.tick() => {
				// An ended auction answers with StaleAuction and a navigation event
				match coordinator.fetcher().fetch_auction_detail(&auction_id, &view.scope).await {
					Ok(snapshot) => {
						if snapshot.current_bid != view.snapshot.current_bid {
							println!("  Current bid {}", format_sar(snapshot.current_bid));
						}
						view.refresh(snapshot);
					}
					Err(e) => debug!("Detail refresh for auction {} failed: {}", auction_id, e),
				}
			}
			changed = countdown.changed() => {
				if changed.is_err() {
					break;
				}
				let state = countdown.borrow_and_update().clone();
				debug!("Auction {} ends in {}", auction_id, state.display_text);
			}
			event = events.recv() => match event {
				Ok(AuctionEvent::Navigation(NavigationEvent::ReturnToListing { reason, .. })) => {
					println!("Auction {} closed ({:?}), returning to the listing", auction_id, reason);
					break;
				}
				Ok(_) => {}
				Err(RecvError::Lagged(skipped)) => debug!("Skipped {} events", skipped),
				Err(RecvError::Closed) => break,
			}
		}
	}

	view.close()?;
	Ok(())
}

/// Places one bid and reports the outcome.
pub async fn bid(config: AuctionConfig, auction_id: AuctionId, amount: &str) -> Result<()> {
	let coordinator = coordinator(config)?;
	let mut events = coordinator.subscribe();
	let view = coordinator.open_detail(&auction_id).await?;

	let result = coordinator
		.bids()
		.submit_bid(&auction_id, amount, &view.scope)
		.await;
	view.close()?;

	match result {
		Ok(receipt) => {
			println!(
				"Bid of {} accepted on auction {}",
				format_sar(receipt.attempt.amount),
				auction_id
			);
			Ok(())
		}
		Err(e) if e.is_validation() => {
			anyhow::bail!("Bid not sent: {}", e)
		}
		Err(e) => {
			// Prefer the message that went out on the bus; it is what a view shows
			while let Ok(event) = events.try_recv() {
				if let AuctionEvent::Bid(BidEvent::Rejected { message, .. }) = event {
					error!("Bid rejected: {}", message);
				}
			}
			Err(e).context(format!("Bid on auction {} failed", auction_id))
		}
	}
}

/// Prints the dealer's own bids.
pub async fn placed_bids(config: AuctionConfig) -> Result<()> {
	let coordinator = coordinator(config)?;
	let bids = coordinator
		.fetcher()
		.fetch_placed_bids()
		.await
		.context("Failed to load placed bids")?;

	if bids.is_empty() {
		println!("No bids placed yet");
	}
	for bid in &bids {
		println!("{}", placed_bid_line(bid));
	}
	Ok(())
}

/// Signs in and prints the access token to use as `AUCTION_API_TOKEN`.
pub async fn login(config: AuctionConfig, email: &str, password: &str) -> Result<()> {
	let backend = HttpBackend::new(&config.backend).context("Failed to create HTTP client")?;
	let tokens = backend
		.sign_in(email, password)
		.await
		.context("Sign-in failed")?;

	let placed = backend
		.with_token(tokens.access_token.clone())
		.placed_bids()
		.await
		.context("Signed in, but the access token was refused")?;

	info!("Signed in as {} ({} bids placed)", email, placed.len());
	println!("{}", tokens.access_token);
	Ok(())
}

pub fn validate(config: &AuctionConfig) {
	info!("Configuration is valid");
	info!("Backend: {}{}", config.backend.base_url, config.backend.api_prefix);
	info!(
		"Polling every {}s ({}ms jitter, policy {})",
		config.polling.interval_secs, config.polling.jitter_ms, config.polling.policy
	);
	info!(
		"Request timeout: {}s, return to listing on accept: {}",
		config.backend.request_timeout_secs, config.bidding.return_to_listing_on_accept
	);
}

fn render_listing(coordinator: &AuctionCoordinator, view: &ListingView) {
	let snapshots = coordinator.book().snapshots();
	if snapshots.is_empty() {
		println!("No live auctions");
		return;
	}

	for snapshot in &snapshots {
		let remaining = view
			.countdown(&snapshot.auction_id)
			.map(|c| c.display_text)
			.unwrap_or_default();
		println!(
			"[{}] {} | {} | {} bids | {}",
			snapshot.auction_id,
			snapshot.title(),
			format_sar(snapshot.current_bid),
			snapshot.bid_count,
			remaining
		);
	}
}

fn placed_bid_line(bid: &PlacedBid) -> String {
	let auction = bid
		.auction_id
		.as_ref()
		.map(|id| id.to_string())
		.unwrap_or_else(|| "-".to_string());
	let placed_at = bid
		.placed_at
		.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
		.unwrap_or_default();

	format!(
		"{} auction {} {} {} {}",
		bid.bid_id,
		auction,
		format_sar(bid.amount),
		bid.status,
		placed_at
	)
	.trim_end()
	.to_string()
}
