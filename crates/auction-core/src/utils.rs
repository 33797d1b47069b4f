//! # Core Utilities
//!
//! Helpers shared by the fetcher and the bid coordinator for bounding
//! backend calls and spacing out polls.

use auction_client::ClientError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Run a backend call with an upper bound on how long it may take.
///
/// # Arguments
/// * `limit` - Maximum time to wait for the call
/// * `call` - The backend future
///
/// # Returns
/// The call's own result, or a [`ClientError::Network`] once `limit` has
/// elapsed. An elapsed call is dropped, so its response can never be applied.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, ClientError>
where
	F: Future<Output = Result<T, ClientError>>,
{
	tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
		Err(ClientError::Network(format!(
			"request timed out after {}s",
			limit.as_secs()
		)))
	})
}

/// Delay before the next poll: the base interval plus up to `jitter` extra.
///
/// Keeps many open dashboards from polling the backend in lockstep.
pub fn jittered(interval: Duration, jitter: Duration) -> Duration {
	let jitter_ms = jitter.as_millis() as u64;
	if jitter_ms == 0 {
		return interval;
	}
	interval.saturating_add(Duration::from_millis(rand::rng().random_range(0..=jitter_ms)))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_jittered_stays_in_range() {
		let interval = Duration::from_secs(30);
		assert_eq!(jittered(interval, Duration::ZERO), interval);

		for _ in 0..100 {
			let delay = jittered(interval, Duration::from_millis(2_000));
			assert!(delay >= interval);
			assert!(delay <= interval + Duration::from_millis(2_000));
		}
	}

	#[test]
	fn test_jittered_saturates_on_huge_interval() {
		let interval = Duration::from_secs(u64::MAX);
		for _ in 0..20 {
			assert!(jittered(interval, Duration::from_millis(2_000)) >= interval);
		}
	}

	#[tokio::test]
	async fn test_with_timeout_reports_network_error() {
		tokio::time::pause();
		let slow = async {
			tokio::time::sleep(Duration::from_secs(60)).await;
			Ok::<_, ClientError>(1)
		};

		let result = with_timeout(Duration::from_secs(15), slow).await;
		match result {
			Err(ClientError::Network(message)) => {
				assert_eq!(message, "request timed out after 15s")
			}
			other => panic!("unexpected result: {other:?}"),
		}

		let fast = async { Ok::<_, ClientError>(2) };
		assert_eq!(with_timeout(Duration::from_secs(15), fast).await.unwrap(), 2);
	}
}
