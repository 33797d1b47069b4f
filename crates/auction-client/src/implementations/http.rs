//! REST implementation of [`AuctionBackend`] on top of `reqwest`.

use crate::{AuctionBackend, ClientError};
use async_trait::async_trait;
use auction_config::BackendConfig;
use auction_types::api::{
	normalize_listing, AuctionRecord, AuthTokens, CarDetailsResponse, ErrorBody,
	ListAuctionsQuery, ListAuctionsResponse, PlaceBidRequest, PlacedBidRecord,
	PlacedBidsResponse, SignInRequest,
};
use auction_types::{Amount, AuctionId, AuctionSnapshot, CarDetails, PlacedBid};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, instrument, warn};

/// HTTP client for the dealer auction API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
	client: Client,
	base_url: String,
	api_prefix: String,
	token: Option<String>,
}

impl HttpBackend {
	/// Builds a client whose every request is bounded by the configured
	/// request timeout.
	pub fn new(config: &BackendConfig) -> Result<Self, ClientError> {
		let mut headers = HeaderMap::new();
		headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

		let client = Client::builder()
			.default_headers(headers)
			.timeout(config.request_timeout())
			.build()
			.map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {}", e)))?;

		debug!(
			"HTTP backend initialized - Base URL: {}, prefix: {}, timeout: {}s",
			config.base_url, config.api_prefix, config.request_timeout_secs
		);

		Ok(Self {
			client,
			base_url: config.base_url.trim_end_matches('/').to_string(),
			api_prefix: config.api_prefix.trim_end_matches('/').to_string(),
			token: config.token.clone().filter(|t| !t.is_empty()),
		})
	}

	pub fn with_token(mut self, token: impl Into<String>) -> Self {
		self.token = Some(token.into());
		self
	}

	/// `POST /auth/sign-in`. Lives outside the versioned prefix.
	#[instrument(skip(self, password))]
	pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthTokens, ClientError> {
		let url = format!("{}/auth/sign-in", self.base_url);
		let body = SignInRequest {
			email: email.to_string(),
			password: password.to_string(),
		};
		let response = self.send(self.client.post(&url).json(&body)).await?;
		let tokens: AuthTokens = Self::parse_json(response).await?;
		info!("Signed in as {}", email);
		Ok(tokens)
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}{}", self.base_url, self.api_prefix, path)
	}

	async fn get<T, Q>(&self, path: &str, query: Option<&Q>) -> Result<T, ClientError>
	where
		T: DeserializeOwned,
		Q: Serialize + ?Sized,
	{
		let mut request = self.client.get(self.url(path));
		if let Some(query) = query {
			request = request.query(query);
		}
		let response = self.send(request).await?;
		Self::parse_json(response).await
	}

	async fn send(&self, mut request: RequestBuilder) -> Result<Response, ClientError> {
		if let Some(token) = &self.token {
			request = request.bearer_auth(token);
		}

		let response = request.send().await.map_err(|e| {
			if e.is_timeout() {
				ClientError::Network("request timed out".to_string())
			} else {
				ClientError::Network(e.to_string())
			}
		})?;

		if response.status().is_success() {
			return Ok(response);
		}

		let status = response.status().as_u16();
		let text = response.text().await.unwrap_or_default();
		let message = serde_json::from_str::<ErrorBody>(&text)
			.ok()
			.and_then(|body| body.message());
		debug!("Request failed with status {}: {}", status, text);

		Err(ClientError::Rejected { status, message })
	}

	async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
		response
			.json::<T>()
			.await
			.map_err(|e| ClientError::InvalidResponse(e.to_string()))
	}
}

#[async_trait]
impl AuctionBackend for HttpBackend {
	#[instrument(skip(self))]
	async fn list_live_auctions(
		&self,
		query: &ListAuctionsQuery,
	) -> Result<Vec<AuctionSnapshot>, ClientError> {
		let response: ListAuctionsResponse = self.get("/auction", Some(query)).await?;
		Ok(normalize_listing(response.data))
	}

	#[instrument(skip(self))]
	async fn get_auction(&self, auction_id: &AuctionId) -> Result<AuctionSnapshot, ClientError> {
		let record: AuctionRecord = self
			.get::<_, ()>(&format!("/auction/{}", auction_id), None)
			.await?;
		Ok(record.normalize()?)
	}

	#[instrument(skip(self))]
	async fn place_bid(
		&self,
		auction_id: &AuctionId,
		amount: Amount,
	) -> Result<Option<AuctionSnapshot>, ClientError> {
		let url = self.url(&format!("/auction/{}/bid", auction_id));
		let response = self
			.send(self.client.post(&url).json(&PlaceBidRequest { amount }))
			.await?;

		let text = response
			.text()
			.await
			.map_err(|e| ClientError::Network(e.to_string()))?;
		if text.trim().is_empty() {
			return Ok(None);
		}

		// Acceptance bodies vary; only a record that normalizes is used
		match serde_json::from_str::<AuctionRecord>(&text).map(AuctionRecord::normalize) {
			Ok(Ok(snapshot)) => Ok(Some(snapshot)),
			_ => {
				debug!("Bid accepted without an auction payload");
				Ok(None)
			}
		}
	}

	#[instrument(skip(self))]
	async fn get_car_details(&self, car_id: &str) -> Result<Option<CarDetails>, ClientError> {
		let response: CarDetailsResponse = self
			.get::<_, ()>(&format!("/car/car-details/{}", car_id), None)
			.await?;
		Ok(response.normalize())
	}

	#[instrument(skip(self))]
	async fn placed_bids(&self) -> Result<Vec<PlacedBid>, ClientError> {
		let response: PlacedBidsResponse = self.get::<_, ()>("/auction/bid/placed", None).await?;
		let records = response.into_records();
		let total = records.len();
		let bids: Vec<PlacedBid> = records
			.into_iter()
			.filter_map(PlacedBidRecord::normalize)
			.collect();
		if bids.len() < total {
			warn!("Dropped {} placed bids without an id", total - bids.len());
		}
		Ok(bids)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use wiremock::matchers::{body_json, header, method, path, query_param};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn backend(server: &MockServer) -> HttpBackend {
		let config = BackendConfig {
			base_url: format!("{}/api", server.uri()),
			token: Some("test-token".to_string()),
			request_timeout_secs: 1,
			..BackendConfig::default()
		};
		HttpBackend::new(&config).expect("client creation")
	}

	fn auction_json(id: u64, current_bid: u64) -> serde_json::Value {
		json!({
			"id": id,
			"endTime": "2030-01-01T00:00:00.000Z",
			"status": "LIVE",
			"startingPrice": 100000,
			"currentBid": current_bid,
			"bidCount": 1,
			"car": { "id": 5, "make": "Lexus", "model": "LX", "year": 2024 }
		})
	}

	#[tokio::test]
	async fn list_live_auctions_sends_query_and_token() {
		let mock_server = MockServer::start().await;

		Mock::given(method("GET"))
			.and(path("/api/1.0/auction"))
			.and(query_param("status", "LIVE"))
			.and(query_param("page", "1"))
			.and(query_param("limit", "10"))
			.and(header("authorization", "Bearer test-token"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"data": [auction_json(1, 120000), { "id": 2 }],
				"total": 2
			})))
			.expect(1)
			.mount(&mock_server)
			.await;

		let auctions = backend(&mock_server)
			.list_live_auctions(&ListAuctionsQuery::default())
			.await
			.unwrap();

		assert_eq!(auctions.len(), 1);
		assert_eq!(auctions[0].auction_id, AuctionId::from("1"));
		assert_eq!(auctions[0].current_bid, 120000);
		assert_eq!(auctions[0].car.make, "Lexus");
	}

	#[tokio::test]
	async fn get_auction_maps_not_found_message() {
		let mock_server = MockServer::start().await;

		Mock::given(method("GET"))
			.and(path("/api/1.0/auction/404"))
			.respond_with(
				ResponseTemplate::new(404).set_body_json(json!({ "message": "Auction not found" })),
			)
			.mount(&mock_server)
			.await;

		let err = backend(&mock_server)
			.get_auction(&AuctionId::from("404"))
			.await
			.unwrap_err();

		assert!(err.is_not_found());
		match err {
			ClientError::Rejected { message, .. } => {
				assert_eq!(message.as_deref(), Some("Auction not found"))
			}
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[tokio::test]
	async fn place_bid_posts_amount_and_reads_updated_auction() {
		let mock_server = MockServer::start().await;

		Mock::given(method("POST"))
			.and(path("/api/1.0/auction/7/bid"))
			.and(body_json(json!({ "amount": 150000 })))
			.respond_with(ResponseTemplate::new(202).set_body_json(auction_json(7, 150000)))
			.expect(1)
			.mount(&mock_server)
			.await;

		let updated = backend(&mock_server)
			.place_bid(&AuctionId::from("7"), 150000)
			.await
			.unwrap()
			.expect("auction payload");
		assert_eq!(updated.current_bid, 150000);
	}

	#[tokio::test]
	async fn place_bid_accepts_empty_body() {
		let mock_server = MockServer::start().await;

		Mock::given(method("POST"))
			.and(path("/api/1.0/auction/7/bid"))
			.respond_with(ResponseTemplate::new(200))
			.mount(&mock_server)
			.await;

		let updated = backend(&mock_server)
			.place_bid(&AuctionId::from("7"), 150000)
			.await
			.unwrap();
		assert!(updated.is_none());
	}

	#[tokio::test]
	async fn place_bid_rejection_keeps_backend_message() {
		let mock_server = MockServer::start().await;

		Mock::given(method("POST"))
			.and(path("/api/1.0/auction/7/bid"))
			.respond_with(ResponseTemplate::new(400).set_body_json(
				json!({ "message": "Bid amount must be higher than current bid" }),
			))
			.mount(&mock_server)
			.await;

		let err = backend(&mock_server)
			.place_bid(&AuctionId::from("7"), 10)
			.await
			.unwrap_err();
		assert_eq!(
			err.to_string(),
			"Request rejected with status 400: Bid amount must be higher than current bid"
		);
	}

	#[tokio::test]
	async fn slow_response_times_out_as_network_error() {
		let mock_server = MockServer::start().await;

		Mock::given(method("GET"))
			.and(path("/api/1.0/auction/1"))
			.respond_with(
				ResponseTemplate::new(200)
					.set_body_json(auction_json(1, 1))
					.set_delay(std::time::Duration::from_secs(3)),
			)
			.mount(&mock_server)
			.await;

		let err = backend(&mock_server)
			.get_auction(&AuctionId::from("1"))
			.await
			.unwrap_err();
		assert!(matches!(err, ClientError::Network(_)));
	}

	#[tokio::test]
	async fn car_details_and_placed_bids() {
		let mock_server = MockServer::start().await;

		Mock::given(method("GET"))
			.and(path("/api/1.0/car/car-details/5"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"car": { "id": 5, "make": "Lexus", "images": ["https://cdn/lx.jpg"] }
			})))
			.mount(&mock_server)
			.await;

		Mock::given(method("GET"))
			.and(path("/api/1.0/auction/bid/placed"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!([
				{ "id": 1, "auctionId": 7, "amount": 180000, "status": "pending" },
				{ "amount": 5 }
			])))
			.mount(&mock_server)
			.await;

		let backend = backend(&mock_server);
		let details = backend.get_car_details("5").await.unwrap().unwrap();
		assert_eq!(details.summary.make, "Lexus");
		assert_eq!(details.images, vec!["https://cdn/lx.jpg"]);

		let bids = backend.placed_bids().await.unwrap();
		assert_eq!(bids.len(), 1);
		assert_eq!(bids[0].amount, 180000);
	}

	#[tokio::test]
	async fn sign_in_uses_unversioned_path() {
		let mock_server = MockServer::start().await;

		Mock::given(method("POST"))
			.and(path("/api/auth/sign-in"))
			.and(body_json(json!({ "email": "dealer@example.com", "password": "pw" })))
			.respond_with(ResponseTemplate::new(201).set_body_json(json!({
				"access_token": "new-access",
				"refresh_token": "new-refresh",
				"id": 3
			})))
			.expect(1)
			.mount(&mock_server)
			.await;

		let tokens = backend(&mock_server)
			.sign_in("dealer@example.com", "pw")
			.await
			.unwrap();
		assert_eq!(tokens.access_token, "new-access");
		assert_eq!(tokens.refresh_token.as_deref(), Some("new-refresh"));
	}
}
