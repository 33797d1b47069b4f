//! Backend wire payloads and their normalization.
//!
//! The backend is loose about its payloads: ids arrive as numbers or
//! strings, amounts sometimes as strings, and most fields may be missing or
//! null. Every record type here is fully optional and carries a single
//! `normalize` function that produces the populated model type from
//! [`crate::auction`]. Nothing downstream ever sees a raw record.

use crate::auction::{
	AuctionSnapshot, AuctionStatus, BidHistoryEntry, CarDetails, CarSummary, InspectionReport,
	PlacedBid, PlacedBidStatus,
};
use crate::common::{Amount, AuctionId};
use crate::errors::{AuctionError, Result};
use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

const DEFAULT_COVER_IMAGE: &str =
	"https://images.pexels.com/photos/120049/pexels-photo-120049.jpeg?auto=compress&cs=tinysrgb&w=800";
const UNKNOWN: &str = "Unknown";
const NO_INSPECTION_DATA: &str = "No data available";

/// Query string of the listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListAuctionsQuery {
	pub status: String,
	pub search: String,
	pub page: u32,
	pub limit: u32,
}

impl Default for ListAuctionsQuery {
	fn default() -> Self {
		Self {
			status: "LIVE".to_string(),
			search: String::new(),
			page: 1,
			limit: 10,
		}
	}
}

/// Paginated listing envelope. Only `data` is consumed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListAuctionsResponse {
	pub data: Vec<AuctionRecord>,
	#[serde(deserialize_with = "lenient::amount")]
	pub total: Option<u64>,
}

/// Raw auction record as served by the listing and detail endpoints.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuctionRecord {
	pub id: Option<Value>,
	pub end_time: Option<String>,
	pub status: Option<String>,
	#[serde(deserialize_with = "lenient::amount")]
	pub starting_price: Option<Amount>,
	#[serde(deserialize_with = "lenient::amount")]
	pub start_price: Option<Amount>,
	#[serde(deserialize_with = "lenient::amount")]
	pub current_bid: Option<Amount>,
	#[serde(deserialize_with = "lenient::amount")]
	pub highest_bid: Option<Amount>,
	#[serde(deserialize_with = "lenient::amount")]
	pub bid_count: Option<u64>,
	pub cover_image: Option<String>,
	pub car: Option<CarRecord>,
	pub bid_history: Option<Vec<BidHistoryRecord>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CarRecord {
	pub id: Option<Value>,
	pub make: Option<String>,
	pub model: Option<String>,
	#[serde(deserialize_with = "lenient::amount")]
	pub year: Option<u64>,
	#[serde(deserialize_with = "lenient::amount")]
	pub mileage: Option<u64>,
	pub condition: Option<String>,
	pub vin: Option<String>,
	pub engine: Option<String>,
	pub transmission: Option<String>,
	pub location: Option<String>,
	pub color: Option<String>,
	pub fuel_type: Option<String>,
	pub drivetrain: Option<String>,
	pub body_type: Option<String>,
	#[serde(deserialize_with = "lenient::amount")]
	pub doors: Option<u64>,
	#[serde(deserialize_with = "lenient::amount")]
	pub seats: Option<u64>,
	pub features: Option<Vec<Value>>,
	pub inspection_report: Option<InspectionRecord>,
	#[serde(rename = "Inspection")]
	pub inspections: Option<Vec<InspectionEntry>>,
	pub images: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct InspectionRecord {
	pub exterior: Option<String>,
	pub interior: Option<String>,
	pub mechanical: Option<String>,
	pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InspectionEntry {
	pub inspection_json: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BidHistoryRecord {
	#[serde(deserialize_with = "lenient::amount")]
	pub amount: Option<Amount>,
	pub bidder: Option<String>,
	pub timestamp: Option<String>,
}

/// Body of `GET /car/car-details/{carId}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CarDetailsResponse {
	pub car: Option<CarRecord>,
	pub images: Option<Vec<Value>>,
}

/// Body of `POST /auction/{id}/bid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceBidRequest {
	pub amount: Amount,
}

/// Error body the backend attaches to rejections.
///
/// `message` is either a string or, for request validation failures, a list
/// of strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ErrorBody {
	pub message: Option<Value>,
}

impl ErrorBody {
	pub fn message(&self) -> Option<String> {
		match self.message.as_ref()? {
			Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
			Value::Array(items) => {
				let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
				if parts.is_empty() {
					None
				} else {
					Some(parts.join("; "))
				}
			}
			_ => None,
		}
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct SignInRequest {
	pub email: String,
	pub password: String,
}

/// Tokens returned by the sign-in endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthTokens {
	pub access_token: String,
	#[serde(default)]
	pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlacedBidRecord {
	pub id: Option<Value>,
	pub auction_id: Option<Value>,
	#[serde(deserialize_with = "lenient::amount")]
	pub amount: Option<Amount>,
	pub status: Option<String>,
	pub created_at: Option<String>,
	pub date: Option<String>,
}

/// The placed-bids endpoint returns either a bare array or a `data` envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PlacedBidsResponse {
	List(Vec<PlacedBidRecord>),
	Envelope { data: Vec<PlacedBidRecord> },
}

impl PlacedBidsResponse {
	pub fn into_records(self) -> Vec<PlacedBidRecord> {
		match self {
			Self::List(records) | Self::Envelope { data: records } => records,
		}
	}
}

impl AuctionRecord {
	/// Produces a fully populated snapshot.
	///
	/// Fails only when the record has no usable id or end time; everything
	/// else has a defined default.
	pub fn normalize(self) -> Result<AuctionSnapshot> {
		let auction_id = self
			.id
			.as_ref()
			.and_then(lenient::value_to_text)
			.map(AuctionId::new)
			.ok_or_else(|| AuctionError::InvalidPayload("auction record has no id".to_string()))?;

		let end_time = self
			.end_time
			.as_deref()
			.ok_or_else(|| {
				AuctionError::InvalidPayload(format!("auction {} has no endTime", auction_id))
			})
			.and_then(parse_instant)?;

		let status = parse_status(self.status.as_deref(), &auction_id);

		// Zero counts as missing, matching how the dashboard chained its fallbacks
		let starting = nonzero(self.starting_price).or(nonzero(self.start_price));
		let current = nonzero(self.current_bid)
			.or(nonzero(self.start_price))
			.or(starting)
			.unwrap_or(0);
		let starting_bid = starting.unwrap_or(current);
		let bid_count = self.bid_count.unwrap_or(0);
		let current_bid = current.max(starting_bid);
		let highest_bid = nonzero(self.highest_bid)
			.unwrap_or(current_bid)
			.max(current_bid);

		if bid_count == 0 && current_bid != starting_bid {
			warn!(
				"Auction {} reports current bid {} with no bids over starting bid {}",
				auction_id, current_bid, starting_bid
			);
		}

		let bid_history = self
			.bid_history
			.unwrap_or_default()
			.into_iter()
			.map(BidHistoryRecord::normalize)
			.collect();

		Ok(AuctionSnapshot {
			auction_id,
			end_time,
			status,
			starting_bid,
			current_bid,
			highest_bid,
			bid_count,
			cover_image: text_or(self.cover_image, DEFAULT_COVER_IMAGE),
			car: self.car.unwrap_or_default().normalize(),
			bid_history,
		})
	}
}

/// Normalizes a listing page, skipping records that cannot be normalized.
pub fn normalize_listing(records: Vec<AuctionRecord>) -> Vec<AuctionSnapshot> {
	let total = records.len();
	let snapshots: Vec<AuctionSnapshot> = records
		.into_iter()
		.filter_map(|record| match record.normalize() {
			Ok(snapshot) => Some(snapshot),
			Err(e) => {
				warn!("Skipping auction record: {}", e);
				None
			}
		})
		.collect();
	debug!("Normalized {}/{} auction records", snapshots.len(), total);
	snapshots
}

impl CarRecord {
	pub fn normalize(self) -> CarSummary {
		let report = self.inspection_report.unwrap_or_default();
		CarSummary {
			car_id: self.id.as_ref().and_then(lenient::value_to_text),
			make: text_or(self.make, UNKNOWN),
			model: text_or(self.model, UNKNOWN),
			year: nonzero(self.year)
				.and_then(|y| i32::try_from(y).ok())
				.unwrap_or_else(|| Utc::now().year()),
			mileage: self.mileage.unwrap_or(0),
			condition: text_or(self.condition, UNKNOWN),
			vin: text_or(self.vin, UNKNOWN),
			engine: text_or(self.engine, UNKNOWN),
			transmission: text_or(self.transmission, "Automatic"),
			location: text_or(self.location, "Saudi Arabia"),
			color: text_or(self.color, UNKNOWN),
			fuel_type: text_or(self.fuel_type, "Petrol"),
			drivetrain: text_or(self.drivetrain, UNKNOWN),
			body_type: text_or(self.body_type, UNKNOWN),
			doors: small_count(self.doors, 4),
			seats: small_count(self.seats, 5),
			features: self
				.features
				.unwrap_or_default()
				.iter()
				.filter_map(lenient::value_to_text)
				.collect(),
			inspection_report: InspectionReport {
				exterior: text_or(report.exterior, NO_INSPECTION_DATA),
				interior: text_or(report.interior, NO_INSPECTION_DATA),
				mechanical: text_or(report.mechanical, NO_INSPECTION_DATA),
				notes: text_or(report.notes, "No additional notes"),
			},
		}
	}
}

impl BidHistoryRecord {
	pub fn normalize(self) -> BidHistoryEntry {
		BidHistoryEntry {
			amount: self.amount.unwrap_or(0),
			bidder: text_or(self.bidder, UNKNOWN),
			timestamp: self
				.timestamp
				.as_deref()
				.and_then(|raw| parse_instant(raw).ok())
				.unwrap_or_else(Utc::now),
		}
	}
}

impl CarDetailsResponse {
	/// Returns `None` when the response carries no car at all.
	pub fn normalize(self) -> Option<CarDetails> {
		let car = self.car?;

		let inspection = car
			.inspections
			.as_ref()
			.and_then(|entries| entries.first())
			.and_then(|entry| entry.inspection_json.clone());

		// Top-level images win over the car's own list
		let images = match self.images {
			Some(images) if !images.is_empty() => images.iter().filter_map(image_url).collect(),
			_ => car
				.images
				.as_ref()
				.map(|images| images.iter().filter_map(image_url).collect())
				.unwrap_or_default(),
		};

		Some(CarDetails {
			summary: car.normalize(),
			images,
			inspection,
		})
	}
}

impl PlacedBidRecord {
	pub fn normalize(self) -> Option<PlacedBid> {
		let bid_id = self.id.as_ref().and_then(lenient::value_to_text)?;
		let status = match self.status.as_deref().map(str::to_ascii_lowercase).as_deref() {
			Some("pending") | None => PlacedBidStatus::Pending,
			Some("accepted") => PlacedBidStatus::Accepted,
			Some("rejected") => PlacedBidStatus::Rejected,
			Some("won") => PlacedBidStatus::Won,
			Some(other) => PlacedBidStatus::Other(other.to_string()),
		};
		let placed_at = self
			.created_at
			.or(self.date)
			.and_then(|raw| parse_instant(&raw).ok());

		Some(PlacedBid {
			bid_id,
			auction_id: self
				.auction_id
				.as_ref()
				.and_then(lenient::value_to_text)
				.map(AuctionId::new),
			amount: self.amount.unwrap_or(0),
			status,
			placed_at,
		})
	}
}

/// Parses an ISO-8601 instant. Timestamps without an offset are taken as UTC.
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
	let raw = raw.trim();
	if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
		return Ok(parsed.with_timezone(&Utc));
	}
	NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
		.map(|naive| naive.and_utc())
		.map_err(|e| AuctionError::InvalidPayload(format!("invalid timestamp '{}': {}", raw, e)))
}

fn parse_status(raw: Option<&str>, auction_id: &AuctionId) -> AuctionStatus {
	match raw.map(|s| s.trim().to_ascii_uppercase()).as_deref() {
		None | Some("LIVE") => AuctionStatus::Live,
		Some("ENDED") => AuctionStatus::Ended,
		Some(other) => {
			warn!(
				"Auction {} has unrecognized status '{}', treating as LIVE",
				auction_id, other
			);
			AuctionStatus::Live
		}
	}
}

fn nonzero(value: Option<u64>) -> Option<u64> {
	value.filter(|v| *v > 0)
}

fn text_or(value: Option<String>, default: &str) -> String {
	value
		.filter(|s| !s.trim().is_empty())
		.unwrap_or_else(|| default.to_string())
}

fn small_count(value: Option<u64>, default: u32) -> u32 {
	nonzero(value)
		.and_then(|v| u32::try_from(v).ok())
		.unwrap_or(default)
}

fn image_url(value: &Value) -> Option<String> {
	match value {
		Value::String(url) => Some(url.clone()),
		Value::Object(map) => map
			.get("url")
			.or_else(|| map.get("imageUrl"))
			.and_then(Value::as_str)
			.map(str::to_string),
		_ => None,
	}
}

/// Deserializers tolerant of the backend's mixed number/string encoding.
mod lenient {
	use serde::{Deserialize, Deserializer};
	use serde_json::Value;

	pub fn amount<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
	where
		D: Deserializer<'de>,
	{
		let value = Option::<Value>::deserialize(deserializer)?;
		Ok(value.as_ref().and_then(value_to_amount))
	}

	pub fn value_to_amount(value: &Value) -> Option<u64> {
		let as_whole = |f: f64| (f.is_finite() && f >= 0.0).then(|| f.floor() as u64);
		match value {
			Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(as_whole)),
			Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok().and_then(as_whole),
			_ => None,
		}
	}

	pub fn value_to_text(value: &Value) -> Option<String> {
		match value {
			Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
			Value::Number(n) => Some(n.to_string()),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn record(value: Value) -> AuctionRecord {
		serde_json::from_value(value).unwrap()
	}

	#[test]
	fn test_normalize_full_record() {
		let snapshot = record(json!({
			"id": 12,
			"endTime": "2030-01-01T00:00:00.000Z",
			"status": "LIVE",
			"startingPrice": 100000,
			"currentBid": "140000",
			"highestBid": 145000,
			"bidCount": 3,
			"car": { "id": 99, "make": "Toyota", "model": "Land Cruiser", "year": 2022 }
		}))
		.normalize()
		.unwrap();

		assert_eq!(snapshot.auction_id, AuctionId::from("12"));
		assert_eq!(snapshot.status, AuctionStatus::Live);
		assert_eq!(snapshot.starting_bid, 100_000);
		assert_eq!(snapshot.current_bid, 140_000);
		assert_eq!(snapshot.highest_bid, 145_000);
		assert_eq!(snapshot.bid_count, 3);
		assert_eq!(snapshot.car.car_id.as_deref(), Some("99"));
		assert_eq!(snapshot.title(), "2022 Toyota Land Cruiser");
	}

	#[test]
	fn test_normalize_applies_defaults() {
		let snapshot = record(json!({
			"id": "a-1",
			"endTime": "2030-01-01T00:00:00Z",
			"startPrice": 50000,
			"car": null
		}))
		.normalize()
		.unwrap();

		assert_eq!(snapshot.starting_bid, 50_000);
		assert_eq!(snapshot.current_bid, 50_000);
		assert_eq!(snapshot.highest_bid, 50_000);
		assert_eq!(snapshot.bid_count, 0);
		assert_eq!(snapshot.cover_image, DEFAULT_COVER_IMAGE);
		assert_eq!(snapshot.car.make, "Unknown");
		assert_eq!(snapshot.car.transmission, "Automatic");
		assert_eq!(snapshot.car.location, "Saudi Arabia");
		assert_eq!(snapshot.car.doors, 4);
		assert_eq!(snapshot.car.seats, 5);
		assert_eq!(snapshot.car.inspection_report.notes, "No additional notes");
		assert!(snapshot.bid_history.is_empty());
	}

	#[test]
	fn test_highest_never_below_current() {
		let snapshot = record(json!({
			"id": 1,
			"endTime": "2030-01-01T00:00:00Z",
			"startingPrice": 100,
			"currentBid": 300,
			"highestBid": 200,
			"bidCount": 2
		}))
		.normalize()
		.unwrap();
		assert_eq!(snapshot.highest_bid, 300);
	}

	#[test]
	fn test_status_ended_is_recognized() {
		let snapshot = record(json!({
			"id": 1,
			"endTime": "2030-01-01T00:00:00Z",
			"status": "ended"
		}))
		.normalize()
		.unwrap();
		assert_eq!(snapshot.status, AuctionStatus::Ended);
	}

	#[test]
	fn test_missing_id_or_end_time_is_rejected() {
		let err = record(json!({ "endTime": "2030-01-01T00:00:00Z" }))
			.normalize()
			.unwrap_err();
		assert!(matches!(err, AuctionError::InvalidPayload(_)));

		let err = record(json!({ "id": 1 })).normalize().unwrap_err();
		assert!(matches!(err, AuctionError::InvalidPayload(_)));

		let err = record(json!({ "id": 1, "endTime": "tomorrow" }))
			.normalize()
			.unwrap_err();
		assert!(matches!(err, AuctionError::InvalidPayload(_)));
	}

	#[test]
	fn test_normalize_listing_skips_bad_records() {
		let response: ListAuctionsResponse = serde_json::from_value(json!({
			"data": [
				{ "id": 1, "endTime": "2030-01-01T00:00:00Z" },
				{ "id": 2 },
				{ "id": 3, "endTime": "2030-01-02T00:00:00" }
			],
			"total": 3
		}))
		.unwrap();

		let snapshots = normalize_listing(response.data);
		let ids: Vec<&str> = snapshots.iter().map(|s| s.auction_id.as_str()).collect();
		assert_eq!(ids, vec!["1", "3"]);
	}

	#[test]
	fn test_naive_timestamp_is_utc() {
		let parsed = parse_instant("2025-09-01T14:30:00").unwrap();
		assert_eq!(parsed.to_rfc3339(), "2025-09-01T14:30:00+00:00");
	}

	#[test]
	fn test_error_body_message_forms() {
		let body: ErrorBody = serde_json::from_value(json!({ "message": "Bid too low" })).unwrap();
		assert_eq!(body.message().as_deref(), Some("Bid too low"));

		let body: ErrorBody =
			serde_json::from_value(json!({ "message": ["amount must be positive", "x"] })).unwrap();
		assert_eq!(body.message().as_deref(), Some("amount must be positive; x"));

		let body: ErrorBody = serde_json::from_value(json!({ "statusCode": 500 })).unwrap();
		assert_eq!(body.message(), None);
	}

	#[test]
	fn test_car_details_images_and_inspection() {
		let response: CarDetailsResponse = serde_json::from_value(json!({
			"car": {
				"make": "BMW",
				"Inspection": [{ "inspectionJson": { "Engine_Condition": "Good" } }],
				"images": ["https://cdn/a.jpg"]
			},
			"images": [{ "url": "https://cdn/1.jpg" }, { "imageUrl": "https://cdn/2.jpg" }]
		}))
		.unwrap();

		let details = response.normalize().unwrap();
		assert_eq!(details.summary.make, "BMW");
		assert_eq!(details.images, vec!["https://cdn/1.jpg", "https://cdn/2.jpg"]);
		assert_eq!(
			details.inspection,
			Some(json!({ "Engine_Condition": "Good" }))
		);
	}

	#[test]
	fn test_placed_bids_accepts_both_shapes() {
		let bare: PlacedBidsResponse =
			serde_json::from_value(json!([{ "id": 1, "amount": 5, "status": "won" }])).unwrap();
		let wrapped: PlacedBidsResponse = serde_json::from_value(json!({
			"data": [{ "id": "b", "auctionId": 9, "amount": "7", "createdAt": "2025-09-01T10:15:00Z" }]
		}))
		.unwrap();

		let bare: Vec<PlacedBid> = bare
			.into_records()
			.into_iter()
			.filter_map(PlacedBidRecord::normalize)
			.collect();
		assert_eq!(bare[0].status, PlacedBidStatus::Won);

		let wrapped: Vec<PlacedBid> = wrapped
			.into_records()
			.into_iter()
			.filter_map(PlacedBidRecord::normalize)
			.collect();
		assert_eq!(wrapped[0].auction_id, Some(AuctionId::from("9")));
		assert_eq!(wrapped[0].amount, 7);
		assert_eq!(wrapped[0].status, PlacedBidStatus::Pending);
		assert!(wrapped[0].placed_at.is_some());
	}
}
