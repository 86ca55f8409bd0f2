//! API types for the relayer HTTP endpoints.
//!
//! Request bodies are deserialized loosely (every field optional, any JSON
//! type) so that the boundary validator can report exactly which field is
//! missing or malformed instead of a generic deserialization failure.

use crate::vote::RejectionReason;
use alloy_primitives::TxHash;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Raw body of `POST /submit-vote`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVoteRequest {
	pub poll_id: Option<serde_json::Value>,
	pub candidate_id: Option<serde_json::Value>,
	pub voter: Option<serde_json::Value>,
	pub signature: Option<serde_json::Value>,
	pub merkle_proof: Option<serde_json::Value>,
}

/// Successful body of `POST /submit-vote`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVoteResponse {
	pub success: bool,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tx_hash: Option<TxHash>,
	/// Correlation id of the submission attempt, for log lookups.
	pub attempt_id: Uuid,
}

/// Body of `GET /status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
	pub success: bool,
	pub address: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub authorized: Option<bool>,
	/// Balance in ether.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub balance: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub balance_wei: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub nonce: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub low_balance: Option<bool>,
	pub chain_id: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

/// API error types as an enum for compile-time safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorType {
	// Input errors
	InvalidJson,
	MissingField,
	InvalidField,

	// Vote outcome errors
	VoteRejected,

	// Infrastructure errors
	LedgerUnavailable,
	RelayerUnavailable,

	InternalError,
}

impl fmt::Display for ApiErrorType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		// Use serde to get the SCREAMING_SNAKE_CASE representation
		let json_str = serde_json::to_string(self).map_err(|_| fmt::Error)?;
		write!(f, "{}", json_str.trim_matches('"'))
	}
}

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Always false; mirrors the `success` flag of successful responses.
	pub success: bool,
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
	/// Rejection code when the vote itself was refused
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reason: Option<RejectionReason>,
	/// Additional error context
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
	/// Suggested retry delay in seconds
	#[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
	pub retry_after: Option<u64>,
}

/// Structured API error type with appropriate HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Malformed input or a voter/poll-specific rejection (400)
	BadRequest {
		error_type: ApiErrorType,
		message: String,
		reason: Option<RejectionReason>,
		details: Option<serde_json::Value>,
	},
	/// Infrastructure problem the voter cannot fix (503)
	ServiceUnavailable {
		error_type: ApiErrorType,
		message: String,
		reason: Option<RejectionReason>,
		retry_after: Option<u64>,
	},
	/// Internal server error (500)
	InternalServerError {
		error_type: ApiErrorType,
		message: String,
		reason: Option<RejectionReason>,
	},
}

impl APIError {
	/// Shorthand for an input error on a single field.
	pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
		APIError::BadRequest {
			error_type: ApiErrorType::InvalidField,
			message: message.into(),
			reason: None,
			details: Some(serde_json::json!({ "field": field })),
		}
	}

	/// Shorthand for a missing required field.
	pub fn missing_field(field: &str) -> Self {
		APIError::BadRequest {
			error_type: ApiErrorType::MissingField,
			message: format!("Missing required field: {}", field),
			reason: None,
			details: Some(serde_json::json!({ "field": field })),
		}
	}

	/// Maps a rejection onto the status class its reason belongs to.
	pub fn from_rejection(reason: RejectionReason, message: impl Into<String>) -> Self {
		let message = message.into();
		if reason.is_infrastructure() {
			APIError::ServiceUnavailable {
				error_type: ApiErrorType::RelayerUnavailable,
				message,
				reason: Some(reason),
				retry_after: Some(30),
			}
		} else if reason == RejectionReason::Unknown {
			APIError::InternalServerError {
				error_type: ApiErrorType::InternalError,
				message,
				reason: Some(reason),
			}
		} else {
			APIError::BadRequest {
				error_type: ApiErrorType::VoteRejected,
				message,
				reason: Some(reason),
				details: None,
			}
		}
	}

	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::ServiceUnavailable { .. } => 503,
			APIError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		match self {
			APIError::BadRequest {
				error_type,
				message,
				reason,
				details,
			} => ErrorResponse {
				success: false,
				error: error_type.to_string(),
				message: message.clone(),
				reason: *reason,
				details: details.clone(),
				retry_after: None,
			},
			APIError::ServiceUnavailable {
				error_type,
				message,
				reason,
				retry_after,
			} => ErrorResponse {
				success: false,
				error: error_type.to_string(),
				message: message.clone(),
				reason: *reason,
				details: None,
				retry_after: *retry_after,
			},
			APIError::InternalServerError {
				error_type,
				message,
				reason,
			} => ErrorResponse {
				success: false,
				error: error_type.to_string(),
				message: message.clone(),
				reason: *reason,
				details: None,
				retry_after: None,
			},
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			APIError::ServiceUnavailable { message, .. } => {
				write!(f, "Service Unavailable: {}", message)
			},
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = match self.status_code() {
			400 => StatusCode::BAD_REQUEST,
			503 => StatusCode::SERVICE_UNAVAILABLE,
			_ => StatusCode::INTERNAL_SERVER_ERROR,
		};

		let error_response = self.to_error_response();
		(status, Json(error_response)).into_response()
	}
}
