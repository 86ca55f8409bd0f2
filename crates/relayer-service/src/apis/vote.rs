//! Vote submission endpoint.
//!
//! # Endpoints
//!
//! - `POST /submit-vote` - Validate a signed vote intent and relay it

use crate::server::AppState;
use crate::validators::vote::{validate_submit_vote, verify_vote_signature};
use axum::{
	extract::{rejection::JsonRejection, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use relayer_core::SubmissionResult;
use relayer_types::{APIError, ApiErrorType, SubmitVoteRequest, SubmitVoteResponse};

/// Seconds a client should wait before retrying after the ledger was
/// unreachable.
const LEDGER_RETRY_AFTER_SECS: u64 = 10;

/// POST /submit-vote - Relays a signed vote.
///
/// # Status Codes
///
/// - `200 OK` - Transaction broadcast, confirmation pending
/// - `202 Accepted` - Still being submitted when the request budget ran out
/// - `400 Bad Request` - Malformed input or the vote was refused
/// - `500 Internal Server Error` - The ledger refused for an unrecognized reason
/// - `503 Service Unavailable` - Ledger unreachable or relayer cannot pay
pub async fn handle_submit_vote(
	State(state): State<AppState>,
	payload: Result<Json<SubmitVoteRequest>, JsonRejection>,
) -> Response {
	let Json(request) = match payload {
		Ok(request) => request,
		Err(rejection) => {
			return APIError::BadRequest {
				error_type: ApiErrorType::InvalidJson,
				message: rejection.body_text(),
				reason: None,
				details: None,
			}
			.into_response();
		},
	};

	let intent = match validate_submit_vote(request) {
		Ok(intent) => intent,
		Err(e) => {
			tracing::debug!(error = %e, "Rejected malformed vote request");
			return e.into_response();
		},
	};

	if let Some(domain) = state.signature_domain.as_deref() {
		if let Err(e) = verify_vote_signature(domain, &intent) {
			return e.into_response();
		}
	}

	match state.engine.submit_vote(intent).await {
		SubmissionResult::Accepted {
			tx_hash,
			attempt_id,
		} => (
			StatusCode::OK,
			Json(SubmitVoteResponse {
				success: true,
				message: "Vote submitted, confirmation pending".to_string(),
				tx_hash: Some(tx_hash),
				attempt_id,
			}),
		)
			.into_response(),
		SubmissionResult::InProgress { attempt_id } => (
			StatusCode::ACCEPTED,
			Json(SubmitVoteResponse {
				success: true,
				message: "Vote submission in progress, verify later".to_string(),
				tx_hash: None,
				attempt_id,
			}),
		)
			.into_response(),
		SubmissionResult::Rejected { reason, message } => {
			APIError::from_rejection(reason, message).into_response()
		},
		SubmissionResult::ServiceUnavailable {
			reason: Some(reason),
			message,
		} => APIError::from_rejection(reason, message).into_response(),
		SubmissionResult::ServiceUnavailable {
			reason: None,
			message,
		} => APIError::ServiceUnavailable {
			error_type: ApiErrorType::LedgerUnavailable,
			message,
			reason: None,
			retry_after: Some(LEDGER_RETRY_AFTER_SECS),
		}
		.into_response(),
	}
}
