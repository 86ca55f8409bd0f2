//! Relayer status endpoint.
//!
//! # Endpoints
//!
//! - `GET /status` - Relayer address, authorization and balance

use crate::server::AppState;
use axum::{extract::State, http::StatusCode, Json};
use relayer_types::StatusResponse;

/// GET /status - Read-through view of the relayer account.
///
/// Nothing is cached: every call reads balance, nonce and authorization
/// fresh from the ledger. Used as a health check, so a ledger failure is
/// reported in the body rather than as a server error.
///
/// # Status Codes
///
/// - `200 OK` - Ledger reachable
/// - `503 Service Unavailable` - Ledger could not be read
pub async fn handle_status(State(state): State<AppState>) -> (StatusCode, Json<StatusResponse>) {
	let ledger = state.engine.ledger();

	match state.engine.status().await {
		Ok(status) => (
			StatusCode::OK,
			Json(StatusResponse {
				success: true,
				address: status.account.address.to_string(),
				authorized: Some(status.account.authorized),
				balance: Some(status.account.balance_ether()),
				balance_wei: Some(status.account.balance.to_string()),
				nonce: Some(status.account.nonce),
				low_balance: Some(status.low_balance),
				chain_id: status.chain_id,
				message: None,
			}),
		),
		Err(e) => {
			tracing::warn!(error = %e, "Status check could not read the ledger");
			(
				StatusCode::SERVICE_UNAVAILABLE,
				Json(StatusResponse {
					success: false,
					address: ledger.relayer_address().to_string(),
					authorized: None,
					balance: None,
					balance_wei: None,
					nonce: None,
					low_balance: None,
					chain_id: ledger.chain_id(),
					message: Some("Ledger unavailable".to_string()),
				}),
			)
		},
	}
}
