//! HTTP server for the relayer API.
//!
//! Exposes the two endpoints voting clients use: a read-through status
//! check and the vote submission endpoint.

use crate::apis::{status::handle_status, vote::handle_submit_vote};
use alloy_sol_types::Eip712Domain;
use axum::{
	routing::{get, post},
	Router, ServiceExt,
};
use relayer_config::ApiConfig;
use relayer_core::RelayerEngine;
use relayer_types::vote_domain;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::normalize_path::NormalizePath;
use tower_http::trace::TraceLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Engine that checks, submits and monitors votes.
	pub engine: RelayerEngine,
	/// Domain for the local signature pre-check; `None` when disabled.
	pub signature_domain: Option<Arc<Eip712Domain>>,
}

impl AppState {
	pub fn new(engine: RelayerEngine) -> Self {
		let config = engine.config();
		let signature_domain = config.relayer.verify_signatures.then(|| {
			Arc::new(vote_domain(
				&config.ledger.eip712_name,
				&config.ledger.eip712_version,
				config.ledger.chain_id,
				config.ledger.contract_address,
			))
		});

		Self {
			engine,
			signature_domain,
		}
	}
}

/// Builds the API router.
pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/status", get(handle_status))
		.route("/submit-vote", post(handle_submit_vote))
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive()),
		)
		.with_state(state)
}

/// Starts the HTTP server and runs it until `shutdown` resolves.
pub async fn start_server(
	api_config: ApiConfig,
	engine: RelayerEngine,
	shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(AppState::new(engine));

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Relayer API server starting on {}", bind_address);

	// Wrap the entire app with NormalizePath to handle trailing slashes
	let app = NormalizePath::trim_trailing_slash(app);
	let service = ServiceExt::<axum::http::Request<axum::body::Body>>::into_make_service(app);

	axum::serve(listener, service)
		.with_graceful_shutdown(shutdown)
		.await?;

	Ok(())
}
