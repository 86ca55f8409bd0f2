//! Boundary validation for `POST /submit-vote`.
//!
//! Every check here runs before the engine sees the request, so malformed
//! input never costs a ledger round trip.

use alloy_primitives::{hex, Address, Bytes, B256};
use alloy_sol_types::Eip712Domain;
use relayer_types::{
	recover_vote_signer, APIError, RejectionReason, SubmitVoteRequest, VoteIntent,
};
use serde_json::Value;
use std::str::FromStr;

const SIGNATURE_LENGTH: usize = 65;

/// Turns a loosely-typed request body into a [`VoteIntent`].
///
/// `pollId` and `candidateId` accept JSON numbers or decimal strings, since
/// browser clients commonly send large integers as strings.
pub fn validate_submit_vote(request: SubmitVoteRequest) -> Result<VoteIntent, APIError> {
	let poll_id = parse_u64("pollId", required("pollId", request.poll_id)?)?;

	let candidate_id = parse_u64("candidateId", required("candidateId", request.candidate_id)?)?;
	let candidate_id = u16::try_from(candidate_id).map_err(|_| {
		APIError::invalid_field("candidateId", "candidateId must fit in 16 bits")
	})?;

	let voter = parse_address(required("voter", request.voter)?)?;
	let signature = parse_signature(required("signature", request.signature)?)?;

	let merkle_proof = match request.merkle_proof {
		None | Some(Value::Null) => Vec::new(),
		Some(value) => parse_merkle_proof(value)?,
	};

	Ok(VoteIntent {
		poll_id,
		candidate_id,
		voter,
		signature,
		merkle_proof,
	})
}

/// Recovers the signer of `intent` locally and checks it is the voter.
///
/// The contract performs the authoritative check; this only spares a
/// transaction for signatures that can never pass.
pub fn verify_vote_signature(domain: &Eip712Domain, intent: &VoteIntent) -> Result<(), APIError> {
	let bad_signature = || APIError::from_rejection(RejectionReason::BadSignature, "Bad signature");

	match recover_vote_signer(domain, intent) {
		Ok(signer) if signer == intent.voter => Ok(()),
		Ok(signer) => {
			tracing::info!(
				voter = %intent.voter,
				recovered = %signer,
				"Signature does not belong to voter"
			);
			Err(bad_signature())
		},
		Err(e) => {
			tracing::info!(voter = %intent.voter, error = %e, "Signature recovery failed");
			Err(bad_signature())
		},
	}
}

fn required(field: &str, value: Option<Value>) -> Result<Value, APIError> {
	match value {
		None | Some(Value::Null) => Err(APIError::missing_field(field)),
		Some(value) => Ok(value),
	}
}

fn parse_u64(field: &str, value: Value) -> Result<u64, APIError> {
	let parsed = match &value {
		Value::Number(n) => n.as_u64(),
		Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
			s.parse::<u64>().ok()
		},
		_ => None,
	};

	parsed.ok_or_else(|| {
		APIError::invalid_field(field, format!("{} must be a non-negative integer", field))
	})
}

fn parse_address(value: Value) -> Result<Address, APIError> {
	let invalid = || APIError::invalid_field("voter", "voter must be a 0x-prefixed 20-byte address");

	let Value::String(s) = value else {
		return Err(invalid());
	};
	if !s.starts_with("0x") {
		return Err(invalid());
	}

	let voter = Address::from_str(&s).map_err(|_| invalid())?;
	if voter == Address::ZERO {
		return Err(APIError::invalid_field("voter", "voter must not be the zero address"));
	}
	Ok(voter)
}

fn parse_signature(value: Value) -> Result<Bytes, APIError> {
	let invalid = || {
		APIError::invalid_field(
			"signature",
			format!("signature must be {} hex-encoded bytes", SIGNATURE_LENGTH),
		)
	};

	let Value::String(s) = value else {
		return Err(invalid());
	};
	let bytes = hex::decode(&s).map_err(|_| invalid())?;
	if bytes.len() != SIGNATURE_LENGTH {
		return Err(invalid());
	}
	Ok(Bytes::from(bytes))
}

fn parse_merkle_proof(value: Value) -> Result<Vec<B256>, APIError> {
	let invalid =
		|| APIError::invalid_field("merkleProof", "merkleProof must be an array of 32-byte hashes");

	let Value::Array(items) = value else {
		return Err(invalid());
	};

	items
		.into_iter()
		.map(|item| match item {
			Value::String(s) => B256::from_str(&s).map_err(|_| invalid()),
			_ => Err(invalid()),
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_signer::SignerSync;
	use alloy_signer_local::PrivateKeySigner;
	use relayer_types::utils::builders::VoteIntentBuilder;
	use relayer_types::{vote_domain, vote_signing_hash, ApiErrorType};
	use serde_json::json;

	fn request(body: Value) -> SubmitVoteRequest {
		serde_json::from_value(body).unwrap()
	}

	fn valid_body() -> Value {
		json!({
			"pollId": 7,
			"candidateId": 2,
			"voter": format!("{}", Address::repeat_byte(0x11)),
			"signature": format!("0x{}", "1b".repeat(65)),
		})
	}

	fn field_of(err: &APIError) -> Option<String> {
		match err {
			APIError::BadRequest {
				details: Some(details),
				..
			} => details["field"].as_str().map(str::to_string),
			_ => None,
		}
	}

	fn error_type(err: &APIError) -> ApiErrorType {
		match err {
			APIError::BadRequest { error_type, .. }
			| APIError::ServiceUnavailable { error_type, .. }
			| APIError::InternalServerError { error_type, .. } => *error_type,
		}
	}

	#[test]
	fn test_valid_request() {
		let intent = validate_submit_vote(request(valid_body())).unwrap();
		assert_eq!(intent.poll_id, 7);
		assert_eq!(intent.candidate_id, 2);
		assert_eq!(intent.voter, Address::repeat_byte(0x11));
		assert_eq!(intent.signature.len(), 65);
		assert!(intent.merkle_proof.is_empty());
	}

	#[test]
	fn test_numeric_strings_accepted() {
		let mut body = valid_body();
		body["pollId"] = json!("12");
		body["candidateId"] = json!("0");
		let intent = validate_submit_vote(request(body)).unwrap();
		assert_eq!(intent.poll_id, 12);
		assert_eq!(intent.candidate_id, 0);
	}

	#[test]
	fn test_missing_fields_reported_by_name() {
		for field in ["pollId", "candidateId", "voter", "signature"] {
			let mut body = valid_body();
			body.as_object_mut().unwrap().remove(field);
			let err = validate_submit_vote(request(body)).unwrap_err();
			assert_eq!(error_type(&err), ApiErrorType::MissingField);
			assert_eq!(field_of(&err).as_deref(), Some(field));
		}
	}

	#[test]
	fn test_null_counts_as_missing() {
		let mut body = valid_body();
		body["signature"] = Value::Null;
		let err = validate_submit_vote(request(body)).unwrap_err();
		assert_eq!(error_type(&err), ApiErrorType::MissingField);
	}

	#[test]
	fn test_mistyped_fields_rejected() {
		let cases = [
			("pollId", json!(-1)),
			("pollId", json!(1.5)),
			("pollId", json!("abc")),
			("candidateId", json!(70000)),
			("voter", json!(42)),
			("voter", json!("0x1234")),
			("voter", json!("1111111111111111111111111111111111111111")),
			("signature", json!("0xzz")),
			("signature", json!("0x1b1b")),
		];

		for (field, value) in cases {
			let mut body = valid_body();
			body[field] = value.clone();
			let err = validate_submit_vote(request(body)).unwrap_err();
			assert_eq!(error_type(&err), ApiErrorType::InvalidField, "{field}={value}");
			assert_eq!(field_of(&err).as_deref(), Some(field));
		}
	}

	#[test]
	fn test_zero_voter_rejected() {
		let mut body = valid_body();
		body["voter"] = json!(format!("{}", Address::ZERO));
		let err = validate_submit_vote(request(body)).unwrap_err();
		assert_eq!(field_of(&err).as_deref(), Some("voter"));
	}

	#[test]
	fn test_merkle_proof_parsing() {
		let mut body = valid_body();
		body["merkleProof"] = json!([format!("{}", B256::repeat_byte(0xab))]);
		let intent = validate_submit_vote(request(body)).unwrap();
		assert_eq!(intent.merkle_proof, vec![B256::repeat_byte(0xab)]);

		let mut body = valid_body();
		body["merkleProof"] = json!(["0x12"]);
		let err = validate_submit_vote(request(body)).unwrap_err();
		assert_eq!(field_of(&err).as_deref(), Some("merkleProof"));
	}

	#[test]
	fn test_signature_check() {
		let domain = vote_domain("GaslessVoting", "1", 31337, Address::repeat_byte(0xcc));
		let signer = PrivateKeySigner::random();
		let unsigned = VoteIntentBuilder::new()
			.with_voter(signer.address())
			.build();
		let signature = signer
			.sign_hash_sync(&vote_signing_hash(&domain, &unsigned))
			.unwrap();
		let intent = VoteIntentBuilder::new()
			.with_voter(signer.address())
			.with_signature(Bytes::from(signature.as_bytes().to_vec()))
			.build();

		assert!(verify_vote_signature(&domain, &intent).is_ok());

		// Same signature claimed by someone else.
		let forged = VoteIntent {
			voter: Address::repeat_byte(0x22),
			..intent.clone()
		};
		let err = verify_vote_signature(&domain, &forged).unwrap_err();
		assert_eq!(err.status_code(), 400);
		assert_eq!(
			err.to_error_response().reason,
			Some(RejectionReason::BadSignature)
		);

		// Signed for a different deployment.
		let other = vote_domain("GaslessVoting", "1", 1, Address::repeat_byte(0xcc));
		assert!(verify_vote_signature(&other, &intent).is_err());
	}
}
