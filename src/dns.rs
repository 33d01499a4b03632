use anyhow::{anyhow, Result};
use hickory_proto::op::{Message, MessageType, Query, ResponseCode};
use hickory_proto::rr::{Name, RecordType as WireRecordType};

use crate::model::{QueryStatus, RecordType};

/// Map our record type to the wire codec's type.
fn wire_record_type(record_type: RecordType) -> WireRecordType {
	match record_type {
		RecordType::A => WireRecordType::A,
		RecordType::Aaaa => WireRecordType::AAAA,
		RecordType::Cname => WireRecordType::CNAME,
		RecordType::Mx => WireRecordType::MX,
		RecordType::Txt => WireRecordType::TXT,
		RecordType::Ns => WireRecordType::NS,
	}
}

/// Decoded DNS response, reduced to what the benchmark records
#[derive(Debug)]
pub struct DecodedResponse {
	pub status: QueryStatus,
	/// String representations of all answer records
	pub answers: Vec<String>,
	/// TTL of the first answer record set, absent without answers
	pub ttl: Option<u32>,
}

/// Build a DNS query message for the given domain and record type.
///
/// When dnssec is true, the DO (DNSSEC OK) bit is set via EDNS.
/// Returns the serialized query bytes ready to hand to a transport.
pub fn build_query(
	domain: &str,
	record_type: RecordType,
	txid: u16,
	dnssec: bool,
) -> Result<Vec<u8>> {
	let name = Name::from_ascii(domain)
		.map_err(|e| anyhow!("invalid domain name '{}': {}", domain, e))?;

	let mut message = Message::new();
	message.set_id(txid);
	message.set_recursion_desired(true);
	message.add_query(Query::query(name, wire_record_type(record_type)));

	// Set DNSSEC OK bit via EDNS when requested
	if dnssec {
		let edns = message.extensions_mut()
			.get_or_insert_with(hickory_proto::op::Edns::new);
		edns.set_dnssec_ok(true);
	}

	let bytes = message.to_vec()
		.map_err(|e| anyhow!("failed to serialize DNS query: {}", e))?;
	Ok(bytes)
}

/// Decode a DNS response, validating the transaction ID and reducing the
/// message to a status, answer strings, and the first record-set TTL.
///
/// NXDOMAIN/SERVFAIL/REFUSED are valid decoded outcomes, not errors; only
/// unparseable or mismatched responses fail.
pub fn decode_response(bytes: &[u8], expected_txid: u16) -> Result<DecodedResponse> {
	let message = Message::from_vec(bytes)
		.map_err(|e| anyhow!("failed to parse DNS response: {}", e))?;

	if message.id() != expected_txid {
		return Err(anyhow!(
			"txid mismatch: expected {}, got {}",
			expected_txid, message.id()
		));
	}

	if message.message_type() != MessageType::Response {
		return Err(anyhow!("received a query instead of a response"));
	}

	let status = match message.response_code() {
		ResponseCode::NoError => QueryStatus::Success,
		ResponseCode::NXDomain => QueryStatus::NxDomain,
		ResponseCode::ServFail => QueryStatus::ServFail,
		ResponseCode::Refused => QueryStatus::Refused,
		_ => QueryStatus::Error,
	};

	let mut answers = Vec::new();
	let mut ttl = None;
	for record in message.answers() {
		if ttl.is_none() {
			ttl = Some(record.ttl());
		}
		answers.push(record.data().to_string());
	}

	Ok(DecodedResponse { status, answers, ttl })
}
