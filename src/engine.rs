use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::dns;
use crate::model::{
	QueryResult, QueryStatus, RecordType, ResolverConfig, TimingBreakdown, Transport,
};
use crate::transport::{build_transport, DnsTransport, TransportError};

/// Fixed delay between retry attempts
const RETRY_DELAY: Duration = Duration::from_millis(100);

/// DNS query engine.
///
/// Builds query messages, dispatches them through per-(transport, resolver)
/// cached transports, applies the retry policy, and classifies every outcome
/// into a terminal QueryResult. No error ever escapes query or query_batch.
///
/// An engine owns its transport cache; it is not meant to be shared between
/// independent engine instances and must be closed exactly once when
/// discarded.
pub struct QueryEngine {
	timeout: Duration,
	retries: u32,
	dnssec: bool,
	transports: Mutex<HashMap<(Transport, String), Arc<dyn DnsTransport>>>,
}

impl QueryEngine {
	pub fn new(timeout: Duration, retries: u32, dnssec: bool) -> Self {
		Self {
			timeout,
			retries,
			dnssec,
			transports: Mutex::new(HashMap::new()),
		}
	}

	/// Get or lazily create the transport for this (type, resolver) pair.
	///
	/// Cached transports are never evicted except by close; the DoH client
	/// in particular keeps its connection pool across calls.
	fn transport_for(
		&self,
		transport_type: Transport,
		resolver: &ResolverConfig,
	) -> Result<Arc<dyn DnsTransport>, TransportError> {
		let key = (transport_type, resolver.name.clone());
		let mut cache = self.transports.lock().unwrap();
		if let Some(transport) = cache.get(&key) {
			return Ok(transport.clone());
		}
		let transport = build_transport(transport_type, resolver)?;
		cache.insert(key, transport.clone());
		Ok(transport)
	}

	/// Execute a single DNS query and classify the outcome.
	///
	/// Transport failures and timeouts are retried with a fixed delay; when
	/// all attempts fail the result carries status Timeout (final failure was
	/// a timeout) or Error, with total_ms pinned to the configured timeout.
	pub async fn query(
		&self,
		domain: &str,
		record_type: RecordType,
		resolver: &ResolverConfig,
		transport_type: Transport,
	) -> QueryResult {
		let txid: u16 = rand::random();

		let attempt_outcome = match dns::build_query(domain, record_type, txid, self.dnssec) {
			Ok(query_bytes) => match self.transport_for(transport_type, resolver) {
				Ok(transport) => {
					self.run_attempts(&query_bytes, txid, transport.as_ref()).await
				}
				Err(e) => Err(e),
			},
			Err(e) => Err(TransportError::Decode(e.to_string())),
		};

		match attempt_outcome {
			Ok((decoded, timing, responder)) => QueryResult {
				domain: domain.to_string(),
				record_type,
				resolver: resolver.name.clone(),
				transport: transport_type,
				status: decoded.status,
				timing,
				timestamp: Utc::now(),
				answers: decoded.answers,
				ttl: decoded.ttl,
				responder: Some(responder),
				cached: false,
				error: None,
			},
			Err(last_error) => {
				let status = if last_error.is_timeout() {
					QueryStatus::Timeout
				} else {
					QueryStatus::Error
				};
				let total_ms = self.timeout.as_secs_f64() * 1000.0;
				QueryResult {
					domain: domain.to_string(),
					record_type,
					resolver: resolver.name.clone(),
					transport: transport_type,
					status,
					timing: TimingBreakdown {
						total_ms,
						connection_ms: 0.0,
						query_ms: 0.0,
					},
					timestamp: Utc::now(),
					answers: Vec::new(),
					ttl: None,
					responder: None,
					cached: false,
					error: Some(last_error.to_string()),
				}
			}
		}
	}

	/// Run up to retries+1 attempts over the given transport.
	///
	/// A decoded response of any DNS status (including NXDOMAIN/SERVFAIL) is
	/// a completed attempt; only transport failures and undecodable
	/// responses are retried.
	async fn run_attempts(
		&self,
		query_bytes: &[u8],
		txid: u16,
		transport: &dyn DnsTransport,
	) -> Result<(dns::DecodedResponse, TimingBreakdown, String), TransportError> {
		let mut last_error = TransportError::Timeout(self.timeout);
		for attempt in 0..=self.retries {
			match transport.exchange(query_bytes, self.timeout).await {
				Ok(exchange) => match dns::decode_response(&exchange.wire, txid) {
					Ok(decoded) => {
						return Ok((decoded, exchange.timing, exchange.responder));
					}
					Err(e) => last_error = TransportError::Decode(e.to_string()),
				},
				Err(e) => last_error = e,
			}
			if attempt < self.retries {
				tokio::time::sleep(RETRY_DELAY).await;
			}
		}
		Err(last_error)
	}

	/// Execute a batch of queries against one resolver over one transport.
	///
	/// Results are returned in submission order regardless of completion
	/// order. At most `concurrency` requests are in flight at once; the
	/// permit is acquired before dispatch and released on completion,
	/// success or failure.
	pub async fn query_batch(
		&self,
		queries: &[(String, RecordType)],
		resolver: &ResolverConfig,
		transport_type: Transport,
		concurrency: usize,
	) -> Vec<QueryResult> {
		let semaphore = Semaphore::new(concurrency.max(1));
		let futures = queries.iter().map(|(domain, record_type)| {
			let semaphore = &semaphore;
			async move {
				let _permit = semaphore.acquire().await.unwrap();
				self.query(domain, *record_type, resolver, transport_type).await
			}
		});
		join_all(futures).await
	}

	/// Release all cached transports. Expected to run exactly once at the
	/// end of the engine's lifetime; dropping the transports closes their
	/// sockets and connection pools.
	pub fn close(&self) {
		self.transports.lock().unwrap().clear();
	}

	#[cfg(test)]
	pub(crate) fn seed_transport(
		&self,
		transport_type: Transport,
		resolver_name: &str,
		transport: Arc<dyn DnsTransport>,
	) {
		self.transports
			.lock()
			.unwrap()
			.insert((transport_type, resolver_name.to_string()), transport);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::transport::Exchange;
	use async_trait::async_trait;
	use hickory_proto::op::{Message, MessageType, ResponseCode};
	use hickory_proto::rr::rdata::A;
	use hickory_proto::rr::{RData, Record};
	use std::net::Ipv4Addr;
	use std::sync::atomic::{AtomicUsize, Ordering};

	fn test_resolver() -> ResolverConfig {
		ResolverConfig {
			name: "Mock".to_string(),
			ipv4: Ipv4Addr::new(192, 0, 2, 1),
			ipv6: None,
			tls_hostname: None,
			doh_url: None,
			description: "mock resolver".to_string(),
		}
	}

	/// Builds a well-formed response for whatever query arrives.
	fn answer_for(query: &[u8], rcode: ResponseCode, with_answer: bool) -> Vec<u8> {
		let mut message = Message::from_vec(query).unwrap();
		message.set_message_type(MessageType::Response);
		message.set_response_code(rcode);
		if with_answer {
			let name = message.queries()[0].name().clone();
			message.add_answer(Record::from_rdata(name, 60, RData::A(A::new(192, 0, 2, 7))));
		}
		message.to_vec().unwrap()
	}

	/// Mock transport scripted by status: answers, times out, or fails,
	/// counting every attempt.
	struct MockTransport {
		calls: AtomicUsize,
		fail_first: usize,
		rcode: ResponseCode,
		delay_from_domain: bool,
	}

	impl MockTransport {
		fn answering(rcode: ResponseCode) -> Self {
			Self {
				calls: AtomicUsize::new(0),
				fail_first: 0,
				rcode,
				delay_from_domain: false,
			}
		}

		fn failing_first(fail_first: usize) -> Self {
			Self {
				calls: AtomicUsize::new(0),
				fail_first,
				rcode: ResponseCode::NoError,
				delay_from_domain: false,
			}
		}

		fn with_domain_delays() -> Self {
			Self {
				calls: AtomicUsize::new(0),
				fail_first: 0,
				rcode: ResponseCode::NoError,
				delay_from_domain: true,
			}
		}
	}

	#[async_trait]
	impl DnsTransport for MockTransport {
		fn transport_type(&self) -> Transport {
			Transport::Udp
		}

		async fn exchange(
			&self,
			query: &[u8],
			timeout: Duration,
		) -> Result<Exchange, TransportError> {
			let call = self.calls.fetch_add(1, Ordering::SeqCst);
			if call < self.fail_first {
				return Err(TransportError::Timeout(timeout));
			}
			if self.delay_from_domain {
				// Domain labels end in a digit that selects the delay so
				// later submissions can complete earlier
				let message = Message::from_vec(query).unwrap();
				let name = message.queries()[0].name().to_ascii();
				let digit = name
					.chars()
					.find(|c| c.is_ascii_digit())
					.and_then(|c| c.to_digit(10))
					.unwrap_or(0) as u64;
				tokio::time::sleep(Duration::from_millis(10 * digit)).await;
			}
			Ok(Exchange {
				wire: answer_for(query, self.rcode, self.rcode == ResponseCode::NoError),
				timing: TimingBreakdown {
					total_ms: 5.0,
					connection_ms: 0.0,
					query_ms: 5.0,
				},
				responder: "mock:53".to_string(),
			})
		}
	}

	/// Transport that always times out.
	struct TimeoutTransport {
		calls: AtomicUsize,
	}

	#[async_trait]
	impl DnsTransport for TimeoutTransport {
		fn transport_type(&self) -> Transport {
			Transport::Udp
		}

		async fn exchange(
			&self,
			_query: &[u8],
			timeout: Duration,
		) -> Result<Exchange, TransportError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			Err(TransportError::Timeout(timeout))
		}
	}

	#[tokio::test]
	async fn test_successful_query_extracts_answers() {
		let engine = QueryEngine::new(Duration::from_secs(2), 1, false);
		let resolver = test_resolver();
		engine.seed_transport(
			Transport::Udp,
			&resolver.name,
			Arc::new(MockTransport::answering(ResponseCode::NoError)),
		);

		let result = engine
			.query("example.com", RecordType::A, &resolver, Transport::Udp)
			.await;

		assert_eq!(result.status, QueryStatus::Success);
		assert_eq!(result.answers.len(), 1);
		assert!(result.answers[0].contains("192.0.2.7"));
		assert_eq!(result.ttl, Some(60));
		assert_eq!(result.responder.as_deref(), Some("mock:53"));
		assert!(result.error.is_none());
		assert!(!result.cached);
	}

	#[tokio::test]
	async fn test_nxdomain_is_terminal_not_retried() {
		let engine = QueryEngine::new(Duration::from_secs(2), 3, false);
		let resolver = test_resolver();
		let transport = Arc::new(MockTransport::answering(ResponseCode::NXDomain));
		engine.seed_transport(Transport::Udp, &resolver.name, transport.clone());

		let result = engine
			.query("nope.invalid", RecordType::A, &resolver, Transport::Udp)
			.await;

		assert_eq!(result.status, QueryStatus::NxDomain);
		// A decoded non-success response completes the query in one attempt
		assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_all_attempts_exhausted_yields_timeout_result() {
		let timeout = Duration::from_secs(2);
		let engine = QueryEngine::new(timeout, 2, false);
		let resolver = test_resolver();
		let transport = Arc::new(TimeoutTransport { calls: AtomicUsize::new(0) });
		engine.seed_transport(Transport::Udp, &resolver.name, transport.clone());

		let result = engine
			.query("example.com", RecordType::A, &resolver, Transport::Udp)
			.await;

		// 2 retries = 3 attempts total
		assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
		assert_eq!(result.status, QueryStatus::Timeout);
		assert!((result.timing.total_ms - 2000.0).abs() < 1e-9);
		assert!(result.answers.is_empty());
		assert!(result.error.is_some());
	}

	#[tokio::test]
	async fn test_retry_then_success() {
		let engine = QueryEngine::new(Duration::from_secs(2), 1, false);
		let resolver = test_resolver();
		let transport = Arc::new(MockTransport::failing_first(1));
		engine.seed_transport(Transport::Udp, &resolver.name, transport.clone());

		let result = engine
			.query("example.com", RecordType::A, &resolver, Transport::Udp)
			.await;

		assert_eq!(result.status, QueryStatus::Success);
		assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn test_unsupported_transport_becomes_error_result() {
		let engine = QueryEngine::new(Duration::from_secs(2), 1, false);
		let resolver = test_resolver();

		let result = engine
			.query("example.com", RecordType::A, &resolver, Transport::Dot)
			.await;

		assert_eq!(result.status, QueryStatus::Error);
		assert!(result.error.unwrap().contains("does not support"));
	}

	#[tokio::test]
	async fn test_cached_transport_is_reused() {
		let engine = QueryEngine::new(Duration::from_secs(2), 0, false);
		let resolver = test_resolver();
		let transport = Arc::new(MockTransport::answering(ResponseCode::NoError));
		engine.seed_transport(Transport::Udp, &resolver.name, transport.clone());

		for _ in 0..3 {
			engine
				.query("example.com", RecordType::A, &resolver, Transport::Udp)
				.await;
		}
		assert_eq!(transport.calls.load(Ordering::SeqCst), 3);

		engine.close();
		assert_eq!(Arc::strong_count(&transport), 1);
	}

	#[tokio::test]
	async fn test_batch_preserves_submission_order() {
		let engine = QueryEngine::new(Duration::from_secs(2), 0, false);
		let resolver = test_resolver();
		engine.seed_transport(
			Transport::Udp,
			&resolver.name,
			Arc::new(MockTransport::with_domain_delays()),
		);

		// Earlier submissions sleep longer, so completion order is reversed
		let queries: Vec<(String, RecordType)> = (0..5)
			.map(|i| (format!("d{}.example.com", 5 - i), RecordType::A))
			.collect();

		let results = engine
			.query_batch(&queries, &resolver, Transport::Udp, 8)
			.await;

		assert_eq!(results.len(), queries.len());
		for (result, (domain, _)) in results.iter().zip(&queries) {
			assert_eq!(&result.domain, domain);
			assert_eq!(result.status, QueryStatus::Success);
		}
	}

	#[tokio::test]
	async fn test_batch_with_concurrency_one() {
		let engine = QueryEngine::new(Duration::from_secs(2), 0, false);
		let resolver = test_resolver();
		engine.seed_transport(
			Transport::Udp,
			&resolver.name,
			Arc::new(MockTransport::with_domain_delays()),
		);

		let queries: Vec<(String, RecordType)> = (0..4)
			.map(|i| (format!("d{}.example.com", 4 - i), RecordType::A))
			.collect();

		let results = engine
			.query_batch(&queries, &resolver, Transport::Udp, 1)
			.await;

		let domains: Vec<&str> = results.iter().map(|r| r.domain.as_str()).collect();
		let expected: Vec<&str> = queries.iter().map(|(d, _)| d.as_str()).collect();
		assert_eq!(domains, expected);
	}
}
