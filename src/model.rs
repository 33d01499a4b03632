use std::collections::HashMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// DNS transport protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
	Udp,
	Tcp,
	Dot,
	Doh,
}

impl Transport {
	/// All transports, in benchmark iteration order.
	pub fn all() -> [Transport; 4] {
		[Transport::Udp, Transport::Tcp, Transport::Dot, Transport::Doh]
	}
}

impl fmt::Display for Transport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Transport::Udp => "udp",
			Transport::Tcp => "tcp",
			Transport::Dot => "dot",
			Transport::Doh => "doh",
		};
		write!(f, "{}", name)
	}
}

impl FromStr for Transport {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"udp" => Ok(Transport::Udp),
			"tcp" => Ok(Transport::Tcp),
			"dot" | "tls" => Ok(Transport::Dot),
			"doh" | "https" => Ok(Transport::Doh),
			other => Err(format!("unknown transport '{}' (expected udp, tcp, dot, or doh)", other)),
		}
	}
}

/// DNS record type to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
	A,
	Aaaa,
	Cname,
	Mx,
	Txt,
	Ns,
}

impl fmt::Display for RecordType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			RecordType::A => "A",
			RecordType::Aaaa => "AAAA",
			RecordType::Cname => "CNAME",
			RecordType::Mx => "MX",
			RecordType::Txt => "TXT",
			RecordType::Ns => "NS",
		};
		write!(f, "{}", name)
	}
}

impl FromStr for RecordType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_uppercase().as_str() {
			"A" => Ok(RecordType::A),
			"AAAA" => Ok(RecordType::Aaaa),
			"CNAME" => Ok(RecordType::Cname),
			"MX" => Ok(RecordType::Mx),
			"TXT" => Ok(RecordType::Txt),
			"NS" => Ok(RecordType::Ns),
			other => Err(format!("unknown record type '{}'", other)),
		}
	}
}

/// Terminal status of a single DNS query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
	Success,
	Timeout,
	NxDomain,
	ServFail,
	Refused,
	Error,
}

impl fmt::Display for QueryStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			QueryStatus::Success => "success",
			QueryStatus::Timeout => "timeout",
			QueryStatus::NxDomain => "nxdomain",
			QueryStatus::ServFail => "servfail",
			QueryStatus::Refused => "refused",
			QueryStatus::Error => "error",
		};
		write!(f, "{}", name)
	}
}

/// Configuration for a single DNS resolver
#[derive(Debug, Clone, Serialize)]
pub struct ResolverConfig {
	pub name: String,
	pub ipv4: Ipv4Addr,
	pub ipv6: Option<Ipv6Addr>,
	/// Hostname presented for TLS certificate verification (DoT)
	pub tls_hostname: Option<String>,
	/// DoH endpoint URL (e.g. https://dns.google/dns-query)
	pub doh_url: Option<String>,
	pub description: String,
}

impl ResolverConfig {
	/// Check whether this resolver can be queried over the given transport.
	///
	/// UDP and TCP are always available; DoT requires a TLS hostname and
	/// DoH requires an endpoint URL.
	pub fn supports_transport(&self, transport: Transport) -> bool {
		match transport {
			Transport::Udp | Transport::Tcp => true,
			Transport::Dot => self.tls_hostname.is_some(),
			Transport::Doh => self.doh_url.is_some(),
		}
	}
}

/// Timing breakdown for a single query round trip, in milliseconds.
///
/// Connectionless transports report connection_ms = 0 and
/// query_ms = total_ms.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TimingBreakdown {
	pub total_ms: f64,
	pub connection_ms: f64,
	pub query_ms: f64,
}

/// Result of a single logical DNS query.
///
/// Created exactly once per query; retries inside the engine are invisible
/// and only the final outcome is materialized.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
	pub domain: String,
	pub record_type: RecordType,
	pub resolver: String,
	pub transport: Transport,
	pub status: QueryStatus,
	pub timing: TimingBreakdown,
	pub timestamp: DateTime<Utc>,
	pub answers: Vec<String>,
	/// TTL of the first answer record set, if any
	pub ttl: Option<u32>,
	/// Identity of the endpoint that answered (socket address, or the
	/// DoH endpoint URL)
	pub responder: Option<String>,
	pub cached: bool,
	pub error: Option<String>,
}

impl QueryResult {
	pub fn is_success(&self) -> bool {
		self.status == QueryStatus::Success
	}

	pub fn latency_ms(&self) -> f64 {
		self.timing.total_ms
	}

	/// Consume this result and return a copy flagged as served from a warm
	/// resolver cache. The flag is an annotation made by the runner, not a
	/// verified property of the resolver.
	pub fn into_cached(self) -> QueryResult {
		QueryResult { cached: true, ..self }
	}
}

/// Aggregated statistics for one (resolver, transport) pair.
///
/// Latency fields are computed over successful queries only and are exactly
/// 0.0 when no query succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct ResolverStats {
	pub resolver: String,
	pub transport: Transport,
	pub total_queries: usize,
	pub successful_queries: usize,
	pub failed_queries: usize,
	pub min_latency: f64,
	pub max_latency: f64,
	pub avg_latency: f64,
	pub median_latency: f64,
	pub p95_latency: f64,
	pub p99_latency: f64,
	pub stddev_latency: f64,
	pub timeout_count: usize,
	pub nxdomain_count: usize,
	pub error_count: usize,
	pub jitter_ms: f64,
}

impl ResolverStats {
	/// Percentage of successful queries, 0.0 when nothing was attempted.
	pub fn success_rate(&self) -> f64 {
		if self.total_queries == 0 {
			return 0.0;
		}
		(self.successful_queries as f64 / self.total_queries as f64) * 100.0
	}

	/// Percentage of failed or timed out queries.
	pub fn packet_loss_rate(&self) -> f64 {
		if self.total_queries == 0 {
			return 0.0;
		}
		(self.failed_queries as f64 / self.total_queries as f64) * 100.0
	}
}

/// Statistics broken down by record type
#[derive(Debug, Clone, Serialize)]
pub struct RecordTypeStats {
	pub record_type: RecordType,
	pub count: usize,
	pub avg_latency: f64,
	pub success_rate: f64,
}

/// Complete result of one benchmark invocation
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkResult {
	pub started_at: DateTime<Utc>,
	pub completed_at: DateTime<Utc>,
	pub test_mode: String,
	pub domains_tested: usize,
	pub runs: usize,
	pub parallel_queries: usize,
	pub resolver_stats: Vec<ResolverStats>,
	pub raw_results: Vec<QueryResult>,
	/// Record-type breakdown keyed by "{resolver}_{transport}"
	pub record_type_stats: HashMap<String, Vec<RecordTypeStats>>,
}

impl BenchmarkResult {
	pub fn duration_seconds(&self) -> f64 {
		let delta = self.completed_at - self.started_at;
		delta.num_milliseconds() as f64 / 1000.0
	}

	/// Resolver with the best average latency among those with at least one
	/// successful query.
	pub fn winner(&self) -> Option<&ResolverStats> {
		self.resolver_stats.iter()
			.filter(|s| s.successful_queries > 0)
			.min_by(|a, b| {
				a.avg_latency.partial_cmp(&b.avg_latency)
					.unwrap_or(std::cmp::Ordering::Equal)
			})
	}
}
