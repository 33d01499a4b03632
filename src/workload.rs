use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::domains::{COMMON_SUBDOMAINS, COMMON_THIRD_PARTY};
use crate::model::RecordType;

const CACHE_BUST_LABEL_LEN: usize = 8;
const NXDOMAIN_LABEL_LEN: usize = 16;
const LABEL_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generates ordered (domain, record type) query lists for each test mode.
///
/// A seeded generator reproduces the same workloads run to run; an unseeded
/// one draws from entropy.
pub struct WorkloadGenerator {
	domains: Vec<String>,
	include_third_party: bool,
	subdomain_expansion: bool,
	rng: StdRng,
}

impl WorkloadGenerator {
	pub fn new(
		domains: Vec<String>,
		include_third_party: bool,
		subdomain_expansion: bool,
		seed: Option<u64>,
	) -> Self {
		let rng = match seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_entropy(),
		};
		Self {
			domains,
			include_third_party,
			subdomain_expansion,
			rng,
		}
	}

	pub fn domain_count(&self) -> usize {
		self.domains.len()
	}

	fn random_label(&mut self, length: usize) -> String {
		(0..length)
			.map(|_| LABEL_CHARS[self.rng.gen_range(0..LABEL_CHARS.len())] as char)
			.collect()
	}

	/// Expand a base domain with a few common subdomain prefixes.
	fn expand_domain(&mut self, domain: &str) -> Vec<String> {
		let mut expanded = vec![domain.to_string()];
		if self.subdomain_expansion {
			for prefix in COMMON_SUBDOMAINS.choose_multiple(&mut self.rng, 3) {
				expanded.push(format!("{}.{}", prefix, domain));
			}
		}
		expanded
	}

	/// Generate cold-start queries.
	///
	/// Every query gets a unique random subdomain prefix so resolvers cannot
	/// answer from cache and must resolve upstream. Third-party domains are
	/// appended unprefixed: a random label under someone else's zone would
	/// not resolve at all.
	pub fn cold_queries(
		&mut self,
		count: usize,
		record_types: &[RecordType],
	) -> Vec<(String, RecordType)> {
		let bases: Vec<String> = self.domains.iter().take(count).cloned().collect();
		let mut queries = Vec::new();

		for domain in &bases {
			for subdomain in self.expand_domain(domain) {
				for &record_type in record_types {
					let prefix = self.random_label(CACHE_BUST_LABEL_LEN);
					queries.push((format!("{}.{}", prefix, subdomain), record_type));
				}
			}
		}

		if self.include_third_party {
			for domain in COMMON_THIRD_PARTY {
				for &record_type in record_types {
					queries.push((domain.to_string(), record_type));
				}
			}
		}

		queries
	}

	/// Generate warm-cache queries: a fixed www. set with no randomization,
	/// identical on every call.
	pub fn warm_queries(
		&self,
		count: usize,
		record_types: &[RecordType],
	) -> Vec<(String, RecordType)> {
		let mut queries = Vec::new();

		for domain in self.domains.iter().take(count) {
			for &record_type in record_types {
				queries.push((format!("www.{}", domain), record_type));
			}
		}

		if self.include_third_party {
			for domain in COMMON_THIRD_PARTY {
				for &record_type in record_types {
					queries.push((domain.to_string(), record_type));
				}
			}
		}

		queries
	}

	/// Generate a burst simulating the DNS fan-out of one page load: a
	/// random subset of domains, each expanded to its typical resource
	/// hosts, plus a sample of third-party domains.
	pub fn burst_queries(
		&mut self,
		burst_size: usize,
		record_types: &[RecordType],
	) -> Vec<(String, RecordType)> {
		let mut queries = Vec::new();

		let picked: Vec<String> = self.domains
			.choose_multiple(&mut self.rng, burst_size.min(self.domains.len()))
			.cloned()
			.collect();

		for domain in &picked {
			for host in ["www", "cdn", "api", "static"] {
				for &record_type in record_types {
					queries.push((format!("{}.{}", host, domain), record_type));
				}
			}
		}

		let third_party_count = COMMON_THIRD_PARTY.len().min(10);
		for domain in COMMON_THIRD_PARTY.choose_multiple(&mut self.rng, third_party_count) {
			queries.push((domain.to_string(), RecordType::A));
		}

		queries
	}

	/// Generate queries for synthetically-constructed non-existent domains.
	///
	/// Uses the .invalid TLD, reserved by RFC 2606, so the answer is a
	/// guaranteed NXDOMAIN rather than a squatted wildcard.
	pub fn nxdomain_queries(&mut self, count: usize) -> Vec<(String, RecordType)> {
		(0..count)
			.map(|_| {
				let label = self.random_label(NXDOMAIN_LABEL_LEN);
				(format!("{}.nxdomain-probe.invalid", label), RecordType::A)
			})
			.collect()
	}
}
