use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::engine::QueryEngine;
use crate::model::{BenchmarkResult, QueryResult, RecordType, ResolverConfig, Transport};
use crate::stats;
use crate::workload::WorkloadGenerator;

/// Progress notification: (message, current unit, total units).
///
/// Advisory only; the runner never changes control flow based on it.
pub type ProgressCallback = Box<dyn Fn(&str, usize, usize) + Send + Sync>;

/// Knobs for a single test invocation
#[derive(Debug, Clone)]
pub struct RunnerOptions {
	pub domain_count: usize,
	pub runs: usize,
	/// Warm mode: discarded cache-priming batches before measurement
	pub warmup_batches: usize,
	pub concurrency: usize,
	pub burst_size: usize,
	pub burst_concurrency: usize,
	pub nxdomain_count: usize,
	pub record_types: Vec<RecordType>,
}

impl Default for RunnerOptions {
	fn default() -> Self {
		Self {
			domain_count: 50,
			runs: 3,
			warmup_batches: 2,
			concurrency: 10,
			burst_size: 20,
			burst_concurrency: 30,
			nxdomain_count: 20,
			record_types: vec![RecordType::A, RecordType::Aaaa],
		}
	}
}

/// Orchestrates benchmark execution across resolver x transport x run
/// combinations for each test mode, and assembles the final results.
///
/// Unsupported resolver/transport pairs are skipped up front via the
/// capability predicate, so transport construction never fails in normal
/// operation.
pub struct TestRunner {
	resolvers: Vec<ResolverConfig>,
	transports: Vec<Transport>,
	engine: QueryEngine,
	workload: WorkloadGenerator,
	progress: Option<ProgressCallback>,
}

impl TestRunner {
	pub fn new(
		resolvers: Vec<ResolverConfig>,
		transports: Vec<Transport>,
		engine: QueryEngine,
		workload: WorkloadGenerator,
	) -> Self {
		Self {
			resolvers,
			transports,
			engine,
			workload,
			progress: None,
		}
	}

	pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
		self.progress = Some(callback);
		self
	}

	fn report(&self, message: &str, current: usize, total: usize) {
		if let Some(callback) = &self.progress {
			callback(message, current, total);
		}
	}

	/// Count the resolver x transport pairs that will actually run.
	fn supported_pair_count(&self) -> usize {
		self.resolvers.iter()
			.map(|r| {
				self.transports.iter()
					.filter(|&&t| r.supports_transport(t))
					.count()
			})
			.sum()
	}

	/// Cold-start benchmark: every run regenerates cache-busting queries so
	/// each resolver must resolve upstream.
	pub async fn run_cold_test(&mut self, opts: &RunnerOptions) -> BenchmarkResult {
		let started_at = Utc::now();
		let mut all_results: Vec<QueryResult> = Vec::new();
		let total_units = self.supported_pair_count() * opts.runs;
		let mut current = 0;

		for run in 0..opts.runs {
			// Fresh random prefixes for every run
			let queries = self.workload.cold_queries(opts.domain_count, &opts.record_types);

			for resolver in &self.resolvers {
				for &transport in &self.transports {
					if !resolver.supports_transport(transport) {
						continue;
					}
					current += 1;
					self.report(
						&format!("Run {}/{}: {} ({})", run + 1, opts.runs, resolver.name, transport),
						current,
						total_units,
					);
					let results = self.engine
						.query_batch(&queries, resolver, transport, opts.concurrency)
						.await;
					all_results.extend(results);
				}
			}
		}

		self.build_result(all_results, started_at, "cold", opts.domain_count, opts.runs, opts.concurrency)
	}

	/// Warm-cache benchmark: one fixed query set; per pair a number of
	/// discarded warm-up batches, then measured batches whose results are
	/// marked as served from cache.
	pub async fn run_warm_test(&mut self, opts: &RunnerOptions) -> BenchmarkResult {
		let started_at = Utc::now();
		let mut all_results: Vec<QueryResult> = Vec::new();

		// One consistent query set, no randomization
		let queries = self.workload.warm_queries(opts.domain_count, &opts.record_types);

		let total_units = self.supported_pair_count() * opts.runs;
		let mut current = 0;

		for resolver in &self.resolvers {
			for &transport in &self.transports {
				if !resolver.supports_transport(transport) {
					continue;
				}

				self.report(
					&format!("Warming cache: {} ({})", resolver.name, transport),
					current,
					total_units,
				);
				for _ in 0..opts.warmup_batches {
					self.engine
						.query_batch(&queries, resolver, transport, opts.concurrency)
						.await;
				}

				for run in 0..opts.runs {
					current += 1;
					self.report(
						&format!("Run {}/{}: {} ({})", run + 1, opts.runs, resolver.name, transport),
						current,
						total_units,
					);
					let results = self.engine
						.query_batch(&queries, resolver, transport, opts.concurrency)
						.await;
					all_results.extend(results.into_iter().map(QueryResult::into_cached));
				}
			}
		}

		self.build_result(all_results, started_at, "warm", opts.domain_count, opts.runs, opts.concurrency)
	}

	/// Burst benchmark: each run samples a fresh simulated page-load set and
	/// executes it at high concurrency.
	pub async fn run_burst_test(&mut self, opts: &RunnerOptions) -> BenchmarkResult {
		let started_at = Utc::now();
		let mut all_results: Vec<QueryResult> = Vec::new();
		let total_units = self.supported_pair_count() * opts.runs;
		let mut current = 0;

		for run in 0..opts.runs {
			let queries = self.workload.burst_queries(opts.burst_size, &opts.record_types);

			for resolver in &self.resolvers {
				for &transport in &self.transports {
					if !resolver.supports_transport(transport) {
						continue;
					}
					current += 1;
					self.report(
						&format!("Burst {}/{}: {} ({})", run + 1, opts.runs, resolver.name, transport),
						current,
						total_units,
					);
					let results = self.engine
						.query_batch(&queries, resolver, transport, opts.burst_concurrency)
						.await;
					all_results.extend(results);
				}
			}
		}

		self.build_result(all_results, started_at, "burst", opts.burst_size, opts.runs, opts.burst_concurrency)
	}

	/// Probe resolver behavior for synthetically-constructed non-existent
	/// domains.
	pub async fn run_nxdomain_test(&mut self, opts: &RunnerOptions) -> BenchmarkResult {
		let started_at = Utc::now();
		let mut all_results: Vec<QueryResult> = Vec::new();
		let total_units = self.supported_pair_count() * opts.runs;
		let mut current = 0;

		for run in 0..opts.runs {
			let queries = self.workload.nxdomain_queries(opts.nxdomain_count);

			for resolver in &self.resolvers {
				for &transport in &self.transports {
					if !resolver.supports_transport(transport) {
						continue;
					}
					current += 1;
					self.report(
						&format!("NXDOMAIN {}/{}: {} ({})", run + 1, opts.runs, resolver.name, transport),
						current,
						total_units,
					);
					let results = self.engine
						.query_batch(&queries, resolver, transport, opts.concurrency)
						.await;
					all_results.extend(results);
				}
			}
		}

		self.build_result(all_results, started_at, "nxdomain", opts.nxdomain_count, opts.runs, opts.concurrency)
	}

	/// Run cold, warm, burst, and nxdomain sequentially, returning one
	/// result per sub-mode keyed by mode name.
	pub async fn run_comprehensive_test(
		&mut self,
		opts: &RunnerOptions,
	) -> HashMap<String, BenchmarkResult> {
		let mut results = HashMap::new();

		self.report("Running cold start test...", 1, 4);
		results.insert("cold".to_string(), self.run_cold_test(opts).await);

		self.report("Running warm cache test...", 2, 4);
		results.insert("warm".to_string(), self.run_warm_test(opts).await);

		self.report("Running burst test...", 3, 4);
		results.insert("burst".to_string(), self.run_burst_test(opts).await);

		self.report("Running NXDOMAIN test...", 4, 4);
		results.insert("nxdomain".to_string(), self.run_nxdomain_test(opts).await);

		results
	}

	/// Partition raw results by (resolver, transport) and reduce each
	/// non-empty partition into stats and a record-type breakdown.
	fn build_result(
		&self,
		results: Vec<QueryResult>,
		started_at: DateTime<Utc>,
		test_mode: &str,
		domains_tested: usize,
		runs: usize,
		parallel_queries: usize,
	) -> BenchmarkResult {
		let completed_at = Utc::now();

		let mut resolver_stats = Vec::new();
		let mut record_type_stats = HashMap::new();

		for resolver in &self.resolvers {
			for &transport in &self.transports {
				if !resolver.supports_transport(transport) {
					continue;
				}
				let subset: Vec<QueryResult> = results.iter()
					.filter(|r| r.resolver == resolver.name && r.transport == transport)
					.cloned()
					.collect();
				if subset.is_empty() {
					continue;
				}
				resolver_stats.push(stats::calculate_resolver_stats(
					&subset, &resolver.name, transport,
				));
				record_type_stats.insert(
					format!("{}_{}", resolver.name, transport),
					stats::calculate_record_type_stats(&subset),
				);
			}
		}

		BenchmarkResult {
			started_at,
			completed_at,
			test_mode: test_mode.to_string(),
			domains_tested,
			runs,
			parallel_queries,
			resolver_stats,
			raw_results: results,
			record_type_stats,
		}
	}

	/// Release engine resources. Call exactly once when done with the
	/// runner; failures to release are not possible here and a computed
	/// result is never invalidated by closing.
	pub fn close(&self) {
		self.engine.close();
	}
}
