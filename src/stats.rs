use serde::Serialize;

use crate::model::{QueryResult, QueryStatus, RecordType, RecordTypeStats, ResolverStats, Transport};

/// Calculate the p-th percentile from a sorted slice using linear
/// interpolation between closest ranks.
///
/// Args:
///   sorted_values: Pre-sorted slice of f64 values.
///   p: Percentile between 0.0 and 100.0 (e.g. 50.0 for median).
///
/// Returns:
///   None if the slice is empty, otherwise the interpolated value.
pub fn percentile(sorted_values: &[f64], p: f64) -> Option<f64> {
	if sorted_values.is_empty() {
		return None;
	}
	if sorted_values.len() == 1 {
		return Some(sorted_values[0]);
	}
	let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted_values.len() - 1) as f64;
	let lower = rank.floor() as usize;
	let upper = rank.ceil() as usize;
	if lower == upper {
		return Some(sorted_values[lower]);
	}
	let fraction = rank - lower as f64;
	Some(sorted_values[lower] + fraction * (sorted_values[upper] - sorted_values[lower]))
}

/// Calculate the arithmetic mean of a slice of values.
pub fn mean(values: &[f64]) -> Option<f64> {
	if values.is_empty() {
		return None;
	}
	let sum: f64 = values.iter().sum();
	Some(sum / values.len() as f64)
}

/// Calculate the population standard deviation of a slice of values.
pub fn stddev(values: &[f64]) -> Option<f64> {
	let avg = mean(values)?;
	let variance = values.iter()
		.map(|v| (v - avg).powi(2))
		.sum::<f64>() / values.len() as f64;
	Some(variance.sqrt())
}

/// Calculate jitter: the mean absolute difference between consecutive
/// latencies in their original execution order. Fewer than two values
/// means no variation to measure, so 0.0.
pub fn jitter(latencies: &[f64]) -> f64 {
	if latencies.len() < 2 {
		return 0.0;
	}
	let diffs: Vec<f64> = latencies.windows(2)
		.map(|pair| (pair[1] - pair[0]).abs())
		.collect();
	mean(&diffs).unwrap_or(0.0)
}

/// Aggregate raw query results for one (resolver, transport) pair.
///
/// Latency statistics are computed exclusively over the successful subset;
/// with zero successes every latency field, jitter included, is exactly 0.0.
/// Jitter uses the successful latencies in execution order, never sorted.
pub fn calculate_resolver_stats(
	results: &[QueryResult],
	resolver: &str,
	transport: Transport,
) -> ResolverStats {
	let successful: Vec<f64> = results.iter()
		.filter(|r| r.is_success())
		.map(|r| r.latency_ms())
		.collect();
	let failed = results.len() - successful.len();

	let timeouts = results.iter()
		.filter(|r| r.status == QueryStatus::Timeout)
		.count();
	let nxdomains = results.iter()
		.filter(|r| r.status == QueryStatus::NxDomain)
		.count();
	let errors = results.iter()
		.filter(|r| matches!(
			r.status,
			QueryStatus::Error | QueryStatus::ServFail | QueryStatus::Refused,
		))
		.count();

	let mut sorted = successful.clone();
	sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

	ResolverStats {
		resolver: resolver.to_string(),
		transport,
		total_queries: results.len(),
		successful_queries: successful.len(),
		failed_queries: failed,
		min_latency: sorted.first().copied().unwrap_or(0.0),
		max_latency: sorted.last().copied().unwrap_or(0.0),
		avg_latency: mean(&sorted).unwrap_or(0.0),
		median_latency: percentile(&sorted, 50.0).unwrap_or(0.0),
		p95_latency: percentile(&sorted, 95.0).unwrap_or(0.0),
		p99_latency: percentile(&sorted, 99.0).unwrap_or(0.0),
		stddev_latency: stddev(&sorted).unwrap_or(0.0),
		timeout_count: timeouts,
		nxdomain_count: nxdomains,
		error_count: errors,
		jitter_ms: jitter(&successful),
	}
}

/// Break the same raw result set down by record type, in order of first
/// appearance.
pub fn calculate_record_type_stats(results: &[QueryResult]) -> Vec<RecordTypeStats> {
	let mut order: Vec<RecordType> = Vec::new();
	for result in results {
		if !order.contains(&result.record_type) {
			order.push(result.record_type);
		}
	}

	order.into_iter()
		.map(|record_type| {
			let type_results: Vec<&QueryResult> = results.iter()
				.filter(|r| r.record_type == record_type)
				.collect();
			let latencies: Vec<f64> = type_results.iter()
				.filter(|r| r.is_success())
				.map(|r| r.latency_ms())
				.collect();
			let success_rate = if type_results.is_empty() {
				0.0
			} else {
				(latencies.len() as f64 / type_results.len() as f64) * 100.0
			};
			RecordTypeStats {
				record_type,
				count: type_results.len(),
				avg_latency: mean(&latencies).unwrap_or(0.0),
				success_rate,
			}
		})
		.collect()
}

/// Cross-resolver comparison: rankings, winner, and the latency improvement
/// the winner offers over each other candidate.
#[derive(Debug, Clone, Serialize)]
pub struct ResolverComparison {
	/// (resolver, avg latency ms), ascending
	pub by_latency: Vec<(String, f64)>,
	/// (resolver, success rate %), descending
	pub by_reliability: Vec<(String, f64)>,
	/// (resolver, composite score), descending
	pub by_composite: Vec<(String, f64)>,
	pub winner: Option<ResolverStats>,
	/// (resolver, % latency improvement the winner offers), in composite
	/// order; entries with zero average latency are omitted
	pub improvements: Vec<(String, f64)>,
}

impl ResolverComparison {
	fn empty() -> Self {
		Self {
			by_latency: Vec::new(),
			by_reliability: Vec::new(),
			by_composite: Vec::new(),
			winner: None,
			improvements: Vec::new(),
		}
	}
}

/// Composite score: 0.6 x normalized latency + 0.4 x success rate.
///
/// Latency is rescaled linearly so the fastest observed average scores 1.0
/// and the slowest 0.0; identical averages all score 1.0.
fn composite_score(stats: &ResolverStats, min_avg: f64, max_avg: f64) -> f64 {
	let latency_score = if (max_avg - min_avg).abs() < f64::EPSILON {
		1.0
	} else {
		1.0 - ((stats.avg_latency - min_avg) / (max_avg - min_avg))
	};
	latency_score * 0.6 + (stats.success_rate() / 100.0) * 0.4
}

/// Compare resolvers and determine rankings.
///
/// Only resolvers with at least one successful query are candidates; with
/// no candidates the comparison is empty and the winner is None.
pub fn compare_resolvers(stats_list: &[ResolverStats]) -> ResolverComparison {
	let valid: Vec<&ResolverStats> = stats_list.iter()
		.filter(|s| s.successful_queries > 0)
		.collect();
	if valid.is_empty() {
		return ResolverComparison::empty();
	}

	let min_avg = valid.iter().map(|s| s.avg_latency).fold(f64::INFINITY, f64::min);
	let max_avg = valid.iter().map(|s| s.avg_latency).fold(f64::NEG_INFINITY, f64::max);

	let mut by_latency: Vec<(String, f64)> = valid.iter()
		.map(|s| (s.resolver.clone(), s.avg_latency))
		.collect();
	by_latency.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

	let mut by_reliability: Vec<(String, f64)> = valid.iter()
		.map(|s| (s.resolver.clone(), s.success_rate()))
		.collect();
	by_reliability.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

	let mut scored: Vec<(&ResolverStats, f64)> = valid.iter()
		.map(|s| (*s, composite_score(s, min_avg, max_avg)))
		.collect();
	scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

	let by_composite: Vec<(String, f64)> = scored.iter()
		.map(|(s, score)| (s.resolver.clone(), *score))
		.collect();

	let winner = scored[0].0.clone();
	let improvements: Vec<(String, f64)> = scored.iter()
		.skip(1)
		.filter(|(s, _)| s.avg_latency > 0.0)
		.map(|(s, _)| {
			let improvement = (s.avg_latency - winner.avg_latency) / s.avg_latency * 100.0;
			(s.resolver.clone(), improvement)
		})
		.collect();

	ResolverComparison {
		by_latency,
		by_reliability,
		by_composite,
		winner: Some(winner),
		improvements,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::TimingBreakdown;
	use chrono::Utc;

	fn result_with(status: QueryStatus, latency_ms: f64, record_type: RecordType) -> QueryResult {
		QueryResult {
			domain: "example.com".to_string(),
			record_type,
			resolver: "Test".to_string(),
			transport: Transport::Udp,
			status,
			timing: TimingBreakdown {
				total_ms: latency_ms,
				connection_ms: 0.0,
				query_ms: latency_ms,
			},
			timestamp: Utc::now(),
			answers: Vec::new(),
			ttl: None,
			responder: None,
			cached: false,
			error: None,
		}
	}

	fn success(latency_ms: f64) -> QueryResult {
		result_with(QueryStatus::Success, latency_ms, RecordType::A)
	}

	fn stats_with(resolver: &str, successful: usize, total: usize, avg: f64) -> ResolverStats {
		ResolverStats {
			resolver: resolver.to_string(),
			transport: Transport::Udp,
			total_queries: total,
			successful_queries: successful,
			failed_queries: total - successful,
			min_latency: avg,
			max_latency: avg,
			avg_latency: avg,
			median_latency: avg,
			p95_latency: avg,
			p99_latency: avg,
			stddev_latency: 0.0,
			timeout_count: 0,
			nxdomain_count: 0,
			error_count: total - successful,
			jitter_ms: 0.0,
		}
	}

	#[test]
	fn test_percentile_interpolates() {
		let values = vec![10.0, 20.0, 30.0, 40.0];
		assert_eq!(percentile(&values, 50.0), Some(25.0));
		assert_eq!(percentile(&values, 0.0), Some(10.0));
		assert_eq!(percentile(&values, 100.0), Some(40.0));
		let pair = vec![0.0, 10.0];
		assert_eq!(percentile(&pair, 50.0), Some(5.0));
	}

	#[test]
	fn test_percentile_empty_and_single() {
		assert_eq!(percentile(&[], 50.0), None);
		assert_eq!(percentile(&[42.0], 50.0), Some(42.0));
		assert_eq!(percentile(&[42.0], 99.0), Some(42.0));
	}

	#[test]
	fn test_mean() {
		assert_eq!(mean(&[1.0, 2.0, 3.0, 4.0, 5.0]), Some(3.0));
		assert_eq!(mean(&[]), None);
	}

	#[test]
	fn test_stddev_population() {
		let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
		let sd = stddev(&values).unwrap();
		assert!((sd - 2.0).abs() < 0.01);
	}

	#[test]
	fn test_jitter_single_value() {
		assert_eq!(jitter(&[10.0]), 0.0);
		assert_eq!(jitter(&[]), 0.0);
	}

	#[test]
	fn test_jitter_execution_order() {
		// mean(|20-10|, |15-20|) = mean(10, 5) = 7.5
		let latencies = vec![10.0, 20.0, 15.0];
		assert!((jitter(&latencies) - 7.5).abs() < 1e-9);
	}

	#[test]
	fn test_stats_counts_balance() {
		let results = vec![
			success(10.0),
			success(20.0),
			result_with(QueryStatus::Timeout, 2000.0, RecordType::A),
			result_with(QueryStatus::NxDomain, 8.0, RecordType::A),
			result_with(QueryStatus::ServFail, 9.0, RecordType::A),
			result_with(QueryStatus::Refused, 9.0, RecordType::A),
			result_with(QueryStatus::Error, 0.0, RecordType::A),
		];
		let stats = calculate_resolver_stats(&results, "Test", Transport::Udp);
		assert_eq!(stats.total_queries, 7);
		assert_eq!(stats.successful_queries + stats.failed_queries, stats.total_queries);
		assert_eq!(stats.timeout_count, 1);
		assert_eq!(stats.nxdomain_count, 1);
		// ERROR family: error + servfail + refused
		assert_eq!(stats.error_count, 3);
		let rate = stats.success_rate();
		assert!((0.0..=100.0).contains(&rate));
	}

	#[test]
	fn test_stats_latency_ordering_invariants() {
		let results: Vec<QueryResult> = [12.0, 55.0, 8.0, 30.0, 21.0, 44.0, 16.0]
			.iter()
			.map(|&l| success(l))
			.collect();
		let stats = calculate_resolver_stats(&results, "Test", Transport::Udp);
		assert!(stats.min_latency <= stats.median_latency);
		assert!(stats.median_latency <= stats.max_latency);
		assert!(stats.p95_latency <= stats.p99_latency + 1e-9);
		assert!(stats.p99_latency <= stats.max_latency + 1e-9);
	}

	#[test]
	fn test_stats_zero_successes_all_zero() {
		let results = vec![
			result_with(QueryStatus::Timeout, 2000.0, RecordType::A),
			result_with(QueryStatus::Error, 2000.0, RecordType::A),
		];
		let stats = calculate_resolver_stats(&results, "Test", Transport::Udp);
		assert_eq!(stats.successful_queries, 0);
		assert_eq!(stats.min_latency, 0.0);
		assert_eq!(stats.max_latency, 0.0);
		assert_eq!(stats.avg_latency, 0.0);
		assert_eq!(stats.median_latency, 0.0);
		assert_eq!(stats.p95_latency, 0.0);
		assert_eq!(stats.p99_latency, 0.0);
		assert_eq!(stats.stddev_latency, 0.0);
		assert_eq!(stats.jitter_ms, 0.0);
	}

	#[test]
	fn test_stats_jitter_uses_execution_order() {
		// Sorted order would give jitter mean(5, 5) = 5; execution order
		// gives mean(10, 5) = 7.5
		let results: Vec<QueryResult> = [10.0, 20.0, 15.0].iter().map(|&l| success(l)).collect();
		let stats = calculate_resolver_stats(&results, "Test", Transport::Udp);
		assert!((stats.jitter_ms - 7.5).abs() < 1e-9);
	}

	#[test]
	fn test_record_type_breakdown() {
		let results = vec![
			success(10.0),
			result_with(QueryStatus::Success, 30.0, RecordType::Aaaa),
			result_with(QueryStatus::Timeout, 2000.0, RecordType::Aaaa),
			success(20.0),
		];
		let breakdown = calculate_record_type_stats(&results);
		assert_eq!(breakdown.len(), 2);

		let a = breakdown.iter().find(|s| s.record_type == RecordType::A).unwrap();
		assert_eq!(a.count, 2);
		assert!((a.avg_latency - 15.0).abs() < 1e-9);
		assert!((a.success_rate - 100.0).abs() < 1e-9);

		let aaaa = breakdown.iter().find(|s| s.record_type == RecordType::Aaaa).unwrap();
		assert_eq!(aaaa.count, 2);
		assert!((aaaa.success_rate - 50.0).abs() < 1e-9);
	}

	#[test]
	fn test_compare_two_resolvers() {
		let stats = vec![
			stats_with("A", 10, 10, 10.0),
			stats_with("B", 10, 10, 20.0),
		];
		let comparison = compare_resolvers(&stats);

		let winner = comparison.winner.unwrap();
		assert_eq!(winner.resolver, "A");

		let score_a = comparison.by_composite.iter().find(|(n, _)| n == "A").unwrap().1;
		let score_b = comparison.by_composite.iter().find(|(n, _)| n == "B").unwrap().1;
		assert!(score_a > score_b);

		// improvement(B) = (20 - 10) / 20 x 100 = 50%
		assert_eq!(comparison.improvements.len(), 1);
		assert_eq!(comparison.improvements[0].0, "B");
		assert!((comparison.improvements[0].1 - 50.0).abs() < 1e-9);
	}

	#[test]
	fn test_compare_identical_latencies_collapse_to_full_score() {
		let stats = vec![
			stats_with("A", 10, 10, 15.0),
			stats_with("B", 10, 10, 15.0),
		];
		let comparison = compare_resolvers(&stats);
		for (_, score) in &comparison.by_composite {
			assert!((score - 1.0).abs() < 1e-9);
		}
	}

	#[test]
	fn test_compare_excludes_zero_success() {
		let stats = vec![
			stats_with("dead", 0, 10, 0.0),
			stats_with("alive", 5, 10, 25.0),
		];
		let comparison = compare_resolvers(&stats);
		assert_eq!(comparison.by_latency.len(), 1);
		assert_eq!(comparison.winner.unwrap().resolver, "alive");
	}

	#[test]
	fn test_compare_no_successes_is_empty() {
		let stats = vec![
			stats_with("dead1", 0, 10, 0.0),
			stats_with("dead2", 0, 10, 0.0),
		];
		let comparison = compare_resolvers(&stats);
		assert!(comparison.winner.is_none());
		assert!(comparison.by_latency.is_empty());
		assert!(comparison.by_reliability.is_empty());
		assert!(comparison.by_composite.is_empty());
		assert!(comparison.improvements.is_empty());
	}

	#[test]
	fn test_compare_omits_improvement_for_zero_average() {
		let stats = vec![
			stats_with("fast", 10, 10, 5.0),
			stats_with("zero", 10, 10, 0.0),
		];
		let comparison = compare_resolvers(&stats);
		// "zero" wins on latency; "fast" gets an improvement entry, but a
		// zero-average non-winner never divides by zero
		assert!(comparison.improvements.iter().all(|(name, _)| name != "zero"));
	}
}
