use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use anyhow::Result;

use crate::model::{BenchmarkResult, ResolverConfig, ResolverStats, Transport};
use crate::runner::RunnerOptions;
use crate::stats::ResolverComparison;

/// Print a summary of the benchmark configuration before running.
pub fn print_config_summary(
	resolvers: &[ResolverConfig],
	transports: &[Transport],
	opts: &RunnerOptions,
	timeout_secs: f64,
	retries: u32,
	dnssec: bool,
	seed: Option<u64>,
) {
	println!("DNS Benchmark Configuration");
	println!("===========================");
	println!("Resolvers:      {}", resolvers.len());
	for r in resolvers {
		let caps: Vec<String> = transports.iter()
			.filter(|&&t| r.supports_transport(t))
			.map(|t| t.to_string())
			.collect();
		println!("  - {} ({}) [{}]", r.name, r.ipv4, caps.join(", "));
	}
	let transport_names: Vec<String> = transports.iter().map(|t| t.to_string()).collect();
	println!("Transports:     {}", transport_names.join(", "));
	println!("Domains:        {}", opts.domain_count);
	println!("Runs:           {}", opts.runs);
	println!("Concurrency:    {}", opts.concurrency);
	println!("Timeout:        {:.1} s", timeout_secs);
	println!("Retries:        {}", retries);
	let dnssec_label = if dnssec { "yes" } else { "no" };
	println!("DNSSEC:         {}", dnssec_label);
	if let Some(seed) = seed {
		println!("Seed:           {}", seed);
	}
	println!();
}

/// Sort stats for display: successful resolvers by ascending average
/// latency, dead ones last.
fn display_order(stats: &[ResolverStats]) -> Vec<&ResolverStats> {
	let mut ordered: Vec<&ResolverStats> = stats.iter().collect();
	ordered.sort_by(|a, b| {
		match (a.successful_queries > 0, b.successful_queries > 0) {
			(true, false) => std::cmp::Ordering::Less,
			(false, true) => std::cmp::Ordering::Greater,
			_ => a.avg_latency.partial_cmp(&b.avg_latency)
				.unwrap_or(std::cmp::Ordering::Equal),
		}
	});
	ordered
}

/// Print one benchmark result as a formatted table.
pub fn print_results_table(result: &BenchmarkResult) {
	let mut table = Table::new();
	table.load_preset(UTF8_FULL);
	table.set_content_arrangement(ContentArrangement::Dynamic);
	table.set_header(vec![
		"Resolver", "Transport", "Queries", "Success %",
		"Avg", "Median", "P95", "P99", "Jitter", "Timeouts",
	]);

	for s in display_order(&result.resolver_stats) {
		table.add_row(vec![
			s.resolver.clone(),
			s.transport.to_string(),
			format!("{}", s.total_queries),
			format!("{:.1}%", s.success_rate()),
			format!("{:.1} ms", s.avg_latency),
			format!("{:.1} ms", s.median_latency),
			format!("{:.1} ms", s.p95_latency),
			format!("{:.1} ms", s.p99_latency),
			format!("{:.1} ms", s.jitter_ms),
			format!("{}", s.timeout_count),
		]);
	}

	println!("\n{} test results ({:.1} s)", result.test_mode, result.duration_seconds());
	println!("{}", "=".repeat(result.test_mode.len() + 13));
	println!("{table}");
	if let Some(winner) = result.winner() {
		println!(
			"Winner: {} over {} ({:.1} ms avg)",
			winner.resolver, winner.transport, winner.avg_latency,
		);
	} else {
		println!("Winner: none (no resolver completed a query successfully)");
	}
}

/// Print cross-resolver rankings and improvement percentages.
pub fn print_comparison(comparison: &ResolverComparison) {
	let Some(winner) = &comparison.winner else {
		return;
	};

	println!("\nRankings");
	println!("========");
	for (i, (name, score)) in comparison.by_composite.iter().enumerate() {
		println!("  {}. {} (score {:.3})", i + 1, name, score);
	}
	for (name, improvement) in &comparison.improvements {
		println!(
			"  {} is {:.1}% faster than {}",
			winner.resolver, improvement, name,
		);
	}
}

/// Write per-resolver statistics to a CSV file.
pub fn write_csv(path: &str, result: &BenchmarkResult) -> Result<()> {
	let mut writer = csv::Writer::from_path(path)?;

	writer.write_record([
		"resolver", "transport",
		"total_queries", "successful_queries", "failed_queries", "success_rate",
		"min_ms", "max_ms", "avg_ms", "median_ms", "p95_ms", "p99_ms",
		"stddev_ms", "jitter_ms",
		"timeout_count", "nxdomain_count", "error_count",
	])?;

	for s in display_order(&result.resolver_stats) {
		writer.write_record([
			s.resolver.clone(),
			s.transport.to_string(),
			s.total_queries.to_string(),
			s.successful_queries.to_string(),
			s.failed_queries.to_string(),
			format!("{:.1}", s.success_rate()),
			format!("{:.2}", s.min_latency),
			format!("{:.2}", s.max_latency),
			format!("{:.2}", s.avg_latency),
			format!("{:.2}", s.median_latency),
			format!("{:.2}", s.p95_latency),
			format!("{:.2}", s.p99_latency),
			format!("{:.2}", s.stddev_latency),
			format!("{:.2}", s.jitter_ms),
			s.timeout_count.to_string(),
			s.nxdomain_count.to_string(),
			s.error_count.to_string(),
		])?;
	}

	writer.flush()?;
	println!("\nResults written to: {}", path);
	Ok(())
}

/// Write every raw query result to a CSV file.
pub fn write_raw_csv(path: &str, result: &BenchmarkResult) -> Result<()> {
	let mut writer = csv::Writer::from_path(path)?;

	writer.write_record([
		"timestamp", "resolver", "transport", "domain", "record_type",
		"status", "total_ms", "connection_ms", "query_ms",
		"ttl", "cached", "responder", "error",
	])?;

	for r in &result.raw_results {
		writer.write_record([
			r.timestamp.to_rfc3339(),
			r.resolver.clone(),
			r.transport.to_string(),
			r.domain.clone(),
			r.record_type.to_string(),
			r.status.to_string(),
			format!("{:.2}", r.timing.total_ms),
			format!("{:.2}", r.timing.connection_ms),
			format!("{:.2}", r.timing.query_ms),
			r.ttl.map(|t| t.to_string()).unwrap_or_default(),
			r.cached.to_string(),
			r.responder.clone().unwrap_or_default(),
			r.error.clone().unwrap_or_default(),
		])?;
	}

	writer.flush()?;
	println!("Raw results written to: {}", path);
	Ok(())
}

/// Write the full benchmark result as JSON.
pub fn write_json(path: &str, result: &BenchmarkResult) -> Result<()> {
	let mut stats = Vec::with_capacity(result.resolver_stats.len());
	for s in &result.resolver_stats {
		let mut value = serde_json::to_value(s)?;
		value["success_rate"] = serde_json::json!(s.success_rate());
		stats.push(value);
	}

	let document = serde_json::json!({
		"test_mode": result.test_mode,
		"started_at": result.started_at,
		"completed_at": result.completed_at,
		"duration_seconds": result.duration_seconds(),
		"domains_tested": result.domains_tested,
		"runs": result.runs,
		"parallel_queries": result.parallel_queries,
		"winner": result.winner().map(|w| w.resolver.clone()),
		"resolver_stats": stats,
		"record_type_stats": result.record_type_stats,
		"raw_results": result.raw_results,
	});

	std::fs::write(path, serde_json::to_string_pretty(&document)?)?;
	println!("JSON written to: {}", path);
	Ok(())
}
