mod cli;
mod dns;
mod domains;
mod engine;
mod model;
mod output;
mod resolver;
mod runner;
mod stats;
mod transport;
mod workload;

use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Parser;

use crate::cli::Cli;
use crate::engine::QueryEngine;
use crate::model::{BenchmarkResult, RecordType, Transport};
use crate::runner::{RunnerOptions, TestRunner};
use crate::workload::WorkloadGenerator;

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	if cli.list_resolvers {
		for (key, config) in resolver::builtin_resolvers() {
			println!("{:<22} {:<16} {}", key, config.ipv4, config.description);
		}
		return Ok(());
	}

	// Collect resolvers from all sources
	let mut resolvers = Vec::new();
	for name in &cli.resolvers {
		resolvers.push(resolver::get_resolver(name)?);
	}
	for ip in &cli.custom_resolvers {
		resolvers.push(resolver::custom_resolver(ip)?);
	}
	if let Some(path) = &cli.resolver_file {
		resolvers.extend(resolver::read_resolver_file(path)?);
	}
	if cli.system_resolvers {
		resolvers.extend(resolver::system_resolvers());
	}

	// Fall back to the default comparison set
	if resolvers.is_empty() {
		for key in resolver::DEFAULT_RESOLVERS {
			resolvers.push(resolver::get_resolver(key)?);
		}
	}

	let transports = cli.transports.iter()
		.map(|t| t.parse::<Transport>().map_err(|e| anyhow!(e)))
		.collect::<Result<Vec<_>>>()?;

	let record_types = if cli.record_types.is_empty() {
		vec![RecordType::A, RecordType::Aaaa]
	} else {
		cli.record_types.iter()
			.map(|t| t.parse::<RecordType>().map_err(|e| anyhow!(e)))
			.collect::<Result<Vec<_>>>()?
	};

	let base_domains = match &cli.domain_file {
		Some(path) => domains::read_domain_file(path)?,
		None => domains::default_domains(),
	};

	let opts = RunnerOptions {
		domain_count: cli.domain_count,
		runs: cli.runs,
		warmup_batches: cli.warmup,
		concurrency: cli.concurrency,
		burst_size: cli.burst_size,
		burst_concurrency: cli.burst_concurrency,
		nxdomain_count: cli.nxdomain_count,
		record_types,
	};

	output::print_config_summary(
		&resolvers, &transports, &opts,
		cli.timeout, cli.retries, cli.dnssec, cli.seed,
	);

	let engine = QueryEngine::new(
		Duration::from_secs_f64(cli.timeout),
		cli.retries,
		cli.dnssec,
	);
	let workload = WorkloadGenerator::new(
		base_domains,
		!cli.no_third_party,
		!cli.no_subdomain_expansion,
		cli.seed,
	);
	let mut runner = TestRunner::new(resolvers, transports, engine, workload)
		.with_progress(Box::new(|message, current, total| {
			println!("  [{}/{}] {}", current, total, message);
		}));

	match cli.mode.as_str() {
		"cold" | "warm" | "burst" | "nxdomain" => {
			let result = match cli.mode.as_str() {
				"cold" => runner.run_cold_test(&opts).await,
				"warm" => runner.run_warm_test(&opts).await,
				"burst" => runner.run_burst_test(&opts).await,
				_ => runner.run_nxdomain_test(&opts).await,
			};
			report_result(&cli, &result, None)?;
		}
		"comprehensive" | "all" => {
			let results = runner.run_comprehensive_test(&opts).await;
			for mode in ["cold", "warm", "burst", "nxdomain"] {
				if let Some(result) = results.get(mode) {
					report_result(&cli, result, Some(mode))?;
				}
			}
		}
		other => {
			runner.close();
			return Err(anyhow!(
				"unknown mode '{}' (expected cold, warm, burst, nxdomain, or comprehensive)",
				other,
			));
		}
	}

	runner.close();
	Ok(())
}

/// Print one benchmark result and run the requested exports. In
/// comprehensive mode the sub-mode name is folded into the output paths so
/// the four results do not overwrite each other.
fn report_result(cli: &Cli, result: &BenchmarkResult, mode_suffix: Option<&str>) -> Result<()> {
	output::print_results_table(result);
	let comparison = stats::compare_resolvers(&result.resolver_stats);
	output::print_comparison(&comparison);

	if let Some(path) = &cli.csv {
		output::write_csv(&suffixed_path(path, mode_suffix), result)?;
	}
	if let Some(path) = &cli.raw_csv {
		output::write_raw_csv(&suffixed_path(path, mode_suffix), result)?;
	}
	if let Some(path) = &cli.json {
		output::write_json(&suffixed_path(path, mode_suffix), result)?;
	}
	Ok(())
}

fn suffixed_path(path: &str, mode_suffix: Option<&str>) -> String {
	match mode_suffix {
		None => path.to_string(),
		Some(mode) => match path.rsplit_once('.') {
			Some((stem, ext)) => format!("{}-{}.{}", stem, mode, ext),
			None => format!("{}-{}", path, mode),
		},
	}
}
