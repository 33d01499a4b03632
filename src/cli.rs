use clap::Parser;

/// DNS resolver benchmark tool
#[derive(Parser, Debug)]
#[command(name = "dns-speed-check")]
#[command(about = "Benchmark DNS resolver performance over UDP, TCP, DoT, and DoH")]
pub struct Cli {
	/// Test mode: cold, warm, burst, nxdomain, or comprehensive
	#[arg(short = 'm', long = "mode", default_value = "cold")]
	pub mode: String,

	/// Built-in resolver key to test (repeatable; see --list-resolvers)
	#[arg(short = 'r', long = "resolver")]
	pub resolvers: Vec<String>,

	/// Custom resolver IPv4 address (repeatable, e.g. 192.0.2.53)
	#[arg(short = 'c', long = "custom-resolver")]
	pub custom_resolvers: Vec<String>,

	/// File containing custom resolver addresses (one per line)
	#[arg(short = 'f', long = "resolver-file")]
	pub resolver_file: Option<String>,

	/// Include system resolvers from /etc/resolv.conf
	#[arg(long = "system-resolvers")]
	pub system_resolvers: bool,

	/// Transport to benchmark (repeatable: udp, tcp, dot, doh)
	#[arg(short = 'T', long = "transport", default_value = "udp")]
	pub transports: Vec<String>,

	/// Record type to query (repeatable: A, AAAA, CNAME, MX, TXT, NS;
	/// default A and AAAA)
	#[arg(long = "record-type")]
	pub record_types: Vec<String>,

	/// File containing base domains to query (one per line)
	#[arg(long = "domains")]
	pub domain_file: Option<String>,

	/// Number of base domains per test
	#[arg(short = 'd', long = "domain-count", default_value = "50")]
	pub domain_count: usize,

	/// Number of measured runs per test
	#[arg(short = 'n', long = "runs", default_value = "3")]
	pub runs: usize,

	/// Discarded cache-priming batches before warm measurement
	#[arg(long = "warmup", default_value = "2")]
	pub warmup: usize,

	/// Maximum concurrent in-flight queries per batch
	#[arg(long = "concurrency", default_value = "10")]
	pub concurrency: usize,

	/// Domains per burst in burst mode
	#[arg(long = "burst-size", default_value = "20")]
	pub burst_size: usize,

	/// Concurrent in-flight queries in burst mode
	#[arg(long = "burst-concurrency", default_value = "30")]
	pub burst_concurrency: usize,

	/// Non-existent domain probes per run in nxdomain mode
	#[arg(long = "nxdomain-count", default_value = "20")]
	pub nxdomain_count: usize,

	/// Per-attempt query timeout in seconds
	#[arg(short = 't', long = "timeout", default_value = "5.0")]
	pub timeout: f64,

	/// Retries after a failed attempt (1 retry = 2 attempts)
	#[arg(long = "retries", default_value = "1")]
	pub retries: u32,

	/// Request DNSSEC (set the DO bit on all queries)
	#[arg(long = "dnssec")]
	pub dnssec: bool,

	/// Exclude common third-party domains from workloads
	#[arg(long = "no-third-party")]
	pub no_third_party: bool,

	/// Disable subdomain expansion in cold workloads
	#[arg(long = "no-subdomain-expansion")]
	pub no_subdomain_expansion: bool,

	/// Random seed for reproducible workloads
	#[arg(short = 's', long = "seed")]
	pub seed: Option<u64>,

	/// Write per-resolver statistics to a CSV file
	#[arg(short = 'o', long = "csv")]
	pub csv: Option<String>,

	/// Write every raw query result to a CSV file
	#[arg(long = "raw-csv")]
	pub raw_csv: Option<String>,

	/// Write the full benchmark result to a JSON file
	#[arg(long = "json")]
	pub json: Option<String>,

	/// List built-in resolvers and exit
	#[arg(long = "list-resolvers")]
	pub list_resolvers: bool,
}
