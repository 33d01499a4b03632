use std::net::{Ipv4Addr, Ipv6Addr};

use anyhow::{anyhow, Result};

use crate::model::ResolverConfig;

fn resolver(
	name: &str,
	ipv4: [u8; 4],
	ipv6: Option<&str>,
	tls_hostname: Option<&str>,
	doh_url: Option<&str>,
	description: &str,
) -> ResolverConfig {
	ResolverConfig {
		name: name.to_string(),
		ipv4: Ipv4Addr::new(ipv4[0], ipv4[1], ipv4[2], ipv4[3]),
		ipv6: ipv6.map(|s| s.parse::<Ipv6Addr>().expect("bad built-in IPv6")),
		tls_hostname: tls_hostname.map(String::from),
		doh_url: doh_url.map(String::from),
		description: description.to_string(),
	}
}

/// Return the built-in registry of well-known public resolvers.
///
/// The registry is immutable configuration data: look up by key with
/// get_resolver, never modify entries.
pub fn builtin_resolvers() -> Vec<(&'static str, ResolverConfig)> {
	vec![
		("cloudflare", resolver(
			"Cloudflare", [1, 1, 1, 1],
			Some("2606:4700:4700::1111"),
			Some("cloudflare-dns.com"),
			Some("https://cloudflare-dns.com/dns-query"),
			"Cloudflare's privacy-focused DNS resolver",
		)),
		("cloudflare-secondary", resolver(
			"Cloudflare Secondary", [1, 0, 0, 1],
			Some("2606:4700:4700::1001"),
			Some("cloudflare-dns.com"),
			Some("https://cloudflare-dns.com/dns-query"),
			"Cloudflare's secondary DNS resolver",
		)),
		("google", resolver(
			"Google", [8, 8, 8, 8],
			Some("2001:4860:4860::8888"),
			Some("dns.google"),
			Some("https://dns.google/dns-query"),
			"Google Public DNS",
		)),
		("google-secondary", resolver(
			"Google Secondary", [8, 8, 4, 4],
			Some("2001:4860:4860::8844"),
			Some("dns.google"),
			Some("https://dns.google/dns-query"),
			"Google Public DNS secondary",
		)),
		("quad9", resolver(
			"Quad9", [9, 9, 9, 9],
			Some("2620:fe::fe"),
			Some("dns.quad9.net"),
			Some("https://dns.quad9.net/dns-query"),
			"Quad9 with malware blocking",
		)),
		("quad9-unsecured", resolver(
			"Quad9 Unsecured", [9, 9, 9, 10],
			Some("2620:fe::10"),
			Some("dns10.quad9.net"),
			Some("https://dns10.quad9.net/dns-query"),
			"Quad9 without malware blocking",
		)),
		("opendns", resolver(
			// OpenDNS does not offer DoT
			"OpenDNS", [208, 67, 222, 222],
			Some("2620:119:35::35"),
			None,
			Some("https://doh.opendns.com/dns-query"),
			"Cisco OpenDNS",
		)),
		("adguard", resolver(
			"AdGuard", [94, 140, 14, 14],
			Some("2a10:50c0::ad1:ff"),
			Some("dns.adguard-dns.com"),
			Some("https://dns.adguard-dns.com/dns-query"),
			"AdGuard DNS with ad blocking",
		)),
		("cleanbrowsing", resolver(
			"CleanBrowsing Security", [185, 228, 168, 9],
			Some("2a0d:2a00:1::2"),
			Some("security-filter-dns.cleanbrowsing.org"),
			Some("https://doh.cleanbrowsing.org/doh/security-filter/"),
			"CleanBrowsing security filter",
		)),
		("controld", resolver(
			"Control D", [76, 76, 2, 0],
			Some("2606:1a40::"),
			Some("p0.freedns.controld.com"),
			Some("https://freedns.controld.com/p0"),
			"Control D free unfiltered DNS",
		)),
	]
}

/// Resolver keys used when none are specified on the command line.
pub const DEFAULT_RESOLVERS: &[&str] = &["cloudflare", "google", "quad9"];

/// Look up a built-in resolver by key (case-insensitive).
pub fn get_resolver(name: &str) -> Result<ResolverConfig> {
	let key = name.to_ascii_lowercase();
	builtin_resolvers().into_iter()
		.find(|(k, _)| *k == key)
		.map(|(_, config)| config)
		.ok_or_else(|| anyhow!(
			"unknown resolver '{}' (available: {})",
			name,
			list_resolvers().join(", "),
		))
}

/// List the keys of all built-in resolvers.
pub fn list_resolvers() -> Vec<&'static str> {
	builtin_resolvers().into_iter().map(|(k, _)| k).collect()
}

/// Create an ad-hoc resolver configuration from a bare IPv4 address.
///
/// Custom resolvers support UDP and TCP only; DoT/DoH data is not known
/// for arbitrary addresses.
pub fn custom_resolver(input: &str) -> Result<ResolverConfig> {
	let trimmed = input.trim();
	let ipv4: Ipv4Addr = trimmed.parse()
		.map_err(|e| anyhow!("invalid IPv4 address '{}': {}", trimmed, e))?;
	Ok(ResolverConfig {
		name: trimmed.to_string(),
		ipv4,
		ipv6: None,
		tls_hostname: None,
		doh_url: None,
		description: format!("Custom resolver at {}", trimmed),
	})
}

/// Read custom resolver addresses from a file, one per line.
///
/// Blank lines and lines starting with '#' are skipped.
pub fn read_resolver_file(path: &str) -> Result<Vec<ResolverConfig>> {
	let content = std::fs::read_to_string(path)
		.map_err(|e| anyhow!("failed to read resolver file '{}': {}", path, e))?;
	let mut resolvers = Vec::new();
	for line in content.lines() {
		let trimmed = line.trim();
		if trimmed.is_empty() || trimmed.starts_with('#') {
			continue;
		}
		resolvers.push(custom_resolver(trimmed)?);
	}
	Ok(resolvers)
}

/// Read system resolvers from /etc/resolv.conf (Unix only).
///
/// Returns an empty vec on non-Unix platforms or if the file cannot be read.
pub fn system_resolvers() -> Vec<ResolverConfig> {
	let content = match std::fs::read_to_string("/etc/resolv.conf") {
		Ok(c) => c,
		Err(_) => return Vec::new(),
	};
	let mut resolvers = Vec::new();
	for line in content.lines() {
		let trimmed = line.trim();
		if !trimmed.starts_with("nameserver") {
			continue;
		}
		let parts: Vec<&str> = trimmed.split_whitespace().collect();
		if parts.len() >= 2 {
			if let Ok(resolver) = custom_resolver(parts[1]) {
				resolvers.push(resolver);
			}
		}
	}
	resolvers
}
