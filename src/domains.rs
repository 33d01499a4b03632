use anyhow::{anyhow, Result};

/// Common third-party domains loaded by real web pages: CDNs, fonts,
/// analytics, APIs, media hosts.
pub const COMMON_THIRD_PARTY: &[&str] = &[
	// CDNs
	"cdn.jsdelivr.net",
	"cdnjs.cloudflare.com",
	"unpkg.com",
	"ajax.googleapis.com",
	"code.jquery.com",
	"stackpath.bootstrapcdn.com",
	"maxcdn.bootstrapcdn.com",
	// Fonts
	"fonts.googleapis.com",
	"fonts.gstatic.com",
	"use.fontawesome.com",
	"use.typekit.net",
	// Analytics and tracking
	"www.google-analytics.com",
	"www.googletagmanager.com",
	"connect.facebook.net",
	"platform.twitter.com",
	"snap.licdn.com",
	"s.pinimg.com",
	"static.ads-twitter.com",
	// APIs and services
	"api.stripe.com",
	"js.stripe.com",
	"www.paypal.com",
	"apis.google.com",
	"maps.googleapis.com",
	"www.gstatic.com",
	"ssl.gstatic.com",
	// Media and images
	"images.unsplash.com",
	"i.imgur.com",
	"pbs.twimg.com",
	"scontent.xx.fbcdn.net",
	// Security widgets
	"www.google.com",
	"challenges.cloudflare.com",
	"static.cloudflareinsights.com",
];

/// Common subdomain prefixes used for realistic workload expansion.
pub const COMMON_SUBDOMAINS: &[&str] = &[
	"www",
	"api",
	"cdn",
	"static",
	"assets",
	"media",
	"img",
	"images",
	"m",
	"mobile",
	"app",
	"login",
	"auth",
	"secure",
	"mail",
];

/// Return the default list of popular base domains.
pub fn default_domains() -> Vec<String> {
	vec![
		"google.com",
		"youtube.com",
		"facebook.com",
		"amazon.com",
		"wikipedia.org",
		"twitter.com",
		"instagram.com",
		"linkedin.com",
		"reddit.com",
		"netflix.com",
		"microsoft.com",
		"apple.com",
		"github.com",
		"stackoverflow.com",
		"cloudflare.com",
		"zoom.us",
		"spotify.com",
		"ebay.com",
		"bbc.co.uk",
		"nytimes.com",
	].into_iter().map(String::from).collect()
}

/// Read domains from a file, one per line.
///
/// Blank lines and lines starting with '#' are skipped.
pub fn read_domain_file(path: &str) -> Result<Vec<String>> {
	let content = std::fs::read_to_string(path)
		.map_err(|e| anyhow!("failed to read domain file '{}': {}", path, e))?;
	let domains: Vec<String> = content.lines()
		.map(|line| line.trim().to_string())
		.filter(|line| !line.is_empty() && !line.starts_with('#'))
		.collect();
	Ok(domains)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_domains_size() {
		let domains = default_domains();
		assert_eq!(domains.len(), 20);
	}

	#[test]
	fn test_default_domains_look_valid() {
		for domain in default_domains() {
			assert!(domain.contains('.'), "not a domain: {}", domain);
			assert!(!domain.starts_with("www."), "base domains only: {}", domain);
		}
	}

	#[test]
	fn test_third_party_non_empty() {
		assert!(COMMON_THIRD_PARTY.len() >= 30);
	}

	#[test]
	fn test_subdomain_prefixes_have_no_dots() {
		for prefix in COMMON_SUBDOMAINS {
			assert!(!prefix.contains('.'), "prefix must be a bare label: {}", prefix);
		}
	}
}
