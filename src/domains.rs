//! Hostname handling: source domains and their subdomain variants.

use itertools::Itertools;
use url::Url;

/// Subdomains that news outlets commonly serve articles from, in query order.
const SUBDOMAIN_PREFIXES: [&str; 5] = ["news", "blog", "m", "mobile", "editorial"];

/// Expand one domain into the ordered, duplicate-free list of hostnames to query.
///
/// The list is the domain itself, `www.<domain>` unless it already starts
/// with `www.`, then one entry per prefix in [`SUBDOMAIN_PREFIXES`].
///
/// # Examples
///
/// ```ignore
/// assert_eq!(domain_variants("example.com")[1], "www.example.com");
/// ```
pub fn domain_variants(domain: &str) -> Vec<String> {
    let domain = domain.trim().to_lowercase();
    let www = (!domain.starts_with("www.")).then(|| format!("www.{domain}"));

    std::iter::once(domain.clone())
        .chain(www)
        .chain(
            SUBDOMAIN_PREFIXES
                .iter()
                .map(|prefix| format!("{prefix}.{domain}")),
        )
        .unique()
        .collect()
}

/// Derive the domain to query from a source's root URL.
///
/// Accepts full URLs as well as bare hostnames (`example.com/path`). Falls
/// back to the trimmed, lowercased input when no host can be parsed.
pub fn source_domain(root_url: &str) -> String {
    let trimmed = root_url.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    Url::parse(&candidate)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_else(|| trimmed.to_lowercase())
}

/// Hostname of a captured page URL, or the raw URL when it has none.
pub fn url_host(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}
