//! URL and registrable-domain helpers.

use url::Url;

/// Second-level labels that sit under a two-letter country TLD, as in `co.uk`.
const COUNTRY_SECOND_LEVEL: [&str; 7] = ["co", "com", "org", "net", "ac", "gov", "edu"];

/// Extract the registrable domain of an absolute URL.
///
/// The host is lowercased and a leading `www.` removed. The last two labels
/// are kept, or the last three when the domain sits under a country
/// second-level label such as `co.uk` or `com.au`. IP hosts are returned as-is.
#[must_use]
pub fn registrable_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    match parsed.host()? {
        url::Host::Domain(host) => Some(domain_of_host(host)),
        url::Host::Ipv4(ip) => Some(ip.to_string()),
        url::Host::Ipv6(ip) => Some(ip.to_string()),
    }
}

fn domain_of_host(host: &str) -> String {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();

    let keep = match labels.as_slice() {
        [.., second, tld]
            if labels.len() >= 3
                && tld.len() == 2
                && COUNTRY_SECOND_LEVEL.contains(second) =>
        {
            3
        }
        _ => 2,
    };

    let start = labels.len().saturating_sub(keep);
    labels[start..].join(".")
}

/// Normalize a page URL for identity comparisons.
///
/// Drops the fragment, a leading `www.`, the default port and a trailing
/// slash, and lowercases scheme and host. Returns `None` for URLs that do not
/// parse.
#[must_use]
pub fn normalize_page_url(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url.trim()).ok()?;
    parsed.set_fragment(None);
    let host = parsed.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    let path = parsed.path().trim_end_matches('/');
    let query = parsed.query().map(|q| format!("?{q}")).unwrap_or_default();
    let port = parsed.port().map(|p| format!(":{p}")).unwrap_or_default();
    Some(format!("{}://{host}{port}{path}{query}", parsed.scheme()))
}
