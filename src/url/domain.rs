use std::net::IpAddr;
use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use contact_harvester::url::extract_domain;
///
/// let url = Url::parse("https://Staff.Univ-X.dz/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("staff.univ-x.dz".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Removes a single leading `www.` label
pub fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Returns true for IP literals and single-label hosts such as `localhost`
pub fn is_bare_host(host: &str) -> bool {
    let unbracketed = host.trim_start_matches('[').trim_end_matches(']');
    unbracketed.parse::<IpAddr>().is_ok() || !host.contains('.')
}

/// Computes the key two hosts must share to belong to the same domain unit
///
/// A leading `www.` is ignored. When the host ends in the crawl's suffix the
/// key is the last two labels (`staff.univ-x.dz` → `univ-x.dz`); otherwise it
/// is the full host.
pub fn domain_unit(host: &str, suffix: &str) -> String {
    let host = host.to_lowercase();
    let stripped = strip_www(&host);
    let suffix = suffix.trim_start_matches('.').to_lowercase();

    let labels: Vec<&str> = stripped.split('.').collect();
    match labels.as_slice() {
        [.., second, last] if *last == suffix && !is_bare_host(stripped) => {
            format!("{}.{}", second, last)
        }
        _ => stripped.to_string(),
    }
}

/// Checks whether two URLs belong to the same crawl unit
///
/// # Examples
///
/// ```
/// use url::Url;
/// use contact_harvester::url::same_domain_unit;
///
/// let a = Url::parse("https://staff.univ-x.dz/p").unwrap();
/// let b = Url::parse("https://www.univ-x.dz/q").unwrap();
/// assert!(same_domain_unit(&a, &b, "dz"));
/// ```
pub fn same_domain_unit(a: &Url, b: &Url, suffix: &str) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(ha), Some(hb)) => domain_unit(ha, suffix) == domain_unit(hb, suffix),
        _ => false,
    }
}

/// Returns true when both hosts are equal once `www.` is ignored
pub fn same_host(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(ha), Some(hb)) => strip_www(&ha.to_lowercase()) == strip_www(&hb.to_lowercase()),
        _ => false,
    }
}

/// Produces the URL with its `www.` prefix added or removed
///
/// Returns `None` for IP literals and single-label hosts, which have no
/// meaningful variant.
pub fn toggle_www(url: &Url) -> Option<Url> {
    let host = url.host_str()?;
    if is_bare_host(host) {
        return None;
    }

    let toggled = match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => format!("www.{}", host),
    };

    let mut variant = url.clone();
    variant.set_host(Some(&toggled)).ok()?;
    Some(variant)
}

/// Produces the URL with the other of http/https
pub fn toggle_scheme(url: &Url) -> Option<Url> {
    let other = match url.scheme() {
        "https" => "http",
        "http" => "https",
        _ => return None,
    };
    let mut variant = url.clone();
    variant.set_scheme(other).ok()?;
    Some(variant)
}
