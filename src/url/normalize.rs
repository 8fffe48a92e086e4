use crate::UrlError;
use url::Url;

/// Normalizes a URL according to Contact-Harvester's normalization rules
///
/// # Normalization Steps
///
/// 1. Default a missing scheme to `https://`
/// 2. Parse the URL; reject if malformed or not HTTP(S)
/// 3. Lowercase the host
/// 4. Strip trailing slashes from the path, except for the root `/`
/// 5. Keep the query string and fragment exactly as given
///
/// The result is stable: normalizing an already normalized URL returns it
/// unchanged, so normalized URLs can key the visited set directly.
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - Failed to parse or normalize the URL
///
/// # Examples
///
/// ```
/// use contact_harvester::url::normalize_url;
///
/// let url = normalize_url("WWW.Univ-X.DZ/staff/?page=2#top").unwrap();
/// assert_eq!(url.as_str(), "https://www.univ-x.dz/staff?page=2#top");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let trimmed = url_str.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Parse("empty URL".to_string()));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else if let Some(rest) = trimmed.strip_prefix("//") {
        format!("https://{}", rest)
    } else {
        format!("https://{}", trimmed)
    };

    let mut url = Url::parse(&with_scheme).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or(UrlError::MissingDomain)?
        .to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let stripped = path.trim_end_matches('/');
        let new_path = if stripped.is_empty() {
            "/".to_string()
        } else {
            stripped.to_string()
        };
        url.set_path(&new_path);
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_scheme_defaults_to_https() {
        let url = normalize_url("univ-x.dz/page").unwrap();
        assert_eq!(url.as_str(), "https://univ-x.dz/page");

        let url = normalize_url("//univ-x.dz/page").unwrap();
        assert_eq!(url.as_str(), "https://univ-x.dz/page");
    }

    #[test]
    fn test_explicit_http_is_kept() {
        let url = normalize_url("http://univ-x.dz/page").unwrap();
        assert_eq!(url.scheme(), "http");
    }

    #[test]
    fn test_lowercase_host() {
        let url = normalize_url("https://UNIV-X.DZ/Path").unwrap();
        assert_eq!(url.host_str(), Some("univ-x.dz"));
        // Path case is significant
        assert_eq!(url.path(), "/Path");
    }

    #[test]
    fn test_www_is_preserved() {
        let url = normalize_url("https://www.univ-x.dz/").unwrap();
        assert_eq!(url.host_str(), Some("www.univ-x.dz"));
    }

    #[test]
    fn test_trailing_slash_removed() {
        let url = normalize_url("https://univ-x.dz/staff/").unwrap();
        assert_eq!(url.path(), "/staff");

        let url = normalize_url("https://univ-x.dz/staff///").unwrap();
        assert_eq!(url.path(), "/staff");
    }

    #[test]
    fn test_root_slash_kept() {
        let url = normalize_url("https://univ-x.dz/").unwrap();
        assert_eq!(url.as_str(), "https://univ-x.dz/");

        let url = normalize_url("https://univ-x.dz").unwrap();
        assert_eq!(url.as_str(), "https://univ-x.dz/");
    }

    #[test]
    fn test_query_and_fragment_preserved() {
        let url = normalize_url("https://univ-x.dz/list/?z=1&a=2#section").unwrap();
        assert_eq!(url.as_str(), "https://univ-x.dz/list?z=1&a=2#section");
    }

    #[test]
    fn test_invalid_scheme() {
        assert!(matches!(
            normalize_url("ftp://univ-x.dz/file"),
            Err(UrlError::InvalidScheme(_))
        ));
    }

    #[test]
    fn test_empty_url() {
        assert!(normalize_url("   ").is_err());
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "univ-x.dz",
            "HTTPS://WWW.UNIV-X.DZ/a/b/",
            "http://univ-x.dz:8080/x/?q=1#f",
            "https://staff.univ-x.dz/page/2/",
            "https://univ-x.dz/%7Euser/",
            "https://univ-x.dz/a b/",
        ];
        for input in inputs {
            let once = normalize_url(input).unwrap();
            let twice = normalize_url(once.as_str()).unwrap();
            assert_eq!(once, twice, "normalization not idempotent for {}", input);
        }
    }
}
