// src/utils/url.rs

//! URL manipulation utilities.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static LINK_RELATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<([^>]+)>\s*;\s*rel="([^"]+)""#).expect("link relation pattern compiles")
});

/// Parse a web-linking `Link` header into relation name → URL.
///
/// # Examples
/// ```
/// use harvester::utils::url::parse_link_header;
///
/// let links = parse_link_header(r#"<https://api.example.com/jobs?page=2>; rel="next""#);
/// assert_eq!(links["next"], "https://api.example.com/jobs?page=2");
/// ```
pub fn parse_link_header(header: &str) -> HashMap<String, String> {
    LINK_RELATION
        .captures_iter(header)
        .map(|caps| (caps[2].to_string(), caps[1].to_string()))
        .collect()
}

/// The `next` relation of a `Link` header, if any.
pub fn next_link(header: Option<&str>) -> Option<String> {
    header.and_then(|h| parse_link_header(h).remove("next"))
}

/// File extension of the last path segment of a URL, without the dot.
///
/// # Examples
/// ```
/// use harvester::utils::url::extension_from_url;
///
/// assert_eq!(
///     extension_from_url("https://files.example.com/cv/ada.docx?sig=abc"),
///     Some("docx".to_string())
/// );
/// assert_eq!(extension_from_url("https://files.example.com/download/123"), None);
/// ```
pub fn extension_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    Path::new(last)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(String::from)
}

/// Build a collection URL: `base` joined with `resource`, plus query pairs.
pub fn resource_url(base: &str, resource: &str, params: &[(&str, String)]) -> Result<Url, url::ParseError> {
    let base = if base.ends_with('/') {
        Url::parse(base)?
    } else {
        Url::parse(&format!("{base}/"))?
    };
    let mut url = base.join(resource)?;
    if !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}
