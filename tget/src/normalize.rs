//! Link and name normalization shared by every source.

use std::borrow::Cow;

/// Classification of a raw `href` relative to the site it was found on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    /// Site-relative path, always starting with `/`.
    Path(String),
    /// Absolute link to some other host. Never followed.
    External,
    /// Empty, fragment-only or non-web scheme (`magnet:`, `javascript:`, ...).
    Invalid,
}

fn is_absolute(href: &str) -> bool {
    href.starts_with("http://") || href.starts_with("https://") || href.starts_with("//")
}

fn strip_scheme(url: &str) -> &str {
    match url.find("//") {
        Some(idx) => &url[idx + 2..],
        None => url,
    }
}

fn has_scheme(href: &str) -> bool {
    match href.find(':') {
        Some(idx) => {
            let scheme = &href[..idx];
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
        }
        None => false,
    }
}

fn at_boundary(href: &str, end: usize) -> bool {
    matches!(href[end..].chars().next(), None | Some('/') | Some('?') | Some('#'))
}

fn rooted(rest: &str) -> String {
    format!("/{}", rest.trim_start_matches('/'))
}

/// Turns an `href` found on a page of `base_url` into a canonical
/// site-relative path.
pub fn normalize_link(raw_href: &str, base_url: &str) -> Link {
    let href = raw_href.trim();
    let base = base_url.trim().trim_end_matches('/');
    if href.is_empty() || href.starts_with('#') {
        return Link::Invalid;
    }

    if is_absolute(href) {
        if !base.is_empty() {
            let end = href
                .match_indices(base)
                .map(|(idx, _)| idx + base.len())
                .filter(|end| at_boundary(href, *end))
                .last();
            if let Some(end) = end {
                return Link::Path(rooted(&href[end..]));
            }
            // same host reached through another scheme or protocol-relative
            let host = strip_scheme(base);
            let rest = strip_scheme(href);
            if !host.is_empty() && rest.starts_with(host) && at_boundary(rest, host.len()) {
                return Link::Path(rooted(&rest[host.len()..]));
            }
        }
        return Link::External;
    }

    if has_scheme(href) {
        return Link::Invalid;
    }
    if href.starts_with('/') {
        Link::Path(href.to_string())
    } else {
        Link::Path(format!("/{}", href))
    }
}

fn decode_percent(input: &str) -> String {
    let bytes = urlencoding::decode_binary(input.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

fn name_pass(input: &str) -> String {
    let decoded = html_escape::decode_html_entities(input.trim());
    decode_percent(&decoded)
        .replace('+', ".")
        .replace('[', "")
        .replace(']', "")
        .replace(' ', ".")
        .replace('\'', "")
}

/// Decodes entities and percent-escapes, then folds separators into dots and
/// drops brackets and apostrophes. Lossy: distinct titles may collide.
///
/// Passes repeat until the output is stable, so the result is a fixed point
/// and normalizing it again is a no-op.
pub fn normalize_name(raw_title: &str) -> String {
    // each changing pass removes an escape or a separator character
    let mut name = name_pass(raw_title);
    loop {
        let next = name_pass(&name);
        if next == name {
            return name;
        }
        name = next;
    }
}

/// Raw `dn=` value of a magnet link.
pub fn magnet_name(link: &str) -> Option<&str> {
    let query = link.strip_prefix("magnet:")?;
    let query = query.strip_prefix('?').unwrap_or(query);
    query
        .split('&')
        .map(|param| param.strip_prefix("amp;").unwrap_or(param))
        .find_map(|param| param.strip_prefix("dn="))
        .filter(|name| !name.is_empty())
}

/// Magnet link as it appears in markup, with `&amp;` separators restored.
pub fn clean_magnet(raw: &str) -> String {
    html_escape::decode_html_entities(raw.trim()).into_owned()
}

/// Seed/leech value reduced to decimal digits. Thousands separators and
/// whitespace are dropped; anything else is not a count.
pub fn normalize_count(raw: &str) -> Option<String> {
    let digits: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        Some(digits)
    } else {
        None
    }
}

/// Builds `magnet:?xt=urn:btih:<HASH>&dn=<name>` from a hex info-hash.
pub fn build_magnet(hash: &str, display_name: &str) -> Option<String> {
    let hash = hash.trim();
    let bytes = hex::decode(hash).ok()?;
    if bytes.len() != 20 {
        return None;
    }
    Some(format!(
        "magnet:?xt=urn:btih:{}&dn={}",
        hash.to_ascii_uppercase(),
        urlencoding::encode(display_name)
    ))
}

/// `quote_plus` style encoding: percent-encode, spaces become `+`.
pub fn quote_plus(input: &str) -> String {
    match urlencoding::encode(input) {
        Cow::Borrowed(x) => x.to_string(),
        Cow::Owned(x) => x.replace("%20", "+"),
    }
}
