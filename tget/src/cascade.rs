//! Ordered extraction strategies.
//!
//! A [`Cascade`] holds every page layout a site is known to have used, newest
//! first. Strategies are tried one at a time and the first that yields at least
//! one match decides the outcome; later strategies are never run. A cascade
//! with no hit yields an empty sequence, which is an ordinary result.

use std::borrow::Cow;

use log::debug;
use regex::Regex;
use serde_json::Value;

use crate::normalize::{clean_magnet, normalize_count};

/// What a strategy's first capture group is expected to hold. Values that do
/// not fit the shape are dropped, so a strategy whose captures never fit
/// counts as a miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Any non-empty text, trimmed.
    Text,
    /// Text containing the marker, compared ASCII case-insensitively.
    Containing(&'static str),
    /// A complete `magnet:` link; `&amp;` separators are restored.
    Magnet,
    /// A seed or leech count, reduced to decimal digits.
    Count,
}

impl Shape {
    fn accept<'t>(&self, raw: &'t str) -> Option<Cow<'t, str>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match self {
            Shape::Text => Some(Cow::Borrowed(raw)),
            Shape::Containing(marker) => raw
                .to_ascii_lowercase()
                .contains(&marker.to_ascii_lowercase())
                .then(|| Cow::Borrowed(raw)),
            Shape::Magnet => raw
                .get(..7)
                .filter(|x| x.eq_ignore_ascii_case("magnet:"))
                .map(|_| Cow::Owned(clean_magnet(raw))),
            Shape::Count => normalize_count(raw).map(Cow::Owned),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMatch<'t> {
    /// label of the strategy that produced the match
    pub strategy: &'static str,
    pub shape: Shape,
    pub value: Cow<'t, str>,
}

#[derive(Debug, Clone)]
pub struct Extractor {
    label: &'static str,
    pattern: Regex,
    shape: Shape,
}

impl Extractor {
    pub fn new(label: &'static str, pattern: &str, shape: Shape) -> Result<Self, regex::Error> {
        Ok(Self {
            label,
            pattern: Regex::new(pattern)?,
            shape,
        })
    }

    fn accept<'t>(&self, caps: regex::Captures<'t>) -> Option<RawMatch<'t>> {
        let found = caps.get(1).or_else(|| caps.get(0))?;
        Some(RawMatch {
            strategy: self.label,
            shape: self.shape,
            value: self.shape.accept(found.as_str())?,
        })
    }

    /// Accepted matches in document order. Capture group 1 is the value; a
    /// pattern without groups yields the whole match.
    pub fn matches<'t>(&self, content: &'t str) -> Vec<RawMatch<'t>> {
        self.pattern
            .captures_iter(content)
            .filter_map(|caps| self.accept(caps))
            .collect()
    }

    pub fn first_match<'t>(&self, content: &'t str) -> Option<RawMatch<'t>> {
        self.pattern
            .captures_iter(content)
            .find_map(|caps| self.accept(caps))
    }
}

#[derive(Debug, Clone)]
pub struct Cascade {
    name: &'static str,
    extractors: Vec<Extractor>,
}

impl Cascade {
    pub fn new(name: &'static str, extractors: Vec<Extractor>) -> Self {
        Self { name, extractors }
    }

    /// Builds a cascade from `(label, pattern, shape)` triples, highest
    /// priority first.
    pub fn build(name: &'static str, strategies: &[(&'static str, &str, Shape)]) -> Result<Self, regex::Error> {
        let extractors = strategies
            .iter()
            .map(|(label, pattern, shape)| Extractor::new(label, pattern, *shape))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(name, extractors))
    }

    /// All matches of the first strategy that matches at all.
    pub fn extract<'t>(&self, content: &'t str) -> Vec<RawMatch<'t>> {
        for extractor in &self.extractors {
            let found = extractor.matches(content);
            if !found.is_empty() {
                debug!(
                    "{}: strategy '{}' found {} matches",
                    self.name,
                    extractor.label,
                    found.len()
                );
                return found;
            }
        }
        debug!("{}: no strategy matched", self.name);
        vec![]
    }

    /// First match of the first strategy that matches at all.
    pub fn first<'t>(&self, content: &'t str) -> Option<RawMatch<'t>> {
        self.extractors
            .iter()
            .find_map(|extractor| extractor.first_match(content))
    }

    /// Single-value field lookup with a fallback for when every strategy misses.
    pub fn field(&self, content: &str, default: &str) -> String {
        self.first(content)
            .map(|x| x.value.into_owned())
            .unwrap_or_else(|| default.to_string())
    }
}

/// Structural counterpart of [`Cascade`] for JSON documents: ordered field
/// paths, the first one leading to a non-empty array wins.
#[derive(Debug, Clone)]
pub struct JsonCascade {
    name: &'static str,
    paths: Vec<Vec<&'static str>>,
}

pub fn lookup<'v>(value: &'v Value, path: &[&str]) -> Option<&'v Value> {
    path.iter().try_fold(value, |value, key| value.get(key))
}

impl JsonCascade {
    pub fn new(name: &'static str, paths: &[&[&'static str]]) -> Self {
        Self {
            name,
            paths: paths.iter().map(|x| x.to_vec()).collect(),
        }
    }

    pub fn extract<'v>(&self, document: &'v Value) -> &'v [Value] {
        for path in &self.paths {
            if let Some(Value::Array(items)) = lookup(document, path) {
                if !items.is_empty() {
                    debug!("{}: path '{}' found {} items", self.name, path.join("."), items.len());
                    return items;
                }
            }
        }
        debug!("{}: no path matched", self.name);
        &[]
    }
}

/// First of `keys` present on `object` with a non-null value.
pub fn json_field<'v>(object: &'v Value, keys: &[&str]) -> Option<&'v Value> {
    keys.iter()
        .filter_map(|key| object.get(key))
        .find(|value| !value.is_null())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn links() -> Cascade {
        Cascade::build(
            "test links",
            &[
                ("row", r#"<td class="name"><a href="([^"]+)""#, Shape::Text),
                ("any", r#"href="([^"]+)""#, Shape::Containing("/torrent/")),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_first_strategy_wins() {
        let page = r#"<td class="name"><a href="/torrent/1/a/">a</a></td>
            <a href="/torrent/2/b/">b</a>"#;
        let found = links().extract(page);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].strategy, "row");
        assert_eq!(found[0].value, "/torrent/1/a/");
    }

    #[test]
    fn test_falls_through() {
        let page = r#"<a href="/about">x</a><a href="/torrent/2/b/">b</a><a href="/TORRENT/3/c/">c</a>"#;
        let found = links().extract(page);
        let values: Vec<_> = found.iter().map(|x| x.value.as_ref()).collect();
        assert_eq!(values, vec!["/torrent/2/b/", "/TORRENT/3/c/"]);
        assert!(found.iter().all(|x| x.strategy == "any"));
    }

    #[test]
    fn test_matches_outlive_cascade() {
        let page = String::from(r#"<td class="name"><a href="/torrent/7/g/">g</a></td>"#);
        let found = {
            let cascade = links();
            cascade.extract(&page)
        };
        assert_eq!(found[0].value, "/torrent/7/g/");
        assert_eq!(links().first(&page).map(|x| x.strategy), Some("row"));
    }

    #[test]
    fn test_no_match_is_empty() {
        assert!(links().extract("<html><body>nothing</body></html>").is_empty());
        assert!(links().extract("").is_empty());
    }

    #[test]
    fn test_shape_rejection_is_a_miss() {
        let seeds = Cascade::build(
            "seeds",
            &[
                ("span", r#"<span class="seeds">(.*?)</span>"#, Shape::Count),
                ("text", r#"(?i)>Seeds?[:\s]*(\d+)"#, Shape::Count),
            ],
        )
        .unwrap();
        let page = r#"<span class="seeds">n/a</span><li>Seeders: 1,2</li><b>Seeds: 42</b>"#;
        assert_eq!(seeds.field(page, "0"), "42");
        assert_eq!(seeds.field(r#"<span class="seeds"> 1,024 </span>"#, "0"), "1024");
        assert_eq!(seeds.field("nothing", "0"), "0");
    }

    #[test]
    fn test_magnet_shape() {
        let magnets = Cascade::build(
            "magnets",
            &[("bare", r#"(?i)(magnet:\?[^'"\s<>]+)"#, Shape::Magnet)],
        )
        .unwrap();
        let found = magnets.first("x MAGNET:?xt=urn:btih:1&amp;dn=y z").unwrap();
        assert_eq!(found.value, "MAGNET:?xt=urn:btih:1&dn=y");
        assert_eq!(found.shape, Shape::Magnet);
    }

    #[test]
    fn test_json_cascade() {
        let movies = JsonCascade::new("movies", &[&["data", "movies"], &["movies"]]);
        let nested = json!({"data": {"movies": [{"title": "a"}]}});
        let flat = json!({"movies": [{"title": "b"}]});
        let empty_nested = json!({"data": {"movies": []}, "movies": [{"title": "c"}]});
        let missing = json!({"status": "ok", "data": {"movie_count": 0}});

        assert_eq!(movies.extract(&nested)[0]["title"], "a");
        assert_eq!(movies.extract(&flat)[0]["title"], "b");
        assert_eq!(movies.extract(&empty_nested)[0]["title"], "c");
        assert!(movies.extract(&missing).is_empty());
        assert!(movies.extract(&json!([1, 2])).is_empty());
    }

    #[test]
    fn test_json_field() {
        let torrent = json!({"seeds": null, "seeders": 4, "peers": 2});
        assert_eq!(json_field(&torrent, &["seeds", "seeders"]), Some(&json!(4)));
        assert_eq!(json_field(&torrent, &["leechers"]), None);
    }
}
