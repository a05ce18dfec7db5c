//! YTS movie API. A single JSON request yields every movie with its torrents,
//! one result per torrent.

use std::sync::Arc;

use log::debug;
use serde_json::Value;
use tget_types::{ResultItem, ResultSet};

use super::{discover, Candidate, Source};
use crate::{
    cascade::{json_field, JsonCascade},
    config::{MovieFilter, SourceConfig},
    fetch::Fetcher,
    normalize::{build_magnet, normalize_count, normalize_name},
};

pub const NAME: &str = "yts";

pub fn default_config() -> SourceConfig {
    SourceConfig::new(
        &["https://yts.mx"],
        &["/api/v2/list_movies.json?query_term={query}&quality={quality}&genre={genre}"],
        &["/api/v2/list_movies.json?quality={quality}&genre={genre}"],
    )
}

lazy_static::lazy_static! {
    static ref MOVIES: JsonCascade = JsonCascade::new("yts movies", &[
        &["data", "movies"],
        &["movies"],
    ]);
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(x) => Some(x.trim().to_string()).filter(|x| !x.is_empty()),
        Value::Number(x) => Some(x.to_string()),
        _ => None,
    }
}

fn count(torrent: &Value, keys: &[&str]) -> String {
    json_field(torrent, keys)
        .and_then(text)
        .and_then(|x| normalize_count(&x))
        .unwrap_or_else(|| "0".to_string())
}

/// `Title.(year).[quality]`, the suffix parts only when present.
pub fn display_name(title: &str, year: Option<&str>, quality: Option<&str>) -> String {
    let mut name = normalize_name(title);
    if let Some(year) = year {
        name.push_str(&format!(".({})", year));
    }
    if let Some(quality) = quality {
        name.push_str(&format!(".[{}]", quality));
    }
    name
}

/// Extracts at most `cap` torrents from an API response.
pub fn parse_movies(document: &Value, cap: usize) -> ResultSet {
    let mut items = ResultSet::new();
    for movie in MOVIES.extract(document) {
        let title = match json_field(movie, &["title", "title_english"]).and_then(text) {
            Some(title) => title,
            None => {
                debug!("{}: skipping movie without title", NAME);
                continue;
            }
        };
        let year = json_field(movie, &["year"]).and_then(text);
        let torrents = match movie.get("torrents") {
            Some(Value::Array(torrents)) => torrents.as_slice(),
            _ => &[],
        };

        for torrent in torrents {
            if items.len() >= cap {
                return items;
            }
            let quality = json_field(torrent, &["quality"]).and_then(text);
            let link = match json_field(torrent, &["url"]).and_then(text) {
                Some(url) => url,
                None => match json_field(torrent, &["hash"])
                    .and_then(text)
                    .and_then(|hash| build_magnet(&hash, &title))
                {
                    Some(magnet) => magnet,
                    None => {
                        debug!("{}: skipping torrent of '{}' without link", NAME, title);
                        continue;
                    }
                },
            };
            let name = display_name(&title, year.as_deref(), quality.as_deref());
            let item = ResultItem::new(
                count(torrent, &["seeds"]),
                count(torrent, &["peers", "leechers"]),
                link,
            );
            items.insert(name, item);
        }
    }
    items
}

pub struct YtsClient {
    fetcher: Arc<dyn Fetcher>,
    config: SourceConfig,
    filter: MovieFilter,
}

impl YtsClient {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: SourceConfig, filter: MovieFilter) -> Self {
        Self {
            fetcher,
            config,
            filter,
        }
    }

    async fn collect(&self, candidates: Vec<Candidate>) -> ResultSet {
        let page = match discover(&*self.fetcher, NAME, candidates, &self.config).await {
            Some(page) => page,
            None => return ResultSet::new(),
        };
        match serde_json::from_str::<Value>(&page.body) {
            Ok(document) => parse_movies(&document, self.config.results),
            Err(e) => {
                debug!("{}: response is not JSON: {}", NAME, e);
                ResultSet::new()
            }
        }
    }
}

#[async_trait::async_trait]
impl Source for YtsClient {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn search(&self, query: &str) -> ResultSet {
        let quality = urlencoding::encode(&self.filter.quality);
        let genre = urlencoding::encode(&self.filter.genre);
        let query = urlencoding::encode(&query.replace(' ', "-")).into_owned();
        let candidates = self
            .config
            .search_candidates(&[query], &[("quality", &*quality), ("genre", &*genre)]);
        self.collect(candidates).await
    }

    async fn list(&self) -> ResultSet {
        let quality = urlencoding::encode(&self.filter.quality);
        let genre = urlencoding::encode(&self.filter.genre);
        let candidates = self
            .config
            .list_candidates(&[("quality", &*quality), ("genre", &*genre)]);
        self.collect(candidates).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const HASH: &str = "0123456789abcdef0123456789abcdef01234567";

    #[test]
    fn test_nested() {
        let document = json!({"status": "ok", "data": {"movies": [{
            "title": "Example", "year": 2020,
            "torrents": [{"quality": "720p", "seeds": 5, "peers": 2, "url": "https://x/1.torrent"}]
        }]}});
        let items = parse_movies(&document, 10);
        assert_eq!(items.len(), 1);
        assert_eq!(
            items["Example.(2020).[720p]"],
            ResultItem::new("5", "2", "https://x/1.torrent")
        );
    }

    #[test]
    fn test_flat_and_hash() {
        let document = json!({"movies": [{
            "title": "Two Words",
            "torrents": [
                {"quality": "1080p", "seeds": "1,200", "hash": HASH},
                {"quality": "2160p", "hash": "not-a-hash"},
                {"seeds": 1, "leechers": 3, "url": "https://x/2.torrent"}
            ]
        }]});
        let items = parse_movies(&document, 10);
        assert_eq!(items.len(), 2);

        let hashed = &items["Two.Words.[1080p]"];
        assert_eq!(hashed.seeds, "1200");
        assert_eq!(hashed.leeches, "0");
        assert_eq!(
            hashed.link,
            "magnet:?xt=urn:btih:0123456789ABCDEF0123456789ABCDEF01234567&dn=Two%20Words"
        );
        assert_eq!(items["Two.Words"].leeches, "3");
    }

    #[test]
    fn test_cap_and_missing_title() {
        let document = json!({"data": {"movies": [
            {"year": 1999, "torrents": [{"url": "https://x/0.torrent"}]},
            {"title": "A", "torrents": [{"quality": "720p", "url": "https://x/a1"}, {"quality": "1080p", "url": "https://x/a2"}]},
            {"title": "B", "torrents": [{"url": "https://x/b"}]}
        ]}});
        let items = parse_movies(&document, 2);
        assert_eq!(items.keys().collect::<Vec<_>>(), vec!["A.[720p]", "A.[1080p]"]);
    }

    #[test]
    fn test_no_movies() {
        assert!(parse_movies(&json!({"status": "ok", "data": {"movie_count": 0}}), 10).is_empty());
        assert!(parse_movies(&json!([]), 10).is_empty());
    }
}
