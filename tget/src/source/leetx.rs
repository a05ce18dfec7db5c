//! 1337x. Listing pages link to one detail page per torrent; the magnet link
//! and counts live on the detail page. The site sits behind an anti-bot
//! challenge, so requests go through the guarded transport.

use std::sync::Arc;

use tget_types::{ResultItem, ResultSet};

use super::{collect_details, discover, Candidate, Source};
use crate::{
    cascade::{Cascade, Shape},
    config::SourceConfig,
    error::ItemError,
    fetch::Fetcher,
    normalize::{magnet_name, normalize_name, quote_plus},
};

pub const NAME: &str = "1337x";

pub fn default_config() -> SourceConfig {
    let mut config = SourceConfig::new(
        &["https://1337x.to", "https://1337x.st", "https://www.1377x.to"],
        &["/search/{query}/1/", "/search/{query}/", "/search?q={query}"],
        &["/top-100"],
    );
    config.anti_bot = true;
    config.min_page_len = 1000;
    config
}

lazy_static::lazy_static! {
    static ref LISTING: Cascade = Cascade::build("1337x listing", &[
        ("anchor", r#"(?i)<a[^>]+href=["']([^"']*torrent/[^"']+)["']"#, Shape::Text),
        ("href", r#"(?i)href=["']([^"']*torrent/[^"']+)["']"#, Shape::Text),
        ("any href", r#"href=["']?([^"'>]+)"#, Shape::Containing("/torrent/")),
    ]).expect("invalid 1337x listing cascade");

    static ref MAGNET: Cascade = Cascade::build("1337x magnet", &[
        ("href", r#"(?i)href=['"]?(magnet:[^'">]+)"#, Shape::Magnet),
        ("bare", r#"(?i)(magnet:\?[^'"\s<>]+)"#, Shape::Magnet),
    ]).expect("invalid 1337x magnet cascade");

    static ref SEEDS: Cascade = Cascade::build("1337x seeds", &[
        ("span", r#"(?is)<span[^>]*class=["']seeds["'][^>]*>(.*?)</span>"#, Shape::Count),
        ("class list", r#"(?is)class=["'][^"']*\bseeds\b[^"']*["'][^>]*>\s*(\d[\d,]*)"#, Shape::Count),
        ("text", r#"(?i)>Seeds?[:\s]*(\d+)"#, Shape::Count),
    ]).expect("invalid 1337x seeds cascade");

    static ref LEECHES: Cascade = Cascade::build("1337x leeches", &[
        ("span", r#"(?is)<span[^>]*class=["']leeches["'][^>]*>(.*?)</span>"#, Shape::Count),
        ("class list", r#"(?is)class=["'][^"']*\bleeches\b[^"']*["'][^>]*>\s*(\d[\d,]*)"#, Shape::Count),
        ("text", r#"(?i)>Leech(?:ers?)?[:\s]*(\d+)"#, Shape::Count),
    ]).expect("invalid 1337x leeches cascade");

    static ref TITLE: Cascade = Cascade::build("1337x title", &[
        ("title", r#"(?is)<title[^>]*>(.*?)</title>"#, Shape::Text),
    ]).expect("invalid 1337x title cascade");
}

/// Encodings of the search term, most likely to work first.
pub fn query_variants(query: &str) -> Vec<String> {
    let lower = query.to_lowercase();
    let variants = [
        quote_plus(&lower),
        lower.replace(' ', "+"),
        lower.replace(' ', "%20"),
        lower.replace(' ', "-"),
        quote_plus(query),
        query.replace(' ', "+"),
    ];
    let mut out: Vec<String> = vec![];
    for variant in variants {
        if !out.contains(&variant) {
            out.push(variant);
        }
    }
    out
}

pub fn parse_listing(body: &str) -> Vec<String> {
    LISTING
        .extract(body)
        .into_iter()
        .map(|x| x.value.into_owned())
        .collect()
}

pub fn parse_detail(body: &str) -> Result<(String, ResultItem), ItemError> {
    let magnet = MAGNET
        .first(body)
        .ok_or(ItemError::Miss("magnet link"))?
        .value
        .into_owned();
    let seeds = SEEDS.field(body, "0");
    let leeches = LEECHES.field(body, "0");

    let name = match magnet_name(&magnet) {
        Some(raw) => normalize_name(raw),
        None => {
            let title = TITLE.first(body).ok_or(ItemError::Miss("name"))?;
            normalize_name(title.value.split('|').next().unwrap_or_default())
        }
    };
    if name.is_empty() {
        return Err(ItemError::Miss("name"));
    }
    Ok((name, ResultItem::new(seeds, leeches, magnet)))
}

pub struct LeetxClient {
    fetcher: Arc<dyn Fetcher>,
    config: SourceConfig,
}

impl LeetxClient {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: SourceConfig) -> Self {
        Self { fetcher, config }
    }

    async fn collect(&self, candidates: Vec<Candidate>) -> ResultSet {
        let page = match discover(&*self.fetcher, NAME, candidates, &self.config).await {
            Some(page) => page,
            None => return ResultSet::new(),
        };
        let links = parse_listing(&page.body);
        collect_details(
            &*self.fetcher,
            NAME,
            &self.config,
            &page,
            links,
            Some("/torrent/"),
            parse_detail,
        )
        .await
    }
}

#[async_trait::async_trait]
impl Source for LeetxClient {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn search(&self, query: &str) -> ResultSet {
        let candidates = self
            .config
            .search_candidates(&query_variants(query), &[]);
        self.collect(candidates).await
    }

    async fn list(&self) -> ResultSet {
        self.collect(self.config.list_candidates(&[])).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL: &str = r#"<html><head><title>Download Some Movie 2020 1080p | 1337x</title></head>
<body><ul class="list">
<li><a class="magnet" href="magnet:?xt=urn:btih:ABCDEF&amp;dn=Some+Movie+2020+%5B1080p%5D&amp;tr=udp%3A%2F%2Ftracker">Magnet Download</a></li>
</ul>
<ul><li><strong>Seeders</strong> <span class="seeds">1,204</span></li>
<li><strong>Leechers</strong> <span class="leeches">87</span></li></ul>
</body></html>"#;

    #[test]
    fn test_query_variants() {
        assert_eq!(
            query_variants("Ubuntu Linux"),
            vec!["ubuntu+linux", "ubuntu%20linux", "ubuntu-linux", "Ubuntu+Linux"]
        );
        assert_eq!(query_variants("debian"), vec!["debian"]);
    }

    #[test]
    fn test_detail() {
        let (name, item) = parse_detail(DETAIL).unwrap();
        assert_eq!(name, "Some.Movie.2020.1080p");
        assert_eq!(item.seeds, "1204");
        assert_eq!(item.leeches, "87");
        assert_eq!(
            item.link,
            "magnet:?xt=urn:btih:ABCDEF&dn=Some+Movie+2020+%5B1080p%5D&tr=udp%3A%2F%2Ftracker"
        );
    }

    #[test]
    fn test_detail_title_fallback() {
        let page = r#"<title>Other Show S01E02 | 1337x</title>
            <a href="magnet:?xt=urn:btih:ABC">m</a> <div>Seeds: 3</div><div>Leechers: 1</div>"#;
        let (name, item) = parse_detail(page).unwrap();
        assert_eq!(name, "Other.Show.S01E02");
        assert_eq!(item.seeds, "3");
        assert_eq!(item.leeches, "1");
    }

    #[test]
    fn test_detail_defaults() {
        let page = r#"<a href="magnet:?xt=urn:btih:ABC&dn=Quiet">m</a>"#;
        let (name, item) = parse_detail(page).unwrap();
        assert_eq!(name, "Quiet");
        assert_eq!(item.seeds, "0");
        assert_eq!(item.leeches, "0");
    }

    #[test]
    fn test_detail_without_magnet() {
        assert!(matches!(
            parse_detail("<title>x</title><span class=\"seeds\">1</span>"),
            Err(ItemError::Miss("magnet link"))
        ));
    }

    #[test]
    fn test_listing() {
        let page = r#"<td class="coll-1 name"><a href="/sub/42/0/" class="icon"></a><a href="/torrent/1/one/">one</a></td>
<td class="coll-1 name"><a href="/torrent/2/two/">two</a></td>
<a href="/torrents/popular">popular</a>"#;
        assert_eq!(parse_listing(page), vec!["/torrent/1/one/", "/torrent/2/two/"]);
        assert!(parse_listing("<p>no links</p>").is_empty());
    }
}
