//! LimeTorrents. Search and top lists link to detail pages holding the magnet
//! link and the counts. The two listing layouts differ in where the detail
//! anchor sits inside the `tt-name` cell.

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

pub const NAME: &str = "limetorrents";

const SEARCH_LAYOUT: &str = r#"tt-name['"]+>.*?</a><a href=['"]?([^'">]+)"#;
const LIST_LAYOUT: &str = r#"tt-name['"]+><a href=['"]?([^'">]+)"#;
const GENERIC_LAYOUT: &str = r#"href=['"]?([^'">]+-torrent-\d+\.html)"#;

pub fn default_config() -> SourceConfig {
    SourceConfig::new(
        &["https://www.limetorrents.lol", "https://www.limetorrents.info"],
        &["/search/all/{query}/"],
        &["/top100"],
    )
}

lazy_static::lazy_static! {
    static ref SEARCH_LISTING: Cascade = Cascade::build("limetorrents search listing", &[
        ("search layout", SEARCH_LAYOUT, Shape::Text),
        ("list layout", LIST_LAYOUT, Shape::Text),
        ("torrent href", GENERIC_LAYOUT, Shape::Text),
    ]).expect("invalid limetorrents search cascade");

    static ref LIST_LISTING: Cascade = Cascade::build("limetorrents list listing", &[
        ("list layout", LIST_LAYOUT, Shape::Text),
        ("search layout", SEARCH_LAYOUT, Shape::Text),
        ("torrent href", GENERIC_LAYOUT, Shape::Text),
    ]).expect("invalid limetorrents list cascade");

    static ref MAGNET: Cascade = Cascade::build("limetorrents magnet", &[
        ("href", r#"(?i)a href=['"]+(magnet:.*?)['"]+"#, Shape::Magnet),
        ("bare", r#"(?i)(magnet:\?[^'"\s<>]+)"#, Shape::Magnet),
    ]).expect("invalid limetorrents magnet cascade");

    static ref SEEDS: Cascade = Cascade::build("limetorrents seeds", &[
        ("label", r#">Seeders : (.*?)<"#, Shape::Count),
        ("text", r#"(?i)>\s*Seed(?:er)?s?\s*:?\s*(\d[\d,]*)"#, Shape::Count),
    ]).expect("invalid limetorrents seeds cascade");

    static ref LEECHES: Cascade = Cascade::build("limetorrents leeches", &[
        ("label", r#">Leechers : (.*?)<"#, Shape::Count),
        ("text", r#"(?i)>\s*Leech(?:er)?s?\s*:?\s*(\d[\d,]*)"#, Shape::Count),
    ]).expect("invalid limetorrents leeches cascade");
}

fn listing_links(cascade: &Cascade, body: &str) -> Vec<String> {
    cascade
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
    let name = magnet_name(&magnet)
        .map(normalize_name)
        .filter(|x| !x.is_empty())
        .ok_or(ItemError::Miss("name"))?;
    let seeds = SEEDS.field(body, "0");
    let leeches = LEECHES.field(body, "0");
    Ok((name, ResultItem::new(seeds, leeches, magnet)))
}

pub struct LimetorrentsClient {
    fetcher: Arc<dyn Fetcher>,
    config: SourceConfig,
}

impl LimetorrentsClient {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: SourceConfig) -> Self {
        Self { fetcher, config }
    }

    async fn collect(&self, candidates: Vec<Candidate>, listing: &Cascade) -> ResultSet {
        let page = match discover(&*self.fetcher, NAME, candidates, &self.config).await {
            Some(page) => page,
            None => return ResultSet::new(),
        };
        let links = listing_links(listing, &page.body);
        collect_details(&*self.fetcher, NAME, &self.config, &page, links, None, parse_detail).await
    }
}

#[async_trait::async_trait]
impl Source for LimetorrentsClient {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn search(&self, query: &str) -> ResultSet {
        let candidates = self.config.search_candidates(&[quote_plus(query)], &[]);
        self.collect(candidates, &SEARCH_LISTING).await
    }

    async fn list(&self) -> ResultSet {
        self.collect(self.config.list_candidates(&[]), &LIST_LISTING).await
    }
}
