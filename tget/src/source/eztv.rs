//! EZTV. Every listing row already carries its magnet link and seed count, so
//! no detail pages are fetched.

use std::sync::Arc;

use log::debug;
use tget_types::{ResultItem, ResultSet, UNKNOWN_COUNT};

use super::{discover, Candidate, Source};
use crate::{
    cascade::{Cascade, Shape},
    config::SourceConfig,
    fetch::Fetcher,
    normalize::{magnet_name, normalize_name},
};

pub const NAME: &str = "eztv";

/// Bare magnet links taken from a page without recognizable rows.
const MAX_BARE_MAGNETS: usize = 50;

pub fn default_config() -> SourceConfig {
    SourceConfig::new(
        &["https://eztv.re", "https://eztvx.to"],
        &["/search/{query}/"],
        &["/"],
    )
}

lazy_static::lazy_static! {
    static ref ROWS: Cascade = Cascade::build("eztv rows", &[
        (
            "hover row",
            r#"(?is)<tr[^>]*name=["']hover["'][^>]*class=["']forum_header_border["'][^>]*>(.*?)</tr>"#,
            Shape::Containing("magnet:"),
        ),
        (
            "header row",
            r#"(?is)<tr[^>]*class=["']forum_header_border["'][^>]*>(.*?)</tr>"#,
            Shape::Containing("magnet:"),
        ),
        ("table row", r#"(?is)<tr[^>]*>(.*?)</tr>"#, Shape::Containing("magnet:")),
        ("magnet row", r#"(?is)<tr[^>]*>(.*?magnet:.*?)</tr>"#, Shape::Containing("magnet:")),
        ("bare magnet", r#"(?i)(magnet:\?[^'"\s<>]+)"#, Shape::Magnet),
    ]).expect("invalid eztv row cascade");

    static ref SEEDS: Cascade = Cascade::build("eztv seeds", &[
        ("green font", r#"(?i)<font[^>]*color=["']green["'][^>]*>(.*?)</font>"#, Shape::Count),
        ("text", r#"(?i)>Seeds?[:\s]*(\d+(?:[,\s]\d+)*)"#, Shape::Count),
    ]).expect("invalid eztv seeds cascade");

    static ref MAGNET: Cascade = Cascade::build("eztv magnet", &[
        ("href", r#"(?i)href=['"]?(magnet:[^'">]+)"#, Shape::Magnet),
        ("bare", r#"(?i)(magnet:\?[^'"\s<>]+)"#, Shape::Magnet),
        ("any href", r#"href=['"]?([^'">]+)"#, Shape::Containing("magnet:")),
    ]).expect("invalid eztv magnet cascade");

    static ref ANCHOR_TEXT: Cascade = Cascade::build("eztv anchor text", &[
        ("anchor", r#"(?is)<a[^>]*>(.*?)</a>"#, Shape::Text),
    ]).expect("invalid eztv anchor cascade");
}

pub fn search_query(query: &str) -> String {
    urlencoding::encode(&query.replace(' ', "-")).into_owned()
}

fn parse_row(row: &str) -> Option<(String, ResultItem)> {
    let magnet = MAGNET.first(row)?.value.into_owned();
    let seeds = SEEDS.field(row, "0");
    let name = match magnet_name(&magnet) {
        Some(raw) => normalize_name(raw),
        None => normalize_name(&ANCHOR_TEXT.first(row)?.value),
    };
    if name.is_empty() {
        return None;
    }
    Some((name, ResultItem::new(seeds, UNKNOWN_COUNT, magnet)))
}

fn parse_bare(magnet: &str) -> Option<(String, ResultItem)> {
    let name = normalize_name(magnet_name(magnet)?);
    if name.is_empty() {
        return None;
    }
    Some((name, ResultItem::new("0", UNKNOWN_COUNT, magnet)))
}

/// Extracts at most `cap` items from a listing page.
pub fn parse_page(body: &str, cap: usize) -> ResultSet {
    let body = body.replace('\t', "").replace('\n', "");
    let rows = ROWS.extract(&body);
    let bare = rows.first().map(|x| x.shape == Shape::Magnet).unwrap_or(false);
    let limit = if bare { MAX_BARE_MAGNETS } else { usize::MAX };

    let mut items = ResultSet::new();
    let mut found = 0;
    for row in rows.into_iter().take(limit) {
        if found >= cap {
            break;
        }
        let parsed = if bare {
            parse_bare(&row.value)
        } else {
            parse_row(&row.value)
        };
        match parsed {
            Some((name, item)) => {
                items.insert(name, item);
                found += 1;
            }
            None => debug!("{}: skipping row without magnet or name", NAME),
        }
    }
    items
}

pub struct EztvClient {
    fetcher: Arc<dyn Fetcher>,
    config: SourceConfig,
}

impl EztvClient {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: SourceConfig) -> Self {
        Self { fetcher, config }
    }

    async fn collect(&self, candidates: Vec<Candidate>) -> ResultSet {
        match discover(&*self.fetcher, NAME, candidates, &self.config).await {
            Some(page) => parse_page(&page.body, self.config.results),
            None => ResultSet::new(),
        }
    }
}

#[async_trait::async_trait]
impl Source for EztvClient {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn search(&self, query: &str) -> ResultSet {
        let candidates = self.config.search_candidates(&[search_query(query)], &[]);
        self.collect(candidates).await
    }

    async fn list(&self) -> ResultSet {
        self.collect(self.config.list_candidates(&[])).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROWS_PAGE: &str = "<table>
<tr name=\"hover\" class=\"forum_header_border\">
\t<td><a href=\"/shows/1/show/\" class=\"thread_link\">Show S01E01 720p</a></td>
\t<td><a href=\"magnet:?xt=urn:btih:AAA&amp;dn=Show.S01E01.720p&amp;tr=udp\" class=\"magnet\"></a></td>
\t<td><font color=\"green\">1,024</font></td>
</tr>
<tr name=\"hover\" class=\"forum_header_border\">
\t<td><a href=\"/shows/2/other/\">Other Show S02E03</a></td>
\t<td><a href=\"magnet:?xt=urn:btih:BBB\" class=\"magnet\"></a></td>
\t<td>-</td>
</tr>
<tr name=\"hover\" class=\"forum_header_border\"><td>announcement</td></tr>
</table>";

    #[test]
    fn test_rows() {
        let items = parse_page(ROWS_PAGE, 10);
        assert_eq!(items.len(), 2);

        let first = &items["Show.S01E01.720p"];
        assert_eq!(first.seeds, "1024");
        assert_eq!(first.leeches, "?");
        assert_eq!(first.link, "magnet:?xt=urn:btih:AAA&dn=Show.S01E01.720p&tr=udp");

        // no dn, named after the first anchor
        let second = &items["Other.Show.S02E03"];
        assert_eq!(second.seeds, "0");
        assert_eq!(second.link, "magnet:?xt=urn:btih:BBB");
    }

    #[test]
    fn test_cap() {
        let items = parse_page(ROWS_PAGE, 1);
        assert_eq!(items.keys().collect::<Vec<_>>(), vec!["Show.S01E01.720p"]);
    }

    #[test]
    fn test_plain_rows_stay_separate() {
        let page = r#"<table>
<tr><td><a href="/ad/">Sponsored</a></td><td><font color="green">999</font></td></tr>
<tr><td><a href="/ep/1/">Plain Show S03E04</a></td><td><a href="magnet:?xt=urn:btih:EEE">m</a></td></tr>
</table>"#;
        let items = parse_page(page, 10);
        assert_eq!(items.len(), 1);
        let item = &items["Plain.Show.S03E04"];
        assert_eq!(item.seeds, "0");
        assert_eq!(item.link, "magnet:?xt=urn:btih:EEE");
    }

    #[test]
    fn test_bare_magnets() {
        let page = "<div>magnet:?xt=urn:btih:CCC&dn=Loose+One</div>
            <p>magnet:?xt=urn:btih:DDD&dn=Loose+Two</p>";
        let items = parse_page(page, 10);
        assert_eq!(items.len(), 2);
        assert_eq!(items["Loose.One"].seeds, "0");
        assert_eq!(items["Loose.Two"].leeches, "?");
    }

    #[test]
    fn test_nothing() {
        assert!(parse_page("<html><body>maintenance</body></html>", 10).is_empty());
    }

    #[test]
    fn test_search_query() {
        assert_eq!(search_query("the show s01"), "the-show-s01");
        assert_eq!(search_query("a&b c"), "a%26b-c");
    }
}
