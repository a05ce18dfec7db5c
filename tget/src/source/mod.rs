pub mod eztv;
pub mod leetx;
pub mod limetorrents;
pub mod yts;

pub use eztv::EztvClient;
pub use leetx::LeetxClient;
pub use limetorrents::LimetorrentsClient;
pub use yts::YtsClient;

use std::{collections::HashSet, fmt, str::FromStr, sync::Arc};

use anyhow::{bail, Result};
use log::{debug, info, warn};
use tget_types::{Action, ResultItem, ResultSet};

use crate::{
    config::{Config, SourceConfig},
    error::ItemError,
    fetch::{FetchOutcome, Fetcher},
    normalize::{normalize_link, Link},
};

/// A site adapter. Both operations always produce a result set; sites that are
/// unreachable, blocked or restructured simply yield an empty one.
#[async_trait::async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str) -> ResultSet;

    async fn list(&self) -> ResultSet;

    async fn run(&self, action: &Action) -> ResultSet {
        match action {
            Action::Search(query) => self.search(query).await,
            Action::List => self.list().await,
        }
    }
}

#[async_trait::async_trait]
impl Source for Box<dyn Source + Send + Sync> {
    fn name(&self) -> &'static str {
        Source::name(&**self)
    }

    async fn search(&self, query: &str) -> ResultSet {
        Source::search(&**self, query).await
    }

    async fn list(&self) -> ResultSet {
        Source::list(&**self).await
    }
}

/// One URL to try, remembering which base URL it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub base_url: String,
    pub url: String,
}

impl Candidate {
    pub fn new(base_url: &str, path: &str) -> Self {
        let base_url = base_url.trim_end_matches('/');
        Self {
            base_url: base_url.to_string(),
            url: format!("{}{}", base_url, path),
        }
    }
}

/// Listing content together with the base URL that served it. Detail links
/// found on the page are resolved against `base_url`.
#[derive(Debug, Clone)]
pub struct Page {
    pub base_url: String,
    pub body: String,
}

/// Tries candidates strictly in order and returns the first page with at least
/// `min_page_len` bytes of content.
pub async fn discover(
    fetcher: &dyn Fetcher,
    source: &'static str,
    candidates: Vec<Candidate>,
    config: &SourceConfig,
) -> Option<Page> {
    for candidate in candidates {
        match fetcher
            .fetch(&candidate.url, config.timeout(), config.anti_bot)
            .await
        {
            Ok(FetchOutcome::Content(body)) if body.len() >= config.min_page_len => {
                debug!("{}: using {} ({} bytes)", source, candidate.url, body.len());
                return Some(Page {
                    base_url: candidate.base_url,
                    body,
                });
            }
            Ok(FetchOutcome::Content(body)) => {
                debug!(
                    "{}: {} returned only {} bytes, trying next",
                    source,
                    candidate.url,
                    body.len()
                );
            }
            Ok(FetchOutcome::Empty(rejection)) => {
                debug!("{}: {} gave no data ({}), trying next", source, candidate.url, rejection);
            }
            Err(e) => {
                warn!("{}: {}", source, e);
            }
        }
    }
    debug!("{}: no candidate returned content", source);
    None
}

pub type DetailParser = fn(&str) -> Result<(String, ResultItem), ItemError>;

async fn fetch_item(
    fetcher: &dyn Fetcher,
    url: &str,
    config: &SourceConfig,
    parse: DetailParser,
) -> Result<(String, ResultItem), ItemError> {
    match fetcher.fetch(url, config.timeout(), config.anti_bot).await? {
        FetchOutcome::Content(body) => parse(&body),
        FetchOutcome::Empty(rejection) => Err(ItemError::Blocked(rejection)),
    }
}

/// Visits detail pages in listing order until `config.results` items parsed.
///
/// Links are normalized against the page's base URL; external and repeated
/// links are skipped, as are links not containing `marker` when one is given.
/// A failing item never stops the remaining ones.
pub async fn collect_details(
    fetcher: &dyn Fetcher,
    source: &'static str,
    config: &SourceConfig,
    page: &Page,
    links: Vec<String>,
    marker: Option<&str>,
    parse: DetailParser,
) -> ResultSet {
    let mut items = ResultSet::new();
    let mut seen = HashSet::new();
    let mut found = 0;
    for raw in links {
        if found >= config.results {
            break;
        }
        let path = match normalize_link(&raw, &page.base_url) {
            Link::Path(path) => path,
            Link::External => {
                debug!("{}: skipping external link {}", source, raw);
                continue;
            }
            Link::Invalid => continue,
        };
        if !seen.insert(path.clone()) {
            continue;
        }
        if let Some(marker) = marker {
            if !path.contains(marker) {
                continue;
            }
        }
        let url = format!("{}{}", page.base_url, path.replace(' ', "%20"));
        match fetch_item(fetcher, &url, config, parse).await {
            Ok((name, item)) => {
                debug!("{}: found '{}'", source, name);
                items.insert(name, item);
                found += 1;
            }
            Err(ItemError::Transport(e)) => warn!("{}: skipping {}: {}", source, path, e),
            Err(e) => debug!("{}: skipping {}: {}", source, path, e),
        }
    }
    items
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Leetx,
    Eztv,
    Limetorrents,
    Yts,
}

impl Target {
    pub const ALL: [Target; 4] = [Target::Leetx, Target::Eztv, Target::Limetorrents, Target::Yts];

    pub fn name(&self) -> &'static str {
        match self {
            Target::Leetx => leetx::NAME,
            Target::Eztv => eztv::NAME,
            Target::Limetorrents => limetorrents::NAME,
            Target::Yts => yts::NAME,
        }
    }

    /// Parses a comma separated target list; `all` expands to every source.
    pub fn parse_list(raw: &str) -> Result<Vec<Target>> {
        let mut out = vec![];
        for part in raw.split(',').map(str::trim).filter(|x| !x.is_empty()) {
            let targets = if part.eq_ignore_ascii_case("all") {
                Target::ALL.to_vec()
            } else {
                vec![part.parse()?]
            };
            for target in targets {
                if !out.contains(&target) {
                    out.push(target);
                }
            }
        }
        if out.is_empty() {
            bail!("no target given");
        }
        Ok(out)
    }
}

impl FromStr for Target {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "1337x" | "leetx" => Target::Leetx,
            "eztv" => Target::Eztv,
            "limetorrents" => Target::Limetorrents,
            "yts" => Target::Yts,
            other => bail!("unknown target '{}'", other),
        })
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub fn build_sources(
    config: &Config,
    targets: &[Target],
    fetcher: Arc<dyn Fetcher>,
) -> Vec<Box<dyn Source + Send + Sync>> {
    targets
        .iter()
        .map(|target| -> Box<dyn Source + Send + Sync> {
            match target {
                Target::Leetx => Box::new(LeetxClient::new(fetcher.clone(), config.leetx.clone())),
                Target::Eztv => Box::new(EztvClient::new(fetcher.clone(), config.eztv.clone())),
                Target::Limetorrents => Box::new(LimetorrentsClient::new(
                    fetcher.clone(),
                    config.limetorrents.clone(),
                )),
                Target::Yts => Box::new(YtsClient::new(
                    fetcher.clone(),
                    config.yts.clone(),
                    config.movies.clone(),
                )),
            }
        })
        .collect()
}

/// Runs every source one after another and merges the results. On a name
/// collision the source run later wins.
pub async fn gather(sources: &[Box<dyn Source + Send + Sync>], action: &Action) -> ResultSet {
    let mut out = ResultSet::new();
    for source in sources {
        let items = source.run(action).await;
        info!("{}: {} results for {}", source.name(), items.len(), action);
        out.extend(items);
    }
    out
}
