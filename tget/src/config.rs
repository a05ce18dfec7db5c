use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::source::{eztv, leetx, limetorrents, yts, Candidate};

/// Environment variable enabling diagnostic output.
pub const DEBUG_ENV: &str = "TGET_DEBUG";
/// Environment variable naming an optional YAML config file.
pub const CONFIG_ENV: &str = "TGET_CONFIG";

pub fn flag_enabled(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

lazy_static::lazy_static! {
    pub static ref DEBUG: bool = std::env::var(DEBUG_ENV)
        .map(|x| flag_enabled(&x))
        .unwrap_or(false);
}

fn default_debug() -> bool {
    *DEBUG
}

fn serde_true() -> bool {
    true
}

fn default_challenge_delay_ms() -> u64 {
    2000
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// dump response metadata and challenge previews to the log
    #[serde(default = "default_debug")]
    pub debug: bool,
    /// whether the cookie-keeping browser transport may be used at all
    #[serde(default = "serde_true")]
    pub anti_bot: bool,
    /// pause before retrying a challenged request
    #[serde(default = "default_challenge_delay_ms")]
    pub challenge_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            debug: default_debug(),
            anti_bot: true,
            challenge_delay_ms: default_challenge_delay_ms(),
        }
    }
}

fn default_quality() -> String {
    "720p".to_string()
}

fn default_genre() -> String {
    "all".to_string()
}

/// Filters understood by the movie API only.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MovieFilter {
    #[serde(default = "default_quality")]
    pub quality: String,
    #[serde(default = "default_genre")]
    pub genre: String,
}

impl Default for MovieFilter {
    fn default() -> Self {
        Self {
            quality: default_quality(),
            genre: default_genre(),
        }
    }
}

fn default_results() -> usize {
    10
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_min_page_len() -> usize {
    100
}

/// Per-site constants. Base URLs are tried in order and the first one that
/// answers with usable content wins.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    pub base_urls: Vec<String>,
    /// path templates, `{query}` is replaced by the encoded search term
    #[serde(default)]
    pub search_paths: Vec<String>,
    #[serde(default)]
    pub list_paths: Vec<String>,
    /// maximum number of results per call
    #[serde(default = "default_results")]
    pub results: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// request through the anti-bot transport
    #[serde(default)]
    pub anti_bot: bool,
    /// listing pages shorter than this are treated as missing
    #[serde(default = "default_min_page_len")]
    pub min_page_len: usize,
}

impl SourceConfig {
    pub fn new(base_urls: &[&str], search_paths: &[&str], list_paths: &[&str]) -> Self {
        let owned = |x: &[&str]| x.iter().map(|x| x.to_string()).collect();
        Self {
            base_urls: owned(base_urls),
            search_paths: owned(search_paths),
            list_paths: owned(list_paths),
            results: default_results(),
            timeout_secs: default_timeout_secs(),
            anti_bot: false,
            min_page_len: default_min_page_len(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Search URLs in priority order: query variant, then path template, then
    /// base URL.
    pub fn search_candidates(&self, variants: &[String], vars: &[(&str, &str)]) -> Vec<Candidate> {
        let mut out = vec![];
        for variant in variants {
            let mut vars = vars.to_vec();
            vars.push(("query", variant.as_str()));
            for path in &self.search_paths {
                let path = render(path, &vars);
                for base in &self.base_urls {
                    out.push(Candidate::new(base, &path));
                }
            }
        }
        out
    }

    /// List URLs in priority order: base URL, then path template.
    pub fn list_candidates(&self, vars: &[(&str, &str)]) -> Vec<Candidate> {
        let mut out = vec![];
        for base in &self.base_urls {
            for path in &self.list_paths {
                out.push(Candidate::new(base, &render(path, vars)));
            }
        }
        out
    }
}

/// Replaces every `{key}` in `template` with its value.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{}}}", key), value);
    }
    out
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub movies: MovieFilter,
    pub leetx: SourceConfig,
    pub eztv: SourceConfig,
    pub limetorrents: SourceConfig,
    pub yts: SourceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            movies: MovieFilter::default(),
            leetx: leetx::default_config(),
            eztv: eztv::default_config(),
            limetorrents: limetorrents::default_config(),
            yts: yts::default_config(),
        }
    }
}

impl Config {
    /// Reads the file named by `TGET_CONFIG`, or returns the built-in defaults
    /// when the variable is unset.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_default();
        if path.is_empty() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config '{}'", path))?;
        Self::from_yaml(&raw).with_context(|| format!("failed to parse config '{}'", path))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Applies a result cap to every source.
    pub fn set_results(&mut self, results: usize) {
        for source in [
            &mut self.leetx,
            &mut self.eztv,
            &mut self.limetorrents,
            &mut self.yts,
        ] {
            source.results = results;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_enabled() {
        assert!(flag_enabled("1"));
        assert!(flag_enabled("TRUE"));
        assert!(flag_enabled("Yes"));
        assert!(!flag_enabled(""));
        assert!(!flag_enabled("0"));
        assert!(!flag_enabled("on"));
    }

    #[test]
    fn test_render() {
        assert_eq!(
            render("/q={query}&quality={quality}", &[("query", "a+b"), ("quality", "720p")]),
            "/q=a+b&quality=720p"
        );
        assert_eq!(render("/top-100", &[("query", "x")]), "/top-100");
    }

    #[test]
    fn test_candidate_order() {
        let config = SourceConfig::new(&["https://a", "https://b"], &["/s/{query}/", "/s?q={query}"], &["/top"]);
        let urls: Vec<String> = config
            .search_candidates(&["x".to_string(), "y".to_string()], &[])
            .into_iter()
            .map(|x| x.url)
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://a/s/x/",
                "https://b/s/x/",
                "https://a/s?q=x",
                "https://b/s?q=x",
                "https://a/s/y/",
                "https://b/s/y/",
                "https://a/s?q=y",
                "https://b/s?q=y",
            ]
        );
        let lists: Vec<String> = config.list_candidates(&[]).into_iter().map(|x| x.url).collect();
        assert_eq!(lists, vec!["https://a/top", "https://b/top"]);
    }

    #[test]
    fn test_partial_yaml() {
        let config = Config::from_yaml(
            r#"
fetch:
  challenge_delay_ms: 0
movies:
  quality: 1080p
eztv:
  base_urls: ["http://localhost:1234"]
  list_paths: ["/"]
  results: 3
"#,
        )
        .unwrap();
        assert_eq!(config.fetch.challenge_delay_ms, 0);
        assert!(config.fetch.anti_bot);
        assert_eq!(config.movies.quality, "1080p");
        assert_eq!(config.movies.genre, "all");
        assert_eq!(config.eztv.base_urls, vec!["http://localhost:1234"]);
        assert_eq!(config.eztv.results, 3);
        assert_eq!(config.eztv.timeout_secs, 10);
        assert!(config.eztv.search_paths.is_empty());
        assert_eq!(config.leetx.min_page_len, 1000);
        assert!(config.leetx.anti_bot);
    }

    #[test]
    fn test_set_results() {
        let mut config = Config::default();
        config.set_results(25);
        assert_eq!(config.leetx.results, 25);
        assert_eq!(config.yts.results, 25);
    }
}
