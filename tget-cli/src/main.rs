use std::sync::Arc;

use anyhow::Result;
use clap::{ArgGroup, Parser};
use cli_table::{print_stdout, Table, WithTitle};
use log::debug;
use tget::{build_sources, config::DEBUG, gather, Config, ReqwestFetcher, Target};
use tget_types::{Action, ResultItem, ResultSet};

/// Searches torrent index sites and prints what they list
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(group(ArgGroup::new("action").required(true).args(&["search", "list"])))]
struct Args {
    /// Search term
    #[clap(short, long)]
    search: Option<String>,
    /// List the sites' current top torrents
    #[clap(short, long)]
    list: bool,
    /// Comma separated sources to query: 1337x, eztv, limetorrents, yts or all
    #[clap(short, long, default_value = "all")]
    target: String,
    /// Movie quality filter (yts only), overrides the config file
    #[clap(short, long)]
    quality: Option<String>,
    /// Movie genre filter (yts only), overrides the config file
    #[clap(short, long)]
    genre: Option<String>,
    /// Maximum results per source, overrides the config file
    #[clap(short, long)]
    results: Option<usize>,
    /// Print the results as JSON
    #[clap(short, long)]
    json: bool,
    /// Print links only, one per line
    #[clap(long, conflicts_with = "json")]
    links: bool,
    /// Increases log level and dumps response details
    #[clap(short, long)]
    verbose: bool,
}

#[derive(Table)]
struct ResultTable {
    #[table(title = "Name")]
    name: String,
    #[table(title = "Seeds")]
    seeds: String,
    #[table(title = "Leeches")]
    leeches: String,
    #[table(title = "Link")]
    link: String,
}

impl From<(String, ResultItem)> for ResultTable {
    fn from((name, item): (String, ResultItem)) -> Self {
        Self {
            name,
            seeds: item.seeds,
            leeches: item.leeches,
            link: item.link,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    let debug_mode = args.verbose || *DEBUG;
    env_logger::Builder::new()
        .parse_env(
            env_logger::Env::default().default_filter_or(if debug_mode { "debug" } else { "info" }),
        )
        .init();

    if let Err(e) = run(args, debug_mode).await {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

fn action(args: &Args) -> Action {
    match &args.search {
        Some(query) => Action::Search(query.clone()),
        None => Action::List,
    }
}

async fn run(args: Args, debug_mode: bool) -> Result<()> {
    let mut config = Config::load()?;
    config.fetch.debug |= debug_mode;
    if let Some(quality) = &args.quality {
        config.movies.quality = quality.clone();
    }
    if let Some(genre) = &args.genre {
        config.movies.genre = genre.clone();
    }
    if let Some(results) = args.results {
        config.set_results(results);
    }

    let targets = Target::parse_list(&args.target)?;
    debug!("targets: {:?}", targets);
    let fetcher = Arc::new(ReqwestFetcher::new(config.fetch.clone())?);
    let sources = build_sources(&config, &targets, fetcher);
    let items = gather(&sources, &action(&args)).await;
    print(&args, items)
}

fn print(args: &Args, items: ResultSet) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if args.links {
        for item in items.values() {
            println!("{}", item.link);
        }
    } else if items.is_empty() {
        println!("no results");
    } else {
        let list: Vec<ResultTable> = items.into_iter().map(ResultTable::from).collect();
        print_stdout(list.with_title())?;
    }
    Ok(())
}
