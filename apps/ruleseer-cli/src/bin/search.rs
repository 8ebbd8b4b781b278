use std::path::PathBuf;

use clap::Parser;
use ruleseer_search::{parse_type_filter, RuleSearch, SearchRequest};

#[derive(Parser)]
#[command(name = "ruleseer-search", about = "Semantic search over units, stratagems, enhancements and rules")]
struct Args {
    /// Natural language query, e.g. "units that can deep strike"
    query: String,

    /// Restrict to one chunk type (unit_overview, stratagem, core_rule, ...) or "all"
    #[arg(long = "type", default_value = "all")]
    chunk_type: String,

    /// Keep only this faction's entries (faction-agnostic rules always pass)
    #[arg(long)]
    faction: Option<String>,

    /// Number of results, clamped to the configured maximum
    #[arg(short, long)]
    limit: Option<usize>,

    /// Print the response as JSON instead of markdown
    #[arg(long)]
    json: bool,

    #[arg(long)]
    index_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ruleseer_cli::init_logging();
    let args = Args::parse();
    let settings = ruleseer_cli::load_settings(None, args.index_dir)?;

    let mut request = SearchRequest::new(args.query).with_type(parse_type_filter(&args.chunk_type)?);
    request.faction = args.faction;
    request.limit = args.limit;

    let facade = RuleSearch::open(&settings);
    let response = facade.search(&request).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", response.render());
    }
    Ok(())
}
