use std::path::PathBuf;

use clap::Parser;
use ruleseer_core::corpus::load_corpus;
use ruleseer_core::generate_all_chunks;
use ruleseer_core::traits::Embedder as _;
use ruleseer_embed::shared_embedder;
use ruleseer_vector::VectorStore;

#[derive(Parser)]
#[command(name = "ruleseer-indexer", about = "Chunk the rules corpus, embed it and rebuild the vector index")]
struct Args {
    /// Directory with units.json, stratagems.json, ... (overrides paths.data_dir)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Index directory to rebuild (overrides paths.index_dir)
    #[arg(long)]
    index_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ruleseer_cli::init_logging();
    let args = Args::parse();
    let settings = ruleseer_cli::load_settings(args.data_dir, args.index_dir)?;

    let data_dir = settings.paths.data_dir();
    tracing::info!(dir = %data_dir.display(), "loading corpus");
    let corpus = load_corpus(&data_dir)?;
    let chunks = generate_all_chunks(&corpus);

    let store = VectorStore::open(settings.paths.index_dir(), shared_embedder(&settings.embedding)?, &settings.index);
    let embedder = store.embedder();
    tracing::info!(model = embedder.id(), dim = embedder.dim(), max_len = embedder.max_len(), "embedder ready");
    let report = store.build(&chunks).await?;

    tracing::info!(
        table = %report.table,
        rows = report.rows,
        ann = report.ann_index,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "inserted {} chunks into {}",
        report.rows,
        store.index_dir().display()
    );
    Ok(())
}
