use ruleseer_core::config::Config;
use ruleseer_core::traits::Embedder as _;
use ruleseer_embed::shared_embedder;

fn main() -> anyhow::Result<()> {
    let settings = Config::load()?.settings()?;
    let embedder = shared_embedder(&settings.embedding)?;
    let texts = vec!["[Core Rule: Deep Strike] Set up in Reserves.".to_string(), "best anti-tank weapons".to_string()];
    let embs = embedder.embed_batch(&texts)?;
    let similarity: f32 = embs[0].iter().zip(&embs[1]).map(|(a, b)| a * b).sum();
    println!("model={} B={} dim={} cos={similarity:.4}", embedder.id(), embs.len(), embedder.dim());
    Ok(())
}
