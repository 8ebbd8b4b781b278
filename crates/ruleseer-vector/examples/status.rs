use std::path::PathBuf;

use ruleseer_core::config::Config;
use ruleseer_vector::manifest::read_manifest;
use ruleseer_vector::table::{lance_dir, open_index_db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Config::load()?.settings()?;
    let index_dir: PathBuf = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| settings.paths.index_dir());
    let Some(manifest) = read_manifest(&index_dir)? else {
        println!("no index at {}", index_dir.display());
        return Ok(());
    };
    println!(
        "active table={} rows={} dim={} embedder={} built_at={}",
        manifest.table, manifest.rows, manifest.dim, manifest.embedder_id, manifest.built_at
    );
    let conn = open_index_db(&index_dir).await?;
    let tables = conn.table_names().execute().await?;
    println!("tables under {}: {}", lance_dir(&index_dir).display(), tables.join(", "));
    let table = conn.open_table(&manifest.table).execute().await?;
    println!("rows on disk: {}", table.count_rows(None).await?);
    Ok(())
}
