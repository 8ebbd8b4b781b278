//! Loads the scraped JSON corpus from a data directory.
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::records::Corpus;

pub const UNITS_FILE: &str = "units.json";
pub const STRATAGEMS_FILE: &str = "stratagems.json";
pub const ENHANCEMENTS_FILE: &str = "enhancements.json";
pub const DETACHMENTS_FILE: &str = "detachments.json";
pub const FACTION_RULES_FILE: &str = "faction-rules.json";
pub const CORE_RULES_FILE: &str = "core-rules.json";

pub fn load_corpus(data_dir: &Path) -> Result<Corpus> {
    let corpus = Corpus {
        units: read_required(data_dir, UNITS_FILE)?,
        stratagems: read_required(data_dir, STRATAGEMS_FILE)?,
        enhancements: read_required(data_dir, ENHANCEMENTS_FILE)?,
        detachments: read_required(data_dir, DETACHMENTS_FILE)?,
        faction_rules: read_required(data_dir, FACTION_RULES_FILE)?,
        core_rules: read_optional(data_dir, CORE_RULES_FILE)?,
    };
    info!(
        units = corpus.units.len(),
        stratagems = corpus.stratagems.len(),
        enhancements = corpus.enhancements.len(),
        detachments = corpus.detachments.len(),
        faction_rules = corpus.faction_rules.len(),
        core_rules = corpus.core_rules.len(),
        "loaded corpus from {}",
        data_dir.display()
    );
    Ok(corpus)
}

fn read_required<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<Vec<T>> {
    let path = dir.join(file);
    if !path.is_file() {
        return Err(Error::NotFound(format!("corpus file {}", path.display())));
    }
    let content = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&content)?)
}

fn read_optional<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<Vec<T>> {
    if !dir.join(file).is_file() {
        warn!("{} not found in {}; continuing without it", file, dir.display());
        return Ok(Vec::new());
    }
    read_required(dir, file)
}
