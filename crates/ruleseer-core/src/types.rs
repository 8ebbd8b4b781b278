//! Domain types shared by the chunker, the index store and the search facade.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Which chunking rule produced a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    UnitOverview,
    UnitWeapons,
    UnitAbilities,
    UnitComposition,
    Stratagem,
    Enhancement,
    DetachmentRule,
    FactionRule,
    CoreRule,
}

impl ChunkType {
    pub const ALL: [ChunkType; 9] = [
        Self::UnitOverview,
        Self::UnitWeapons,
        Self::UnitAbilities,
        Self::UnitComposition,
        Self::Stratagem,
        Self::Enhancement,
        Self::DetachmentRule,
        Self::FactionRule,
        Self::CoreRule,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnitOverview => "unit_overview",
            Self::UnitWeapons => "unit_weapons",
            Self::UnitAbilities => "unit_abilities",
            Self::UnitComposition => "unit_composition",
            Self::Stratagem => "stratagem",
            Self::Enhancement => "enhancement",
            Self::DetachmentRule => "detachment_rule",
            Self::FactionRule => "faction_rule",
            Self::CoreRule => "core_rule",
        }
    }

    /// The record kind every chunk of this type is generated from.
    pub fn source(self) -> ChunkSource {
        match self {
            Self::UnitOverview | Self::UnitWeapons | Self::UnitAbilities | Self::UnitComposition => {
                ChunkSource::Units
            }
            Self::Stratagem => ChunkSource::Stratagems,
            Self::Enhancement => ChunkSource::Enhancements,
            Self::DetachmentRule => ChunkSource::Detachments,
            Self::FactionRule => ChunkSource::FactionRules,
            Self::CoreRule => ChunkSource::CoreRules,
        }
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown chunk type '{s}'")))
    }
}

/// Origin record kind of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkSource {
    Units,
    Stratagems,
    Enhancements,
    Detachments,
    FactionRules,
    CoreRules,
}

impl ChunkSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Units => "units",
            Self::Stratagems => "stratagems",
            Self::Enhancements => "enhancements",
            Self::Detachments => "detachments",
            Self::FactionRules => "faction-rules",
            Self::CoreRules => "core-rules",
        }
    }
}

impl fmt::Display for ChunkSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::Units,
            Self::Stratagems,
            Self::Enhancements,
            Self::Detachments,
            Self::FactionRules,
            Self::CoreRules,
        ]
        .into_iter()
        .find(|k| k.as_str() == s)
        .ok_or_else(|| Error::InvalidInput(format!("unknown chunk source '{s}'")))
    }
}

/// Typed metadata stored next to every chunk.
///
/// - `chunk_type`: the generating rule; always consistent with `source`
/// - `unit_name`: set for the four unit sub-chunks
/// - `detachment`: set for stratagems, enhancements and detachment rules
/// - `faction`: `None` for core rules and for records without a faction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(rename = "type")]
    pub chunk_type: ChunkType,
    pub unit_name: Option<String>,
    pub detachment: Option<String>,
    pub faction: Option<String>,
    pub source: ChunkSource,
}

impl ChunkMetadata {
    pub fn new(chunk_type: ChunkType) -> Self {
        Self { chunk_type, unit_name: None, detachment: None, faction: None, source: chunk_type.source() }
    }

    pub fn with_unit(mut self, name: &str) -> Self {
        self.unit_name = Some(name.to_string());
        self
    }

    pub fn with_detachment(mut self, name: &str) -> Self {
        self.detachment = Some(name.to_string());
        self
    }

    pub fn with_faction(mut self, faction: Option<&str>) -> Self {
        self.faction = faction.map(str::to_string);
        self
    }
}

/// A self-contained retrievable passage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// One ranked hit from the index store. `score` is cosine similarity, higher is better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub text: String,
    pub score: f32,
    /// Insertion order within the active index.
    pub position: u32,
    pub metadata: ChunkMetadata,
}

impl SearchResult {
    pub fn score_percent(&self) -> f32 {
        self.score * 100.0
    }
}
