//! Typed source records as produced by the corpus scraper.
//!
//! Field names follow the camelCase JSON on disk. Anything a scraped record
//! may lack defaults to empty so that one incomplete record never fails a load.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A profile value that the source writes either as a number or as text
/// (`3`, `"D6+1"`, `"2+"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Characteristic {
    Number(i64),
    Text(String),
}

impl Default for Characteristic {
    fn default() -> Self {
        Self::Text("-".to_string())
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Characteristic {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Characteristic {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitStats {
    #[serde(rename = "M")]
    pub movement: String,
    #[serde(rename = "T")]
    pub toughness: Characteristic,
    #[serde(rename = "Sv")]
    pub save: String,
    #[serde(rename = "W")]
    pub wounds: Characteristic,
    #[serde(rename = "Ld")]
    pub leadership: String,
    #[serde(rename = "OC")]
    pub objective_control: Characteristic,
}

/// Same profile as [`UnitStats`] with every value optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialStats {
    #[serde(rename = "M")]
    pub movement: Option<String>,
    #[serde(rename = "T")]
    pub toughness: Option<Characteristic>,
    #[serde(rename = "Sv")]
    pub save: Option<String>,
    #[serde(rename = "W")]
    pub wounds: Option<Characteristic>,
    #[serde(rename = "Ld")]
    pub leadership: Option<String>,
    #[serde(rename = "OC")]
    pub objective_control: Option<Characteristic>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weapon {
    pub name: String,
    pub range: String,
    #[serde(rename = "A")]
    pub attacks: Characteristic,
    #[serde(rename = "BS")]
    pub ballistic_skill: Option<String>,
    #[serde(rename = "WS")]
    pub weapon_skill: Option<String>,
    #[serde(rename = "S")]
    pub strength: Characteristic,
    #[serde(rename = "AP")]
    pub armour_penetration: String,
    #[serde(rename = "D")]
    pub damage: Characteristic,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ability {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitAbilities {
    pub core: Vec<String>,
    pub faction: Vec<String>,
    pub unit: Vec<Ability>,
}

impl UnitAbilities {
    pub fn is_empty(&self) -> bool {
        self.core.is_empty() && self.faction.is_empty() && self.unit.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Composition {
    pub min: u32,
    pub max: u32,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointsCost {
    pub models: u32,
    pub points: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DegradingProfile {
    pub remaining_wounds: String,
    pub stats: PartialStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Unit {
    pub name: String,
    #[serde(deserialize_with = "non_empty")]
    pub faction: Option<String>,
    pub keywords: Vec<String>,
    pub faction_keywords: Vec<String>,
    pub stats: UnitStats,
    #[serde(deserialize_with = "non_empty")]
    pub invulnerable_save: Option<String>,
    pub ranged_weapons: Vec<Weapon>,
    pub melee_weapons: Vec<Weapon>,
    pub abilities: UnitAbilities,
    pub composition: Composition,
    pub points: Vec<PointsCost>,
    pub leader: Option<Ability>,
    pub leader_attachable_to: Option<Vec<String>>,
    pub unit_category: String,
    pub degrading_profiles: Vec<DegradingProfile>,
}

impl Unit {
    pub fn has_weapons(&self) -> bool {
        !self.ranged_weapons.is_empty() || !self.melee_weapons.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Stratagem {
    pub name: String,
    #[serde(deserialize_with = "non_empty")]
    pub faction: Option<String>,
    pub detachment: String,
    pub cp_cost: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub when: String,
    pub target: String,
    pub effect: String,
    #[serde(deserialize_with = "non_empty")]
    pub restrictions: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Enhancement {
    pub name: String,
    #[serde(deserialize_with = "non_empty")]
    pub faction: Option<String>,
    pub detachment: String,
    pub points_cost: u32,
    #[serde(deserialize_with = "non_empty")]
    pub restrictions: Option<String>,
    pub effect: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Detachment {
    pub name: String,
    #[serde(deserialize_with = "non_empty")]
    pub faction: Option<String>,
    pub rule_name: String,
    pub rule_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactionRule {
    pub name: String,
    #[serde(deserialize_with = "non_empty")]
    pub faction: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreRule {
    pub name: String,
    pub text: String,
}

/// Every record kind the chunker understands, each in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Corpus {
    pub units: Vec<Unit>,
    pub stratagems: Vec<Stratagem>,
    pub enhancements: Vec<Enhancement>,
    pub detachments: Vec<Detachment>,
    pub faction_rules: Vec<FactionRule>,
    pub core_rules: Vec<CoreRule>,
}

impl Corpus {
    pub fn record_count(&self) -> usize {
        self.units.len()
            + self.stratagems.len()
            + self.enhancements.len()
            + self.detachments.len()
            + self.faction_rules.len()
            + self.core_rules.len()
    }
}

/// `null`, missing and blank strings all collapse to `None`.
fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_faction_becomes_none() {
        let rule: FactionRule = serde_json::from_str(r#"{"name":"Battle Focus","faction":"","text":"t"}"#)
            .expect("parse");
        assert_eq!(rule.faction, None);
    }

    #[test]
    fn unit_with_missing_facets_still_loads() {
        let unit: Unit = serde_json::from_str(
            r#"{"name":"Wraithguard","faction":"aeldari","stats":{"M":"6\"","T":7,"Sv":"2+","W":3,"Ld":"7+","OC":1}}"#,
        )
        .expect("parse");
        assert!(unit.ranged_weapons.is_empty());
        assert!(unit.abilities.is_empty());
        assert_eq!(unit.stats.toughness, Characteristic::Number(7));
        assert_eq!(unit.faction.as_deref(), Some("aeldari"));
    }

    #[test]
    fn characteristic_accepts_numbers_and_dice() {
        let weapon: Weapon = serde_json::from_str(
            r#"{"name":"Wraithcannon","range":"18\"","A":1,"BS":"4+","S":14,"AP":"-4","D":"D6+1","keywords":[]}"#,
        )
        .expect("parse");
        assert_eq!(weapon.attacks.to_string(), "1");
        assert_eq!(weapon.damage.to_string(), "D6+1");
    }
}
