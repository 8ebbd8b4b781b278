//! Deterministic decomposition of a [`Corpus`] into retrievable chunks.
//!
//! Every chunk carries its field labels inline so it reads on its own when
//! returned out of context. Units are split into overview, weapons, abilities
//! and composition chunks so that a weapons question does not have to pull in
//! a unit's abilities and vice versa.
//!
//! Output order: units (input order; overview, weapons, abilities, composition),
//! then stratagems, enhancements, detachments, faction rules, core rules.

use tracing::info;

use crate::records::{CoreRule, Corpus, Detachment, Enhancement, FactionRule, Stratagem, Unit, Weapon};
use crate::types::{Chunk, ChunkMetadata, ChunkType};

pub fn generate_all_chunks(corpus: &Corpus) -> Vec<Chunk> {
    let mut chunks = Vec::with_capacity(corpus.units.len() * 4 + corpus.record_count());

    for unit in &corpus.units {
        chunks.extend(chunk_unit(unit));
    }
    chunks.extend(corpus.stratagems.iter().map(chunk_stratagem));
    chunks.extend(corpus.enhancements.iter().map(chunk_enhancement));
    chunks.extend(corpus.detachments.iter().map(chunk_detachment));
    chunks.extend(corpus.faction_rules.iter().map(chunk_faction_rule));
    chunks.extend(corpus.core_rules.iter().map(chunk_core_rule));

    info!(records = corpus.record_count(), chunks = chunks.len(), "generated chunks");
    chunks
}

pub fn chunk_unit(unit: &Unit) -> Vec<Chunk> {
    let faction = unit.faction.as_deref();
    let meta = |chunk_type| ChunkMetadata::new(chunk_type).with_unit(&unit.name).with_faction(faction);

    let mut chunks = vec![Chunk { text: unit_overview(unit), metadata: meta(ChunkType::UnitOverview) }];

    if unit.has_weapons() {
        let mut lines = vec![format!("[Unit: {}] Weapons:", unit.name)];
        lines.extend(unit.ranged_weapons.iter().map(|w| weapon_line("Ranged", "BS", w.ballistic_skill.as_deref(), w)));
        lines.extend(unit.melee_weapons.iter().map(|w| weapon_line("Melee", "WS", w.weapon_skill.as_deref(), w)));
        chunks.push(Chunk { text: lines.join("\n"), metadata: meta(ChunkType::UnitWeapons) });
    }

    if !unit.abilities.is_empty() {
        let mut lines = vec![format!("[Unit: {}] Abilities:", unit.name)];
        if !unit.abilities.core.is_empty() {
            lines.push(format!("Core: {}", unit.abilities.core.join(", ")));
        }
        if !unit.abilities.faction.is_empty() {
            lines.push(format!("Faction: {}", unit.abilities.faction.join(", ")));
        }
        lines.extend(unit.abilities.unit.iter().map(|a| format!("{}: {}", a.name, a.description)));
        chunks.push(Chunk { text: lines.join("\n"), metadata: meta(ChunkType::UnitAbilities) });
    }

    let description = unit.composition.description.trim();
    if !description.is_empty() || unit.leader_attachable_to.is_some() {
        let mut lines = vec![format!("[Unit: {}] Composition and Leader Info:", unit.name)];
        if !description.is_empty() {
            lines.push(format!("Composition: {description}"));
        }
        if let Some(targets) = unit.leader_attachable_to.as_ref().filter(|t| !t.is_empty()) {
            lines.push(format!("Can be attached to: {}", targets.join(", ")));
        }
        if let Some(leader) = &unit.leader {
            lines.push(format!("Leader ability: {} - {}", leader.name, leader.description));
        }
        chunks.push(Chunk { text: lines.join("\n"), metadata: meta(ChunkType::UnitComposition) });
    }

    chunks
}

fn unit_overview(unit: &Unit) -> String {
    let s = &unit.stats;
    let mut parts = vec![
        format!("{}{}", label("Unit", &unit.name), faction_suffix(unit.faction.as_deref())),
        format!("Category: {}", unit.unit_category),
        format!(
            "Stats: M {}, T {}, Sv {}, W {}, Ld {}, OC {}",
            s.movement, s.toughness, s.save, s.wounds, s.leadership, s.objective_control
        ),
    ];
    if let Some(invuln) = &unit.invulnerable_save {
        parts.push(format!("Invulnerable Save: {invuln}"));
    }
    let points: Vec<String> = unit.points.iter().map(|p| format!("{} models = {}pts", p.models, p.points)).collect();
    parts.push(format!("Points: {}", points.join(", ")));
    parts.push(format!("Keywords: {}", unit.keywords.join(", ")));
    parts.push(format!("Faction: {}", unit.faction_keywords.join(", ")));
    parts.join(". ")
}

fn weapon_line(kind: &str, skill_label: &str, skill: Option<&str>, w: &Weapon) -> String {
    let keywords = if w.keywords.is_empty() { String::new() } else { format!(" [{}]", w.keywords.join(", ")) };
    format!(
        "{kind} - {}: Range {}, A{}, {skill_label} {}, S{}, AP{}, D{}{keywords}",
        w.name,
        w.range,
        w.attacks,
        skill.unwrap_or("-"),
        w.strength,
        w.armour_penetration,
        w.damage,
    )
}

pub fn chunk_stratagem(strat: &Stratagem) -> Chunk {
    let mut lines = vec![
        format!("{}{}", label("Stratagem", &strat.name), faction_suffix(strat.faction.as_deref())),
        format!("Detachment: {}", strat.detachment),
        format!("Type: {}", strat.kind),
        format!("CP Cost: {}CP", strat.cp_cost),
        format!("WHEN: {}", strat.when),
        format!("TARGET: {}", strat.target),
        format!("EFFECT: {}", strat.effect),
    ];
    if let Some(restrictions) = &strat.restrictions {
        lines.push(format!("RESTRICTIONS: {restrictions}"));
    }
    Chunk {
        text: lines.join("\n"),
        metadata: ChunkMetadata::new(ChunkType::Stratagem)
            .with_detachment(&strat.detachment)
            .with_faction(strat.faction.as_deref()),
    }
}

pub fn chunk_enhancement(enh: &Enhancement) -> Chunk {
    let mut lines = vec![
        format!("{}{}", label("Enhancement", &enh.name), faction_suffix(enh.faction.as_deref())),
        format!("Detachment: {}", enh.detachment),
        format!("Points Cost: {}pts", enh.points_cost),
    ];
    if let Some(restrictions) = &enh.restrictions {
        lines.push(format!("Restrictions: {restrictions}"));
    }
    lines.push(format!("Effect: {}", enh.effect));
    Chunk {
        text: lines.join("\n"),
        metadata: ChunkMetadata::new(ChunkType::Enhancement)
            .with_detachment(&enh.detachment)
            .with_faction(enh.faction.as_deref()),
    }
}

pub fn chunk_detachment(detachment: &Detachment) -> Chunk {
    Chunk {
        text: format!(
            "{}{} {}: {}",
            label("Detachment Rule", &detachment.name),
            faction_suffix(detachment.faction.as_deref()),
            detachment.rule_name,
            detachment.rule_text
        ),
        metadata: ChunkMetadata::new(ChunkType::DetachmentRule)
            .with_detachment(&detachment.name)
            .with_faction(detachment.faction.as_deref()),
    }
}

pub fn chunk_faction_rule(rule: &FactionRule) -> Chunk {
    Chunk {
        text: format!("{}{} {}", label("Faction Rule", &rule.name), faction_suffix(rule.faction.as_deref()), rule.text),
        metadata: ChunkMetadata::new(ChunkType::FactionRule).with_faction(rule.faction.as_deref()),
    }
}

pub fn chunk_core_rule(rule: &CoreRule) -> Chunk {
    Chunk {
        text: format!("{} {}", label("Core Rule", &rule.name), rule.text),
        metadata: ChunkMetadata::new(ChunkType::CoreRule),
    }
}

fn label(kind: &str, name: &str) -> String {
    format!("[{kind}: {name}]")
}

fn faction_suffix(faction: Option<&str>) -> String {
    faction.map(|f| format!(" ({f})")).unwrap_or_default()
}
