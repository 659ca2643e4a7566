//! Data layer — parses the balance tables and populates all registries.
//!
//! The four tables (upgrades, levels, projects, stages) live as RON
//! documents under `assets/balance/` and are embedded at compile time.
//! Each table is parsed independently: a table that fails to parse or
//! fails validation leaves its registry empty, logs a warning, and emits a
//! [`BalanceDataErrorEvent`]. The engine then runs in degraded mode —
//! lookups return empty results, nothing panics — and the host decides
//! whether that is fatal.

use bevy::prelude::*;
use serde::Deserialize;

use crate::shared::*;

const UPGRADES_RON: &str = include_str!("../../assets/balance/upgrades.ron");
const LEVELS_RON: &str = include_str!("../../assets/balance/levels.ron");
const PROJECTS_RON: &str = include_str!("../../assets/balance/projects.ron");
const STAGES_RON: &str = include_str!("../../assets/balance/stages.ron");

pub struct DataPlugin;

impl Plugin for DataPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(GameState::Loading), load_balance_tables);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// RAW ROWS — the tabular schema as it appears in the RON files
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct UpgradeRow {
    id: String,
    category: String,
    name: String,
    description: String,
    currency: String,
    base_price: f64,
    price_growth: f64,
    max_level: i32,
    unlock: String,
    /// `(effect_tag, base_value)` pairs.
    effects: Vec<(String, f64)>,
}

#[derive(Debug, Deserialize)]
struct LevelRow {
    level: u32,
    required_exp: u64,
    money_multiplier: f64,
    bonus_money: u64,
    unlock_feature: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProjectRow {
    id: String,
    name: String,
    stage: u32,
    required_exp: u64,
    base_reward: u64,
    completion_secs: f32,
}

#[derive(Debug, Deserialize)]
struct StageRow {
    stage: u32,
    name: String,
    required_level: u32,
}

// ═══════════════════════════════════════════════════════════════════════
// SYSTEM: load_balance_tables
// ═══════════════════════════════════════════════════════════════════════

/// Single system that populates every registry and then transitions to
/// MainMenu — degraded or not, the engine always comes up.
fn load_balance_tables(
    mut upgrade_registry: ResMut<UpgradeRegistry>,
    mut level_registry: ResMut<LevelRegistry>,
    mut project_registry: ResMut<ProjectRegistry>,
    mut stage_registry: ResMut<StageRegistry>,
    mut status: ResMut<BalanceDataStatus>,
    mut error_writer: EventWriter<BalanceDataErrorEvent>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    info!("[Data] Parsing balance tables…");

    match parse_upgrades(UPGRADES_RON) {
        Ok(upgrades) => {
            status.upgrades_loaded = !upgrades.is_empty();
            upgrade_registry.upgrades = upgrades;
            info!("  Upgrades loaded: {}", upgrade_registry.upgrades.len());
        }
        Err(e) => report_table_failure("upgrades", e, &mut error_writer),
    }

    match parse_levels(LEVELS_RON) {
        Ok(levels) => {
            status.levels_loaded = !levels.is_empty();
            level_registry.levels = levels;
            info!("  Levels loaded: {}", level_registry.levels.len());
        }
        Err(e) => report_table_failure("levels", e, &mut error_writer),
    }

    match parse_projects(PROJECTS_RON) {
        Ok(projects) => {
            status.projects_loaded = !projects.is_empty();
            project_registry.projects = projects;
            info!("  Projects loaded: {}", project_registry.projects.len());
        }
        Err(e) => report_table_failure("projects", e, &mut error_writer),
    }

    match parse_stages(STAGES_RON) {
        Ok(stages) => {
            status.stages_loaded = !stages.is_empty();
            stage_registry.stages = stages;
            info!("  Stages loaded: {}", stage_registry.stages.len());
        }
        Err(e) => report_table_failure("stages", e, &mut error_writer),
    }

    if status.degraded() {
        warn!("[Data] One or more balance tables missing — running degraded.");
    } else {
        info!("[Data] All balance tables populated. Transitioning to MainMenu.");
    }
    next_state.set(GameState::MainMenu);
}

fn report_table_failure(
    table: &str,
    error: String,
    error_writer: &mut EventWriter<BalanceDataErrorEvent>,
) {
    warn!("[Data] Failed to load '{}' table: {}", table, error);
    error_writer.send(BalanceDataErrorEvent {
        table: table.to_string(),
        error,
    });
}

// ═══════════════════════════════════════════════════════════════════════
// PARSERS — one per table, pure so tests can feed them bad documents
// ═══════════════════════════════════════════════════════════════════════

pub(crate) fn parse_upgrades(
    source: &str,
) -> Result<std::collections::HashMap<UpgradeId, UpgradeDef>, String> {
    let rows: Vec<UpgradeRow> =
        ron::from_str(source).map_err(|e| format!("RON parse error: {}", e))?;

    let mut upgrades = std::collections::HashMap::new();
    for row in rows {
        let category = match row.category.as_str() {
            "skills" => UpgradeCategory::Skills,
            "equipment" => UpgradeCategory::Equipment,
            "team" => UpgradeCategory::Team,
            other => {
                warn!(
                    "[Data] Upgrade '{}' has unknown category '{}' — row skipped",
                    row.id, other
                );
                continue;
            }
        };
        let currency = match row.currency.as_str() {
            "money" => CurrencyKind::Money,
            "experience" => CurrencyKind::Experience,
            other => {
                warn!(
                    "[Data] Upgrade '{}' has unknown currency '{}' — row skipped",
                    row.id, other
                );
                continue;
            }
        };

        let effects = row
            .effects
            .iter()
            .map(|(tag, value)| EffectDef {
                kind: EffectKind::parse(tag),
                base_value: *value,
            })
            .collect();

        upgrades.insert(
            row.id.clone(),
            UpgradeDef {
                id: row.id,
                category,
                name: row.name,
                description: row.description,
                currency,
                base_price: row.base_price,
                price_growth: row.price_growth,
                max_level: row.max_level,
                unlock: UnlockRequirement::parse(&row.unlock),
                effects,
            },
        );
    }
    Ok(upgrades)
}

pub(crate) fn parse_levels(
    source: &str,
) -> Result<std::collections::HashMap<u32, LevelDef>, String> {
    let rows: Vec<LevelRow> =
        ron::from_str(source).map_err(|e| format!("RON parse error: {}", e))?;

    // Required experience must be strictly increasing with level; a table
    // violating that would loop the level-up evaluation forever.
    let mut sorted: Vec<&LevelRow> = rows.iter().collect();
    sorted.sort_by_key(|r| r.level);
    for pair in sorted.windows(2) {
        if pair[1].required_exp <= pair[0].required_exp {
            return Err(format!(
                "required_exp not strictly increasing between level {} and {}",
                pair[0].level, pair[1].level
            ));
        }
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            (
                row.level,
                LevelDef {
                    level: row.level,
                    required_exp: row.required_exp,
                    money_multiplier: row.money_multiplier,
                    bonus_money: row.bonus_money,
                    unlock_feature: row.unlock_feature,
                },
            )
        })
        .collect())
}

pub(crate) fn parse_projects(
    source: &str,
) -> Result<std::collections::HashMap<ProjectId, ProjectDef>, String> {
    let rows: Vec<ProjectRow> =
        ron::from_str(source).map_err(|e| format!("RON parse error: {}", e))?;
    Ok(rows
        .into_iter()
        .map(|row| {
            (
                row.id.clone(),
                ProjectDef {
                    id: row.id,
                    name: row.name,
                    stage: row.stage,
                    required_exp: row.required_exp,
                    base_reward: row.base_reward,
                    completion_secs: row.completion_secs,
                },
            )
        })
        .collect())
}

pub(crate) fn parse_stages(
    source: &str,
) -> Result<std::collections::HashMap<u32, StageDef>, String> {
    let rows: Vec<StageRow> =
        ron::from_str(source).map_err(|e| format!("RON parse error: {}", e))?;
    for row in &rows {
        if row.stage == 0 {
            return Err("stage numbers start at 1".to_string());
        }
    }
    Ok(rows
        .into_iter()
        .map(|row| {
            (
                row.stage,
                StageDef {
                    stage: row.stage,
                    name: row.name,
                    required_level: row.required_level,
                },
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_tables_parse() {
        let upgrades = parse_upgrades(UPGRADES_RON).expect("upgrades table should parse");
        let levels = parse_levels(LEVELS_RON).expect("levels table should parse");
        let projects = parse_projects(PROJECTS_RON).expect("projects table should parse");
        let stages = parse_stages(STAGES_RON).expect("stages table should parse");

        assert!(!upgrades.is_empty());
        assert!(!levels.is_empty());
        assert!(!projects.is_empty());
        assert_eq!(stages.len(), 10);
    }

    #[test]
    fn test_malformed_table_is_an_error_not_a_panic() {
        assert!(parse_upgrades("not ron at all [").is_err());
        assert!(parse_levels("(oops)").is_err());
    }

    #[test]
    fn test_levels_must_strictly_increase() {
        let doc = r#"[
            (level: 1, required_exp: 0, money_multiplier: 1.0, bonus_money: 0, unlock_feature: None),
            (level: 2, required_exp: 100, money_multiplier: 1.0, bonus_money: 0, unlock_feature: None),
            (level: 3, required_exp: 100, money_multiplier: 1.0, bonus_money: 0, unlock_feature: None),
        ]"#;
        let err = parse_levels(doc).unwrap_err();
        assert!(err.contains("strictly increasing"), "got: {}", err);
    }

    #[test]
    fn test_unknown_effect_tags_survive_parsing() {
        let doc = r#"[
            (id: "exotic", category: "skills", name: "Exotic", description: "",
             currency: "experience", base_price: 10.0, price_growth: 1.1,
             max_level: 0, unlock: "none", effects: [("team_morale", 0.5)]),
        ]"#;
        let upgrades = parse_upgrades(doc).unwrap();
        let def = upgrades.get("exotic").unwrap();
        assert_eq!(
            def.effects[0].kind,
            EffectKind::Unknown("team_morale".to_string())
        );
    }

    #[test]
    fn test_unknown_category_skips_row_only() {
        let doc = r#"[
            (id: "weird", category: "management", name: "", description: "",
             currency: "money", base_price: 1.0, price_growth: 1.0,
             max_level: 0, unlock: "none", effects: []),
            (id: "fine", category: "team", name: "", description: "",
             currency: "money", base_price: 1.0, price_growth: 1.0,
             max_level: 0, unlock: "none", effects: []),
        ]"#;
        let upgrades = parse_upgrades(doc).unwrap();
        assert!(upgrades.get("weird").is_none());
        assert!(upgrades.get("fine").is_some());
    }

    #[test]
    fn test_sample_upgrade_shape() {
        let upgrades = parse_upgrades(UPGRADES_RON).unwrap();
        let typing = upgrades.get("touch_typing").expect("touch_typing exists");
        assert_eq!(typing.category, UpgradeCategory::Skills);
        assert_eq!(typing.currency, CurrencyKind::Experience);
        assert!(typing.effects.iter().any(|e| e.kind == EffectKind::ExpPerClick));
    }
}
