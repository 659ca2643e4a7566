//! Versioned save-file schema and the migration chain.
//!
//! Migrations are explicit field mappings between versioned structs —
//! data, not reflection. Adding a version means adding a struct and one
//! function here, then bumping [`SAVE_VERSION`].

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::shared::*;

pub const SAVE_VERSION: u32 = 2;

/// The current on-disk layout. Every field below `version` defaults, so a
/// *future* save loaded by this build degrades to defaults for whatever it
/// does not recognize instead of failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveFile {
    pub version: u32,
    #[serde(default)]
    pub save_count: u64,
    #[serde(default)]
    pub first_play_time: u64,
    #[serde(default)]
    pub last_save_time: u64,
    #[serde(default)]
    pub play_time_secs: u64,
    #[serde(default)]
    pub progress: PlayerProgress,
    #[serde(default)]
    pub derived: DerivedStats,
    #[serde(default)]
    pub stats: PlayStats,
    #[serde(default)]
    pub milestones: Milestones,
    #[serde(default)]
    pub project_board: ProjectBoard,
}

impl Default for SaveFile {
    fn default() -> Self {
        Self {
            version: SAVE_VERSION,
            save_count: 0,
            first_play_time: 0,
            last_save_time: 0,
            play_time_secs: 0,
            progress: PlayerProgress::default(),
            derived: DerivedStats::default(),
            stats: PlayStats::default(),
            milestones: Milestones::default(),
            project_board: ProjectBoard::default(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// V1 — legacy layout with a single click/auto scalar per track
// ═══════════════════════════════════════════════════════════════════════

fn default_level() -> u32 {
    1
}

/// The v1 schema kept one `click_power` and one `auto_income` number; v2
/// split both into separate money/experience tracks.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveFileV1 {
    pub version: u32,
    #[serde(default)]
    pub save_count: u64,
    #[serde(default)]
    pub first_play_time: u64,
    #[serde(default)]
    pub last_save_time: u64,
    #[serde(default)]
    pub play_time_secs: u64,
    #[serde(default)]
    pub money: u64,
    #[serde(default)]
    pub experience: u64,
    #[serde(default = "default_level")]
    pub player_level: u32,
    #[serde(default = "default_level")]
    pub stage: u32,
    #[serde(default)]
    pub upgrade_levels: HashMap<String, u32>,
    #[serde(default)]
    pub click_power: f64,
    #[serde(default)]
    pub auto_income: f64,
    #[serde(default)]
    pub stats: PlayStats,
    #[serde(default)]
    pub unlocked_features: Vec<String>,
}

/// v1 → v2: the legacy scalars become the experience track, and the money
/// track is derived at reduced rates — but only if money generation was
/// already unlocked when the save was written (explicitly listed, or
/// implied by the level gate).
pub fn migrate_v1_to_v2(v1: SaveFileV1) -> SaveFile {
    let money_unlocked = v1
        .unlocked_features
        .iter()
        .any(|id| id == MONEY_GENERATION_MILESTONE)
        || v1.player_level >= 10;

    let derived = DerivedStats {
        exp_per_click: v1.click_power,
        money_per_click: if money_unlocked {
            v1.click_power * 0.5
        } else {
            0.0
        },
        auto_exp: v1.auto_income,
        auto_money: if money_unlocked {
            v1.auto_income * 0.3
        } else {
            0.0
        },
        ..DerivedStats::default()
    };

    SaveFile {
        version: SAVE_VERSION,
        save_count: v1.save_count,
        first_play_time: v1.first_play_time,
        last_save_time: v1.last_save_time,
        play_time_secs: v1.play_time_secs,
        progress: PlayerProgress {
            money: v1.money,
            experience: v1.experience,
            level: v1.player_level,
            stage: v1.stage,
            upgrade_levels: v1.upgrade_levels,
        },
        derived,
        stats: v1.stats,
        milestones: Milestones {
            unlocked: v1.unlocked_features,
        },
        project_board: ProjectBoard::default(),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// ENTRY POINT
// ═══════════════════════════════════════════════════════════════════════

/// Parses a save blob of any known version into the current layout.
pub fn load_any_version(json: &str) -> Result<SaveFile, String> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| format!("Deserialization failed: {}", e))?;

    let version = value
        .get("version")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| "Save blob has no version tag".to_string())? as u32;

    match version {
        1 => {
            info!("[Save] Migrating save from v1 to v{}", SAVE_VERSION);
            let v1: SaveFileV1 = serde_json::from_value(value)
                .map_err(|e| format!("v1 deserialization failed: {}", e))?;
            Ok(migrate_v1_to_v2(v1))
        }
        SAVE_VERSION => serde_json::from_value(value)
            .map_err(|e| format!("Deserialization failed: {}", e)),
        other => {
            // A future version: take every field we recognize, default the
            // rest, and keep playing rather than refusing the save.
            warn!(
                "[Save] Save has version {} but current version is {}. Loading with defaults for unknown fields.",
                other, SAVE_VERSION
            );
            let mut file: SaveFile = serde_json::from_value(value)
                .map_err(|e| format!("Deserialization failed: {}", e))?;
            file.version = SAVE_VERSION;
            Ok(file)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_splits_tracks_when_money_unlocked() {
        let v1 = SaveFileV1 {
            version: 1,
            save_count: 7,
            first_play_time: 1000,
            last_save_time: 2000,
            play_time_secs: 0,
            money: 500,
            experience: 2500,
            player_level: 12,
            stage: 2,
            upgrade_levels: HashMap::new(),
            click_power: 5.0,
            auto_income: 2.0,
            stats: PlayStats::default(),
            unlocked_features: vec![MONEY_GENERATION_MILESTONE.to_string()],
        };

        let v2 = migrate_v1_to_v2(v1);
        assert_eq!(v2.version, SAVE_VERSION);
        assert_eq!(v2.derived.exp_per_click, 5.0);
        assert_eq!(v2.derived.money_per_click, 2.5);
        assert_eq!(v2.derived.auto_exp, 2.0);
        assert!((v2.derived.auto_money - 0.6).abs() < 1e-12);
        assert_eq!(v2.progress.level, 12);
        assert_eq!(v2.save_count, 7);
    }

    #[test]
    fn test_migration_level_gate_implies_money_unlock() {
        let v1 = SaveFileV1 {
            version: 1,
            save_count: 0,
            first_play_time: 0,
            last_save_time: 0,
            play_time_secs: 0,
            money: 0,
            experience: 0,
            player_level: 10, // no explicit feature list, level implies it
            stage: 1,
            upgrade_levels: HashMap::new(),
            click_power: 4.0,
            auto_income: 1.0,
            stats: PlayStats::default(),
            unlocked_features: vec![],
        };
        let v2 = migrate_v1_to_v2(v1);
        assert_eq!(v2.derived.money_per_click, 2.0);
        assert!((v2.derived.auto_money - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_migration_keeps_money_locked_below_gate() {
        let v1 = SaveFileV1 {
            version: 1,
            save_count: 0,
            first_play_time: 0,
            last_save_time: 0,
            play_time_secs: 0,
            money: 0,
            experience: 300,
            player_level: 6,
            stage: 1,
            upgrade_levels: HashMap::new(),
            click_power: 3.0,
            auto_income: 1.5,
            stats: PlayStats::default(),
            unlocked_features: vec![],
        };
        let v2 = migrate_v1_to_v2(v1);
        assert_eq!(v2.derived.exp_per_click, 3.0);
        assert_eq!(v2.derived.money_per_click, 0.0);
        assert_eq!(v2.derived.auto_exp, 1.5);
        assert_eq!(v2.derived.auto_money, 0.0);
    }

    #[test]
    fn test_load_any_version_dispatches_v1() {
        let blob = r#"{
            "version": 1,
            "money": 42,
            "experience": 1500,
            "player_level": 10,
            "click_power": 5.0,
            "auto_income": 2.0
        }"#;
        let file = load_any_version(blob).unwrap();
        assert_eq!(file.version, SAVE_VERSION);
        assert_eq!(file.progress.money, 42);
        assert_eq!(file.derived.money_per_click, 2.5);
    }

    #[test]
    fn test_load_current_version_roundtrip() {
        let mut original = SaveFile::default();
        original.progress.money = 777;
        original.progress.level = 9;
        original.milestones.unlocked.push("team_hiring".to_string());

        let json = serde_json::to_string(&original).unwrap();
        let loaded = load_any_version(&json).unwrap();
        assert_eq!(loaded.progress.money, 777);
        assert_eq!(loaded.progress.level, 9);
        assert!(loaded.milestones.is_unlocked("team_hiring"));
    }

    #[test]
    fn test_load_future_version_defaults_unknown_fields() {
        let blob = r#"{
            "version": 9,
            "progress": { "money": 12, "experience": 0, "level": 1, "stage": 1, "upgrade_levels": {} },
            "some_future_field": { "whatever": true }
        }"#;
        let file = load_any_version(blob).unwrap();
        assert_eq!(file.version, SAVE_VERSION);
        assert_eq!(file.progress.money, 12);
        assert_eq!(file.stats.total_clicks, 0);
    }

    #[test]
    fn test_load_rejects_garbage() {
        assert!(load_any_version("not json").is_err());
        assert!(load_any_version("{\"no_version\": true}").is_err());
    }
}
