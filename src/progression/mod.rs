//! Progression domain — level-ups, stage unlocks, and the project board.
//!
//! Level and stage transitions are evaluated as loops: a single large
//! experience injection (offline catch-up, a project payout) can cross
//! several thresholds at once, and each threshold must produce its own
//! event in order.

use bevy::prelude::*;

use crate::shared::*;

pub mod projects;

use projects::{advance_projects, reset_board_on_stage_unlock};

pub struct ProgressionPlugin;

impl Plugin for ProgressionPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                apply_debug_progress,
                // Stage gates read the level set this frame, so keep the
                // two evaluations ordered.
                check_level_ups,
                check_stage_unlocks,
                reset_board_on_stage_unlock,
                advance_projects,
            )
                .chain()
                .run_if(in_state(GameState::Playing)),
        );

        info!("[Progression] ProgressionPlugin registered.");
    }
}

// ═══════════════════════════════════════════════════════════════════════
// SYSTEM: check_level_ups
// ═══════════════════════════════════════════════════════════════════════

/// Promotes the player while their experience covers the next threshold.
///
/// One [`LevelUpEvent`] fires per level crossed. Each level's bonus money
/// is credited through the wallet; levels past the end of the table simply
/// end the loop. Levels never move backwards — spending experience on
/// Skills upgrades delays the next level, it does not demote.
pub fn check_level_ups(
    level_registry: Res<LevelRegistry>,
    mut progress: ResMut<PlayerProgress>,
    mut levelup_writer: EventWriter<LevelUpEvent>,
    mut money_writer: EventWriter<MoneyDeltaEvent>,
    mut notify_writer: EventWriter<NotificationEvent>,
) {
    loop {
        let next = progress.level + 1;
        let Some(required) = level_registry.required_exp(next) else {
            break;
        };
        if progress.experience < required {
            break;
        }

        progress.level = next;
        levelup_writer.send(LevelUpEvent { new_level: next });

        if let Some(def) = level_registry.get(next) {
            if def.bonus_money > 0 {
                money_writer.send(MoneyDeltaEvent {
                    amount: def.bonus_money as i64,
                    reason: format!("level {} bonus", next),
                });
            }
            if let Some(feature) = &def.unlock_feature {
                // The milestone gate re-evaluates every frame; the tag just
                // records which milestone this level vouches for.
                debug!("[Progression] Level {} vouches for '{}'", next, feature);
            }
        }

        notify_writer.send(NotificationEvent {
            title: "Level up!".to_string(),
            message: format!("You reached level {}.", next),
        });
        info!("[Progression] Level up → {}", next);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// SYSTEM: check_stage_unlocks
// ═══════════════════════════════════════════════════════════════════════

/// Advances the studio stage while the player's level covers the next
/// stage's requirement. Requirements past the defined table extrapolate
/// geometrically (see [`StageRegistry::required_level`]), so the loop is
/// bounded by the player's level, not the table length.
pub fn check_stage_unlocks(
    stage_registry: Res<StageRegistry>,
    mut progress: ResMut<PlayerProgress>,
    mut stage_writer: EventWriter<StageUnlockedEvent>,
    mut notify_writer: EventWriter<NotificationEvent>,
) {
    loop {
        let next = progress.stage + 1;
        let Some(required) = stage_registry.required_level(next) else {
            break;
        };
        if progress.level < required {
            break;
        }

        progress.stage = next;
        stage_writer.send(StageUnlockedEvent { stage: next });

        let name = stage_registry
            .get(next)
            .map(|def| def.name.clone())
            .unwrap_or_else(|| format!("Stage {}", next));
        notify_writer.send(NotificationEvent {
            title: "Stage unlocked!".to_string(),
            message: format!("Welcome to {}.", name),
        });
        info!("[Progression] Stage unlocked → {} ({})", next, name);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// SYSTEM: apply_debug_progress
// ═══════════════════════════════════════════════════════════════════════

/// Debug/test entry point: overwrites the core numbers wholesale. Normal
/// evaluation picks up from the injected values on the same frame.
pub fn apply_debug_progress(
    mut events: EventReader<DebugSetProgressEvent>,
    mut progress: ResMut<PlayerProgress>,
) {
    for ev in events.read() {
        warn!(
            "[Progression] Debug override: level {} exp {} money {} stage {}",
            ev.level, ev.experience, ev.money, ev.stage
        );
        progress.level = ev.level.max(1);
        progress.experience = ev.experience;
        progress.money = ev.money;
        progress.stage = ev.stage.max(1);
    }
}
