//! The project board — surfaces stage projects once the player has the
//! experience for them, runs a completion timer, and pays the reward.
//!
//! The board's growing requirement is the single source of truth for
//! "what does the next project take": the offline calculator replays the
//! same numbers, so online and offline completions can never disagree.

use bevy::prelude::*;

use crate::shared::*;

/// Picks the project definition the board is currently cycling on.
/// Earlier completions walk through the stage's list; once exhausted the
/// last (biggest) project repeats with the grown requirement.
pub fn current_project<'a>(
    registry: &'a ProjectRegistry,
    stage: u32,
    completions: u32,
) -> Option<&'a ProjectDef> {
    let defs = registry.by_stage(stage);
    if defs.is_empty() {
        return None;
    }
    let index = (completions as usize).min(defs.len() - 1);
    Some(defs[index])
}

/// Seeds/starts/ticks the active project.
pub fn advance_projects(
    time: Res<Time>,
    registry: Res<ProjectRegistry>,
    progress: Res<PlayerProgress>,
    mut board: ResMut<ProjectBoard>,
    mut money_writer: EventWriter<MoneyDeltaEvent>,
    mut complete_writer: EventWriter<ProjectCompletedEvent>,
    mut notify_writer: EventWriter<NotificationEvent>,
) {
    // ── Tick the active project ────────────────────────────────────────
    if let Some(active) = board.active.as_mut() {
        active.remaining_secs -= time.delta().as_secs_f32();
        if active.remaining_secs > 0.0 {
            return;
        }
        let project_id = active.project_id.clone();
        board.active = None;

        let Some(def) = registry.get(&project_id) else {
            warn!(
                "[Progression] Completed project '{}' no longer in tables — no reward",
                project_id
            );
            return;
        };

        money_writer.send(MoneyDeltaEvent {
            amount: def.base_reward as i64,
            reason: format!("project '{}'", def.id),
        });
        complete_writer.send(ProjectCompletedEvent {
            project_id: def.id.clone(),
            reward: def.base_reward,
        });
        notify_writer.send(NotificationEvent {
            title: "Project shipped!".to_string(),
            message: format!("{} paid out {}.", def.name, def.base_reward),
        });

        board.completions_this_stage += 1;
        board.requirement *= PROJECT_REQUIREMENT_GROWTH;
        info!(
            "[Progression] Project '{}' complete (+{}). Next requirement: {:.0} exp",
            def.id, def.base_reward, board.requirement
        );
        return;
    }

    // ── Start the next one once the experience requirement is met ──────
    let Some(def) = current_project(&registry, progress.stage, board.completions_this_stage)
    else {
        return;
    };

    // The requirement never drops below the definition's own floor.
    let floor = def.required_exp as f64;
    if board.requirement < floor {
        board.requirement = floor;
    }

    if (progress.experience as f64) < board.requirement {
        return;
    }

    board.active = Some(ActiveProject {
        project_id: def.id.clone(),
        remaining_secs: def.completion_secs,
    });
    info!(
        "[Progression] Project '{}' started ({}s to ship)",
        def.id, def.completion_secs
    );
}

/// A new stage means a new project lineup: clear the board and let the
/// next `advance_projects` pass reseed the requirement.
pub fn reset_board_on_stage_unlock(
    mut events: EventReader<StageUnlockedEvent>,
    mut board: ResMut<ProjectBoard>,
) {
    for ev in events.read() {
        *board = ProjectBoard::default();
        debug!("[Progression] Project board reset for stage {}", ev.stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ProjectRegistry {
        let mut registry = ProjectRegistry::default();
        for (id, stage, required_exp, reward) in [
            ("small", 1, 150u64, 120u64),
            ("large", 1, 500, 400),
            ("next_stage", 2, 1200, 900),
        ] {
            registry.projects.insert(
                id.to_string(),
                ProjectDef {
                    id: id.to_string(),
                    name: id.to_string(),
                    stage,
                    required_exp,
                    base_reward: reward,
                    completion_secs: 30.0,
                },
            );
        }
        registry
    }

    #[test]
    fn test_current_project_walks_then_repeats() {
        let registry = registry();
        assert_eq!(current_project(&registry, 1, 0).unwrap().id, "small");
        assert_eq!(current_project(&registry, 1, 1).unwrap().id, "large");
        // Exhausted: the biggest project repeats.
        assert_eq!(current_project(&registry, 1, 7).unwrap().id, "large");
    }

    #[test]
    fn test_current_project_filters_by_stage() {
        let registry = registry();
        assert_eq!(current_project(&registry, 2, 0).unwrap().id, "next_stage");
        assert!(current_project(&registry, 3, 0).is_none());
    }
}
