//! Milestone system for Devclicker.
//!
//! Defines the feature milestones, checks conditions every frame during
//! Playing state, and fires `FeatureUnlockedEvent` when a new milestone is
//! earned. The unlocked set is append-only for the life of a save and
//! re-checking an unlocked milestone is a no-op, so evaluation is safe to
//! run as often as we like — including at session start, which catches
//! saves that predate a newly added milestone.

use bevy::prelude::*;

use crate::shared::*;

// ═══════════════════════════════════════════════════════════════════════
// MILESTONE DEFINITIONS
// ═══════════════════════════════════════════════════════════════════════

/// Static description of a single milestone.
pub struct MilestoneDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Coarse category for `is_kind_unlocked` queries.
    pub kind: &'static str,
    pub required_level: u32,
    pub required_stage: u32,
    pub prerequisites: &'static [&'static str],
}

/// All milestones defined statically. `money_generation` is load-bearing:
/// every money income path checks it.
pub const MILESTONES: &[MilestoneDef] = &[
    MilestoneDef {
        id: "project_contracts",
        name: "Project Contracts",
        description: "Clients start offering real work.",
        kind: "projects",
        required_level: 3,
        required_stage: 1,
        prerequisites: &[],
    },
    MilestoneDef {
        id: "money_generation",
        name: "Monetization",
        description: "Your code starts paying the bills.",
        kind: "economy",
        required_level: 10,
        required_stage: 1,
        prerequisites: &[],
    },
    MilestoneDef {
        id: "team_hiring",
        name: "First Hire",
        description: "You can bring other people on board.",
        kind: "team",
        required_level: 1,
        required_stage: 2,
        prerequisites: &[],
    },
    MilestoneDef {
        id: "studio_founding",
        name: "Studio Founding",
        description: "A name on the door and everything.",
        kind: "studio",
        required_level: 1,
        required_stage: 3,
        prerequisites: &["team_hiring"],
    },
    MilestoneDef {
        id: "publisher_deal",
        name: "Publisher Deal",
        description: "Someone else's money, your game.",
        kind: "studio",
        required_level: 1,
        required_stage: 4,
        prerequisites: &["studio_founding", "money_generation"],
    },
    MilestoneDef {
        id: "industry_award",
        name: "Industry Award",
        description: "A shiny thing for the lobby shelf.",
        kind: "prestige",
        required_level: 30,
        required_stage: 5,
        prerequisites: &["publisher_deal"],
    },
];

pub fn milestone_def(id: &str) -> Option<&'static MilestoneDef> {
    MILESTONES.iter().find(|def| def.id == id)
}

// ═══════════════════════════════════════════════════════════════════════
// QUERIES
// ═══════════════════════════════════════════════════════════════════════

/// True if any unlocked milestone carries the given kind tag.
pub fn is_kind_unlocked(milestones: &Milestones, kind: &str) -> bool {
    milestones
        .unlocked
        .iter()
        .filter_map(|id| milestone_def(id))
        .any(|def| def.kind == kind)
}

/// Milestones the player is close to: within [`MILESTONE_SOON_LEVELS`]
/// levels or [`MILESTONE_SOON_STAGES`] stages, with prerequisites already
/// met. For "coming soon" hints in the host UI.
pub fn pending_soon(
    milestones: &Milestones,
    level: u32,
    stage: u32,
) -> Vec<&'static MilestoneDef> {
    MILESTONES
        .iter()
        .filter(|def| !milestones.is_unlocked(def.id))
        .filter(|def| {
            def.prerequisites
                .iter()
                .all(|prereq| milestones.is_unlocked(prereq))
        })
        .filter(|def| {
            let level_close = def.required_level <= level + MILESTONE_SOON_LEVELS;
            let stage_close = def.required_stage <= stage + MILESTONE_SOON_STAGES;
            level_close && stage_close
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════
// SYSTEM: check_milestones
// ═══════════════════════════════════════════════════════════════════════

/// Evaluates the full condition — level, stage, prerequisites — for each
/// milestone not yet unlocked, and fires the unlock atomically: append to
/// the set, emit the feature event, notify the player.
pub fn check_milestones(
    progress: Res<PlayerProgress>,
    mut milestones: ResMut<Milestones>,
    mut feature_writer: EventWriter<FeatureUnlockedEvent>,
    mut notify_writer: EventWriter<NotificationEvent>,
) {
    let mut newly_unlocked: Vec<&'static MilestoneDef> = Vec::new();

    for def in MILESTONES {
        if milestones.is_unlocked(def.id) {
            continue;
        }
        let conditions_met = progress.level >= def.required_level
            && progress.stage >= def.required_stage
            && def
                .prerequisites
                .iter()
                .all(|prereq| milestones.is_unlocked(prereq));
        if conditions_met {
            newly_unlocked.push(def);
        }
    }

    for def in newly_unlocked {
        milestones.unlocked.push(def.id.to_string());

        feature_writer.send(FeatureUnlockedEvent {
            feature_id: def.id.to_string(),
        });
        notify_writer.send(NotificationEvent {
            title: format!("Unlocked: {}", def.name),
            message: def.description.to_string(),
        });

        info!("[Unlocks] Milestone unlocked: \"{}\" — {}", def.name, def.description);
    }
}

pub struct UnlockPlugin;

impl Plugin for UnlockPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            check_milestones.run_if(in_state(GameState::Playing)),
        )
        // Session start: a loaded save may already satisfy milestones that
        // were added after it was written.
        .add_systems(OnEnter(GameState::Playing), check_milestones);

        info!("[Unlocks] UnlockPlugin registered.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_milestone_table_ids_are_unique() {
        for (i, a) in MILESTONES.iter().enumerate() {
            for b in &MILESTONES[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }

    #[test]
    fn test_prerequisites_reference_defined_milestones() {
        for def in MILESTONES {
            for prereq in def.prerequisites {
                assert!(
                    milestone_def(prereq).is_some(),
                    "milestone '{}' references unknown prerequisite '{}'",
                    def.id,
                    prereq
                );
            }
        }
    }

    #[test]
    fn test_is_kind_unlocked() {
        let mut milestones = Milestones::default();
        assert!(!is_kind_unlocked(&milestones, "economy"));
        milestones.unlocked.push("money_generation".to_string());
        assert!(is_kind_unlocked(&milestones, "economy"));
        assert!(!is_kind_unlocked(&milestones, "team"));
    }

    #[test]
    fn test_pending_soon_window() {
        let milestones = Milestones::default();
        // Level 6, stage 1: money_generation (level 10) is within 5 levels.
        let soon = pending_soon(&milestones, 6, 1);
        assert!(soon.iter().any(|def| def.id == "money_generation"));
        // Level 1, stage 1: it is not.
        let soon = pending_soon(&milestones, 1, 1);
        assert!(!soon.iter().any(|def| def.id == "money_generation"));
    }

    #[test]
    fn test_pending_soon_respects_prerequisites() {
        let mut milestones = Milestones::default();
        // studio_founding needs stage 3 and the team_hiring prerequisite.
        let soon = pending_soon(&milestones, 50, 2);
        assert!(!soon.iter().any(|def| def.id == "studio_founding"));

        milestones.unlocked.push("team_hiring".to_string());
        let soon = pending_soon(&milestones, 50, 2);
        assert!(soon.iter().any(|def| def.id == "studio_founding"));
    }
}
