//! Offline progression — catch-up earnings for real time spent away.
//!
//! The calculation is a pure function over the elapsed gap, the derived
//! auto rates, and the project board; the single system applies the report
//! right after a successful load. Offline income runs at
//! [`OFFLINE_EFFICIENCY`] of the live rate — away time helps, it does not
//! replace playing.

use bevy::prelude::*;

use crate::shared::*;

/// Snapshot of the project the board would run next: its requirement and
/// what one completion pays.
#[derive(Debug, Clone, Copy)]
pub struct OfflineProjectInput {
    pub requirement: f64,
    pub reward: u64,
}

pub struct OfflinePlugin;

impl Plugin for OfflinePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            apply_offline_progress.run_if(in_state(GameState::Playing)),
        );

        info!("[Offline] OfflinePlugin registered.");
    }
}

// ═══════════════════════════════════════════════════════════════════════
// CALCULATION
// ═══════════════════════════════════════════════════════════════════════

/// Computes the catch-up report for a raw elapsed gap in seconds.
///
/// Gaps below [`OFFLINE_MIN_SECS`] return the zero report (no UI popup for
/// trivial absences); gaps above [`OFFLINE_CAP_SECS`] are treated exactly
/// like the cap. Money accrues only when money generation is unlocked.
///
/// Project completions are estimated by draining the offline experience
/// pool against the board's current requirement, growing the requirement
/// by [`PROJECT_REQUIREMENT_GROWTH`] per completion — the pool is fixed
/// and the requirement strictly grows, so the loop always terminates.
pub fn calculate_offline(
    elapsed_raw_secs: u64,
    derived: &DerivedStats,
    money_unlocked: bool,
    project: Option<OfflineProjectInput>,
) -> OfflineReport {
    if elapsed_raw_secs < OFFLINE_MIN_SECS {
        return OfflineReport::default();
    }
    let elapsed = elapsed_raw_secs.min(OFFLINE_CAP_SECS);
    let scaled_secs = elapsed as f64 * OFFLINE_EFFICIENCY;

    let exp_earned = (derived.auto_exp * scaled_secs).floor() as u64;
    let money_earned = if money_unlocked {
        (derived.auto_money * scaled_secs).floor() as u64
    } else {
        0
    };

    let mut projects_completed = 0u32;
    let mut project_rewards = 0u64;
    if let Some(project) = project {
        let mut pool = exp_earned as f64;
        let mut requirement = project.requirement;
        while requirement > 0.0 && pool >= requirement {
            projects_completed += 1;
            project_rewards = project_rewards.saturating_add(project.reward);
            pool -= requirement;
            requirement *= PROJECT_REQUIREMENT_GROWTH;
        }
    }

    OfflineReport {
        elapsed_secs: elapsed,
        money_earned,
        exp_earned,
        projects_completed,
        project_rewards,
    }
}

// ═══════════════════════════════════════════════════════════════════════
// SYSTEM: apply_offline_progress
// ═══════════════════════════════════════════════════════════════════════

/// Applies the offline report once per successful load.
///
/// All deltas flow in a single pass; the level-up, stage and milestone
/// loops batch-catch-up on the frames that follow.
pub fn apply_offline_progress(
    mut load_events: EventReader<LoadCompleteEvent>,
    meta: Res<SaveMeta>,
    derived: Res<DerivedStats>,
    milestones: Res<Milestones>,
    registry: Res<ProjectRegistry>,
    progress: Res<PlayerProgress>,
    mut board: ResMut<ProjectBoard>,
    mut stats: ResMut<PlayStats>,
    mut money_writer: EventWriter<MoneyDeltaEvent>,
    mut exp_writer: EventWriter<ExpDeltaEvent>,
    mut offline_writer: EventWriter<OfflineProgressEvent>,
    mut notify_writer: EventWriter<NotificationEvent>,
) {
    for ev in load_events.read() {
        if !ev.success {
            continue;
        }
        // A fresh state has no saved timestamp — nothing to catch up.
        if meta.last_save_time == 0 {
            continue;
        }

        let now = current_timestamp();
        let elapsed = now.saturating_sub(meta.last_save_time);

        let project = crate::progression::projects::current_project(
            &registry,
            progress.stage,
            board.completions_this_stage,
        )
        .map(|def| OfflineProjectInput {
            requirement: board.requirement.max(def.required_exp as f64),
            reward: def.base_reward,
        });

        let report = calculate_offline(
            elapsed,
            &derived,
            milestones.is_unlocked(MONEY_GENERATION_MILESTONE),
            project,
        );

        if report.is_empty() {
            debug!("[Offline] Gap of {}s below threshold — no catch-up", elapsed);
            continue;
        }

        if report.exp_earned > 0 {
            exp_writer.send(ExpDeltaEvent {
                amount: report.exp_earned as i64,
                reason: "offline progress".to_string(),
            });
        }
        let money_total = report.money_earned.saturating_add(report.project_rewards);
        if money_total > 0 {
            money_writer.send(MoneyDeltaEvent {
                amount: money_total as i64,
                reason: "offline progress".to_string(),
            });
        }
        if report.projects_completed > 0 {
            stats.total_projects_completed = stats
                .total_projects_completed
                .saturating_add(report.projects_completed as u64);
            board.completions_this_stage += report.projects_completed;
            board.requirement = board.requirement.max(1.0)
                * PROJECT_REQUIREMENT_GROWTH.powi(report.projects_completed as i32);
        }

        info!(
            "[Offline] {}s away: +{} exp, +{} money, {} projects shipped",
            report.elapsed_secs, report.exp_earned, money_total, report.projects_completed
        );
        notify_writer.send(NotificationEvent {
            title: "Welcome back!".to_string(),
            message: format!(
                "While you were away: +{} exp, +{} money, {} projects shipped.",
                report.exp_earned, money_total, report.projects_completed
            ),
        });
        offline_writer.send(OfflineProgressEvent { report });
    }
}
