//! Save/Load system for persisting progression state.
//!
//! This plugin provides:
//! - A primary slot plus a backup slot that receives the previous primary
//!   before every overwrite
//! - Versioned JSON with an explicit migration chain (see `migration`)
//! - Automatic saves on an interval and on pause
//! - Corruption fallback: primary → backup → fresh default state

pub mod migration;

use bevy::prelude::*;
#[cfg(not(target_arch = "wasm32"))]
use std::fs;
#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;

use crate::shared::*;
use migration::{load_any_version, SaveFile, SAVE_VERSION};

/// Timer resource for automatic saves.
#[derive(Resource)]
pub struct AutosaveTimer(pub Timer);

impl Default for AutosaveTimer {
    fn default() -> Self {
        Self(Timer::from_seconds(
            AUTOSAVE_INTERVAL_SECS,
            TimerMode::Repeating,
        ))
    }
}

/// Sub-second remainder of the playtime accumulator.
#[derive(Resource, Default)]
pub struct SessionTimer {
    pub elapsed: std::time::Duration,
}

pub struct SavePlugin;

impl Plugin for SavePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AutosaveTimer>()
            .init_resource::<SessionTimer>()
            .add_systems(
                Update,
                (
                    tick_play_time,
                    tick_autosave,
                    handle_save_request,
                    handle_load_request,
                )
                    .run_if(in_state(GameState::Playing)),
            )
            // The pause menu can also save/load.
            .add_systems(
                Update,
                (handle_save_request, handle_load_request)
                    .run_if(in_state(GameState::Paused)),
            )
            // The host menu starts or resumes a game.
            .add_systems(
                Update,
                (handle_load_request, handle_new_game).run_if(in_state(GameState::MainMenu)),
            )
            // Persist on pause/focus-loss.
            .add_systems(OnEnter(GameState::Paused), request_save_on_pause);

        info!("[Save] SavePlugin registered.");
    }
}

// ═══════════════════════════════════════════════════════════════════════
// FILESYSTEM HELPERS
// ═══════════════════════════════════════════════════════════════════════

#[cfg(not(target_arch = "wasm32"))]
fn saves_directory() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));
    exe_dir.join("saves")
}

#[cfg(not(target_arch = "wasm32"))]
fn primary_path() -> PathBuf {
    saves_directory().join("progress.json")
}

#[cfg(not(target_arch = "wasm32"))]
fn backup_path() -> PathBuf {
    saves_directory().join("progress.backup.json")
}

// ═══════════════════════════════════════════════════════════════════════
// SAVE / LOAD LOGIC
// ═══════════════════════════════════════════════════════════════════════

#[cfg(not(target_arch = "wasm32"))]
fn write_save(file: &SaveFile) -> Result<(), String> {
    let dir = saves_directory();
    fs::create_dir_all(&dir).map_err(|e| format!("Could not create saves directory: {}", e))?;

    let primary = primary_path();

    // Keep the previous good save: the backup slot always holds the
    // primary as it was before this write.
    if primary.exists() {
        if let Err(e) = fs::copy(&primary, backup_path()) {
            warn!("[Save] Could not refresh backup slot: {}", e);
        }
    }

    let json =
        serde_json::to_string_pretty(file).map_err(|e| format!("Serialization failed: {}", e))?;

    // Write to a temp file first, then rename for atomicity.
    let tmp_path = primary.with_extension("json.tmp");
    fs::write(&tmp_path, &json)
        .map_err(|e| format!("Write failed for {}: {}", tmp_path.display(), e))?;
    fs::rename(&tmp_path, &primary).map_err(|e| format!("Rename failed: {}", e))?;

    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn write_save(_file: &SaveFile) -> Result<(), String> {
    Ok(())
}

/// Reads the save, falling back from the primary to the backup slot.
/// `Ok(None)` means no save exists at all — a fresh start, not an error.
#[cfg(not(target_arch = "wasm32"))]
fn read_save() -> Result<Option<SaveFile>, String> {
    let primary = primary_path();
    if !primary.exists() {
        return Ok(None);
    }

    let primary_result = fs::read_to_string(&primary)
        .map_err(|e| format!("Read failed for {}: {}", primary.display(), e))
        .and_then(|json| load_any_version(&json));

    match primary_result {
        Ok(file) => Ok(Some(file)),
        Err(primary_err) => {
            warn!(
                "[Save] Primary slot unreadable ({}) — trying backup",
                primary_err
            );
            let backup = backup_path();
            if !backup.exists() {
                return Err(primary_err);
            }
            let file = fs::read_to_string(&backup)
                .map_err(|e| format!("Read failed for {}: {}", backup.display(), e))
                .and_then(|json| load_any_version(&json))
                .map_err(|backup_err| {
                    format!("primary: {}; backup: {}", primary_err, backup_err)
                })?;
            Ok(Some(file))
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn read_save() -> Result<Option<SaveFile>, String> {
    Err("Saves not available in browser".to_string())
}

// ═══════════════════════════════════════════════════════════════════════
// SYSTEMS
// ═══════════════════════════════════════════════════════════════════════

/// Accumulates playtime while in the Playing state, flushing whole seconds
/// into [`SaveMeta`] so the counter stays cheap to persist.
fn tick_play_time(
    time: Res<Time>,
    mut session: ResMut<SessionTimer>,
    mut meta: ResMut<SaveMeta>,
) {
    session.elapsed += time.delta();
    let whole = session.elapsed.as_secs();
    if whole > 0 {
        meta.play_time_secs = meta.play_time_secs.saturating_add(whole);
        session.elapsed -= std::time::Duration::from_secs(whole);
    }
}

fn tick_autosave(
    time: Res<Time>,
    mut timer: ResMut<AutosaveTimer>,
    mut save_writer: EventWriter<SaveRequestEvent>,
) {
    if timer.0.tick(time.delta()).just_finished() {
        info!("[Save] Autosave triggered");
        save_writer.send(SaveRequestEvent);
    }
}

fn request_save_on_pause(mut save_writer: EventWriter<SaveRequestEvent>) {
    info!("[Save] Pause — persisting progress");
    save_writer.send(SaveRequestEvent);
}

fn handle_save_request(
    mut save_events: EventReader<SaveRequestEvent>,
    mut complete_events: EventWriter<SaveCompleteEvent>,
    mut meta: ResMut<SaveMeta>,
    progress: Res<PlayerProgress>,
    derived: Res<DerivedStats>,
    stats: Res<PlayStats>,
    milestones: Res<Milestones>,
    project_board: Res<ProjectBoard>,
) {
    // Multiple requests in one frame collapse into a single write.
    if save_events.read().count() == 0 {
        return;
    }

    // Bookkeeping advances on save, never on load.
    let now = current_timestamp();
    if meta.first_play_time == 0 {
        meta.first_play_time = now;
    }
    meta.last_save_time = now;
    meta.last_play_time = now;
    meta.save_count = meta.save_count.saturating_add(1);

    let file = SaveFile {
        version: SAVE_VERSION,
        save_count: meta.save_count,
        first_play_time: meta.first_play_time,
        last_save_time: meta.last_save_time,
        play_time_secs: meta.play_time_secs,
        progress: progress.clone(),
        derived: derived.clone(),
        stats: stats.clone(),
        milestones: milestones.clone(),
        project_board: project_board.clone(),
    };

    match write_save(&file) {
        Ok(()) => {
            info!("[Save] Save #{} written.", meta.save_count);
            complete_events.send(SaveCompleteEvent {
                success: true,
                error_message: None,
            });
        }
        Err(e) => {
            // The in-memory state stays valid and playable.
            warn!("[Save] Save FAILED: {}", e);
            complete_events.send(SaveCompleteEvent {
                success: false,
                error_message: Some(e),
            });
        }
    }
}

fn handle_load_request(
    mut load_events: EventReader<LoadRequestEvent>,
    mut complete_events: EventWriter<LoadCompleteEvent>,
    mut meta: ResMut<SaveMeta>,
    mut progress: ResMut<PlayerProgress>,
    mut derived: ResMut<DerivedStats>,
    mut stats: ResMut<PlayStats>,
    mut milestones: ResMut<Milestones>,
    mut project_board: ResMut<ProjectBoard>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if load_events.read().count() == 0 {
        return;
    }

    info!("[Save] Loading…");
    match read_save() {
        Ok(Some(file)) => {
            *progress = file.progress;
            *derived = file.derived;
            *stats = file.stats;
            *milestones = file.milestones;
            *project_board = file.project_board;
            meta.save_count = file.save_count;
            meta.first_play_time = file.first_play_time;
            meta.last_save_time = file.last_save_time;
            meta.play_time_secs = file.play_time_secs;

            info!(
                "[Save] Loaded save #{} (level {}, stage {}).",
                file.save_count, progress.level, progress.stage
            );
            next_state.set(GameState::Playing);
            complete_events.send(LoadCompleteEvent {
                success: true,
                error_message: None,
            });
        }
        Ok(None) => {
            // First run: fresh state, still a successful load.
            info!("[Save] No save found — starting fresh.");
            reset_to_defaults(
                &mut meta,
                &mut progress,
                &mut derived,
                &mut stats,
                &mut milestones,
                &mut project_board,
            );
            next_state.set(GameState::Playing);
            complete_events.send(LoadCompleteEvent {
                success: true,
                error_message: None,
            });
        }
        Err(e) => {
            // Both slots corrupt: the run is lost, the game is not.
            warn!("[Save] Load FAILED ({}) — starting fresh.", e);
            reset_to_defaults(
                &mut meta,
                &mut progress,
                &mut derived,
                &mut stats,
                &mut milestones,
                &mut project_board,
            );
            next_state.set(GameState::Playing);
            complete_events.send(LoadCompleteEvent {
                success: true,
                error_message: Some(e),
            });
        }
    }
}

fn handle_new_game(
    mut new_game_events: EventReader<NewGameEvent>,
    mut meta: ResMut<SaveMeta>,
    mut progress: ResMut<PlayerProgress>,
    mut derived: ResMut<DerivedStats>,
    mut stats: ResMut<PlayStats>,
    mut milestones: ResMut<Milestones>,
    mut project_board: ResMut<ProjectBoard>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if new_game_events.read().count() == 0 {
        return;
    }

    info!("[Save] Starting new game");
    reset_to_defaults(
        &mut meta,
        &mut progress,
        &mut derived,
        &mut stats,
        &mut milestones,
        &mut project_board,
    );
    meta.first_play_time = current_timestamp();
    next_state.set(GameState::Playing);
    info!("[Save] New game initialized.");
}

/// Replaces the whole progression state — the only sanctioned "reset".
fn reset_to_defaults(
    meta: &mut SaveMeta,
    progress: &mut PlayerProgress,
    derived: &mut DerivedStats,
    stats: &mut PlayStats,
    milestones: &mut Milestones,
    project_board: &mut ProjectBoard,
) {
    *meta = SaveMeta::default();
    *progress = PlayerProgress::default();
    *derived = DerivedStats::default();
    *stats = PlayStats::default();
    *milestones = Milestones::default();
    *project_board = ProjectBoard::default();
}
