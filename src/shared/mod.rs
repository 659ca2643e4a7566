//! Shared resources, events, and balance-definition types for Devclicker.
//!
//! This is the type contract. Every domain plugin imports from here.
//! No domain imports from any other domain directly.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ═══════════════════════════════════════════════════════════════════════
// GAME STATE — top-level state machine
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, States, Default)]
pub enum GameState {
    #[default]
    Loading,
    MainMenu,
    Playing,
    Paused,
}

// ═══════════════════════════════════════════════════════════════════════
// BALANCE DEFINITIONS — loaded from assets/balance/*.ron
// ═══════════════════════════════════════════════════════════════════════

/// Unique identifier for every upgrade in the balance tables.
/// Using string IDs for data-driven flexibility.
pub type UpgradeId = String;

pub type ProjectId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeCategory {
    Skills,
    Equipment,
    Team,
}

/// Which balance the upgrade's price is paid from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurrencyKind {
    Money,
    Experience,
}

/// Typed effect classification.
///
/// The tag itself decides how an effect stacks: multiplier kinds compound
/// multiplicatively across upgrades, everything else sums. Effect types the
/// formula engine has no handler for parse into `Unknown` and are carried
/// along as a logged no-op, so new balance rows never break old builds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    ExpPerClick,
    MoneyPerClick,
    AutoExp,
    AutoMoney,
    ExpMultiplier,
    MoneyMultiplier,
    AllMultiplier,
    Unknown(String),
}

impl EffectKind {
    /// Parses the `effect` column of the upgrades table.
    pub fn parse(tag: &str) -> EffectKind {
        match tag {
            "exp_per_click" => EffectKind::ExpPerClick,
            "money_per_click" => EffectKind::MoneyPerClick,
            "auto_exp" => EffectKind::AutoExp,
            "auto_money" => EffectKind::AutoMoney,
            "exp_multiplier" => EffectKind::ExpMultiplier,
            "money_multiplier" => EffectKind::MoneyMultiplier,
            "all_multiplier" => EffectKind::AllMultiplier,
            other => EffectKind::Unknown(other.to_string()),
        }
    }

    /// Multiplier kinds fold as `acc *= 1 + value`; additive kinds sum.
    pub fn is_multiplier(&self) -> bool {
        matches!(
            self,
            EffectKind::ExpMultiplier | EffectKind::MoneyMultiplier | EffectKind::AllMultiplier
        )
    }
}

/// One numeric contribution an upgrade makes to a derived player stat.
/// Magnitude scales linearly with the purchased level: `base_value * level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectDef {
    pub kind: EffectKind,
    pub base_value: f64,
}

/// Gate that must be satisfied before an upgrade can be purchased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UnlockRequirement {
    #[default]
    None,
    Level(u32),
    Stage(u32),
}

impl UnlockRequirement {
    /// Parses the `unlock` column: `"none"`, `"level_12"`, `"stage_3"`.
    /// Malformed values gate nothing rather than poisoning the row.
    pub fn parse(tag: &str) -> UnlockRequirement {
        if tag.is_empty() || tag == "none" {
            return UnlockRequirement::None;
        }
        if let Some(n) = tag.strip_prefix("level_").and_then(|n| n.parse().ok()) {
            return UnlockRequirement::Level(n);
        }
        if let Some(n) = tag.strip_prefix("stage_").and_then(|n| n.parse().ok()) {
            return UnlockRequirement::Stage(n);
        }
        UnlockRequirement::None
    }

    pub fn is_satisfied(&self, level: u32, stage: u32) -> bool {
        match self {
            UnlockRequirement::None => true,
            UnlockRequirement::Level(required) => level >= *required,
            UnlockRequirement::Stage(required) => stage >= *required,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeDef {
    pub id: UpgradeId,
    pub category: UpgradeCategory,
    pub name: String,
    pub description: String,
    pub currency: CurrencyKind,
    pub base_price: f64,
    /// Price grows geometrically per owned level. Values ≤ 0 mean the price
    /// stays constant at `base_price` (defined behavior, not an error).
    pub price_growth: f64,
    /// ≤ 0 = unbounded.
    pub max_level: i32,
    pub unlock: UnlockRequirement,
    pub effects: Vec<EffectDef>,
}

impl UpgradeDef {
    pub fn is_max_level(&self, owned: u32) -> bool {
        self.max_level > 0 && owned >= self.max_level as u32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelDef {
    pub level: u32,
    /// Cumulative experience required to *reach* this level.
    /// Strictly increasing across the table.
    pub required_exp: u64,
    /// Multiplier applied to all money income while at (or past) this level.
    pub money_multiplier: f64,
    /// One-shot money credit granted on reaching this level.
    pub bonus_money: u64,
    /// Milestone id this level vouches for (checked by the unlock gate).
    pub unlock_feature: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDef {
    pub id: ProjectId,
    pub name: String,
    pub stage: u32,
    /// Experience the player must have accumulated before the project
    /// appears on the board.
    pub required_exp: u64,
    pub base_reward: u64,
    pub completion_secs: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDef {
    pub stage: u32,
    pub name: String,
    pub required_level: u32,
}

// ═══════════════════════════════════════════════════════════════════════
// REGISTRIES — populated by the data plugin
// ═══════════════════════════════════════════════════════════════════════

#[derive(Resource, Debug, Clone, Default)]
pub struct UpgradeRegistry {
    pub upgrades: HashMap<UpgradeId, UpgradeDef>,
}

impl UpgradeRegistry {
    pub fn get(&self, id: &str) -> Option<&UpgradeDef> {
        self.upgrades.get(id)
    }

    /// Category listing, sorted by base price so the UI gets a stable order.
    pub fn by_category(&self, category: UpgradeCategory) -> Vec<&UpgradeDef> {
        let mut list: Vec<&UpgradeDef> = self
            .upgrades
            .values()
            .filter(|u| u.category == category)
            .collect();
        list.sort_by(|a, b| a.base_price.total_cmp(&b.base_price));
        list
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct LevelRegistry {
    pub levels: HashMap<u32, LevelDef>,
}

impl LevelRegistry {
    pub fn get(&self, level: u32) -> Option<&LevelDef> {
        self.levels.get(&level)
    }

    /// Cumulative experience required to reach `level`, or `None` past the
    /// end of the table (levelling stops there).
    pub fn required_exp(&self, level: u32) -> Option<u64> {
        self.levels.get(&level).map(|def| def.required_exp)
    }

    /// Money multiplier granted by the highest defined level ≤ `level`.
    pub fn money_multiplier(&self, level: u32) -> f64 {
        (1..=level)
            .rev()
            .find_map(|l| self.levels.get(&l))
            .map(|def| def.money_multiplier)
            .unwrap_or(1.0)
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct ProjectRegistry {
    pub projects: HashMap<ProjectId, ProjectDef>,
}

impl ProjectRegistry {
    pub fn get(&self, id: &str) -> Option<&ProjectDef> {
        self.projects.get(id)
    }

    /// Projects belonging to a stage, cheapest requirement first.
    pub fn by_stage(&self, stage: u32) -> Vec<&ProjectDef> {
        let mut list: Vec<&ProjectDef> = self
            .projects
            .values()
            .filter(|p| p.stage == stage)
            .collect();
        list.sort_by_key(|p| p.required_exp);
        list
    }
}

/// Growth factor used to extrapolate stage requirements past the table.
pub const STAGE_EXTRAPOLATION_GROWTH: f64 = 1.25;

#[derive(Resource, Debug, Clone, Default)]
pub struct StageRegistry {
    pub stages: HashMap<u32, StageDef>,
}

impl StageRegistry {
    pub fn get(&self, stage: u32) -> Option<&StageDef> {
        self.stages.get(&stage)
    }

    /// Player level required to unlock `stage`.
    ///
    /// Beyond the defined table the requirement extrapolates geometrically
    /// from the last defined stage, so progression never dead-ends on data.
    /// Returns `None` only when the table is empty (degraded mode).
    pub fn required_level(&self, stage: u32) -> Option<u32> {
        if let Some(def) = self.stages.get(&stage) {
            return Some(def.required_level);
        }
        let last = self.stages.values().max_by_key(|s| s.stage)?;
        if stage <= last.stage {
            // A hole inside the table: treat like the nearest stage below.
            return (1..stage)
                .rev()
                .find_map(|s| self.stages.get(&s))
                .map(|def| def.required_level);
        }
        let steps = (stage - last.stage) as i32;
        let extrapolated = (last.required_level as f64) * STAGE_EXTRAPOLATION_GROWTH.powi(steps);
        Some(extrapolated.ceil() as u32)
    }
}

/// Per-table load status. The engine keeps running with empty registries
/// when a table fails to parse; callers read this to decide how loud to be.
#[derive(Resource, Debug, Clone, Default)]
pub struct BalanceDataStatus {
    pub upgrades_loaded: bool,
    pub levels_loaded: bool,
    pub projects_loaded: bool,
    pub stages_loaded: bool,
}

impl BalanceDataStatus {
    pub fn fully_loaded(&self) -> bool {
        self.upgrades_loaded && self.levels_loaded && self.projects_loaded && self.stages_loaded
    }

    pub fn degraded(&self) -> bool {
        !self.fully_loaded()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// PLAYER PROGRESS — the persistence root
// ═══════════════════════════════════════════════════════════════════════

/// Mutable progression state. Mutated only by the economy, progression and
/// offline plugins; everything else observes it through change events.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProgress {
    pub money: u64,
    pub experience: u64,
    pub level: u32,
    pub stage: u32,
    /// upgrade id → purchased level (absent = 0).
    pub upgrade_levels: HashMap<UpgradeId, u32>,
}

impl Default for PlayerProgress {
    fn default() -> Self {
        Self {
            money: 0,
            experience: 0,
            level: 1,
            stage: 1,
            upgrade_levels: HashMap::new(),
        }
    }
}

impl PlayerProgress {
    pub fn upgrade_level(&self, id: &str) -> u32 {
        self.upgrade_levels.get(id).copied().unwrap_or(0)
    }
}

/// Click values, auto-income rates and the multiplier stack, all derived
/// from purchased upgrades plus the level table. Recomputed after every
/// purchase/level change; persisted so the v1→v2 migration has a target.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedStats {
    pub money_per_click: f64,
    pub exp_per_click: f64,
    pub auto_money: f64,
    pub auto_exp: f64,
    pub money_multiplier: f64,
    pub exp_multiplier: f64,
    pub all_multiplier: f64,
}

impl Default for DerivedStats {
    fn default() -> Self {
        Self {
            money_per_click: 0.0,
            exp_per_click: BASE_EXP_PER_CLICK,
            auto_money: 0.0,
            auto_exp: 0.0,
            money_multiplier: 1.0,
            exp_multiplier: 1.0,
            all_multiplier: 1.0,
        }
    }
}

/// Lifetime statistics. Persisted in the save file.
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayStats {
    pub total_clicks: u64,
    pub total_money_earned: u64,
    pub total_experience_earned: u64,
    pub total_upgrades_purchased: u64,
    pub total_projects_completed: u64,
}

/// Save bookkeeping (unix seconds). `save_count` and `last_save_time` are
/// advanced by the save path, never by loads; `play_time_secs` accumulates
/// while the game is in the Playing state.
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveMeta {
    pub first_play_time: u64,
    pub last_save_time: u64,
    pub last_play_time: u64,
    pub save_count: u64,
    pub play_time_secs: u64,
}

/// Append-only set of unlocked milestone ids.
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Milestones {
    pub unlocked: Vec<String>,
}

impl Milestones {
    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked.iter().any(|u| u == id)
    }
}

/// The project currently being worked plus the stage's growing requirement.
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectBoard {
    pub active: Option<ActiveProject>,
    /// Experience required before the *next* project becomes available.
    /// Seeded from the project definition, grown on every completion.
    pub requirement: f64,
    /// Completions within the current stage (drives requirement growth).
    pub completions_this_stage: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveProject {
    pub project_id: ProjectId,
    pub remaining_secs: f32,
}

// ═══════════════════════════════════════════════════════════════════════
// OFFLINE REPORT
// ═══════════════════════════════════════════════════════════════════════

/// Outcome of an offline catch-up computation. A gap below the minimum
/// threshold yields the all-zero report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfflineReport {
    pub elapsed_secs: u64,
    pub money_earned: u64,
    pub exp_earned: u64,
    pub projects_completed: u32,
    pub project_rewards: u64,
}

impl OfflineReport {
    pub fn is_empty(&self) -> bool {
        self.elapsed_secs == 0
            && self.money_earned == 0
            && self.exp_earned == 0
            && self.projects_completed == 0
    }
}

// ═══════════════════════════════════════════════════════════════════════
// EVENTS — cross-domain communication
// ═══════════════════════════════════════════════════════════════════════

/// One player click. The host sends this; the economy resolves the gains.
#[derive(Event, Debug, Clone)]
pub struct ClickEvent;

/// Purchase request from the host UI.
#[derive(Event, Debug, Clone)]
pub struct PurchaseRequestEvent {
    pub upgrade_id: UpgradeId,
}

/// Internal: credit/debit money. Applied centrally by the wallet system.
#[derive(Event, Debug, Clone)]
pub struct MoneyDeltaEvent {
    pub amount: i64, // positive = gain, negative = spend
    pub reason: String,
}

/// Internal: credit/debit experience.
#[derive(Event, Debug, Clone)]
pub struct ExpDeltaEvent {
    pub amount: i64,
    pub reason: String,
}

/// New money total, for the host HUD.
#[derive(Event, Debug, Clone)]
pub struct MoneyChangedEvent {
    pub total: u64,
}

/// New experience total.
#[derive(Event, Debug, Clone)]
pub struct ExperienceChangedEvent {
    pub total: u64,
}

#[derive(Event, Debug, Clone)]
pub struct ClickValuesChangedEvent {
    pub money_per_click: f64,
    pub exp_per_click: f64,
}

#[derive(Event, Debug, Clone)]
pub struct AutoIncomeChangedEvent {
    pub auto_money: f64,
    pub auto_exp: f64,
}

#[derive(Event, Debug, Clone)]
pub struct LevelUpEvent {
    pub new_level: u32,
}

#[derive(Event, Debug, Clone)]
pub struct StageUnlockedEvent {
    pub stage: u32,
}

#[derive(Event, Debug, Clone)]
pub struct FeatureUnlockedEvent {
    pub feature_id: String,
}

#[derive(Event, Debug, Clone)]
pub struct UpgradePurchasedEvent {
    pub upgrade_id: UpgradeId,
    pub new_level: u32,
    pub price_paid: u64,
}

#[derive(Event, Debug, Clone)]
pub struct ProjectCompletedEvent {
    pub project_id: ProjectId,
    pub reward: u64,
}

#[derive(Event, Debug, Clone)]
pub struct OfflineProgressEvent {
    pub report: OfflineReport,
}

/// Toast-style notification for milestone/achievement popups.
#[derive(Event, Debug, Clone)]
pub struct NotificationEvent {
    pub title: String,
    pub message: String,
}

/// Emitted once per balance table that failed to parse (degraded mode).
#[derive(Event, Debug, Clone)]
pub struct BalanceDataErrorEvent {
    pub table: String,
    pub error: String,
}

/// Sent by the host to trigger a manual save.
#[derive(Event, Debug, Clone)]
pub struct SaveRequestEvent;

/// Sent by the host to load the saved game.
#[derive(Event, Debug, Clone)]
pub struct LoadRequestEvent;

/// Sent after a save completes (success or failure).
#[derive(Event, Debug, Clone)]
pub struct SaveCompleteEvent {
    pub success: bool,
    pub error_message: Option<String>,
}

/// Sent after a load completes.
#[derive(Event, Debug, Clone)]
pub struct LoadCompleteEvent {
    pub success: bool,
    pub error_message: Option<String>,
}

/// Sent to initialize a new game (clears all state to defaults).
#[derive(Event, Debug, Clone)]
pub struct NewGameEvent;

/// Debug/test entry point: overwrite the core progression numbers.
/// Normal evaluation (level-ups, stages, milestones) resumes afterwards.
#[derive(Event, Debug, Clone)]
pub struct DebugSetProgressEvent {
    pub level: u32,
    pub experience: u64,
    pub money: u64,
    pub stage: u32,
}

// ═══════════════════════════════════════════════════════════════════════
// TIME
// ═══════════════════════════════════════════════════════════════════════

/// Wall-clock seconds since the unix epoch. Both the save layer and the
/// offline calculator measure real time with this.
#[cfg(not(target_arch = "wasm32"))]
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(target_arch = "wasm32")]
pub fn current_timestamp() -> u64 {
    0
}

// ═══════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════

/// Base experience gained per click before any upgrade effects.
pub const BASE_EXP_PER_CLICK: f64 = 1.0;
/// Base money gained per click once money generation is unlocked.
pub const BASE_MONEY_PER_CLICK: f64 = 1.0;

/// Milestone id gating all money income.
pub const MONEY_GENERATION_MILESTONE: &str = "money_generation";

/// Offline gaps shorter than this are ignored entirely.
pub const OFFLINE_MIN_SECS: u64 = 60;
/// Offline gaps are clamped to this cap (24 hours).
pub const OFFLINE_CAP_SECS: u64 = 24 * 60 * 60;
/// Offline income runs at a fraction of the live rate.
pub const OFFLINE_EFFICIENCY: f64 = 0.5;

/// Project requirement growth per completion within a stage.
pub const PROJECT_REQUIREMENT_GROWTH: f64 = 1.5;

/// Autosave interval, seconds.
pub const AUTOSAVE_INTERVAL_SECS: f32 = 60.0;

/// "Coming soon" window for milestone hints: within this many levels.
pub const MILESTONE_SOON_LEVELS: u32 = 5;
/// …or within this many stages.
pub const MILESTONE_SOON_STAGES: u32 = 1;
