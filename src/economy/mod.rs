//! Economy domain — formulas, wallet, clicks, auto-income, purchases.
//!
//! All cross-domain communication goes through `crate::shared::*` events and
//! resources. No other domain module is imported here.

use bevy::prelude::*;

use crate::shared::*;

pub mod clicker;
pub mod formulas;
pub mod income;
pub mod purchase;
pub mod stats;
pub mod wallet;

use clicker::handle_clicks;
use formulas::refresh_derived_stats;
use income::tick_auto_income;
use purchase::handle_purchase_requests;
use stats::{track_projects_completed, track_upgrades_purchased};
use wallet::{apply_currency_changes, FractionalEarnings};

pub struct EconomyPlugin;

impl Plugin for EconomyPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FractionalEarnings>();

        app.add_systems(
            Update,
            (
                // Inbound player intent.
                handle_clicks,
                handle_purchase_requests,
                // Passive income accrues every frame.
                tick_auto_income,
                // Currency deltas from any domain funnel through the wallet.
                apply_currency_changes,
                // Derived click/income values track purchases and level.
                refresh_derived_stats,
                // Lifetime counters — passive event listeners.
                track_upgrades_purchased,
                track_projects_completed,
            )
                .run_if(in_state(GameState::Playing)),
        );

        info!("[Economy] EconomyPlugin registered.");
    }
}
