//! Click resolution — turns host [`ClickEvent`]s into currency gains.

use bevy::prelude::*;

use crate::economy::wallet::FractionalEarnings;
use crate::shared::*;

/// Applies one click's worth of gains per event.
///
/// Experience always flows; money only once the money-generation milestone
/// is unlocked. Fractional per-click values bank up in [`FractionalEarnings`]
/// so nothing is lost to rounding.
pub fn handle_clicks(
    mut click_events: EventReader<ClickEvent>,
    derived: Res<DerivedStats>,
    milestones: Res<Milestones>,
    mut bank: ResMut<FractionalEarnings>,
    mut stats: ResMut<PlayStats>,
    mut money_writer: EventWriter<MoneyDeltaEvent>,
    mut exp_writer: EventWriter<ExpDeltaEvent>,
) {
    let clicks = click_events.read().count() as u64;
    if clicks == 0 {
        return;
    }

    stats.total_clicks = stats.total_clicks.saturating_add(clicks);

    let exp_due = bank.deposit_experience(derived.exp_per_click * clicks as f64);
    if exp_due > 0 {
        exp_writer.send(ExpDeltaEvent {
            amount: exp_due as i64,
            reason: "click".to_string(),
        });
    }

    if milestones.is_unlocked(MONEY_GENERATION_MILESTONE) {
        let money_due = bank.deposit_money(derived.money_per_click * clicks as f64);
        if money_due > 0 {
            money_writer.send(MoneyDeltaEvent {
                amount: money_due as i64,
                reason: "click".to_string(),
            });
        }
    }
}
