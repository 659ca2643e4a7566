//! Passive income — applies the auto rates from [`DerivedStats`] over
//! real elapsed time while the game is running.

use bevy::prelude::*;

use crate::economy::wallet::FractionalEarnings;
use crate::shared::*;

/// Accrues auto income each frame. Rates are per second; the fractional
/// bank turns them into whole currency units as they add up.
pub fn tick_auto_income(
    time: Res<Time>,
    derived: Res<DerivedStats>,
    milestones: Res<Milestones>,
    mut bank: ResMut<FractionalEarnings>,
    mut money_writer: EventWriter<MoneyDeltaEvent>,
    mut exp_writer: EventWriter<ExpDeltaEvent>,
) {
    let delta = time.delta().as_secs_f64();
    if delta <= 0.0 {
        return;
    }

    if derived.auto_exp > 0.0 {
        let due = bank.deposit_experience(derived.auto_exp * delta);
        if due > 0 {
            exp_writer.send(ExpDeltaEvent {
                amount: due as i64,
                reason: "auto income".to_string(),
            });
        }
    }

    if derived.auto_money > 0.0 && milestones.is_unlocked(MONEY_GENERATION_MILESTONE) {
        let due = bank.deposit_money(derived.auto_money * delta);
        if due > 0 {
            money_writer.send(MoneyDeltaEvent {
                amount: due as i64,
                reason: "auto income".to_string(),
            });
        }
    }
}
