//! Central currency application. Every money/experience delta in the game
//! funnels through [`apply_currency_changes`], which keeps the saturating
//! arithmetic, lifetime earn counters, and change announcements in one place.

use bevy::prelude::*;

use crate::shared::*;

/// Banks sub-unit income so fractional rates accumulate losslessly.
/// Not persisted — losing a fraction of a unit on exit is acceptable.
#[derive(Resource, Debug, Clone, Default)]
pub struct FractionalEarnings {
    money: f64,
    experience: f64,
}

impl FractionalEarnings {
    /// Deposits a fractional money amount; returns the whole units now due.
    pub fn deposit_money(&mut self, amount: f64) -> u64 {
        self.money += amount.max(0.0);
        let whole = self.money.floor();
        self.money -= whole;
        whole as u64
    }

    /// Deposits a fractional experience amount; returns the whole units due.
    pub fn deposit_experience(&mut self, amount: f64) -> u64 {
        self.experience += amount.max(0.0);
        let whole = self.experience.floor();
        self.experience -= whole;
        whole as u64
    }
}

/// Applies queued deltas to [`PlayerProgress`].
///
/// Spends are expected to be validated by their senders; an overdraft is
/// clamped to zero with a warning rather than panicking.
pub fn apply_currency_changes(
    mut money_events: EventReader<MoneyDeltaEvent>,
    mut exp_events: EventReader<ExpDeltaEvent>,
    mut progress: ResMut<PlayerProgress>,
    mut stats: ResMut<PlayStats>,
    mut money_writer: EventWriter<MoneyChangedEvent>,
    mut exp_writer: EventWriter<ExperienceChangedEvent>,
) {
    let mut money_touched = false;
    for ev in money_events.read() {
        money_touched = true;
        if ev.amount >= 0 {
            let gain = ev.amount as u64;
            progress.money = progress.money.saturating_add(gain);
            stats.total_money_earned = stats.total_money_earned.saturating_add(gain);
        } else {
            let cost = ev.amount.unsigned_abs();
            if progress.money < cost {
                warn!(
                    "[Economy] Tried to spend {} money but only have {} (reason: {}). Clamping to 0.",
                    cost, progress.money, ev.reason
                );
            }
            progress.money = progress.money.saturating_sub(cost);
        }
    }
    if money_touched {
        money_writer.send(MoneyChangedEvent {
            total: progress.money,
        });
    }

    let mut exp_touched = false;
    for ev in exp_events.read() {
        exp_touched = true;
        if ev.amount >= 0 {
            let gain = ev.amount as u64;
            progress.experience = progress.experience.saturating_add(gain);
            stats.total_experience_earned = stats.total_experience_earned.saturating_add(gain);
        } else {
            let cost = ev.amount.unsigned_abs();
            if progress.experience < cost {
                warn!(
                    "[Economy] Tried to spend {} exp but only have {} (reason: {}). Clamping to 0.",
                    cost, progress.experience, ev.reason
                );
            }
            progress.experience = progress.experience.saturating_sub(cost);
        }
    }
    if exp_touched {
        exp_writer.send(ExperienceChangedEvent {
            total: progress.experience,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fractional_deposits_accumulate() {
        let mut bank = FractionalEarnings::default();
        assert_eq!(bank.deposit_money(0.4), 0);
        assert_eq!(bank.deposit_money(0.4), 0);
        assert_eq!(bank.deposit_money(0.4), 1);
        // 0.2 carried over
        assert_eq!(bank.deposit_money(0.8), 1);
    }

    #[test]
    fn test_fractional_deposit_whole_units() {
        let mut bank = FractionalEarnings::default();
        assert_eq!(bank.deposit_experience(3.0), 3);
        assert_eq!(bank.deposit_experience(0.0), 0);
    }

    #[test]
    fn test_negative_deposit_is_ignored() {
        let mut bank = FractionalEarnings::default();
        assert_eq!(bank.deposit_money(-5.0), 0);
        assert_eq!(bank.deposit_money(0.5), 0);
        assert_eq!(bank.deposit_money(0.5), 1);
    }
}
