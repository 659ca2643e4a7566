//! The purchase controller — validates and commits upgrade purchases.
//!
//! Validation is a pure function with a fixed precondition order so the
//! host UI can tell "locked" from "can't afford" from "maxed out". The
//! commit is a single mutation block: nothing is debited on any failure
//! path.

use bevy::prelude::*;

use crate::economy::formulas::{upgrade_price_charged, upgrade_price};
use crate::shared::*;

/// Why a purchase was refused. Ordering of the checks is part of the
/// contract — the first failing precondition names the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseError {
    UnknownUpgrade,
    MaxLevelReached,
    Locked,
    InsufficientFunds,
}

impl PurchaseError {
    pub fn message(&self) -> &'static str {
        match self {
            PurchaseError::UnknownUpgrade => "That upgrade does not exist.",
            PurchaseError::MaxLevelReached => "Already at max level.",
            PurchaseError::Locked => "Not unlocked yet.",
            PurchaseError::InsufficientFunds => "Not enough funds.",
        }
    }
}

/// Checks, in order: exists → max level → unlock gate → affordability.
/// Returns the charged price on success. Pure — no state is touched.
pub fn validate_purchase(
    def: Option<&UpgradeDef>,
    progress: &PlayerProgress,
) -> Result<u64, PurchaseError> {
    let def = def.ok_or(PurchaseError::UnknownUpgrade)?;

    let owned = progress.upgrade_level(&def.id);
    if def.is_max_level(owned) {
        return Err(PurchaseError::MaxLevelReached);
    }

    if !def.unlock.is_satisfied(progress.level, progress.stage) {
        return Err(PurchaseError::Locked);
    }

    let price = upgrade_price_charged(def, owned);
    let balance = match def.currency {
        CurrencyKind::Money => progress.money,
        CurrencyKind::Experience => progress.experience,
    };
    if balance < price {
        return Err(PurchaseError::InsufficientFunds);
    }

    Ok(price)
}

/// Processes [`PurchaseRequestEvent`]s — the core purchase flow.
pub fn handle_purchase_requests(
    mut requests: EventReader<PurchaseRequestEvent>,
    registry: Res<UpgradeRegistry>,
    mut progress: ResMut<PlayerProgress>,
    mut purchased_writer: EventWriter<UpgradePurchasedEvent>,
    mut money_writer: EventWriter<MoneyChangedEvent>,
    mut exp_writer: EventWriter<ExperienceChangedEvent>,
    mut notify_writer: EventWriter<NotificationEvent>,
) {
    for ev in requests.read() {
        let def = registry.get(&ev.upgrade_id);

        let price = match validate_purchase(def, &progress) {
            Ok(price) => price,
            Err(error) => {
                info!(
                    "[Economy] Purchase of '{}' refused: {:?}",
                    ev.upgrade_id, error
                );
                notify_writer.send(NotificationEvent {
                    title: "Purchase failed".to_string(),
                    message: error.message().to_string(),
                });
                continue;
            }
        };
        // Validation guarantees the definition exists past this point.
        let Some(def) = def else {
            continue;
        };

        // ── All checks passed — commit atomically ─────────────────────────
        match def.currency {
            CurrencyKind::Money => {
                progress.money = progress.money.saturating_sub(price);
                money_writer.send(MoneyChangedEvent {
                    total: progress.money,
                });
            }
            CurrencyKind::Experience => {
                progress.experience = progress.experience.saturating_sub(price);
                exp_writer.send(ExperienceChangedEvent {
                    total: progress.experience,
                });
            }
        }

        let new_level = progress.upgrade_level(&def.id) + 1;
        progress
            .upgrade_levels
            .insert(def.id.clone(), new_level);

        for effect in &def.effects {
            if let EffectKind::Unknown(tag) = &effect.kind {
                // Forward compatibility: balance rows may carry effect types
                // this build has no handler for.
                debug!(
                    "[Economy] Upgrade '{}' effect '{}' has no handler — ignored",
                    def.id, tag
                );
            }
        }

        purchased_writer.send(UpgradePurchasedEvent {
            upgrade_id: def.id.clone(),
            new_level,
            price_paid: price,
        });

        info!(
            "[Economy] Bought '{}' level {} for {} {:?}. Next price: {:.0}",
            def.id,
            new_level,
            price,
            def.currency,
            upgrade_price(def, new_level)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(currency: CurrencyKind, unlock: UnlockRequirement, max_level: i32) -> UpgradeDef {
        UpgradeDef {
            id: "kb".to_string(),
            category: UpgradeCategory::Equipment,
            name: String::new(),
            description: String::new(),
            currency,
            base_price: 100.0,
            price_growth: 1.15,
            max_level,
            unlock,
            effects: vec![],
        }
    }

    #[test]
    fn test_unknown_upgrade_first() {
        let progress = PlayerProgress::default();
        assert_eq!(
            validate_purchase(None, &progress),
            Err(PurchaseError::UnknownUpgrade)
        );
    }

    #[test]
    fn test_precondition_order_max_level_before_lock() {
        // Maxed AND locked AND broke: max level must win.
        let d = def(CurrencyKind::Money, UnlockRequirement::Level(99), 2);
        let mut progress = PlayerProgress::default();
        progress.upgrade_levels.insert("kb".to_string(), 2);
        assert_eq!(
            validate_purchase(Some(&d), &progress),
            Err(PurchaseError::MaxLevelReached)
        );
    }

    #[test]
    fn test_precondition_order_lock_before_funds() {
        let d = def(CurrencyKind::Money, UnlockRequirement::Level(99), 0);
        let progress = PlayerProgress::default(); // no money either
        assert_eq!(
            validate_purchase(Some(&d), &progress),
            Err(PurchaseError::Locked)
        );
    }

    #[test]
    fn test_insufficient_funds_last() {
        let d = def(CurrencyKind::Experience, UnlockRequirement::None, 0);
        let progress = PlayerProgress::default(); // 0 exp, price 100
        assert_eq!(
            validate_purchase(Some(&d), &progress),
            Err(PurchaseError::InsufficientFunds)
        );
    }

    #[test]
    fn test_validation_never_mutates() {
        let d = def(CurrencyKind::Experience, UnlockRequirement::None, 0);
        let progress = PlayerProgress::default();
        let before = progress.clone();
        let _ = validate_purchase(Some(&d), &progress);
        assert_eq!(progress.money, before.money);
        assert_eq!(progress.experience, before.experience);
        assert_eq!(progress.upgrade_levels, before.upgrade_levels);
    }

    #[test]
    fn test_successful_validation_prices_current_level() {
        let d = def(CurrencyKind::Money, UnlockRequirement::None, 0);
        let mut progress = PlayerProgress::default();
        progress.money = 1_000_000;
        progress.upgrade_levels.insert("kb".to_string(), 3);
        // 100 × 1.15³ ≈ 152.0875 → 152
        assert_eq!(validate_purchase(Some(&d), &progress), Ok(152));
    }
}
