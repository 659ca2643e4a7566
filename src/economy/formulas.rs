//! The formula engine — price curves, effect magnitudes, and the aggregate
//! multiplier/additive stack.
//!
//! Everything in this file is a pure function over balance definitions and
//! the purchased-upgrade map; the single system at the bottom folds the
//! results back into [`DerivedStats`]. The progression and offline domains
//! call the same functions, so there is exactly one set of numbers.

use bevy::prelude::*;
use std::collections::HashMap;

use crate::shared::*;

// ─────────────────────────────────────────────────────────────────────────────
// Price curve
// ─────────────────────────────────────────────────────────────────────────────

/// Price of the *next* level of an upgrade, given how many are owned.
///
/// Level 0 pays the base price. A growth factor ≤ 0 pins the price at the
/// base forever — a defined degenerate case for flat-priced upgrades, not
/// an input error.
pub fn upgrade_price(def: &UpgradeDef, owned: u32) -> f64 {
    if owned == 0 || def.price_growth <= 0.0 {
        return def.base_price;
    }
    def.base_price * def.price_growth.powi(owned as i32)
}

/// The integer amount actually charged for the next level.
pub fn upgrade_price_charged(def: &UpgradeDef, owned: u32) -> u64 {
    upgrade_price(def, owned).round().max(0.0) as u64
}

// ─────────────────────────────────────────────────────────────────────────────
// Effect magnitudes and the aggregate stack
// ─────────────────────────────────────────────────────────────────────────────

/// An effect's magnitude at a given upgrade level. Linear — no compounding
/// within a single upgrade.
pub fn effect_value(effect: &EffectDef, level: u32) -> f64 {
    effect.base_value * level as f64
}

/// Folds every owned upgrade's effects into a per-kind accumulator.
///
/// Multiplier kinds compound across upgrades (`acc *= 1 + value`, starting
/// from 1.0); additive kinds sum from 0.0. Both folds are commutative, so
/// the map's iteration order never changes the result.
pub fn aggregate_effects(
    registry: &UpgradeRegistry,
    upgrade_levels: &HashMap<UpgradeId, u32>,
) -> HashMap<EffectKind, f64> {
    let mut totals: HashMap<EffectKind, f64> = HashMap::new();

    for (id, &level) in upgrade_levels {
        if level == 0 {
            continue;
        }
        let Some(def) = registry.get(id) else {
            // A save can reference upgrades removed from the balance tables.
            continue;
        };
        for effect in &def.effects {
            let value = effect_value(effect, level);
            if effect.kind.is_multiplier() {
                let acc = totals.entry(effect.kind.clone()).or_insert(1.0);
                *acc *= 1.0 + value;
            } else {
                let acc = totals.entry(effect.kind.clone()).or_insert(0.0);
                *acc += value;
            }
        }
    }

    totals
}

/// Reads one accumulator out of the aggregate map, falling back to the
/// kind's identity (1.0 for multipliers, 0.0 for additive effects).
pub fn aggregated(totals: &HashMap<EffectKind, f64>, kind: &EffectKind) -> f64 {
    totals
        .get(kind)
        .copied()
        .unwrap_or(if kind.is_multiplier() { 1.0 } else { 0.0 })
}

// ─────────────────────────────────────────────────────────────────────────────
// Derived click/income values
// ─────────────────────────────────────────────────────────────────────────────

/// Computes the full derived-stat block from an aggregate map.
///
/// `money_unlocked` gates only the *base* money-per-click; purchased
/// money effects are part of the sum either way (their upgrades are gated
/// behind the same milestone by the balance tables). The same multiplier
/// stack — all × currency × level — applies to clicks and auto income.
pub fn compute_derived(
    totals: &HashMap<EffectKind, f64>,
    level_registry: &LevelRegistry,
    level: u32,
    money_unlocked: bool,
) -> DerivedStats {
    let all = aggregated(totals, &EffectKind::AllMultiplier);
    let money_mult = aggregated(totals, &EffectKind::MoneyMultiplier);
    let exp_mult = aggregated(totals, &EffectKind::ExpMultiplier);
    let level_money = level_registry.money_multiplier(level);

    let base_money = if money_unlocked {
        BASE_MONEY_PER_CLICK
    } else {
        0.0
    };

    DerivedStats {
        money_per_click: (base_money + aggregated(totals, &EffectKind::MoneyPerClick))
            * all
            * money_mult
            * level_money,
        exp_per_click: (BASE_EXP_PER_CLICK + aggregated(totals, &EffectKind::ExpPerClick))
            * all
            * exp_mult,
        auto_money: aggregated(totals, &EffectKind::AutoMoney) * all * money_mult * level_money,
        auto_exp: aggregated(totals, &EffectKind::AutoExp) * all * exp_mult,
        money_multiplier: money_mult,
        exp_multiplier: exp_mult,
        all_multiplier: all,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// System
// ─────────────────────────────────────────────────────────────────────────────

/// Recomputes [`DerivedStats`] every frame and announces changes.
/// Cheap — one pass over the purchased map — and keeps every consumer
/// honest without recompute bookkeeping after each mutation path.
pub fn refresh_derived_stats(
    registry: Res<UpgradeRegistry>,
    level_registry: Res<LevelRegistry>,
    progress: Res<PlayerProgress>,
    milestones: Res<Milestones>,
    mut derived: ResMut<DerivedStats>,
    mut click_writer: EventWriter<ClickValuesChangedEvent>,
    mut income_writer: EventWriter<AutoIncomeChangedEvent>,
) {
    let totals = aggregate_effects(&registry, &progress.upgrade_levels);
    let next = compute_derived(
        &totals,
        &level_registry,
        progress.level,
        milestones.is_unlocked(MONEY_GENERATION_MILESTONE),
    );

    if next == *derived {
        return;
    }

    if next.money_per_click != derived.money_per_click
        || next.exp_per_click != derived.exp_per_click
    {
        click_writer.send(ClickValuesChangedEvent {
            money_per_click: next.money_per_click,
            exp_per_click: next.exp_per_click,
        });
    }
    if next.auto_money != derived.auto_money || next.auto_exp != derived.auto_exp {
        income_writer.send(AutoIncomeChangedEvent {
            auto_money: next.auto_money,
            auto_exp: next.auto_exp,
        });
    }

    *derived = next;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upgrade(id: &str, effects: Vec<EffectDef>) -> UpgradeDef {
        UpgradeDef {
            id: id.to_string(),
            category: UpgradeCategory::Skills,
            name: String::new(),
            description: String::new(),
            currency: CurrencyKind::Experience,
            base_price: 10.0,
            price_growth: 1.15,
            max_level: 0,
            unlock: UnlockRequirement::None,
            effects,
        }
    }

    #[test]
    fn test_price_examples() {
        let def = upgrade("kb", vec![]);
        assert_eq!(upgrade_price(&def, 0), 10.0);
        // 10 × 1.15³ ≈ 15.2088
        let price = upgrade_price(&def, 3);
        assert!((price - 15.208_75).abs() < 1e-4, "got {}", price);
    }

    #[test]
    fn test_price_monotonicity() {
        let def = upgrade("kb", vec![]);
        let mut previous = upgrade_price(&def, 0);
        for level in 1..200 {
            let price = upgrade_price(&def, level);
            assert!(price > previous, "price must grow at level {}", level);
            previous = price;
        }
    }

    #[test]
    fn test_price_degenerate_growth_is_constant() {
        let mut def = upgrade("flat", vec![]);
        def.price_growth = 0.0;
        assert_eq!(upgrade_price(&def, 0), 10.0);
        assert_eq!(upgrade_price(&def, 7), 10.0);
        def.price_growth = -2.5;
        assert_eq!(upgrade_price(&def, 3), 10.0);
    }

    #[test]
    fn test_effect_value_scales_linearly() {
        let effect = EffectDef {
            kind: EffectKind::ExpPerClick,
            base_value: 1.5,
        };
        assert_eq!(effect_value(&effect, 0), 0.0);
        assert_eq!(effect_value(&effect, 4), 6.0);
    }

    #[test]
    fn test_aggregate_additive_and_multiplicative() {
        let mut registry = UpgradeRegistry::default();
        registry.upgrades.insert(
            "a".into(),
            upgrade(
                "a",
                vec![EffectDef {
                    kind: EffectKind::MoneyPerClick,
                    base_value: 1.0,
                }],
            ),
        );
        registry.upgrades.insert(
            "b".into(),
            upgrade(
                "b",
                vec![EffectDef {
                    kind: EffectKind::MoneyPerClick,
                    base_value: 2.0,
                }],
            ),
        );
        registry.upgrades.insert(
            "c".into(),
            upgrade(
                "c",
                vec![EffectDef {
                    kind: EffectKind::AllMultiplier,
                    base_value: 0.1,
                }],
            ),
        );

        let mut owned = HashMap::new();
        owned.insert("a".to_string(), 1);
        owned.insert("b".to_string(), 1);
        owned.insert("c".to_string(), 2); // effect value 0.2

        let totals = aggregate_effects(&registry, &owned);
        assert_eq!(aggregated(&totals, &EffectKind::MoneyPerClick), 3.0);
        let all = aggregated(&totals, &EffectKind::AllMultiplier);
        assert!((all - 1.2).abs() < 1e-12, "got {}", all);
    }

    #[test]
    fn test_aggregate_order_independence() {
        let mut registry = UpgradeRegistry::default();
        let ids: Vec<String> = (0..8).map(|i| format!("u{}", i)).collect();
        for (i, id) in ids.iter().enumerate() {
            let kind = if i % 2 == 0 {
                EffectKind::ExpPerClick
            } else {
                EffectKind::AllMultiplier
            };
            registry.upgrades.insert(
                id.clone(),
                upgrade(
                    id,
                    vec![EffectDef {
                        kind,
                        base_value: 0.05 * (i as f64 + 1.0),
                    }],
                ),
            );
        }

        let mut forward = HashMap::new();
        for (i, id) in ids.iter().enumerate() {
            forward.insert(id.clone(), i as u32 + 1);
        }
        let mut reverse = HashMap::new();
        for (i, id) in ids.iter().enumerate().rev() {
            reverse.insert(id.clone(), i as u32 + 1);
        }

        let a = aggregate_effects(&registry, &forward);
        let b = aggregate_effects(&registry, &reverse);
        for kind in [EffectKind::ExpPerClick, EffectKind::AllMultiplier] {
            let va = aggregated(&a, &kind);
            let vb = aggregated(&b, &kind);
            assert!((va - vb).abs() < 1e-9, "{:?}: {} vs {}", kind, va, vb);
        }
    }

    #[test]
    fn test_aggregate_skips_unowned_and_missing() {
        let mut registry = UpgradeRegistry::default();
        registry.upgrades.insert(
            "a".into(),
            upgrade(
                "a",
                vec![EffectDef {
                    kind: EffectKind::ExpPerClick,
                    base_value: 1.0,
                }],
            ),
        );

        let mut owned = HashMap::new();
        owned.insert("a".to_string(), 0); // owned at level 0 contributes nothing
        owned.insert("ghost".to_string(), 3); // removed from the tables

        let totals = aggregate_effects(&registry, &owned);
        assert!(totals.is_empty());
    }

    #[test]
    fn test_compute_derived_money_gate() {
        let registry = LevelRegistry::default();
        let totals = HashMap::new();

        let locked = compute_derived(&totals, &registry, 1, false);
        assert_eq!(locked.money_per_click, 0.0);
        assert_eq!(locked.exp_per_click, BASE_EXP_PER_CLICK);

        let unlocked = compute_derived(&totals, &registry, 1, true);
        assert_eq!(unlocked.money_per_click, BASE_MONEY_PER_CLICK);
    }

    #[test]
    fn test_compute_derived_full_stack() {
        let mut level_registry = LevelRegistry::default();
        level_registry.levels.insert(
            10,
            LevelDef {
                level: 10,
                required_exp: 1000,
                money_multiplier: 1.45,
                bonus_money: 0,
                unlock_feature: None,
            },
        );

        let mut totals = HashMap::new();
        totals.insert(EffectKind::MoneyPerClick, 2.0);
        totals.insert(EffectKind::AllMultiplier, 1.1);
        totals.insert(EffectKind::MoneyMultiplier, 1.2);

        let derived = compute_derived(&totals, &level_registry, 10, true);
        // (1 + 2) × 1.1 × 1.2 × 1.45
        let expected = 3.0 * 1.1 * 1.2 * 1.45;
        assert!((derived.money_per_click - expected).abs() < 1e-9);
        // Auto money uses the same stack but has no base term.
        assert_eq!(derived.auto_money, 0.0);
    }

    #[test]
    fn test_unknown_kinds_do_not_leak_into_derived() {
        let registry = LevelRegistry::default();
        let mut totals = HashMap::new();
        totals.insert(EffectKind::Unknown("team_morale".into()), 99.0);

        let derived = compute_derived(&totals, &registry, 1, true);
        assert_eq!(derived.exp_per_click, BASE_EXP_PER_CLICK);
        assert_eq!(derived.money_per_click, BASE_MONEY_PER_CLICK);
    }
}
