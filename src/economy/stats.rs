//! Lifetime-statistics counters — passive listeners on outbound events.
//! Clicks and earned-currency totals are counted at their source (clicker
//! and wallet); these two close the set.

use bevy::prelude::*;

use crate::shared::*;

pub fn track_upgrades_purchased(
    mut events: EventReader<UpgradePurchasedEvent>,
    mut stats: ResMut<PlayStats>,
) {
    for _ev in events.read() {
        stats.total_upgrades_purchased = stats.total_upgrades_purchased.saturating_add(1);
    }
}

pub fn track_projects_completed(
    mut events: EventReader<ProjectCompletedEvent>,
    mut stats: ResMut<PlayStats>,
) {
    for _ev in events.read() {
        stats.total_projects_completed = stats.total_projects_completed.saturating_add(1);
    }
}
