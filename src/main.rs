//! Headless demo host for the Devclicker economy engine.
//!
//! Runs the full plugin stack on a 60 Hz schedule runner, loads (or
//! starts) a game, and feeds it a steady stream of clicks so the whole
//! loop — clicks, purchases, level-ups, projects, autosave — can be
//! watched through the log. A real host replaces this file with its own
//! event wiring.

use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::prelude::*;
use bevy::state::app::StatesPlugin;

use devclicker::shared::*;

fn main() {
    App::new()
        .add_plugins(
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
                1.0 / 60.0,
            ))),
        )
        .add_plugins(bevy::log::LogPlugin::default())
        .add_plugins(StatesPlugin)
        // Game state
        .init_state::<GameState>()
        // Shared resources
        .init_resource::<PlayerProgress>()
        .init_resource::<DerivedStats>()
        .init_resource::<PlayStats>()
        .init_resource::<SaveMeta>()
        .init_resource::<Milestones>()
        .init_resource::<ProjectBoard>()
        .init_resource::<UpgradeRegistry>()
        .init_resource::<LevelRegistry>()
        .init_resource::<ProjectRegistry>()
        .init_resource::<StageRegistry>()
        .init_resource::<BalanceDataStatus>()
        // Events
        .add_event::<ClickEvent>()
        .add_event::<PurchaseRequestEvent>()
        .add_event::<MoneyDeltaEvent>()
        .add_event::<ExpDeltaEvent>()
        .add_event::<MoneyChangedEvent>()
        .add_event::<ExperienceChangedEvent>()
        .add_event::<ClickValuesChangedEvent>()
        .add_event::<AutoIncomeChangedEvent>()
        .add_event::<LevelUpEvent>()
        .add_event::<StageUnlockedEvent>()
        .add_event::<FeatureUnlockedEvent>()
        .add_event::<UpgradePurchasedEvent>()
        .add_event::<ProjectCompletedEvent>()
        .add_event::<OfflineProgressEvent>()
        .add_event::<NotificationEvent>()
        .add_event::<BalanceDataErrorEvent>()
        .add_event::<SaveRequestEvent>()
        .add_event::<LoadRequestEvent>()
        .add_event::<SaveCompleteEvent>()
        .add_event::<LoadCompleteEvent>()
        .add_event::<NewGameEvent>()
        .add_event::<DebugSetProgressEvent>()
        // Domain plugins
        .add_plugins(devclicker::data::DataPlugin)
        .add_plugins(devclicker::economy::EconomyPlugin)
        .add_plugins(devclicker::progression::ProgressionPlugin)
        .add_plugins(devclicker::unlocks::UnlockPlugin)
        .add_plugins(devclicker::save::SavePlugin)
        .add_plugins(devclicker::offline::OfflinePlugin)
        // Demo host wiring
        .add_systems(Update, boot_into_game.run_if(in_state(GameState::MainMenu)))
        .add_systems(
            Update,
            (demo_clicks, surface_notifications).run_if(in_state(GameState::Playing)),
        )
        .run();
}

/// Loads the save (or starts fresh) as soon as the data layer hands over.
fn boot_into_game(mut load_writer: EventWriter<LoadRequestEvent>) {
    load_writer.send(LoadRequestEvent);
}

/// A tireless demo player: one click per frame.
fn demo_clicks(mut click_writer: EventWriter<ClickEvent>) {
    click_writer.send(ClickEvent);
}

/// Mirrors engine notifications into the log so the demo has a "UI".
fn surface_notifications(mut notifications: EventReader<NotificationEvent>) {
    for ev in notifications.read() {
        info!("[Host] ★ {} — {}", ev.title, ev.message);
    }
}
