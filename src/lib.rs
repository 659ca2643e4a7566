//! Devclicker library crate — re-exports all modules for integration testing.
//!
//! The binary crate (`main.rs`) is a thin headless host; the engine itself
//! is this library. `tests/` integration tests import the same plugins,
//! systems, and resources and drive them without a window or GPU.

pub mod shared;

pub mod data;
pub mod economy;
pub mod offline;
pub mod progression;
pub mod save;
pub mod unlocks;
