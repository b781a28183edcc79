//! Planetside simulation library
//!
//! Exposes the world config, the game simulation and logging setup for the
//! CLI and for tests.

pub mod config;
pub mod game;
pub mod logging;
