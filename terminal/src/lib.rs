// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! stocksim-terminal: line-oriented front end for the stocksim trading desk.
//!
//! Loads a TOML config, opens the account snapshot, runs the desk as a
//! background service, and turns typed commands into quotes, confirmed
//! orders, undo, and text views of the portfolio, history, insights and
//! leaderboard.

pub mod commands;
pub mod config;
pub mod error;
pub mod render;
pub mod session;
