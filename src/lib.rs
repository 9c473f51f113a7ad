//! Least-cost sizing of hybrid electric/thermal microgrids.
//!
//! A model describes a microgrid with renewables, a battery and a diesel generator on the
//! electric side, and solar collectors, a boiler, a storage tank and an electric resistance for
//! each class of thermal user. The sizes of every component and their dispatch in every period of
//! every scenario are chosen by a single linear program which minimises the expected net present
//! cost.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod error;
pub mod finance;
pub mod input;
pub mod log;
pub mod model;
pub mod optimisation;
pub mod output;
pub mod sensitivity;
pub mod sets;
pub mod settings;
pub mod simulation;
pub mod solver;
pub mod summary;
pub mod time_series;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the folder in which program settings are stored
pub fn get_mes2_config_dir() -> PathBuf {
    dirs::config_dir().unwrap_or_default().join("mes2")
}
