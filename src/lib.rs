//! SleepTempo host: command-line player and WAV renderer for tempo ladders

pub mod cli;
pub mod config;
pub mod driver;
pub mod export;
pub mod logging;
