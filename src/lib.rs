//! Fall and sustained-posture monitoring from per-frame pose and furniture
//! detections.
//!
//! [`engine::PostureEngine`] is the single entry point: feed it one frame's
//! detections and a timestamp, get back a [`engine::StatusSnapshot`] and any
//! alarm transitions. [`monitor`] runs it in a loop over a [`providers::FrameSource`];
//! [`replay`] does the same from a recorded file.

pub mod alarm;
pub mod alert;
pub mod cli;
pub mod engine;
pub mod journal;
pub mod metrics;
pub mod monitor;
pub mod posture;
pub mod providers;
pub mod replay;
pub mod settings;
mod utils;

use anyhow::Result;
use clap::Parser;

pub fn run() -> Result<()> {
    // Info unless RUST_LOG says otherwise
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = cli::Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(cli.execute())
}
