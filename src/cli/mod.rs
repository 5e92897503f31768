mod replay_cmd;
mod settings_cmd;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::settings::{AlarmSettings, MonitorSettings};

pub use replay_cmd::ReplayCommand;

const DEFAULT_SETTINGS_PATH: &str = "fallwatch.json";

#[derive(Parser)]
#[command(name = "fallwatch")]
#[command(about = "Fall and sustained-posture monitor", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the settings file
    #[arg(long, global = true, env = "FALLWATCH_SETTINGS")]
    settings: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitor over a recorded detection file (JSON lines)
    Replay(ReplayCommand),

    /// Manage settings
    #[command(subcommand)]
    Settings(SettingsSubcommands),
}

#[derive(Subcommand)]
enum SettingsSubcommands {
    /// Print the effective settings
    Show,

    /// Write a settings file with defaults
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Change individual values and save
    Set {
        #[command(flatten)]
        monitor: MonitorOverrides,

        #[command(flatten)]
        alarm: AlarmOverrides,
    },
}

/// Per-invocation overrides for the monitor timing and thresholds.
#[derive(Args, Debug, Clone, Default)]
pub struct MonitorOverrides {
    /// Seconds a fall must persist before the alarm sounds
    #[arg(long)]
    fall_confirm_secs: Option<f32>,

    /// Seconds of recovery before the alarm stops
    #[arg(long)]
    recover_confirm_secs: Option<f32>,

    /// Seconds in one posture before a reminder is logged
    #[arg(long)]
    sustained_warning_secs: Option<f32>,

    /// Minimum furniture detection confidence (0-1)
    #[arg(long)]
    min_confidence: Option<f32>,

    /// Target milliseconds between frames (0 to run unpaced)
    #[arg(long)]
    frame_interval_ms: Option<u64>,

    /// Milliseconds allowed for detection on one frame
    #[arg(long)]
    frame_timeout_ms: Option<u64>,
}

impl MonitorOverrides {
    pub fn apply(&self, settings: &mut MonitorSettings) {
        if let Some(value) = self.fall_confirm_secs {
            settings.fall_confirm_secs = value;
        }
        if let Some(value) = self.recover_confirm_secs {
            settings.recover_confirm_secs = value;
        }
        if let Some(value) = self.sustained_warning_secs {
            settings.sustained_warning_secs = value;
        }
        if let Some(value) = self.min_confidence {
            settings.furniture_min_confidence = value;
        }
        if let Some(value) = self.frame_interval_ms {
            settings.frame_interval_ms = (value > 0).then_some(value);
        }
        if let Some(value) = self.frame_timeout_ms {
            settings.frame_timeout_ms = value;
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct AlarmOverrides {
    /// Turn the audible alarm on or off
    #[arg(long)]
    alarm_enabled: Option<bool>,

    /// Audio file to loop while the alarm is on
    #[arg(long)]
    sound: Option<PathBuf>,

    /// Alarm volume (0-1)
    #[arg(long)]
    volume: Option<f32>,
}

impl AlarmOverrides {
    pub fn apply(&self, settings: &mut AlarmSettings) {
        if let Some(enabled) = self.alarm_enabled {
            settings.enabled = enabled;
        }
        if let Some(path) = &self.sound {
            settings.sound_path = Some(path.clone());
        }
        if let Some(volume) = self.volume {
            settings.volume = volume.clamp(0.0, 1.0);
        }
    }
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let settings_path = self
            .settings
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH));

        match self.command {
            Commands::Replay(cmd) => cmd.execute(&settings_path).await,
            Commands::Settings(subcmd) => match subcmd {
                SettingsSubcommands::Show => settings_cmd::show_settings(&settings_path),
                SettingsSubcommands::Init { force } => {
                    settings_cmd::init_settings(&settings_path, force)
                }
                SettingsSubcommands::Set { monitor, alarm } => {
                    settings_cmd::set_settings(&settings_path, &monitor, &alarm)
                }
            },
        }
    }
}
