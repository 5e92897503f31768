use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

use crate::alert::AlertConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct MonitorSettings {
    pub fall_confirm_secs: f32,
    pub recover_confirm_secs: f32,
    pub sustained_warning_secs: f32,
    pub furniture_min_confidence: f32,
    /// Target spacing between frames for the live loop; `None` runs flat out.
    pub frame_interval_ms: Option<u64>,
    pub frame_timeout_ms: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            fall_confirm_secs: 0.5,
            recover_confirm_secs: 0.5,
            sustained_warning_secs: 10.0,
            furniture_min_confidence: crate::posture::DEFAULT_MIN_CONFIDENCE,
            frame_interval_ms: None,
            frame_timeout_ms: 5_000,
        }
    }
}

impl MonitorSettings {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("fallConfirmSecs", self.fall_confirm_secs),
            ("recoverConfirmSecs", self.recover_confirm_secs),
            ("sustainedWarningSecs", self.sustained_warning_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("{name} must be a non-negative number of seconds, got {value}");
            }
        }
        if !(0.0..=1.0).contains(&self.furniture_min_confidence) {
            bail!(
                "furnitureMinConfidence must be within [0, 1], got {}",
                self.furniture_min_confidence
            );
        }
        if self.frame_timeout_ms == 0 {
            bail!("frameTimeoutMs must be greater than zero");
        }
        Ok(())
    }

    pub fn alert_config(&self) -> Result<AlertConfig> {
        self.validate()?;
        Ok(AlertConfig {
            fall_confirm: secs(self.fall_confirm_secs)?,
            recover_confirm: secs(self.recover_confirm_secs)?,
            sustained_warning: secs(self.sustained_warning_secs)?,
        })
    }

    pub fn frame_interval(&self) -> Option<Duration> {
        self.frame_interval_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    pub fn frame_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_timeout_ms)
    }
}

fn secs(value: f32) -> Result<Duration> {
    Duration::try_from_secs_f32(value).map_err(|err| anyhow!("invalid duration {value}: {err}"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AlarmSettings {
    pub enabled: bool,
    /// Audio file looped while the alarm is on; a generated siren otherwise.
    pub sound_path: Option<PathBuf>,
    pub volume: f32,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            sound_path: None,
            volume: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct UserSettings {
    pub monitor: MonitorSettings,
    pub alarm: AlarmSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            let parsed: UserSettings = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse settings in {}", path.display()))?;
            parsed.monitor.validate()?;
            parsed
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn current(&self) -> UserSettings {
        self.read().clone()
    }

    pub fn monitor(&self) -> MonitorSettings {
        self.read().monitor.clone()
    }

    pub fn alarm(&self) -> AlarmSettings {
        self.read().alarm.clone()
    }

    pub fn update_monitor(&self, settings: MonitorSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.write();
        guard.monitor = settings;
        self.persist(&guard)
    }

    pub fn update_alarm(&self, settings: AlarmSettings) -> Result<()> {
        let mut guard = self.write();
        guard.alarm = settings;
        self.persist(&guard)
    }

    /// Writes the current values out, creating the file if needed.
    pub fn save(&self) -> Result<()> {
        let guard = self.read();
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: UserSettings = serde_json::from_str(&contents)?;
        data.monitor.validate()?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
