use anyhow::{Context, Result};
use std::path::Path;

use crate::settings::SettingsStore;

use super::{AlarmOverrides, MonitorOverrides};

pub fn show_settings(path: &Path) -> Result<()> {
    let store = SettingsStore::new(path.to_path_buf())?;
    let rendered = serde_json::to_string_pretty(&store.current())?;

    println!("Settings ({})", store.path().display());
    println!("{rendered}");

    Ok(())
}

pub fn init_settings(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("Settings file already exists at: {}", path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    if force && path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("failed to remove {}", path.display()))?;
    }

    let store = SettingsStore::new(path.to_path_buf())?;
    store.save()?;

    println!("Settings initialized at: {}", path.display());
    Ok(())
}

pub fn set_settings(path: &Path, monitor: &MonitorOverrides, alarm: &AlarmOverrides) -> Result<()> {
    let store = SettingsStore::new(path.to_path_buf())?;

    let mut monitor_settings = store.monitor();
    monitor.apply(&mut monitor_settings);
    store.update_monitor(monitor_settings)?;

    let mut alarm_settings = store.alarm();
    alarm.apply(&mut alarm_settings);
    store.update_alarm(alarm_settings)?;

    println!("Settings saved to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_reload_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fallwatch.json");

        let monitor = MonitorOverrides {
            sustained_warning_secs: Some(30.0),
            ..Default::default()
        };
        let alarm = AlarmOverrides {
            volume: Some(3.0),
            ..Default::default()
        };
        set_settings(&path, &monitor, &alarm).unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.monitor().sustained_warning_secs, 30.0);
        assert_eq!(store.alarm().volume, 1.0);
    }

    #[test]
    fn rejects_invalid_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fallwatch.json");
        let monitor = MonitorOverrides {
            fall_confirm_secs: Some(-1.0),
            ..Default::default()
        };

        assert!(set_settings(&path, &monitor, &AlarmOverrides::default()).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn init_does_not_clobber_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fallwatch.json");
        std::fs::write(&path, r#"{"monitor":{"fallConfirmSecs":2.0}}"#).unwrap();

        init_settings(&path, false).unwrap();
        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.monitor().fall_confirm_secs, 2.0);

        init_settings(&path, true).unwrap();
        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.monitor().fall_confirm_secs, 0.5);
    }
}
