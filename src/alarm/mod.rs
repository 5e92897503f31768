mod player;
pub mod siren;

use player::Player;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;

use log::{error, warn};

use crate::settings::AlarmSettings;

enum AlarmCommand {
    Start,
    Stop,
}

/// Cheap-to-clone handle to the alarm thread. Audio objects are not `Send`, so
/// they are created and owned by a dedicated thread fed over a channel.
#[derive(Clone)]
pub struct AlarmHandle {
    tx: Arc<Mutex<Option<Sender<AlarmCommand>>>>,
    is_sounding: Arc<AtomicBool>,
    settings: AlarmSettings,
}

impl AlarmHandle {
    pub fn new(settings: AlarmSettings) -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
            is_sounding: Arc::new(AtomicBool::new(false)),
            settings,
        }
    }

    fn ensure_thread(&self) -> Result<Sender<AlarmCommand>, String> {
        if let Some(tx) = self.tx.lock().map_err(|e| e.to_string())?.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AlarmCommand>();
        let is_sounding = Arc::clone(&self.is_sounding);
        let settings = self.settings.clone();

        thread::Builder::new()
            .name("alarm-audio".to_string())
            .spawn(move || {
                let mut player = Player::new(settings);
                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AlarmCommand::Start => {
                            player.start();
                            is_sounding.store(true, Ordering::SeqCst);
                        }
                        AlarmCommand::Stop => {
                            player.stop();
                            is_sounding.store(false, Ordering::SeqCst);
                        }
                    }
                }
                player.stop();
            })
            .map_err(|e| e.to_string())?;

        let tx_clone = tx.clone();
        *self.tx.lock().map_err(|e| e.to_string())? = Some(tx);
        Ok(tx_clone)
    }

    /// Starts the looping alarm. No-op when disabled in settings.
    pub fn raise(&self) -> Result<(), String> {
        if !self.settings.enabled {
            return Ok(());
        }
        let tx = self.ensure_thread()?;
        tx.send(AlarmCommand::Start).map_err(|e| e.to_string())
    }

    /// Stops the alarm. Does nothing if it was never raised.
    pub fn silence(&self) -> Result<(), String> {
        let tx = self.tx.lock().map_err(|e| e.to_string())?.clone();
        match tx {
            Some(tx) => tx.send(AlarmCommand::Stop).map_err(|e| e.to_string()),
            None => Ok(()),
        }
    }

    pub fn is_sounding(&self) -> bool {
        self.is_sounding.load(Ordering::SeqCst)
    }

    /// Stops any sound and lets the thread exit once all handles are gone.
    pub fn shutdown(&self) {
        if let Err(err) = self.silence() {
            error!("Failed to stop alarm thread: {err}");
        }
        match self.tx.lock() {
            Ok(mut guard) => {
                guard.take();
            }
            Err(poisoned) => {
                warn!("Alarm channel lock poisoned; dropping sender anyway");
                poisoned.into_inner().take();
            }
        }
    }
}

#[cfg(all(test, not(feature = "audio")))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_for(handle: &AlarmHandle, sounding: bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if handle.is_sounding() == sounding {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn raise_and_silence_toggle_state() {
        let handle = AlarmHandle::new(AlarmSettings::default());
        handle.raise().unwrap();
        assert!(wait_for(&handle, true));
        handle.silence().unwrap();
        assert!(wait_for(&handle, false));
        handle.shutdown();
    }

    #[test]
    fn disabled_alarm_stays_quiet() {
        let handle = AlarmHandle::new(AlarmSettings {
            enabled: false,
            ..AlarmSettings::default()
        });
        handle.raise().unwrap();
        thread::sleep(Duration::from_millis(20));
        assert!(!handle.is_sounding());
    }

    #[test]
    fn silence_reports_a_dead_alarm_thread() {
        let handle = AlarmHandle::new(AlarmSettings::default());
        let (tx, rx) = mpsc::channel();
        drop(rx);
        *handle.tx.lock().unwrap() = Some(tx);

        assert!(handle.silence().is_err());
        // shutdown logs the failure and still releases the sender
        handle.shutdown();
        assert!(handle.tx.lock().unwrap().is_none());
    }

    #[test]
    fn silence_before_raise_is_harmless() {
        let handle = AlarmHandle::new(AlarmSettings::default());
        assert!(handle.silence().is_ok());
        assert!(!handle.is_sounding());
    }
}
