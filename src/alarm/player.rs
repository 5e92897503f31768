use crate::settings::AlarmSettings;

#[cfg(feature = "audio")]
pub use rodio_player::Player;

#[cfg(not(feature = "audio"))]
pub use log_player::Player;

#[cfg(feature = "audio")]
mod rodio_player {
    use std::{fs::File, io::BufReader, path::Path};

    use log::{error, warn};
    use rodio::{Decoder, OutputStream, Sink, Source};

    use super::AlarmSettings;
    use crate::alarm::siren::Siren;

    /// Owns the non-`Send` audio objects; lives on the alarm thread only.
    pub struct Player {
        settings: AlarmSettings,
        _stream: Option<OutputStream>,
        sink: Option<Sink>,
    }

    impl Player {
        pub fn new(settings: AlarmSettings) -> Self {
            Self {
                settings,
                _stream: None,
                sink: None,
            }
        }

        fn ensure_sink(&mut self) -> Result<&Sink, String> {
            if self.sink.is_none() {
                let (stream, handle) = OutputStream::try_default()
                    .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
                let sink = Sink::try_new(&handle)
                    .map_err(|e| format!("Failed to create audio sink: {}", e))?;
                sink.set_volume(self.settings.volume.clamp(0.0, 1.0));
                self._stream = Some(stream);
                self.sink = Some(sink);
            }
            self.sink
                .as_ref()
                .ok_or_else(|| "audio sink unavailable".to_string())
        }

        pub fn start(&mut self) {
            self.stop();
            let sound_path = self.settings.sound_path.clone();
            let sink = match self.ensure_sink() {
                Ok(sink) => sink,
                Err(err) => {
                    error!("alarm audio unavailable: {err}");
                    return;
                }
            };

            match sound_path.as_deref().map(open_looped) {
                Some(Ok(source)) => sink.append(source),
                Some(Err(err)) => {
                    warn!("alarm sound file unusable ({err}); falling back to siren");
                    sink.append(Siren::new());
                }
                None => sink.append(Siren::new()),
            }
            sink.play();
        }

        pub fn stop(&mut self) {
            if let Some(sink) = self.sink.take() {
                sink.stop();
            }
            self._stream = None;
        }
    }

    fn open_looped(
        path: &Path,
    ) -> Result<rodio::source::Repeat<Decoder<BufReader<File>>>, String> {
        let file = File::open(path).map_err(|e| format!("{}: {}", path.display(), e))?;
        let decoder =
            Decoder::new(BufReader::new(file)).map_err(|e| format!("{}: {}", path.display(), e))?;
        Ok(decoder.repeat_infinite())
    }
}

#[cfg(not(feature = "audio"))]
mod log_player {
    use log::{info, warn};

    use super::AlarmSettings;

    /// Stand-in when the crate is built without the `audio` feature: the alarm
    /// is announced through the log.
    pub struct Player {
        settings: AlarmSettings,
    }

    impl Player {
        pub fn new(settings: AlarmSettings) -> Self {
            Self { settings }
        }

        pub fn start(&mut self) {
            match &self.settings.sound_path {
                Some(path) => warn!(
                    "ALARM: fall confirmed (would loop {}; built without audio)",
                    path.display()
                ),
                None => warn!("ALARM: fall confirmed (built without audio)"),
            }
        }

        pub fn stop(&mut self) {
            info!("alarm silenced");
        }
    }
}
