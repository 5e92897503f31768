use std::f32::consts::PI;
#[cfg(feature = "audio")]
use std::time::Duration;

const HIGH_HZ: f32 = 880.0;
const LOW_HZ: f32 = 660.0;
const TONE_SECS: f32 = 0.5;

/// Two-tone siren, alternating every half second. Used when no alarm sound
/// file is configured or the file cannot be decoded.
pub struct Siren {
    sample_rate: u32,
    num_sample: u64,
    phase: f32,
}

impl Siren {
    pub fn new() -> Self {
        Self {
            sample_rate: 44100,
            num_sample: 0,
            phase: 0.0,
        }
    }

    fn frequency_at(&self, num_sample: u64) -> f32 {
        let t = num_sample as f32 / self.sample_rate as f32;
        if (t / TONE_SECS) as u64 % 2 == 0 {
            HIGH_HZ
        } else {
            LOW_HZ
        }
    }
}

impl Iterator for Siren {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let freq = self.frequency_at(self.num_sample);
        self.num_sample = self.num_sample.wrapping_add(1);

        // Accumulate phase so the tone switch does not click.
        self.phase = (self.phase + 2.0 * PI * freq / self.sample_rate as f32) % (2.0 * PI);

        Some(self.phase.sin() * 0.4)
    }
}

#[cfg(feature = "audio")]
impl rodio::Source for Siren {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alternates_tones_every_half_second() {
        let siren = Siren::new();
        assert_eq!(siren.frequency_at(0), HIGH_HZ);
        assert_eq!(siren.frequency_at(22_050), LOW_HZ);
        assert_eq!(siren.frequency_at(44_100), HIGH_HZ);
    }

    #[test]
    fn samples_stay_in_range() {
        assert!(Siren::new().take(44_100).all(|s| (-0.4..=0.4).contains(&s)));
    }
}
