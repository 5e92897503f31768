use anyhow::{anyhow, Context, Result};
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
    time::Duration,
};

use crate::{
    posture::RawDetection,
    providers::{FrameSource, FurnitureProvider, PoseDetection, PoseProvider},
};

use super::record::ReplayRecord;

/// Reads one [`ReplayRecord`] per line. Blank lines are skipped; a malformed
/// line ends the stream with an error naming the line.
pub struct ReplaySource {
    reader: Box<dyn BufRead + Send>,
    line_no: usize,
    buf: String,
}

impl ReplaySource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open replay file {}", path.display()))?;
        Ok(Self::from_reader(BufReader::new(file)))
    }

    pub fn from_reader(reader: impl BufRead + Send + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            line_no: 0,
            buf: String::new(),
        }
    }
}

impl FrameSource for ReplaySource {
    type Frame = ReplayRecord;

    fn next_frame(&mut self) -> Result<Option<ReplayRecord>> {
        loop {
            self.buf.clear();
            let read = self
                .reader
                .read_line(&mut self.buf)
                .context("failed to read replay file")?;
            if read == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let line = self.buf.trim();
            if line.is_empty() {
                continue;
            }

            let record: ReplayRecord = serde_json::from_str(line)
                .with_context(|| format!("invalid replay record on line {}", self.line_no))?;
            record
                .offset()
                .with_context(|| format!("invalid replay record on line {}", self.line_no))?;
            return Ok(Some(record));
        }
    }

    fn frame_offset(&self, frame: &ReplayRecord) -> Option<Duration> {
        frame.offset().ok()
    }
}

/// Serves the keypoints stored in each record.
pub struct RecordedPose;

impl PoseProvider<ReplayRecord> for RecordedPose {
    fn detect_pose(&self, frame: &ReplayRecord) -> Result<Option<PoseDetection>> {
        Ok(frame.pose())
    }
}

/// Serves the stored detections; a record without any behaves like the
/// furniture model being unreachable for that frame.
pub struct RecordedFurniture;

impl FurnitureProvider<ReplayRecord> for RecordedFurniture {
    fn detect_furniture(&self, frame: &ReplayRecord) -> Result<Vec<RawDetection>> {
        frame
            .furniture
            .clone()
            .ok_or_else(|| anyhow!("no furniture detections recorded at t={}", frame.t))
    }
}
