//! Scan Session
//!
//! Drives the scanner over a stream of frames. Only one scan runs at a time:
//! the OCR collaborator sits behind a mutex whose `try_lock` doubles as the
//! "run active" guard, so a frame arriving mid-scan is dropped rather than
//! queued.

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::capture::Frame;
use crate::events::{EventSink, ScanEvent};
use crate::vision::{CardScanner, ScanOutcome, TextRecognizer};

/// Counters kept across scans
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    /// Scans started
    pub scans: u64,
    /// Frames dropped because a scan was active
    pub skipped: u64,
    /// Scans that found a card boundary
    pub detections: u64,
    /// Most recent accepted title
    pub last_title: Option<String>,
}

/// Single-flight scanning over a shared OCR collaborator
pub struct ScanSession<R> {
    scanner: CardScanner,
    recognizer: Mutex<R>,
    stats: RwLock<SessionStats>,
}

impl<R: TextRecognizer> ScanSession<R> {
    /// Create a new session
    pub fn new(scanner: CardScanner, recognizer: R) -> Self {
        Self {
            scanner,
            recognizer: Mutex::new(recognizer),
            stats: RwLock::new(SessionStats::default()),
        }
    }

    /// Scan `frame` unless another scan is in progress.
    ///
    /// Returns `None`, after emitting [`ScanEvent::FrameSkipped`], when the
    /// frame was dropped.
    pub fn try_scan(&self, frame: &Frame, sink: &dyn EventSink) -> Option<ScanOutcome> {
        let Some(mut recognizer) = self.recognizer.try_lock() else {
            let scan = {
                let mut stats = self.stats.write();
                stats.skipped += 1;
                stats.scans
            };
            sink.emit(ScanEvent::FrameSkipped { scan });
            return None;
        };

        let scan = {
            let mut stats = self.stats.write();
            stats.scans += 1;
            stats.scans
        };
        debug!(
            "Scan #{} started on {}x{} frame captured {:?} ago",
            scan,
            frame.width(),
            frame.height(),
            frame.timestamp.elapsed()
        );

        let outcome = self.scanner.scan(frame, &mut *recognizer, sink);
        drop(recognizer);

        {
            let mut stats = self.stats.write();
            if outcome.detection.is_some() {
                stats.detections += 1;
            }
            if let Some(title) = &outcome.title {
                stats.last_title = Some(title.clone());
            }
        }

        if let Some(title) = &outcome.title {
            info!("Scan #{} read title {:?} in {}ms", scan, title, outcome.processing_time_ms);
        } else {
            debug!("Scan #{} finished in {}ms without a title", scan, outcome.processing_time_ms);
        }

        Some(outcome)
    }

    /// Whether a scan is currently running
    pub fn is_active(&self) -> bool {
        self.recognizer.is_locked()
    }

    /// Number of scans started
    pub fn scan_count(&self) -> u64 {
        self.stats.read().scans
    }

    /// Most recent accepted title
    pub fn last_title(&self) -> Option<String> {
        self.stats.read().last_title.clone()
    }

    /// Snapshot of the session counters
    pub fn stats(&self) -> SessionStats {
        self.stats.read().clone()
    }

    /// Clear counters and the last title
    pub fn reset(&self) {
        *self.stats.write() = SessionStats::default();
    }
}
