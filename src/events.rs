//! Scan events
//!
//! The pipeline reports progress by emitting [`ScanEvent`]s to a caller-supplied
//! [`EventSink`] instead of logging directly, so detection stays free of
//! global side effects and its behaviour can be asserted in tests.

use crossbeam_channel::Sender;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::vision::geometry::CornerSet;

/// Progress and outcome notifications from one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    /// A frame arrived while another run was active and was dropped
    FrameSkipped { scan: u64 },
    /// Grayscale conversion and blur finished
    Preprocessed { width: u32, height: u32 },
    /// Edge map computed
    EdgesDetected { edge_pixels: usize },
    /// Flood fill finished; `retained` contours passed the size filters
    ContoursTraced { traced: usize, retained: usize },
    /// A candidate beat the previous best
    CandidateAccepted {
        contour: usize,
        epsilon: f32,
        vertices: usize,
        score: f32,
        area: f32,
    },
    /// Corners were re-fit to the edge pixels
    CornersRefined { max_shift: f32 },
    /// A card boundary was found
    CardDetected { corners: CornerSet, score: f32 },
    /// No quadrilateral cleared the acceptance rules
    NoCardDetected { reason: String },
    /// Rectified image produced
    Rectified { width: u32, height: u32 },
    /// OCR produced an accepted title
    TitleRecognized { title: String, confidence: f32 },
    /// OCR text did not yield a usable title
    TitleRejected { reason: String },
    /// The OCR collaborator returned an error
    OcrFailed { message: String },
}

/// Receiver of scan events
pub trait EventSink {
    fn emit(&self, event: ScanEvent);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: ScanEvent) {}
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: ScanEvent) {
        match &event {
            ScanEvent::CardDetected { corners, score } => {
                info!("Card detected (score {:.3}): {:?}", score, corners.points());
            }
            ScanEvent::TitleRecognized { title, confidence } => {
                info!("Card title detected: {:?} (OCR confidence {:.1}%)", title, confidence);
            }
            ScanEvent::FrameSkipped { scan } => {
                debug!("Frame skipped, scan #{} still running", scan);
            }
            ScanEvent::OcrFailed { message } => warn!("OCR error: {}", message),
            other => debug!("{:?}", other),
        }
    }
}

impl EventSink for Sender<ScanEvent> {
    fn emit(&self, event: ScanEvent) {
        // A dropped receiver only means nobody is listening any more
        let _ = self.send(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for &S {
    fn emit(&self, event: ScanEvent) {
        (**self).emit(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_channel_sink_delivers_events() {
        let (tx, rx) = unbounded();
        tx.emit(ScanEvent::EdgesDetected { edge_pixels: 12 });
        tx.emit(ScanEvent::NoCardDetected {
            reason: "no contours".to_string(),
        });

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], ScanEvent::EdgesDetected { edge_pixels: 12 });
    }

    #[test]
    fn test_channel_sink_ignores_dropped_receiver() {
        let (tx, rx) = unbounded();
        drop(rx);
        tx.emit(ScanEvent::Rectified { width: 1, height: 1 });
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_string(&ScanEvent::Rectified { width: 800, height: 1118 }).unwrap();
        assert_eq!(json, r#"{"event":"rectified","width":800,"height":1118}"#);
    }
}
