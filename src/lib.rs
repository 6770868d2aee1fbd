//! Card Scanner - trading card boundary detection and title extraction
//!
//! Locates a physical card in a single camera frame, rectifies it to a
//! canonical fronto-parallel image and crops the title band for an external
//! OCR engine.

pub mod capture;
pub mod config;
pub mod error;
pub mod events;
pub mod session;
pub mod vision;

pub use capture::{Frame, FrameSource, ImageFileSource};
pub use config::ScannerConfig;
pub use error::ScanError;
pub use events::{EventSink, NullSink, ScanEvent, TracingSink};
pub use session::{ScanSession, SessionStats};
pub use vision::{CardScanner, CornerSet, Detection, OcrText, Point, ScanOutcome, TextRecognizer};
