//! Card Vision Layer
//!
//! Finds the boundary of a trading card in a camera frame, rectifies it to a
//! fronto-parallel image and extracts the title band for OCR.
//!
//! Stages run strictly forward, once per frame:
//! - grayscale + Gaussian blur
//! - Sobel edges with hysteresis
//! - flood-fill contours
//! - hull + Douglas-Peucker sweep, rectangularity scoring
//! - quadrant corner reduction and line-fit refinement
//! - perspective rectification
//! - title crop and OCR post-processing

pub mod contours;
pub mod edges;
pub mod geometry;
pub mod hull;
pub mod ocr;
pub mod preprocess;
pub mod rectify;
pub mod refine;
mod rows;
pub mod scoring;
pub mod simplify;
pub mod title;

use image::{GrayImage, RgbaImage};
use serde::Serialize;
use std::time::Instant;

use crate::capture::Frame;
use crate::config::ScannerConfig;
use crate::events::{EventSink, ScanEvent};

pub use contours::Contour;
pub use geometry::{Bounds, CornerSet, Point};
pub use ocr::{OcrText, TextRecognizer};
pub use preprocess::GrayF32;
pub use scoring::{Candidate, ScoreBreakdown};
pub use title::TitleRejection;

/// Smallest frame dimension the edge detector can work with
const MIN_FRAME_DIMENSION: u32 = 3;

/// Located card boundary
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Detection {
    /// Corners ordered by angle about their centroid
    pub corners: CornerSet,
    /// Rectangularity score of the winning polygon (0.0 - 1.0)
    pub score: f32,
    /// Area of the winning polygon in pixels
    pub area: f32,
}

/// Intermediates of one detection pass over a frame
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Luma of the input frame
    pub gray: GrayF32,
    /// Luma after Gaussian smoothing
    pub blurred: GrayF32,
    /// Binary edge map
    pub edges: GrayImage,
    /// Contours that passed the size filters, largest first
    pub contours: Vec<Contour>,
    /// Best-scoring quadrilateral, before ordering and refinement
    pub candidate: Option<Candidate>,
    /// Final result
    pub detection: Option<Detection>,
}

impl PipelineRun {
    /// Run stages 1-6 over `image`
    pub fn execute(image: &RgbaImage, config: &ScannerConfig, sink: &dyn EventSink) -> Self {
        let (width, height) = image.dimensions();

        let gray = preprocess::grayscale(image);
        let blurred = preprocess::gaussian_blur(&gray, config.preprocess.blur_sigma);
        sink.emit(ScanEvent::Preprocessed { width, height });

        let mut run = Self {
            gray,
            blurred,
            edges: GrayImage::new(width, height),
            contours: Vec::new(),
            candidate: None,
            detection: None,
        };

        if width < MIN_FRAME_DIMENSION || height < MIN_FRAME_DIMENSION {
            sink.emit(ScanEvent::NoCardDetected {
                reason: format!("frame {}x{} is too small", width, height),
            });
            return run;
        }

        run.edges = edges::detect_edges(&run.blurred, &config.edges);
        sink.emit(ScanEvent::EdgesDetected {
            edge_pixels: edges::count_edges(&run.edges),
        });

        let traced = contours::trace_contours(&run.edges);
        let traced_count = traced.len();
        run.contours = contours::filter_contours(traced, width, height, &config.contours);
        sink.emit(ScanEvent::ContoursTraced {
            traced: traced_count,
            retained: run.contours.len(),
        });

        run.candidate = scoring::select_candidate(
            &run.contours,
            width,
            height,
            &config.detection,
            &config.scoring,
            sink,
        );

        run.detection = match &run.candidate {
            Some(candidate) => Some(run.locate(candidate, config, sink)),
            None => {
                let reason = if run.contours.is_empty() {
                    "no contour passed the size filters"
                } else {
                    "no quadrilateral cleared the acceptance rules"
                };
                sink.emit(ScanEvent::NoCardDetected {
                    reason: reason.to_string(),
                });
                None
            }
        };

        run
    }

    /// Order and refine the winning candidate's corners
    fn locate(&self, candidate: &Candidate, config: &ScannerConfig, sink: &dyn EventSink) -> Detection {
        let mut corners = CornerSet::from_unordered(candidate.polygon);

        if config.detection.refine_corners {
            let points = &self.contours[candidate.contour].points;
            if let Some((refined, max_shift)) =
                refine::refine_corners(&corners, points, config.detection.max_refine_shift)
            {
                sink.emit(ScanEvent::CornersRefined { max_shift });
                corners = refined;
            }
        }

        sink.emit(ScanEvent::CardDetected {
            corners,
            score: candidate.score,
        });

        Detection {
            corners,
            score: candidate.score,
            area: candidate.area,
        }
    }
}

/// Everything produced by a full scan of one frame
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub detection: Option<Detection>,
    /// Card warped to the configured output size
    pub rectified: Option<RgbaImage>,
    /// Region handed to OCR: the title band, or the guide box as fallback
    pub title_crop: Option<RgbaImage>,
    /// Raw OCR output, when OCR ran and succeeded
    pub ocr: Option<OcrText>,
    /// Accepted, normalised card title
    pub title: Option<String>,
    /// Wall time of the whole scan
    pub processing_time_ms: u64,
}

/// Card detection, rectification and title extraction
#[derive(Debug, Clone, Default)]
pub struct CardScanner {
    config: ScannerConfig,
}

impl CardScanner {
    /// Create a scanner with default configuration
    pub fn new() -> Self {
        Self::with_config(ScannerConfig::default())
    }

    /// Create a scanner with custom configuration
    pub fn with_config(config: ScannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Run detection and keep every intermediate
    pub fn run(&self, frame: &Frame, sink: &dyn EventSink) -> PipelineRun {
        PipelineRun::execute(frame.image(), &self.config, sink)
    }

    /// Locate the card boundary
    pub fn detect(&self, frame: &Frame, sink: &dyn EventSink) -> Option<Detection> {
        self.run(frame, sink).detection
    }

    /// Warp the quadrilateral `corners` of a frame to the configured output size
    pub fn rectify(&self, frame: &Frame, corners: &CornerSet) -> RgbaImage {
        let cfg = &self.config.rectify;
        rectify::rectify(frame.image(), corners, cfg.width, cfg.height, cfg.mode)
    }

    /// Detect, rectify and read the title of the card in `frame`.
    ///
    /// The recognizer is invoked at most once.
    pub fn scan(
        &self,
        frame: &Frame,
        recognizer: &mut dyn TextRecognizer,
        sink: &dyn EventSink,
    ) -> ScanOutcome {
        let start = Instant::now();
        let title_cfg = &self.config.title;

        let detection = self.detect(frame, sink);

        let rectified = detection.map(|d| {
            let image = self.rectify(frame, &d.corners);
            sink.emit(ScanEvent::Rectified {
                width: image.width(),
                height: image.height(),
            });
            image
        });

        let title_crop = match &rectified {
            Some(image) => Some(title::crop_title(image, title_cfg.crop_fraction)),
            None if title_cfg.guide_box_fallback && !frame.is_empty() => Some(title::guide_box(
                frame.image(),
                title_cfg.guide_box_width,
                title_cfg.guide_box_height,
            )),
            None => None,
        };

        let (ocr, title) = match &title_crop {
            Some(crop) => self.read_title(crop, recognizer, sink),
            None => (None, None),
        };

        ScanOutcome {
            detection,
            rectified,
            title_crop,
            ocr,
            title,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Run OCR on a title region and post-process the text
    pub fn read_title(
        &self,
        image: &RgbaImage,
        recognizer: &mut dyn TextRecognizer,
        sink: &dyn EventSink,
    ) -> (Option<OcrText>, Option<String>) {
        let ocr = match recognizer.recognize(image) {
            Ok(ocr) => ocr,
            Err(e) => {
                sink.emit(ScanEvent::OcrFailed {
                    message: format!("{:#}", e),
                });
                return (None, None);
            }
        };

        let title = match title::evaluate_title(&ocr, &self.config.title) {
            Ok(title) => {
                sink.emit(ScanEvent::TitleRecognized {
                    title: title.clone(),
                    confidence: ocr.confidence,
                });
                Some(title)
            }
            Err(rejection) => {
                sink.emit(ScanEvent::TitleRejected {
                    reason: rejection.to_string(),
                });
                None
            }
        };

        (Some(ocr), title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullSink;
    use anyhow::{anyhow, Result};
    use crossbeam_channel::unbounded;
    use image::Rgba;
    use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
    use imageproc::rect::Rect;

    /// White 300x400 card with corner radius `r` at (150, 60) on a black 640x520 frame
    fn rounded_card(r: i32) -> Frame {
        let white = Rgba([255, 255, 255, 255]);
        let mut img = RgbaImage::from_pixel(640, 520, Rgba([0, 0, 0, 255]));
        draw_filled_rect_mut(&mut img, Rect::at(150, 60 + r).of_size(300, (400 - 2 * r) as u32), white);
        draw_filled_rect_mut(&mut img, Rect::at(150 + r, 60).of_size((300 - 2 * r) as u32, 400), white);
        for (cx, cy) in [(150 + r, 60 + r), (449 - r, 60 + r), (449 - r, 459 - r), (150 + r, 459 - r)] {
            draw_filled_circle_mut(&mut img, (cx, cy), r, white);
        }
        Frame::from_image(img)
    }

    /// White 300x200 rectangle at (50, 50) on a black 400x300 frame
    fn scenario_a() -> Frame {
        let mut img = RgbaImage::from_pixel(400, 300, Rgba([0, 0, 0, 255]));
        draw_filled_rect_mut(&mut img, Rect::at(50, 50).of_size(300, 200), Rgba([255, 255, 255, 255]));
        Frame::from_image(img)
    }

    fn event_names(events: &[ScanEvent]) -> Vec<String> {
        events
            .iter()
            .map(|e| serde_json::to_value(e).unwrap()["event"].as_str().unwrap().to_string())
            .collect()
    }

    /// Corners match `expected` up to a cyclic rotation
    fn assert_corners_near(corners: &CornerSet, expected: [Point; 4], tolerance: f32) {
        let pts = corners.points();
        let matched = (0..4).any(|shift| (0..4).all(|i| pts[(i + shift) % 4].distance(&expected[i]) <= tolerance));
        assert!(matched, "corners {:?} not within {} of {:?}", pts, tolerance, expected);
    }

    #[test]
    fn test_scenario_a_detects_rectangle() {
        let scanner = CardScanner::new();
        let detection = scanner.detect(&scenario_a(), &NullSink).unwrap();

        assert_corners_near(
            &detection.corners,
            [
                Point::new(50.0, 50.0),
                Point::new(350.0, 50.0),
                Point::new(350.0, 250.0),
                Point::new(50.0, 250.0),
            ],
            2.0,
        );
        assert!((detection.corners.area() - 60_000.0).abs() < 1_500.0);
        assert!(detection.score > 0.7, "score {}", detection.score);
        assert!(detection.score <= 1.0);
    }

    #[test]
    fn test_scenario_a_without_refinement_stays_on_edge_band() {
        let mut config = ScannerConfig::default();
        config.detection.refine_corners = false;
        let detection = CardScanner::with_config(config).detect(&scenario_a(), &NullSink).unwrap();

        assert_corners_near(
            &detection.corners,
            [
                Point::new(50.0, 50.0),
                Point::new(350.0, 50.0),
                Point::new(350.0, 250.0),
                Point::new(50.0, 250.0),
            ],
            6.0,
        );
    }

    #[test]
    fn test_rounded_card_corners_meet_straight_sides() {
        let scanner = CardScanner::new();
        // Corner radius 5-8% of the card width
        for r in [15, 20, 24] {
            let detection = scanner
                .detect(&rounded_card(r), &NullSink)
                .unwrap_or_else(|| panic!("no card with radius {}", r));
            assert_corners_near(
                &detection.corners,
                [
                    Point::new(150.0, 60.0),
                    Point::new(450.0, 60.0),
                    Point::new(450.0, 460.0),
                    Point::new(150.0, 460.0),
                ],
                2.0,
            );
            assert!(detection.score > 0.7, "radius {} score {}", r, detection.score);
        }
    }

    #[test]
    fn test_scenario_b_black_frame_finds_nothing() {
        let frame = Frame::from_image(RgbaImage::from_pixel(400, 300, Rgba([0, 0, 0, 255])));
        let run = CardScanner::new().run(&frame, &NullSink);
        assert!(run.contours.is_empty());
        assert!(run.candidate.is_none());
        assert!(run.detection.is_none());
    }

    #[test]
    fn test_tiny_and_empty_frames() {
        let scanner = CardScanner::new();
        let (tx, rx) = unbounded();

        let tiny = Frame::from_raw(vec![255; 2 * 2 * 4], 2, 2).unwrap();
        assert!(scanner.detect(&tiny, &tx).is_none());
        let empty = Frame::from_raw(Vec::new(), 0, 0).unwrap();
        assert!(scanner.detect(&empty, &tx).is_none());

        let names = event_names(&rx.try_iter().collect::<Vec<_>>());
        assert_eq!(names, ["preprocessed", "no_card_detected", "preprocessed", "no_card_detected"]);
    }

    #[test]
    fn test_scan_reads_title_once() {
        let scanner = CardScanner::new();
        let mut calls = 0;
        let mut crop_size = (0, 0);
        let mut recognizer = |img: &RgbaImage| -> Result<OcrText> {
            calls += 1;
            crop_size = img.dimensions();
            Ok(OcrText::new("Lightning Bolt\nInstant\n...", 85.0))
        };

        let outcome = scanner.scan(&scenario_a(), &mut recognizer, &NullSink);
        drop(recognizer);

        assert_eq!(calls, 1);
        assert_eq!(crop_size, (800, 134));
        assert_eq!(outcome.title.as_deref(), Some("lightning bolt"));
        assert_eq!(outcome.rectified.as_ref().map(|r| r.dimensions()), Some((800, 1118)));

        // Rectified card is the white interior
        let rectified = outcome.rectified.unwrap();
        assert_eq!(*rectified.get_pixel(400, 559), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_scan_event_order() {
        let scanner = CardScanner::new();
        let (tx, rx) = unbounded();
        let mut recognizer = |_: &RgbaImage| -> Result<OcrText> { Ok(OcrText::new("Lightning Bolt", 85.0)) };
        scanner.scan(&scenario_a(), &mut recognizer, &tx);

        let mut names = event_names(&rx.try_iter().collect::<Vec<_>>());
        names.dedup();
        assert_eq!(
            names,
            [
                "preprocessed",
                "edges_detected",
                "contours_traced",
                "candidate_accepted",
                "corners_refined",
                "card_detected",
                "rectified",
                "title_recognized",
            ]
        );
    }

    #[test]
    fn test_no_detection_skips_ocr() {
        let frame = Frame::from_image(RgbaImage::from_pixel(400, 300, Rgba([0, 0, 0, 255])));
        let mut calls = 0;
        let mut recognizer = |_: &RgbaImage| -> Result<OcrText> {
            calls += 1;
            Ok(OcrText::default())
        };
        let outcome = CardScanner::new().scan(&frame, &mut recognizer, &NullSink);
        drop(recognizer);

        assert_eq!(calls, 0);
        assert!(outcome.detection.is_none());
        assert!(outcome.title_crop.is_none());
        assert!(outcome.title.is_none());
    }

    #[test]
    fn test_guide_box_fallback() {
        let mut config = ScannerConfig::default();
        config.title.guide_box_fallback = true;
        let frame = Frame::from_image(RgbaImage::from_pixel(400, 300, Rgba([0, 0, 0, 255])));

        let mut recognizer = |_: &RgbaImage| -> Result<OcrText> { Ok(OcrText::new("Llanowar Elves", 60.0)) };
        let outcome = CardScanner::with_config(config).scan(&frame, &mut recognizer, &NullSink);

        assert!(outcome.detection.is_none());
        assert_eq!(outcome.title_crop.map(|c| c.dimensions()), Some((240, 90)));
        assert_eq!(outcome.title.as_deref(), Some("llanowar elves"));
    }

    #[test]
    fn test_ocr_failure_is_reported() {
        let scanner = CardScanner::new();
        let (tx, rx) = unbounded();
        let mut recognizer = |_: &RgbaImage| -> Result<OcrText> { Err(anyhow!("engine offline")) };
        let outcome = scanner.scan(&scenario_a(), &mut recognizer, &tx);

        assert!(outcome.detection.is_some());
        assert!(outcome.ocr.is_none());
        assert!(outcome.title.is_none());
        assert!(rx
            .try_iter()
            .any(|e| e == ScanEvent::OcrFailed { message: "engine offline".to_string() }));
    }

    #[test]
    fn test_low_confidence_title_is_rejected() {
        let scanner = CardScanner::new();
        let mut recognizer = |_: &RgbaImage| -> Result<OcrText> { Ok(OcrText::new("Lightning Bolt", 25.0)) };
        let outcome = scanner.scan(&scenario_a(), &mut recognizer, &NullSink);
        assert!(outcome.ocr.is_some());
        assert!(outcome.title.is_none());
    }
}
