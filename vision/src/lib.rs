pub mod detection;

pub mod source {
    use crate::detection::{BoundingBox, Detection, DetectionFrame};
    use serde::Deserialize;
    use std::io::BufRead;

    /// Class label the detector uses for people
    pub const PERSON_LABEL: &str = "person";
    /// Line that ends a detection stream
    pub const QUIT_LINE: &str = "quit";

    #[derive(Debug, thiserror::Error)]
    pub enum VisionError {
        #[error("failed to read detection stream: {0}")]
        Io(#[from] std::io::Error),
        #[error("malformed detection frame on line {line}: {source}")]
        Malformed {
            line: usize,
            #[source]
            source: serde_json::Error,
        },
    }

    /// Upstream vision subsystem as seen by the control loop.
    pub trait DetectionSource {
        /// Next frame's person detections. `Ok(None)` means the stream has ended
        /// and the control loop should shut down.
        fn next_frame(&mut self) -> Result<Option<DetectionFrame>, VisionError>;
    }

    #[derive(Deserialize)]
    struct RawFrame {
        #[serde(default)]
        detections: Vec<RawDetection>,
    }

    #[derive(Deserialize)]
    struct RawDetection {
        label: String,
        confidence: f32,
        #[serde(rename = "box")]
        bounding_box: [i32; 4],
    }

    /// Reads one JSON document per line from an external detector process:
    ///
    /// `{"detections":[{"label":"person","confidence":0.82,"box":[100,40,60,180]}]}`
    ///
    /// Only `person` entries at or above the confidence threshold are kept.
    pub struct JsonLinesSource<R> {
        reader: R,
        confidence_threshold: f32,
        buf: String,
        line: usize,
    }

    impl<R: BufRead> JsonLinesSource<R> {
        pub fn new(reader: R, confidence_threshold: f32) -> JsonLinesSource<R> {
            JsonLinesSource {
                reader,
                confidence_threshold,
                buf: String::new(),
                line: 0,
            }
        }

        fn parse(&self, text: &str) -> Result<DetectionFrame, VisionError> {
            let raw: RawFrame = serde_json::from_str(text).map_err(|source| VisionError::Malformed {
                line: self.line,
                source,
            })?;

            let mut frame = DetectionFrame::empty();
            for d in raw.detections {
                if d.label != PERSON_LABEL || d.confidence < self.confidence_threshold {
                    continue;
                }
                let [left, top, width, height] = d.bounding_box;
                frame.push(Detection::from_box(
                    BoundingBox::new(left, top, width, height),
                    d.confidence,
                ));
            }
            Ok(frame)
        }
    }

    impl<R: BufRead> DetectionSource for JsonLinesSource<R> {
        fn next_frame(&mut self) -> Result<Option<DetectionFrame>, VisionError> {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;

            let text = self.buf.trim();
            if text == QUIT_LINE {
                log::info!("Detection stream requested shutdown");
                return Ok(None);
            }
            if text.is_empty() {
                return Ok(Some(DetectionFrame::empty()));
            }
            self.parse(text).map(Some)
        }
    }

}

pub use detection::{BoundingBox, Detection, DetectionFrame};
pub use source::{DetectionSource, JsonLinesSource, VisionError};
