use anyhow::{Context, Result};
use log::*;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use tracking::{ControlState, Snapshot};

/// Consumer of the per-cycle snapshot (display, log, recorder).
pub trait TelemetrySink {
    fn publish(&mut self, snapshot: &Snapshot) -> Result<()>;
}

/// Logs every snapshot at debug level and state changes at info.
#[derive(Default)]
pub struct LogSink {
    last_state: Option<ControlState>,
}

impl TelemetrySink for LogSink {
    fn publish(&mut self, snapshot: &Snapshot) -> Result<()> {
        if self.last_state != Some(snapshot.state) {
            info!(
                "State: {} | Angle: {} | FPS: {:.1}",
                snapshot.state, snapshot.current_angle, snapshot.frame_fps
            );
            self.last_state = Some(snapshot.state);
        }
        match snapshot.reset_in {
            Some(remaining) => debug!(
                "State: {} | Angle: {} | Reset: {:.1}s",
                snapshot.state, snapshot.current_angle, remaining
            ),
            None => debug!(
                "State: {} | Angle: {} | Dir: {:?} | FPS: {:.1} | Box: {:?}",
                snapshot.state,
                snapshot.current_angle,
                snapshot.last_direction,
                snapshot.frame_fps,
                snapshot.detection_box
            ),
        }
        Ok(())
    }
}

/// One JSON document per snapshot, newline separated.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        JsonLinesSink { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TelemetrySink for JsonLinesSink<W> {
    fn publish(&mut self, snapshot: &Snapshot) -> Result<()> {
        serde_json::to_writer(&mut self.writer, snapshot)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Build the sink named in `[telemetry] sink`.
pub fn open(sink: &str) -> Result<Box<dyn TelemetrySink>> {
    match sink {
        "log" => Ok(Box::new(LogSink::default())),
        "stdout" => Ok(Box::new(JsonLinesSink::new(io::stdout()))),
        path => {
            let file = File::create(path).with_context(|| format!("creating telemetry file {}", path))?;
            info!("Writing telemetry to {}", path);
            Ok(Box::new(JsonLinesSink::new(BufWriter::new(file))))
        }
    }
}
