use anyhow::{anyhow, Context};
use clock::{Clock, SystemClock};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{Delay, SpidevDevice};
use link::{Link, Transport};
use log::*;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracking::Tracker;
use vision::{DetectionSource, JsonLinesSource};

mod config;
mod telemetry;

use config::{Config, LinkConfig, TimingConfig, VisionConfig};
use telemetry::TelemetrySink;

fn main() -> anyhow::Result<()> {
    // Initialize logger, RUST_LOG overrides the default level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load(Path::new(&config_path))?;

    info!("{}", "=".repeat(60));
    info!("Fan tracker starting");
    info!(
        "Link: {} @ {} Hz, mode {} | Frame width: {} | Angles: {}..{} (center {})",
        config.link.device,
        config.link.speed_hz,
        config.link.mode,
        config.tracking.frame_width,
        config.tracking.min_angle,
        config.tracking.max_angle,
        config.tracking.center_angle
    );
    info!("Press the start button on the board to begin");
    info!("{}", "=".repeat(60));

    // ======== Link: Initialization ========
    let link = open_link(&config.link)?;

    // ======== Vision & telemetry ========
    let mut source = open_source(&config.vision)?;
    let mut sink = telemetry::open(&config.telemetry.sink)?;

    let mut tracker = Tracker::new(config.tracking.clone(), link, SystemClock::new())
        .with_start_settle(config.start_settle());

    // Ctrl-C ends the loop so the final reset still goes out
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            info!("Interrupt received, stopping");
            running.store(false, Ordering::SeqCst);
        })
        .context("installing Ctrl-C handler")?;
    }

    run(
        &mut tracker,
        source.as_mut(),
        sink.as_mut(),
        &config.timing,
        &running,
    );

    // ======== Shutdown ========
    let link = tracker.shutdown();
    thread::sleep(config.shutdown_settle());
    let (spi, _delay) = link.release();
    drop(spi);
    info!("Shutdown complete");
    Ok(())
}

/// Cycle until the detection stream ends or `running` is cleared.
fn run<T, C>(
    tracker: &mut Tracker<T, C>,
    source: &mut dyn DetectionSource,
    sink: &mut dyn TelemetrySink,
    timing: &TimingConfig,
    running: &AtomicBool,
) where
    T: Transport,
    C: Clock,
{
    while running.load(Ordering::SeqCst) {
        // A vision error is handed to the tracker, which skips the cycle
        let frame = match source.next_frame() {
            Ok(Some(frame)) => Ok(frame),
            Ok(None) => {
                info!("Detection stream ended");
                break;
            }
            Err(e) => Err(e),
        };

        let snapshot = tracker.cycle(frame);

        if let Err(e) = sink.publish(&snapshot) {
            warn!("Failed to publish telemetry: {:?}", e);
        }

        let pause = timing.pause_for(snapshot.state);
        if !pause.is_zero() {
            thread::sleep(pause);
        }
    }
}

fn open_link(config: &LinkConfig) -> anyhow::Result<Link<SpidevDevice, Delay>> {
    let mut spi = SpidevDevice::open(&config.device)
        .map_err(|e| anyhow!("failed to open {}: {:?}", config.device, e))?;

    let mode = match config.mode {
        0 => SpiModeFlags::SPI_MODE_0,
        1 => SpiModeFlags::SPI_MODE_1,
        2 => SpiModeFlags::SPI_MODE_2,
        _ => SpiModeFlags::SPI_MODE_3,
    };
    let options = SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(config.speed_hz)
        .lsb_first(false)
        .mode(mode)
        .build();
    spi.configure(&options)
        .with_context(|| format!("configuring {}", config.device))?;

    info!("Opened {}", config.device);
    Ok(Link::new(spi, Delay))
}

fn open_source(config: &VisionConfig) -> anyhow::Result<Box<dyn DetectionSource>> {
    if config.source == "-" {
        info!("Reading detections from stdin");
        return Ok(Box::new(JsonLinesSource::new(
            io::stdin().lock(),
            config.confidence_threshold,
        )));
    }

    let file = File::open(&config.source)
        .with_context(|| format!("opening detection stream {}", config.source))?;
    info!("Reading detections from {}", config.source);
    Ok(Box::new(JsonLinesSource::new(
        BufReader::new(file),
        config.confidence_threshold,
    )))
}
