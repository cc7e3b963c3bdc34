//! Replay of recorded frame streams
//!
//! Input is JSON lines, one frame per line, either landmark frames or
//! pre-extracted observations. Blank lines and `#` comments are skipped.

use alerting::{AlertLevel, AlertPulse};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dms::{DriverState, FaceFrame, FrameObservation};
use monitor::{DrowsinessMonitor, MonitorConfig, TickRecord};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Input line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// `FaceFrame` objects with raw landmark points
    Landmarks,
    /// `FrameObservation` objects with ratios already computed
    Observations,
}

/// Replay a recorded drowsiness session
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// JSON-lines input file, or `-` for stdin
    #[arg(long, short)]
    pub input: String,

    /// Record format of each input line
    #[arg(long, value_enum, default_value = "landmarks")]
    pub format: InputFormat,

    /// TOML or JSON configuration file (DROWSY__* variables override it)
    #[arg(long, env = "DROWSY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Pace frames by their timestamps instead of replaying as fast as possible
    #[arg(long)]
    pub realtime: bool,

    /// Write every tick record to stdout as a JSON line
    #[arg(long)]
    pub json: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    /// Debug logging
    #[arg(long, short)]
    pub verbose: bool,
}

/// Initialize logging on stderr, leaving stdout for records
pub fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.context("Failed to set tracing subscriber")
}

/// One parsed input line
#[derive(Debug, Clone)]
pub enum ReplayFrame {
    Landmarks(FaceFrame),
    Observation(FrameObservation),
}

impl ReplayFrame {
    pub fn timestamp(&self) -> f64 {
        match self {
            ReplayFrame::Landmarks(frame) => frame.timestamp,
            ReplayFrame::Observation(obs) => obs.timestamp,
        }
    }
}

/// Parse one input line, `None` for blank lines and comments
pub fn parse_line(format: InputFormat, line: &str) -> Result<Option<ReplayFrame>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let frame = match format {
        InputFormat::Landmarks => ReplayFrame::Landmarks(serde_json::from_str(line).context("Invalid landmark frame")?),
        InputFormat::Observations => {
            ReplayFrame::Observation(serde_json::from_str(line).context("Invalid observation")?)
        }
    };
    Ok(Some(frame))
}

/// Totals for a finished replay
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplaySummary {
    pub frames: u64,
    pub invalid_lines: u64,
    pub transitions: u64,
    pub pulses: u64,
    pub highest_level: AlertLevel,
    pub final_state: Option<DriverState>,
}

impl ReplaySummary {
    fn observe(&mut self, record: &TickRecord) {
        self.frames += 1;
        self.transitions += u64::from(record.transition.is_some());
        self.pulses += u64::from(record.pulse.is_some());
        self.highest_level = self.highest_level.max(record.alert.level);
        self.final_state = Some(record.state);
    }
}

/// Open the input named on the command line
pub async fn open_input(input: &str) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if input == "-" {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let file = tokio::fs::File::open(input)
        .await
        .with_context(|| format!("Failed to open input {input}"))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Log pulses as they arrive, standing in for the audio consumer
pub fn spawn_pulse_logger(mut pulses: mpsc::Receiver<AlertPulse>) -> tokio::task::JoinHandle<u64> {
    tokio::spawn(async move {
        let mut count = 0;
        while let Some(pulse) = pulses.recv().await {
            count += 1;
            info!(level = %pulse.level, timestamp = pulse.timestamp, sequence = pulse.sequence, "Alert pulse");
        }
        count
    })
}

/// Feed every line of `reader` through `monitor`
pub async fn replay<R, W>(
    monitor: &mut DrowsinessMonitor,
    reader: R,
    format: InputFormat,
    realtime: bool,
    mut records_out: Option<W>,
) -> Result<ReplaySummary>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut summary = ReplaySummary::default();
    let mut lines = reader.lines();
    let mut line_no = 0u64;
    let mut previous_ts: Option<f64> = None;

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        line_no += 1;
        let frame = match parse_line(format, &line) {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(e) => {
                summary.invalid_lines += 1;
                warn!(line = line_no, error = %format!("{e:#}"), "Skipping invalid input line");
                continue;
            }
        };

        if realtime {
            if let Some(prev) = previous_ts {
                let delay = frame.timestamp() - prev;
                if delay.is_finite() && delay > 0.0 {
                    tokio::time::sleep(Duration::from_secs_f64(delay.min(10.0))).await;
                }
            }
            previous_ts = Some(frame.timestamp());
        }

        let record = match frame {
            ReplayFrame::Landmarks(frame) => monitor.tick(&frame),
            ReplayFrame::Observation(obs) => monitor.tick_observation(obs),
        };
        summary.observe(&record);

        if let Some(transition) = &record.transition {
            info!(
                from = %transition.from,
                to = %transition.to,
                reason = ?transition.reason,
                timestamp = transition.timestamp,
                score = transition.score,
                "Alert transition"
            );
        }

        if let Some(out) = records_out.as_mut() {
            serde_json::to_writer(&mut *out, &record).context("Failed to write record")?;
            out.write_all(b"\n").context("Failed to write record")?;
        }
    }

    Ok(summary)
}

/// Run the replay described by `args`
pub async fn run(args: Args) -> Result<ReplaySummary> {
    let config = MonitorConfig::load(args.config.as_deref()).context("Invalid configuration")?;
    let mut monitor = DrowsinessMonitor::new(config).context("Failed to build monitor")?;
    info!(session_id = %monitor.session_id(), input = %args.input, format = ?args.format, "Starting replay");

    let pulses = monitor
        .sinks()
        .take_pulse_receiver()
        .context("Pulse receiver already taken")?;
    let pulse_logger = spawn_pulse_logger(pulses);

    let reader = open_input(&args.input).await?;
    let stdout = args.json.then(|| std::io::BufWriter::new(std::io::stdout().lock()));
    let summary = replay(&mut monitor, reader, args.format, args.realtime, stdout).await?;

    drop(monitor);
    let logged = pulse_logger.await.context("Pulse logger failed")?;
    info!(
        frames = summary.frames,
        invalid_lines = summary.invalid_lines,
        transitions = summary.transitions,
        pulses = logged,
        highest_level = %summary.highest_level,
        final_state = ?summary.final_state,
        "Replay finished"
    );
    Ok(summary)
}
