use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hello_playback::api;
use hello_playback::audio::{DeviceListEntry, ToneGenerator};
use hello_playback::config::AppConfig;
use hello_playback::controller::{GlobalFacade, PlaybackController, TouchAction};
use hello_playback::engine::TelemetryEvent;
use hello_playback::telemetry::{self, MetricEvent};
use tokio::sync::{broadcast, mpsc};

/// Frames rendered per block when writing WAV output
const RENDER_BLOCK_FRAMES: usize = 512;

#[derive(Parser, Debug)]
#[command(
    name = "hello_playback",
    about = "Low-latency tone player with live output latency readout"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List output devices offered for selection
    Devices {
        /// Print the list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start an interactive playback session
    Play {
        /// Device list index to select after start
        #[arg(long)]
        device: Option<usize>,
        /// Buffer size option index to select after start (0 = Automatic)
        #[arg(long)]
        bursts: Option<usize>,
        /// Override the latency poll period
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Render the tone to a WAV file without opening an audio device
    Render {
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = 1.0)]
        seconds: f32,
        #[arg(long)]
        frequency: Option<f32>,
        #[arg(long)]
        amplitude: Option<f32>,
    },
}

fn main() -> ExitCode {
    hello_playback::init_logging();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Devices { json } => run_devices(json),
        Commands::Play {
            device,
            bursts,
            interval_ms,
        } => run_play(device, bursts, interval_ms),
        Commands::Render {
            output,
            seconds,
            frequency,
            amplitude,
        } => run_render(output, seconds, frequency, amplitude),
    }
}

fn run_devices(json: bool) -> Result<ExitCode> {
    let devices = api::output_devices();

    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
    } else {
        print_devices(&devices);
    }
    Ok(ExitCode::from(0))
}

fn run_play(
    device: Option<usize>,
    bursts: Option<usize>,
    interval_ms: Option<u64>,
) -> Result<ExitCode> {
    let interval = Duration::from_millis(
        interval_ms.unwrap_or(AppConfig::load().ui.latency_update_interval_ms),
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("building Tokio runtime")?;

    runtime.block_on(play_session(device, bursts, interval))
}

async fn play_session(
    device: Option<usize>,
    bursts: Option<usize>,
    interval: Duration,
) -> Result<ExitCode> {
    let mut engine_events = api::engine().subscribe_telemetry();
    let mut metrics = telemetry::hub().collector().subscribe();
    let mut controller =
        PlaybackController::new(Arc::new(GlobalFacade)).with_update_interval(interval);

    if !controller.on_create() {
        eprintln!("Engine could not be created; tone is disabled for this session.");
    }
    controller.on_devices_updated(api::output_devices());

    if let Some(index) = device {
        if controller.on_device_selected(index).is_none() {
            eprintln!("Device index {index} is not offered");
        }
    }
    if let Some(index) = bursts {
        if controller.on_buffer_size_selected(index).is_none() {
            eprintln!("Buffer size index {index} is not offered");
        }
    }

    print_session_state(&controller);
    print_help();

    let mut latency_rx = controller.start_latency_updates();
    let mut lines = spawn_stdin_reader();

    loop {
        tokio::select! {
            Some(text) = latency_rx.recv() => {
                println!("{text}");
                controller.on_latency_text(text);
            }
            Ok(MetricEvent::Error { code, context }) = metrics.recv() => {
                eprintln!("Warning ({code:?}): {context}");
            }
            line = lines.recv() => {
                let Some(line) = line else { break };
                match SessionCommand::parse(&line) {
                    Some(SessionCommand::Quit) => break,
                    Some(SessionCommand::Telemetry) => print_telemetry(&mut engine_events)?,
                    Some(command) => apply_command(&mut controller, command),
                    None => print_help(),
                }
            }
        }
    }

    controller.on_destroy();
    Ok(ExitCode::from(0))
}

fn apply_command(controller: &mut PlaybackController, command: SessionCommand) {
    match command {
        SessionCommand::Down => controller.on_touch(TouchAction::Down),
        SessionCommand::Up => controller.on_touch(TouchAction::Up),
        SessionCommand::Device(index) => match controller.on_device_selected(index) {
            Some(id) => println!("Selected device id {id}"),
            None => eprintln!("Device index {index} is not offered"),
        },
        SessionCommand::Bursts(index) => match controller.on_buffer_size_selected(index) {
            Some(bursts) => println!("Selected buffer size {bursts}"),
            None => eprintln!("Buffer size index {index} is not offered"),
        },
        SessionCommand::Refresh => {
            controller.on_devices_updated(api::output_devices());
            print_session_state(controller);
        }
        SessionCommand::Status => print_session_state(controller),
        SessionCommand::Telemetry | SessionCommand::Quit => {}
    }
}

/// Forward stdin lines to the session; the channel closes at EOF.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(err) = spawned {
        log::error!("[CLI] Failed to spawn stdin reader: {}", err);
    }
    rx
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionCommand {
    Down,
    Up,
    Device(usize),
    Bursts(usize),
    Refresh,
    Status,
    Telemetry,
    Quit,
}

impl SessionCommand {
    fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let command = match parts.next()? {
            "down" | "d" => Self::Down,
            "up" | "u" => Self::Up,
            "device" => Self::Device(parts.next()?.parse().ok()?),
            "bursts" => Self::Bursts(parts.next()?.parse().ok()?),
            "refresh" | "r" => Self::Refresh,
            "status" | "s" => Self::Status,
            "telemetry" | "t" => Self::Telemetry,
            "quit" | "q" | "exit" => Self::Quit,
            _ => return None,
        };
        Some(command)
    }
}

fn print_help() {
    println!(
        "Commands: down | up | device <index> | bursts <index> | refresh | status | telemetry | quit"
    );
}

fn print_devices(devices: &[DeviceListEntry]) {
    for (index, entry) in devices.iter().enumerate() {
        println!("[{index}] id={} {}", entry.id, entry.name);
    }
}

fn print_session_state(controller: &PlaybackController) {
    println!("Devices:");
    print_devices(controller.devices());
    if let Some(selected) = controller.selected_device() {
        println!("Selected device: {} (id {})", selected.name, selected.id);
    }

    println!("Buffer sizes:");
    for (index, option) in controller.buffer_options().iter().enumerate() {
        println!("[{index}] {}", option.description());
    }
    if let Some(selected) = controller.selected_buffer_size() {
        println!("Selected buffer size: {}", selected.description());
    }
    println!("{}", controller.latency_text());
    let _ = io::stdout().flush();
}

/// Print the engine events since the last call and the metrics history.
fn print_telemetry(engine_events: &mut broadcast::Receiver<TelemetryEvent>) -> Result<()> {
    println!("Engine events:");
    loop {
        match engine_events.try_recv() {
            Ok(event) => println!(
                "  +{}ms {:?}{}",
                event.timestamp_ms,
                event.kind,
                event.detail.map(|d| format!(" ({d})")).unwrap_or_default()
            ),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                println!("  ... {skipped} events skipped");
            }
            Err(_) => break,
        }
    }

    let snapshot = telemetry::hub().snapshot();
    println!(
        "Metrics ({} total, {} dropped from history):",
        snapshot.total_events, snapshot.dropped_events
    );
    println!("{}", serde_json::to_string_pretty(&snapshot.recent)?);
    Ok(())
}

fn run_render(
    output: PathBuf,
    seconds: f32,
    frequency: Option<f32>,
    amplitude: Option<f32>,
) -> Result<ExitCode> {
    let config = AppConfig::load();
    let sample_rate = config.audio.sample_rate;
    let channels = config.audio.channel_count.max(1);
    let mut tone = ToneGenerator::new(
        frequency.unwrap_or(config.tone.frequency_hz),
        amplitude.unwrap_or(config.tone.amplitude),
        sample_rate,
    );

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&output, spec)
        .with_context(|| format!("creating {}", output.display()))?;

    let channels = channels as usize;
    let total_frames = (seconds.max(0.0) * sample_rate as f32).round() as usize;
    let mut block = vec![0.0_f32; RENDER_BLOCK_FRAMES * channels];
    let mut remaining = total_frames;

    while remaining > 0 {
        let frames = remaining.min(RENDER_BLOCK_FRAMES);
        let samples = &mut block[..frames * channels];
        tone.render(samples, channels, true);
        for sample in samples.iter() {
            writer
                .write_sample(*sample)
                .with_context(|| format!("writing {}", output.display()))?;
        }
        remaining -= frames;
    }

    writer
        .finalize()
        .with_context(|| format!("finalizing {}", output.display()))?;
    println!(
        "Rendered {total_frames} frames ({channels} ch, {sample_rate} Hz) to {}",
        output.display()
    );
    Ok(ExitCode::from(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_session_commands() {
        assert_eq!(SessionCommand::parse("down"), Some(SessionCommand::Down));
        assert_eq!(SessionCommand::parse(" up "), Some(SessionCommand::Up));
        assert_eq!(SessionCommand::parse("device 2"), Some(SessionCommand::Device(2)));
        assert_eq!(SessionCommand::parse("bursts 4"), Some(SessionCommand::Bursts(4)));
        assert_eq!(SessionCommand::parse("refresh"), Some(SessionCommand::Refresh));
        assert_eq!(SessionCommand::parse("t"), Some(SessionCommand::Telemetry));
        assert_eq!(SessionCommand::parse("q"), Some(SessionCommand::Quit));
    }

    #[test]
    fn rejects_malformed_commands() {
        assert_eq!(SessionCommand::parse(""), None);
        assert_eq!(SessionCommand::parse("device"), None);
        assert_eq!(SessionCommand::parse("bursts x"), None);
        assert_eq!(SessionCommand::parse("louder"), None);
    }
}
