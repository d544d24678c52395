use std::io::Read as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use cw_engine::generator::Generator;
use cw_engine::limits;
use cw_engine::sink::{NullSink, RodioSink, Sink, WavFileSink};
use cw_engine::slope::SlopeShape;
use cw_engine::straight_key::StraightKey;

#[derive(Parser, Debug)]
#[command(author, version, about = "Send text as Morse code over a real-time tone generator", long_about = None)]
struct Args {
    /// Speed in WPM (PARIS standard)
    #[arg(short, long, default_value_t = limits::SPEED_INITIAL, value_parser = clap::value_parser!(u32).range(limits::SPEED_MIN as i64..=limits::SPEED_MAX as i64))]
    wpm: u32,

    /// Tone frequency in Hz
    #[arg(short, long, default_value_t = limits::FREQ_INITIAL)]
    tone: u16,

    /// Volume, 0-100
    #[arg(long, default_value_t = limits::VOL_INITIAL)]
    volume: u32,

    /// Extra inter-character/word gap, in dot units
    #[arg(short, long, default_value_t = 0, value_parser = clap::value_parser!(u32).range(limits::GAP_MIN as i64..=limits::GAP_MAX as i64))]
    gap: u32,

    /// Dot/dash weighting, 20-80 (50 = unweighted)
    #[arg(long, default_value_t = limits::WEIGHT_INITIAL)]
    weighting: u32,

    /// Envelope shape applied at tone edges
    #[arg(long, value_enum, default_value_t = SlopeShape::RaisedCosine)]
    slope: SlopeShape,

    /// Envelope length in microseconds
    #[arg(long, default_value_t = 4_000)]
    slope_us: i32,

    /// Where to send audio
    #[arg(long, value_enum, default_value_t = OutputMode::Audio)]
    output: OutputMode,

    /// Write audio to this WAV file instead of playing it (implies --output wav)
    #[arg(long)]
    output_file: Option<String>,

    /// Read text from this file instead of stdin
    #[arg(short, long)]
    file: Option<String>,

    /// Key straight instead of sending text: each input line toggles the
    /// key closed/open rather than being decoded into Morse
    #[arg(long)]
    straight_key: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputMode {
    Audio,
    Wav,
    Silent,
}

fn read_input(args: &Args) -> Result<String> {
    if let Some(path) = &args.file {
        std::fs::read_to_string(path).with_context(|| format!("reading {path}"))
    } else {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading stdin")?;
        Ok(buf)
    }
}

fn build_generator(args: &Args) -> Result<Generator> {
    let output = if args.output_file.is_some() {
        OutputMode::Wav
    } else {
        args.output
    };
    let output_file = args.output_file.clone();

    let generator = match output {
        OutputMode::Audio => Generator::new(|| Box::new(RodioSink::new(44_100, 512)) as Box<dyn Sink>),
        OutputMode::Wav => {
            let path = output_file.unwrap_or_else(|| "cw-demo.wav".to_string());
            Generator::new(move || Box::new(WavFileSink::new(path, 44_100, 512)) as Box<dyn Sink>)
        }
        OutputMode::Silent => Generator::new(|| Box::new(NullSink::new(44_100, 512)) as Box<dyn Sink>),
    };

    generator.start(None)?;
    generator.set_speed(args.wpm)?;
    generator.set_frequency(args.tone)?;
    generator.set_volume(args.volume)?;
    generator.set_gap(args.gap)?;
    generator.set_weighting(args.weighting)?;
    generator.set_slope(Some(args.slope), Some(args.slope_us))?;
    Ok(generator)
}

fn run_text_mode(generator: &Generator, text: &str) -> Result<()> {
    generator.enqueue_string(text)?;
    generator.wait_for_level(0);
    Ok(())
}

fn run_straight_key_mode(generator: Arc<Generator>, text: &str) -> Result<()> {
    let mut key = StraightKey::new(generator.clone());
    for line in text.lines() {
        let closed = matches!(line.trim(), "1" | "down" | "close");
        key.set_closed(closed)?;
    }
    key.set_closed(false)?;
    generator.wait_for_level(0);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let text = read_input(&args)?;

    let generator = Arc::new(build_generator(&args)?);

    if args.straight_key {
        run_straight_key_mode(generator.clone(), &text)?;
    } else {
        run_text_mode(&generator, &text)?;
    }

    generator.stop()?;
    Ok(())
}
