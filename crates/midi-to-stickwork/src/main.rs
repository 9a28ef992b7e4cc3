use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::fs;
use std::path::PathBuf;

use midi_to_stickwork::output::{self, OutputFormat, OutputFormatter};
use midi_to_stickwork::{Pipeline, PipelineConfig};

#[derive(Parser, Debug)]
#[command(name = "midi-to-stickwork")]
#[command(about = "Convert MIDI drum tracks to drum-robot measure tables", long_about = None)]
struct Args {
    /// Path to the MIDI file (default: uses first .mid file in current directory)
    #[arg(short, long)]
    midi: Option<PathBuf>,

    /// Output file path (default: `<midi-name>.txt`)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print output to stdout instead of file
    #[arg(long)]
    stdout: bool,

    /// Suppress informational messages (only warnings and errors)
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Log every hand decision
    #[arg(short, long)]
    verbose: bool,

    /// TOML file with pipeline settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Tempo in BPM, used before the first tempo event and for groove and dynamics
    #[arg(long)]
    bpm: Option<f64>,

    /// MIDI channel carrying the drums (1-16)
    #[arg(long)]
    drum_channel: Option<u8>,

    /// Disable drift correction
    #[arg(long)]
    no_groove: bool,

    /// Sidecar `time,instrument,velocity` log for the dynamics windows
    #[arg(long)]
    velocity_log: Option<PathBuf>,

    /// Derive hand power from the MIDI velocities
    #[arg(long)]
    dynamics: bool,

    /// Also write the velocity window table here
    #[arg(long)]
    dynamics_output: Option<PathBuf>,

    /// Directory for intermediate stage dumps
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Tsv)]
    format: OutputFormat,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let config = build_config(&args)?;
    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    // Find MIDI file
    let midi_path = if let Some(path) = &args.midi {
        if !path.exists() {
            anyhow::bail!("MIDI file not found: {}", path.display());
        }
        path.clone()
    } else {
        find_first_midi_file()?
    };

    let output_path = if let Some(path) = &args.output {
        path.clone()
    } else {
        let stem = midi_path.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
        let extension = match args.format {
            OutputFormat::Tsv => "txt",
            OutputFormat::Json => "json",
        };
        PathBuf::from(format!("{}.{}", stem, extension))
    };

    info!("Processing MIDI file: {}", midi_path.display());

    let pipeline = Pipeline::new(config).context("Invalid configuration")?;
    let result = pipeline
        .run_file(&midi_path, args.velocity_log.as_deref())
        .with_context(|| format!("Failed to convert {}", midi_path.display()))?;

    let warnings = result.hit_log.warnings().count();
    if warnings > 0 {
        warn!("{} recoverable problems while decoding", warnings);
    }

    let formatter = OutputFormatter::new(args.format);
    let rendered = formatter.build_output(&result);

    // Nothing is written until the whole pipeline has succeeded
    if let Some(dir) = &args.dump_dir {
        output::write_stage_dumps(dir, &result)
            .with_context(|| format!("Failed to write stage dumps to {}", dir.display()))?;
        info!("Stage dumps saved to {}", dir.display());
    }

    if let Some(path) = &args.dynamics_output {
        fs::write(path, output::dynamics_table(&result.dynamics))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Dynamics saved to {}", path.display());
    }

    if args.stdout {
        print!("{}", rendered);
    } else {
        fs::write(&output_path, &rendered).with_context(|| format!("Failed to write {}", output_path.display()))?;
        info!(
            "Output saved to {} ({} rows, {} measures)",
            output_path.display(),
            result.table.rows.len(),
            result.table.last_measure()
        );
    }

    Ok(())
}

fn init_logging(args: &Args) {
    let level = if args.quiet {
        "warn"
    } else if args.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Config file first, then the flags on top
fn build_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(bpm) = args.bpm {
        config.decoder.default_bpm = bpm;
        config.tempo = Some(bpm);
    }
    if let Some(channel) = args.drum_channel {
        config.decoder.drum_channel = channel;
    }
    if args.no_groove {
        config.groove.enabled = false;
    }
    if args.dynamics {
        config.dynamics.apply_power = true;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn find_first_midi_file() -> Result<PathBuf> {
    let entries = fs::read_dir(".").context("Failed to read current directory")?;

    for entry in entries {
        let path = entry?.path();
        let extension = path.extension().and_then(|s| s.to_str()).map(str::to_ascii_lowercase);
        if matches!(extension.as_deref(), Some("mid") | Some("midi")) {
            return Ok(path);
        }
    }

    anyhow::bail!("No MIDI files found in current directory")
}
