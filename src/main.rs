//! OSR Script CLI - Encode funscripts into frame tables and play them back.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Args, CommandFactory, Parser, Subcommand};
use osr_script::{
    schema::{DEFAULT_INTERVAL_MS, EncoderConfig, PlayerConfig, discover_sources},
    script::{EncodeStats, EncodedScript, ScriptPlayer, Tick, encode_source_set},
};

#[derive(Debug, Parser)]
#[command(
    name = "osr-script",
    about = "Encode funscripts into a fixed-rate .srbs frame table and play it as T-code",
    version
)]
struct Cli {
    /// Print example encoder and player configurations.
    #[arg(long)]
    example: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Merge a script and its axis siblings (Name.roll.funscript, ...).
    Encode(EncodeArgs),

    /// Print one T-code command per frame in real time.
    Play(PlayArgs),

    /// Print the header and per-channel statistics.
    Inspect(InspectArgs),
}

#[derive(Debug, Args)]
struct EncodeArgs {
    /// Main .funscript file.
    input: PathBuf,

    /// Sample interval in ms, 100-10000.
    #[arg(short = 'v', long = "interval", default_value_t = DEFAULT_INTERVAL_MS)]
    interval_ms: u32,

    /// Output directory (default: current directory).
    #[arg(short = 'o', long = "output-dir")]
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct PlayArgs {
    /// Encoded .srbs script.
    script: PathBuf,

    /// Playback interval override in ms.
    #[arg(short = 'v', long = "interval")]
    interval_ms: Option<u32>,

    /// Frames held in memory (default: 128).
    #[arg(short = 'w', long = "window")]
    window_length: Option<usize>,

    /// Player configuration file.
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Never emit surge/sway commands.
    #[arg(long = "no-extra-axes")]
    no_extra_axes: bool,
}

#[derive(Debug, Args)]
struct InspectArgs {
    /// Encoded .srbs script.
    script: PathBuf,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    if cli.example {
        print_example_config();
        return;
    }

    match cli.command {
        Some(Commands::Encode(args)) => run_encode(args),
        Some(Commands::Play(args)) => run_play(args),
        Some(Commands::Inspect(args)) => run_inspect(args),
        None => {
            let _ = Cli::command().print_help();
            std::process::exit(1);
        }
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{}", message);
    std::process::exit(1);
}

fn run_encode(args: EncodeArgs) {
    let config = EncoderConfig {
        interval_ms: args.interval_ms,
        output_dir: args.output_dir,
    };
    println!("-v = {}", config.interval_ms);

    config
        .validate()
        .unwrap_or_else(|e| fail(format!("Invalid configuration: {}", e)));

    let input = args.input;
    let set = discover_sources(&input)
        .unwrap_or_else(|e| fail(format!("Error reading {}: {}", input.display(), e)));

    println!("Script: {}", set.base_name);
    for path in &set.paths {
        println!("  {}", path.display());
    }
    println!();

    let (out_path, stats) = encode_source_set(&set, &config)
        .unwrap_or_else(|e| fail(format!("Failed to create file: {}", e)));

    println!("Encoded: {}", stats);
    println!("Binary OSR script saved to {}", out_path.display());
}

fn run_play(args: PlayArgs) {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .unwrap_or_else(|e| fail(format!("Error reading config file: {}", e)));
            serde_json::from_str(&text)
                .unwrap_or_else(|e| fail(format!("Error parsing config: {}", e)))
        }
        None => PlayerConfig::default(),
    };
    if let Some(window_length) = args.window_length {
        config.window_length = window_length;
    }
    if args.no_extra_axes {
        config.extra_axes = false;
    }

    let input = args.script;
    let mut player = ScriptPlayer::open(&input, &config)
        .unwrap_or_else(|e| fail(format!("Invalid configuration: {}", e)));

    if let Some(e) = player.validation_error() {
        fail(format!("Script file {} is not available: {}", input.display(), e));
    }

    println!("Loading script from: {}", input.display());
    println!("  {}", player.header());
    println!();

    player.play();
    if let Some(v) = args.interval_ms
        && !player.set_interval(v)
    {
        eprintln!("Ignoring out-of-range interval {} ms", v);
    }

    let start = Instant::now();
    let mut commands = 0u64;
    loop {
        let tick = player.advance();
        match &tick {
            Tick::Command(command) => {
                commands += 1;
                println!(
                    "[{}|{}] Tcode: {}",
                    player.position(),
                    player.position() as u64 * player.interval_ms() as u64,
                    command
                );
            }
            Tick::Finished => break,
            Tick::Invalid => fail(Tick::INVALID_MESSAGE),
            _ => {}
        }
        if !tick.is_active() {
            break;
        }
        // Poll at twice the frame rate so no frame is missed
        let nap = (player.interval_ms() / 2).max(1);
        std::thread::sleep(Duration::from_millis(nap as u64));
    }

    println!();
    println!(
        "Played {} frames in {:.2}s",
        commands,
        start.elapsed().as_secs_f32()
    );
}

fn run_inspect(args: InspectArgs) {
    let input = args.script;
    let script = EncodedScript::open(&input).unwrap_or_else(|e| {
        fail(format!(
            "Script file {} is not available: {}",
            input.display(),
            e
        ))
    });
    let stats = EncodeStats::from_script(&script);

    println!("{}", input.display());
    println!("  {}", script.header);
    println!("  {}", stats);
}

fn print_example_config() {
    println!("Example encoder configuration:");
    println!(
        "{}",
        serde_json::to_string_pretty(&EncoderConfig::default()).unwrap_or_default()
    );
    println!();
    println!("Example player configuration (play -c config.json):");
    println!(
        "{}",
        serde_json::to_string_pretty(&PlayerConfig::default()).unwrap_or_default()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_encode_defaults() {
        let cli = Cli::try_parse_from(["osr-script", "encode", "Clip.funscript"]).unwrap();
        let Some(Commands::Encode(args)) = cli.command else {
            panic!("expected encode");
        };
        assert_eq!(args.input, PathBuf::from("Clip.funscript"));
        assert_eq!(args.interval_ms, DEFAULT_INTERVAL_MS);
        assert_eq!(args.output_dir, None);
    }

    #[test]
    fn test_play_flags() {
        let cli = Cli::try_parse_from([
            "osr-script",
            "play",
            "Clip.srbs",
            "-v",
            "50",
            "-w",
            "16",
            "-c",
            "player.json",
            "--no-extra-axes",
        ])
        .unwrap();
        let Some(Commands::Play(args)) = cli.command else {
            panic!("expected play");
        };
        assert_eq!(args.script, PathBuf::from("Clip.srbs"));
        assert_eq!(args.interval_ms, Some(50));
        assert_eq!(args.window_length, Some(16));
        assert_eq!(args.config, Some(PathBuf::from("player.json")));
        assert!(args.no_extra_axes);
    }

    #[test]
    fn test_bad_values_rejected() {
        assert!(
            Cli::try_parse_from(["osr-script", "encode", "a.funscript", "-v", "fast"]).is_err()
        );
        assert!(Cli::try_parse_from(["osr-script", "play", "a.srbs", "-w", "-3"]).is_err());
        assert!(Cli::try_parse_from(["osr-script", "inspect"]).is_err());
        assert!(Cli::try_parse_from(["osr-script", "rewind", "a.srbs"]).is_err());
    }

    #[test]
    fn test_example_flag() {
        let cli = Cli::try_parse_from(["osr-script", "--example"]).unwrap();
        assert!(cli.example);
        assert!(cli.command.is_none());
    }
}
