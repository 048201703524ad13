//! Command-line interface

use clap::{Args, Parser, Subcommand};
use sleeptempo_audio::TempoStep;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sleeptempo")]
#[command(about = "Metronome that walks a ladder of slowing tempos", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Log debug detail (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play the ladder on the default output device
    Play(PlayArgs),
    /// Render the ladder to a WAV file
    Render(RenderArgs),
    /// List the click sounds and how each one loaded
    Sounds(AssetArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AssetArgs {
    /// Directory holding sounds/ and voice/
    #[arg(long, default_value = "assets")]
    pub assets: PathBuf,
}

/// Options shared by everything that plays a ladder
#[derive(Args, Debug, Clone, Default)]
pub struct LadderArgs {
    /// Settings JSON file (sound, voiceCountEnabled, ladder)
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Click sound key, e.g. WOODBLOCK
    #[arg(long)]
    pub sound: Option<String>,

    /// Disable the spoken count every ten beats
    #[arg(long)]
    pub no_voice: bool,

    /// Replace the ladder; repeat for each step in order
    #[arg(long = "step", value_name = "BPM:BEATS")]
    pub steps: Vec<TempoStep>,
}

#[derive(Args, Debug)]
pub struct PlayArgs {
    #[command(flatten)]
    pub ladder: LadderArgs,

    #[command(flatten)]
    pub assets: AssetArgs,

    /// Stop after this many seconds even if the ladder is not finished
    #[arg(long, value_name = "SECS")]
    pub stop_after: Option<f64>,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub ladder: LadderArgs,

    #[command(flatten)]
    pub assets: AssetArgs,

    /// Output WAV path
    #[arg(short, long)]
    pub out: PathBuf,

    #[arg(long, default_value = "44100")]
    pub sample_rate: u32,

    #[arg(long, default_value = "16")]
    pub bit_depth: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_play() {
        let cli = Cli::try_parse_from([
            "sleeptempo", "-v", "play", "--sound", "KALIMBA", "--step", "90:8", "--step", "60:4",
            "--stop-after", "30",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Command::Play(args) = cli.command else {
            panic!("expected play");
        };
        assert_eq!(args.ladder.sound.as_deref(), Some("KALIMBA"));
        assert_eq!(args.ladder.steps, vec![TempoStep::new(90.0, 8), TempoStep::new(60.0, 4)]);
        assert_eq!(args.stop_after, Some(30.0));
        assert_eq!(args.assets.assets, PathBuf::from("assets"));
    }

    #[test]
    fn test_parse_render_defaults() {
        let cli = Cli::try_parse_from(["sleeptempo", "render", "--out", "night.wav", "--no-voice"]).unwrap();
        let Command::Render(args) = cli.command else {
            panic!("expected render");
        };
        assert_eq!(args.sample_rate, 44100);
        assert_eq!(args.bit_depth, 16);
        assert!(args.ladder.no_voice);
    }

    #[test]
    fn test_bad_step_rejected() {
        assert!(Cli::try_parse_from(["sleeptempo", "play", "--step", "fast"]).is_err());
    }
}
