use anyhow::{Context, Result};
use clap::Parser;
use sleeptempo_app::cli::{AssetArgs, Cli, Command, PlayArgs, RenderArgs};
use sleeptempo_app::driver::{self, PlayOutcome};
use sleeptempo_app::export::{self, ExportParams};
use sleeptempo_app::logging;
use sleeptempo_audio::{DeviceClock, DirAssets, LoadTier, Player, PlayerConfig, SoundBank, SoundId};
use std::sync::Arc;
use std::time::Duration;

/// Rate used to probe assets for `sounds`
const PROBE_SAMPLE_RATE: u32 = 48000;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Command::Play(args) => play(args).await,
        Command::Render(args) => render(args).await,
        Command::Sounds(args) => sounds(args).await,
    }
}

async fn play(args: PlayArgs) -> Result<()> {
    let settings = args.ladder.resolve()?;
    let stop_after = args
        .stop_after
        .map(Duration::try_from_secs_f64)
        .transpose()
        .context("--stop-after must be a non-negative number of seconds")?;

    let clock = DeviceClock::new().context("Failed to open the audio output")?;
    println!(
        "Playing {} step(s), {} beats, about {:.0}s",
        settings.ladder.len(),
        settings.ladder.total_beats(),
        settings.ladder.nominal_duration()
    );

    let mut player = Player::new(Arc::new(clock), settings, PlayerConfig::default());
    player.begin_loading(Arc::new(DirAssets::new(args.assets.assets)));

    match driver::run(&mut player, stop_after).await? {
        PlayOutcome::Finished => println!("Ladder finished"),
        PlayOutcome::TimeLimit => println!("Stopped after time limit"),
        PlayOutcome::Interrupted => println!("Stopped"),
    }
    Ok(())
}

async fn render(args: RenderArgs) -> Result<()> {
    let settings = args.ladder.resolve()?;
    let params = ExportParams::new(&args.out, args.sample_rate, args.bit_depth);
    let assets = DirAssets::new(args.assets.assets);

    let summary = export::export_wav(&settings, &assets, &params)
        .await
        .with_context(|| format!("Failed to render {}", args.out.display()))?;

    println!(
        "Wrote {} ({:.1}s, {} clicks, {} voice cues)",
        args.out.display(),
        summary.seconds,
        summary.clicks,
        summary.voice_cues
    );
    Ok(())
}

async fn sounds(args: AssetArgs) -> Result<()> {
    let assets = DirAssets::new(&args.assets);
    let bank = SoundBank::load(&assets, PROBE_SAMPLE_RATE).await?;

    for id in SoundId::ALL {
        let Some(report) = bank.report(id) else {
            println!("{:<10} {:<12} unavailable", id.key(), id.label());
            continue;
        };
        let tier = match report.tier() {
            LoadTier::Primary => "primary",
            LoadTier::Secondary => "secondary",
            LoadTier::Synthesized => "synthesized",
            LoadTier::Minimal => "minimal",
        };
        let note = if report.is_degraded() { " (fallback)" } else { "" };
        println!("{:<10} {:<12} {} from {}{}", id.key(), id.label(), tier, report.resolved, note);
    }

    match bank.voice_cues() {
        Some(cues) => println!("Voice count: {} numbers", cues.offsets.len()),
        None => println!("Voice count: unavailable in {}", args.assets.display()),
    }
    Ok(())
}
