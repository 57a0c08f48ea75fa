use std::path::PathBuf;

use binaural_core::{
    catalog, preset, render_to_wav, AppConfig, PresetId, RangePolicy, RenderSettings,
    SessionConfig,
};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod player;
mod view;

fn main() -> binaural_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Presets { json } => list_presets(json),
        Commands::Play { tuning } => {
            let app = tuning.app_config()?;
            let session = tuning.session_config(&app)?;
            player::run(&app, session)
        }
        Commands::Render {
            tuning,
            output,
            seconds,
        } => run_render(&tuning, &output, seconds),
    }
}

fn list_presets(json: bool) -> binaural_core::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(catalog())?);
    } else {
        print!("{}", view::preset_tiles(catalog(), None));
    }
    Ok(())
}

fn run_render(
    tuning: &TuningArgs,
    output: &PathBuf,
    seconds: Option<u32>,
) -> binaural_core::Result<()> {
    let app = tuning.app_config()?;
    let settings = RenderSettings {
        preset: app.session.preset,
        config: tuning.session_config(&app)?,
        volume: app.session.volume,
        sample_rate: app.audio.sample_rate,
        block_size: app.audio.block_size,
        limit_seconds: seconds,
    };
    tracing::info!(?output, "rendering to wav");

    let summary = render_to_wav(output, &settings)?;
    println!(
        "wrote {} ({:.1} s, peak {:.3}{})",
        output.display(),
        summary.seconds(),
        summary.peak,
        if summary.expired { "" } else { ", stopped early" }
    );
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Binaural beat player", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the available effects.
    Presets {
        /// Print the catalog as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Run an interactive session through the audio device.
    Play {
        #[command(flatten)]
        tuning: TuningArgs,
    },
    /// Render a whole session, fades included, to a WAV file.
    Render {
        #[command(flatten)]
        tuning: TuningArgs,
        /// Path of the WAV file to write.
        #[arg(short, long)]
        output: PathBuf,
        /// Stop after this many seconds instead of the full duration.
        #[arg(short, long)]
        seconds: Option<u32>,
    },
}

#[derive(Args, Debug, Clone)]
struct TuningArgs {
    /// Effect to start from: relaxation, focus, sleep, meditation, energy or creativity.
    #[arg(short, long)]
    preset: Option<PresetId>,
    /// Beat frequency in Hz (the difference between the two ears).
    #[arg(short, long)]
    beat: Option<f32>,
    /// Carrier frequency in Hz (the left ear tone).
    #[arg(short, long)]
    carrier: Option<f32>,
    /// Session length in minutes, 5 to 60.
    #[arg(short, long)]
    duration: Option<u32>,
    /// Volume between 0 and 1.
    #[arg(short, long)]
    volume: Option<f32>,
    /// What to do with out-of-range values: accept, clamp or reject.
    #[arg(long)]
    policy: Option<RangePolicy>,
    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl TuningArgs {
    /// Configuration file (or defaults) with command line overrides applied.
    fn app_config(&self) -> binaural_core::Result<AppConfig> {
        let mut app = match &self.config {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::default(),
        };
        if let Some(id) = self.preset {
            app.session.preset = id;
        }
        if let Some(volume) = self.volume {
            app.session.volume = volume;
        }
        if let Some(minutes) = self.duration {
            app.session.duration_minutes = minutes;
        }
        if let Some(policy) = self.policy {
            app.session.range_policy = policy;
        }
        app.validate()?;
        Ok(app)
    }

    /// Tones for the first session: preset defaults, then explicit flags,
    /// each passed through the range policy.
    fn session_config(&self, app: &AppConfig) -> binaural_core::Result<SessionConfig> {
        let entry = preset(app.session.preset);
        let policy = app.session.range_policy;
        Ok(SessionConfig {
            carrier_hz: policy.carrier(self.carrier.unwrap_or(entry.default_carrier))?,
            beat_hz: policy.beat(self.beat.unwrap_or(entry.default_beat), entry.beat_range)?,
            duration_minutes: policy.duration(app.session.duration_minutes)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("binaural").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_override_preset_defaults() {
        let Commands::Play { tuning } = parse(&["play", "--preset", "focus", "--beat", "18"]).command
        else {
            panic!("expected play");
        };
        let app = tuning.app_config().unwrap();
        let session = tuning.session_config(&app).unwrap();

        assert_eq!(app.session.preset, PresetId::Focus);
        assert_eq!(session.carrier_hz, 180.0);
        assert_eq!(session.beat_hz, 18.0);
        assert_eq!(session.duration_minutes, 20);
    }

    #[test]
    fn clamp_policy_applies_to_flags() {
        let Commands::Render { tuning, seconds, .. } = parse(&[
            "render", "-o", "out.wav", "-s", "10", "--policy", "clamp", "-b", "40", "-d", "7",
        ])
        .command
        else {
            panic!("expected render");
        };
        let app = tuning.app_config().unwrap();
        let session = tuning.session_config(&app).unwrap();

        assert_eq!(seconds, Some(10));
        assert_eq!(session.beat_hz, 12.0);
        assert_eq!(session.duration_minutes, 5);
    }

    #[test]
    fn unknown_preset_is_a_parse_error() {
        let result = Cli::try_parse_from(["binaural", "play", "--preset", "lucid"]);
        assert!(result.is_err());
    }

    #[test]
    fn out_of_range_volume_is_rejected() {
        let Commands::Play { tuning } = parse(&["play", "-v", "2"]).command else {
            panic!("expected play");
        };
        assert!(tuning.app_config().is_err());
    }
}
