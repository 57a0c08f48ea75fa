//! Offline rendering of a complete session to a WAV file.

use std::{
    io::{Seek, Write},
    path::Path,
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    audio::HeadlessOutput,
    config::{RangePolicy, SessionDefaults},
    session::{PlaybackState, SessionController, SessionEvent},
    timeline::{Clock, ManualClock},
    PresetId, Result, SessionConfig, TickOutcome,
};

/// What to render and how.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    pub preset: PresetId,
    pub config: SessionConfig,
    pub volume: f32,
    pub sample_rate: u32,
    /// Frames rendered per pass through the graph.
    pub block_size: usize,
    /// Stop the session early after this many seconds.
    pub limit_seconds: Option<u32>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            preset: PresetId::default(),
            config: SessionConfig::default(),
            volume: SessionDefaults::default().volume,
            sample_rate: 48_000,
            block_size: 1024,
            limit_seconds: None,
        }
    }
}

/// What a render produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderSummary {
    pub frames: u64,
    pub sample_rate: u32,
    /// True when the countdown ran out rather than hitting the limit.
    pub expired: bool,
    pub peak: f32,
}

impl RenderSummary {
    pub fn seconds(&self) -> f32 {
        self.frames as f32 / self.sample_rate.max(1) as f32
    }
}

fn wav_spec(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    }
}

/// Renders a session into a new WAV file at `path`.
pub fn render_to_wav(path: impl AsRef<Path>, settings: &RenderSettings) -> Result<RenderSummary> {
    let mut writer = hound::WavWriter::create(path.as_ref(), wav_spec(settings.sample_rate))?;
    let summary = render_session(&mut writer, settings)?;
    writer.finalize()?;
    Ok(summary)
}

/// Drives a real controller against a manual clock, writing one second of
/// audio per countdown tick, then the fade-out until the session is released.
pub fn render_session<W: Write + Seek>(
    writer: &mut hound::WavWriter<W>,
    settings: &RenderSettings,
) -> Result<RenderSummary> {
    let clock = ManualClock::new();
    let defaults = SessionDefaults {
        preset: settings.preset,
        volume: settings.volume,
        duration_minutes: settings.config.duration_minutes,
        range_policy: RangePolicy::Accept,
    };
    let mut controller = SessionController::with_defaults(
        HeadlessOutput::new(settings.sample_rate),
        clock.clone(),
        &defaults,
    );
    controller.set_carrier(settings.config.carrier_hz)?;
    controller.set_beat(settings.config.beat_hz)?;
    controller.start()?;

    tracing::info!(
        preset = %settings.preset,
        carrier = settings.config.carrier_hz,
        beat = settings.config.beat_hz,
        minutes = settings.config.duration_minutes,
        limit = ?settings.limit_seconds,
        "rendering session"
    );

    let mut summary = RenderSummary {
        sample_rate: settings.sample_rate,
        ..Default::default()
    };
    let block_size = settings.block_size.max(1);
    let mut buffer = vec![0.0; block_size * 2];
    let mut elapsed = 0u32;

    loop {
        let block = match controller.state() {
            PlaybackState::Idle => match controller.next_teardown() {
                Some(due) => due.saturating_sub(clock.now()),
                None => break,
            },
            _ => Duration::from_secs(1),
        };

        let frames = (block.as_secs_f64() * settings.sample_rate as f64).round() as usize;
        let mut left = frames;
        while left > 0 {
            let chunk = &mut buffer[..left.min(block_size) * 2];
            controller.render(chunk)?;
            for sample in chunk.iter() {
                summary.peak = summary.peak.max(sample.abs());
                writer.write_sample(*sample)?;
            }
            left -= chunk.len() / 2;
        }
        summary.frames += frames as u64;
        clock.advance(block);
        controller.poll();

        if controller.state() != PlaybackState::Idle {
            elapsed += 1;
            if controller.tick() == TickOutcome::Expired {
                summary.expired = true;
            } else if settings.limit_seconds.is_some_and(|limit| elapsed >= limit) {
                controller.stop();
            }
        }

        for event in controller.drain_events() {
            if let SessionEvent::TornDown { generation } = event {
                tracing::debug!(generation, "render released session");
            }
        }
    }

    tracing::info!(frames = summary.frames, peak = summary.peak, "render finished");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::session::GAIN_SCALE;

    fn render(settings: &RenderSettings) -> (RenderSummary, Vec<f32>) {
        let mut bytes = Cursor::new(Vec::new());
        let summary = {
            let mut writer = hound::WavWriter::new(&mut bytes, wav_spec(settings.sample_rate)).unwrap();
            let summary = render_session(&mut writer, settings).unwrap();
            writer.finalize().unwrap();
            summary
        };
        bytes.set_position(0);
        let samples = hound::WavReader::new(bytes)
            .unwrap()
            .into_samples::<f32>()
            .map(|s| s.unwrap())
            .collect();
        (summary, samples)
    }

    #[test]
    fn full_session_runs_until_expiry_and_fades_out() {
        let settings = RenderSettings {
            config: SessionConfig {
                duration_minutes: 5,
                ..Default::default()
            },
            sample_rate: 200,
            ..Default::default()
        };
        let (summary, samples) = render(&settings);

        assert!(summary.expired);
        assert_eq!(summary.frames, 300 * 200 + 100);
        assert_eq!(samples.len() as u64, summary.frames * 2);
        assert!(summary.peak <= settings.volume * GAIN_SCALE + 1e-6);
        assert!(samples[0] == 0.0 && samples[1] == 0.0);
    }

    #[test]
    fn limit_stops_session_early() {
        let settings = RenderSettings {
            sample_rate: 1_000,
            limit_seconds: Some(3),
            ..Default::default()
        };
        let (summary, samples) = render(&settings);

        assert!(!summary.expired);
        assert_eq!(summary.frames, 3 * 1_000 + 500);
        assert!((summary.seconds() - 3.5).abs() < 1e-6);
        assert!(summary.peak > 0.1);

        let tail = &samples[samples.len() - 2..];
        assert!(tail.iter().all(|s| s.abs() <= crate::audio::GAIN_FLOOR));
    }

    #[test]
    fn block_size_does_not_change_the_rendered_audio() {
        let whole = RenderSettings {
            sample_rate: 1_000,
            block_size: 4_096,
            limit_seconds: Some(2),
            ..Default::default()
        };
        let chunked = RenderSettings {
            block_size: 7,
            ..whole.clone()
        };
        let (whole_summary, whole_samples) = render(&whole);
        let (chunked_summary, chunked_samples) = render(&chunked);

        assert_eq!(chunked_summary.frames, 2 * 1_000 + 500);
        assert_eq!(chunked_summary.frames, whole_summary.frames);
        assert_eq!(chunked_samples, whole_samples);
    }
}
