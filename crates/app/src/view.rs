//! Text rendering of the control surface.

use std::fmt::Write as _;

use binaural_core::{
    config::{MAX_DURATION_MINUTES, MIN_DURATION_MINUTES},
    format_clock, AudioOutput, BinauralError, Clock, PlaybackState, Preset, PresetId,
    SessionController, SessionEvent,
};

const SLIDER_WIDTH: usize = 12;

/// One line per preset tile, the selected one marked.
pub fn preset_tiles(presets: &[Preset], selected: Option<PresetId>) -> String {
    let mut out = String::new();
    for entry in presets {
        let marker = if selected == Some(entry.id) { '>' } else { ' ' };
        let _ = writeln!(
            out,
            "{marker} {:<11} {:<9} {:<19} {:<14} carrier {:>3} Hz, beat {} Hz",
            entry.id.as_str(),
            entry.title,
            entry.subtitle,
            entry.frequency_label,
            entry.default_carrier,
            entry.default_beat,
        );
    }
    out
}

/// Slider track filled in proportion to where `value` sits in [min, max].
pub fn slider(value: f32, min: f32, max: f32) -> String {
    let fraction = if max > min {
        ((value - min) / (max - min)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (fraction * SLIDER_WIDTH as f32).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(SLIDER_WIDTH - filled))
}

pub fn status<O: AudioOutput, C: Clock>(controller: &SessionController<O, C>) -> String {
    let entry = controller.preset();
    let config = controller.config();
    let symbol = match controller.state() {
        PlaybackState::Idle => "[]",
        PlaybackState::Playing => "|>",
        PlaybackState::Paused => "||",
    };
    let clock = match controller.state() {
        PlaybackState::Idle => format_clock(config.duration_seconds()),
        _ => format_clock(controller.remaining()),
    };
    let elapsed_track = slider(controller.progress(), 0.0, 1.0);
    let beat_track = slider(
        entry.beat_range.fraction(config.beat_hz),
        0.0,
        1.0,
    );
    let duration_track = slider(
        config.duration_minutes as f32,
        MIN_DURATION_MINUTES as f32,
        MAX_DURATION_MINUTES as f32,
    );

    format!(
        "{symbol} {:<7} {clock:>5} {elapsed_track}  {} ({})  {} Hz + {} Hz  beat {beat_track}  {} min {duration_track}  vol {:.0}%",
        controller.state(),
        entry.title,
        entry.frequency_label,
        config.carrier_hz,
        config.beat_hz,
        config.duration_minutes,
        controller.volume() * 100.0,
    )
}

pub fn event_line(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::PresetSelected(id) => Some(format!("selected {id}")),
        SessionEvent::Expired => Some("session complete".to_string()),
        SessionEvent::Started { remaining, .. } => {
            Some(format!("started, {} to go", format_clock(*remaining)))
        }
        SessionEvent::VolumeChanged(_)
        | SessionEvent::Paused { .. }
        | SessionEvent::Resumed { .. }
        | SessionEvent::Stopping { .. }
        | SessionEvent::TornDown { .. } => None,
    }
}

/// Blocking notice shown when sound could not be started.
pub fn audio_notice(err: &BinauralError) -> String {
    format!("Headphones required for binaural beats. Audio could not start: {err}")
}

pub fn help() -> &'static str {
    "enter/p toggle  s stop  v <0-1> volume  b <hz> beat  c <hz> carrier  \
     d <min> duration  preset <name>  presets  status  q quit"
}

#[cfg(test)]
mod tests {
    use binaural_core::{catalog, HeadlessOutput, ManualClock};

    use super::*;

    #[test]
    fn slider_fills_proportionally() {
        assert_eq!(slider(5.0, 5.0, 60.0), "[------------]");
        assert_eq!(slider(60.0, 5.0, 60.0), "[############]");
        assert_eq!(slider(10.0, 8.0, 12.0), "[######------]");
        assert_eq!(slider(99.0, 8.0, 12.0), "[############]");
    }

    #[test]
    fn tiles_mark_the_selection() {
        let tiles = preset_tiles(catalog(), Some(PresetId::Sleep));
        assert_eq!(tiles.lines().count(), 6);
        assert!(tiles.lines().any(|l| l.starts_with("> sleep")));
    }

    #[test]
    fn status_shows_configured_duration_when_idle() {
        let controller = SessionController::new(HeadlessOutput::new(1_000), ManualClock::new());
        let line = status(&controller);
        assert!(line.contains("idle"));
        assert!(line.contains("20:00"));
        assert!(line.contains("Relax"));
        assert!(line.contains("20:00 [------------]"));
    }

    #[test]
    fn status_tracks_elapsed_session_time() {
        let mut controller =
            SessionController::new(HeadlessOutput::new(1_000), ManualClock::new());
        controller.set_duration(5).unwrap();
        controller.start().unwrap();
        for _ in 0..150 {
            controller.tick();
        }
        assert!(status(&controller).contains(" 2:30 [######------]"));

        controller.pause().unwrap();
        assert!(status(&controller).contains(" 2:30 [######------]"));
    }

    #[test]
    fn status_survives_oversized_durations() {
        let mut controller =
            SessionController::new(HeadlessOutput::new(1_000), ManualClock::new());
        controller.set_duration(100_000_000).unwrap();
        assert!(status(&controller).contains("100000000 min"));
        controller.start().unwrap();
        assert!(status(&controller).contains("[------------]"));
    }
}
