//! Session controller: the only owner of playback state, tuning, the live
//! audio session and the countdown.

use std::{fmt, time::Duration};

use serde::Serialize;

use crate::{
    audio::{AudioOutput, AudioSession, ToneSpec, GAIN_FLOOR},
    config::{snap, RangePolicy, SessionConfig, SessionDefaults, DEFAULT_VOLUME, VOLUME_STEP},
    preset::{preset, Preset, PresetId},
    timeline::{Clock, Scheduler},
    timer::{Countdown, TickOutcome},
    BinauralError, Result,
};

/// Channel gain at full volume.
pub const GAIN_SCALE: f32 = 0.3;
pub const FADE_IN: Duration = Duration::from_millis(1500);
pub const FADE_OUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
        })
    }
}

/// Notifications for the presentation layer, drained after each input.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PresetSelected(PresetId),
    VolumeChanged(f32),
    Started { generation: u64, remaining: u32 },
    Paused { remaining: u32 },
    Resumed { remaining: u32 },
    /// The countdown reached zero; a `Stopping` follows.
    Expired,
    /// Fade-out began; the session is released once it completes.
    Stopping { generation: u64 },
    TornDown { generation: u64 },
}

pub struct SessionController<O, C> {
    output: O,
    clock: C,
    state: PlaybackState,
    preset: PresetId,
    config: SessionConfig,
    policy: RangePolicy,
    volume: f32,
    session: Option<AudioSession>,
    countdown: Countdown,
    /// Length of the running session in seconds, 0 when idle.
    total: u32,
    teardowns: Scheduler<AudioSession>,
    generation: u64,
    events: Vec<SessionEvent>,
}

impl<O: AudioOutput, C: Clock> SessionController<O, C> {
    pub fn new(output: O, clock: C) -> Self {
        Self::with_defaults(output, clock, &SessionDefaults::default())
    }

    pub fn with_defaults(output: O, clock: C, defaults: &SessionDefaults) -> Self {
        let entry = preset(defaults.preset);
        Self {
            output,
            clock,
            state: PlaybackState::Idle,
            preset: defaults.preset,
            config: SessionConfig {
                carrier_hz: entry.default_carrier,
                beat_hz: entry.default_beat,
                duration_minutes: defaults.duration_minutes,
            },
            policy: defaults.range_policy,
            volume: clamp_volume(defaults.volume).unwrap_or(DEFAULT_VOLUME),
            session: None,
            countdown: Countdown::new(),
            total: 0,
            teardowns: Scheduler::new(),
            generation: 0,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn preset(&self) -> &'static Preset {
        preset(self.preset)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn policy(&self) -> RangePolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: RangePolicy) {
        self.policy = policy;
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn remaining(&self) -> u32 {
        self.countdown.remaining()
    }

    /// Share of the running session already played, from 0 to 1.
    pub fn progress(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        let elapsed = self.total.saturating_sub(self.countdown.remaining());
        (elapsed as f64 / self.total as f64) as f32
    }

    /// Generation of the most recently started session.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Sessions fading out and waiting to be released.
    pub fn pending_teardowns(&self) -> usize {
        self.teardowns.len()
    }

    /// When the next pending teardown falls due.
    pub fn next_teardown(&self) -> Option<Duration> {
        self.teardowns.next_due()
    }

    /// Current (left, right) gain of the live session, if any.
    pub fn channel_gains(&self) -> Option<(f32, f32)> {
        self.session.as_ref().and_then(|s| s.gains().ok())
    }

    /// Current (left, right) tone frequency of the live session, if any.
    pub fn channel_frequencies(&self) -> Option<(f32, f32)> {
        self.session.as_ref().and_then(|s| s.frequencies().ok())
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Makes `id` the active preset and resets carrier and beat to its
    /// defaults. A live session keeps its tones until the next start.
    pub fn select_preset(&mut self, id: PresetId) {
        let entry = preset(id);
        self.preset = id;
        self.config.carrier_hz = entry.default_carrier;
        self.config.beat_hz = entry.default_beat;
        tracing::info!(preset = %id, carrier = entry.default_carrier, beat = entry.default_beat, "preset selected");
        self.events.push(SessionEvent::PresetSelected(id));
    }

    /// Stores a new beat frequency, subject to the range policy.
    pub fn set_beat(&mut self, hz: f32) -> Result<f32> {
        let hz = self.policy.beat(hz, self.preset().beat_range)?;
        self.config.beat_hz = hz;
        Ok(hz)
    }

    pub fn set_carrier(&mut self, hz: f32) -> Result<f32> {
        let hz = self.policy.carrier(hz)?;
        self.config.carrier_hz = hz;
        Ok(hz)
    }

    /// Sets the duration used by the next start. A running countdown is not
    /// affected.
    pub fn set_duration(&mut self, minutes: u32) -> Result<u32> {
        let minutes = self.policy.duration(minutes)?;
        self.config.duration_minutes = minutes;
        Ok(minutes)
    }

    /// Stores the volume, clamped to [0, 1] and snapped to the slider step
    /// under [`RangePolicy::Clamp`], and applies it at once to any live
    /// session, paused or not. Failures to apply are logged, never returned.
    pub fn set_volume(&mut self, volume: f32) -> f32 {
        let Some(mut volume) = clamp_volume(volume) else {
            tracing::warn!(volume, "ignoring non-finite volume");
            return self.volume;
        };
        if self.policy == RangePolicy::Clamp {
            volume = snap(volume, VOLUME_STEP).clamp(0.0, 1.0);
        }
        self.volume = volume;
        if let Some(session) = &self.session {
            if let Err(err) = session.set_gain(volume * GAIN_SCALE) {
                tracing::warn!(%err, "volume change not applied");
            }
        }
        self.events.push(SessionEvent::VolumeChanged(volume));
        volume
    }

    /// Opens a fresh audio session, fades it in and starts the countdown.
    pub fn start(&mut self) -> Result<()> {
        if self.state != PlaybackState::Idle {
            return Err(BinauralError::InvalidTransition {
                event: "start",
                state: self.state,
            });
        }
        self.poll();

        let generation = self.generation + 1;
        let spec = ToneSpec::from(&self.config);
        let session = match AudioSession::open(&mut self.output, generation, spec) {
            Ok(session) => session,
            Err(err) => {
                tracing::error!(%err, "could not open audio session");
                return Err(err);
            }
        };
        if let Err(err) = session.ramp_gain(self.volume * GAIN_SCALE, FADE_IN.as_secs_f32()) {
            tracing::error!(%err, "could not fade in audio session");
            if let Err(err) = session.release() {
                tracing::warn!(%err, "failed to release aborted session");
            }
            return Err(BinauralError::AudioUnavailable(err.to_string()));
        }

        self.generation = generation;
        self.session = Some(session);
        self.total = self.config.duration_seconds();
        self.countdown.start(self.total);
        self.state = PlaybackState::Playing;
        tracing::info!(
            generation,
            left_hz = spec.left_hz,
            right_hz = spec.right_hz,
            seconds = self.countdown.remaining(),
            "session started"
        );
        self.events.push(SessionEvent::Started {
            generation,
            remaining: self.countdown.remaining(),
        });
        Ok(())
    }

    /// Silences both channels at once and holds the countdown.
    pub fn pause(&mut self) -> Result<()> {
        if self.state != PlaybackState::Playing {
            return Err(BinauralError::InvalidTransition {
                event: "pause",
                state: self.state,
            });
        }
        self.apply_gain(0.0);
        self.countdown.halt();
        self.state = PlaybackState::Paused;
        tracing::info!(remaining = self.countdown.remaining(), "session paused");
        self.events.push(SessionEvent::Paused {
            remaining: self.countdown.remaining(),
        });
        Ok(())
    }

    /// Restores full gain at once and continues the countdown.
    pub fn resume(&mut self) -> Result<()> {
        if self.state != PlaybackState::Paused {
            return Err(BinauralError::InvalidTransition {
                event: "resume",
                state: self.state,
            });
        }
        self.apply_gain(self.volume * GAIN_SCALE);
        self.countdown.resume();
        self.state = PlaybackState::Playing;
        tracing::info!(remaining = self.countdown.remaining(), "session resumed");
        self.events.push(SessionEvent::Resumed {
            remaining: self.countdown.remaining(),
        });
        Ok(())
    }

    /// Fades the session out and schedules its release. No-op when idle.
    pub fn stop(&mut self) {
        if self.state == PlaybackState::Idle {
            return;
        }
        if let Some(session) = self.session.take() {
            let generation = session.generation();
            if let Err(err) = session.ramp_gain(GAIN_FLOOR, FADE_OUT.as_secs_f32()) {
                tracing::warn!(%err, generation, "fade-out not applied");
            }
            self.teardowns.schedule(self.clock.now() + FADE_OUT, session);
            tracing::info!(generation, "session stopping");
            self.events.push(SessionEvent::Stopping { generation });
        }
        self.countdown.reset();
        self.total = 0;
        self.state = PlaybackState::Idle;
    }

    /// Start when idle, resume when paused, pause when playing.
    pub fn toggle(&mut self) -> Result<()> {
        match self.state {
            PlaybackState::Idle => self.start(),
            PlaybackState::Paused => self.resume(),
            PlaybackState::Playing => self.pause(),
        }
    }

    /// One second of session time. Stops the session when the countdown
    /// runs out.
    pub fn tick(&mut self) -> TickOutcome {
        let outcome = self.countdown.tick();
        match outcome {
            TickOutcome::Expired => {
                tracing::info!(generation = self.generation, "session complete");
                self.events.push(SessionEvent::Expired);
                self.stop();
            }
            TickOutcome::Counting(remaining) => tracing::trace!(remaining, "tick"),
            TickOutcome::Idle => {}
        }
        outcome
    }

    /// Releases sessions whose fade-out has finished. Returns how many.
    pub fn poll(&mut self) -> usize {
        let due = self.teardowns.drain_due(self.clock.now());
        let count = due.len();
        for session in due {
            self.release(session);
        }
        count
    }

    /// Stops and releases everything immediately, without waiting for fades.
    pub fn shutdown(&mut self) {
        self.stop();
        for session in self.teardowns.drain_all() {
            self.release(session);
        }
    }

    /// Renders the next frames of every session still producing sound, for
    /// outputs that do not pull samples on their own.
    pub fn render(&self, out: &mut [f32]) -> Result<()> {
        out.fill(0.0);
        for session in self.session.iter().chain(self.teardowns.iter()) {
            session.mix_into(out)?;
        }
        Ok(())
    }

    fn apply_gain(&self, value: f32) {
        if let Some(session) = &self.session {
            if let Err(err) = session.set_gain(value) {
                tracing::warn!(%err, "gain change not applied");
            }
        }
    }

    fn release(&mut self, session: AudioSession) {
        let generation = session.generation();
        if let Err(err) = session.release() {
            tracing::warn!(%err, generation, "failed to release audio session");
        }
        tracing::debug!(generation, "session released");
        self.events.push(SessionEvent::TornDown { generation });
    }
}

fn clamp_volume(volume: f32) -> Option<f32> {
    volume.is_finite().then(|| volume.clamp(0.0, 1.0))
}
