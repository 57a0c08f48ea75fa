//! Core library for the Binaural beat player.
//!
//! Two sine tones, one per ear, a few hertz apart. The crate owns everything
//! below the user interface: the preset catalog, the tunable session
//! configuration, the session controller with its countdown and fades, the
//! sample-level tone graph, and the boundary to whatever actually produces
//! sound (a device through `cpal` behind the `device` feature, or a headless
//! output used for offline rendering).

pub mod audio;
pub mod config;
pub mod error;
pub mod preset;
pub mod render;
pub mod session;
pub mod timeline;
pub mod timer;

#[cfg(feature = "device")]
pub use audio::DeviceOutput;
pub use audio::{AudioOutput, AudioSession, Channel, HeadlessOutput, OutputStream, ToneGraph, ToneSpec};
pub use config::{AppConfig, AudioConfig, RangePolicy, SessionConfig, SessionDefaults};
pub use error::{BinauralError, Result};
pub use preset::{catalog, preset, BeatRange, Preset, PresetId};
pub use render::{render_session, render_to_wav, RenderSettings, RenderSummary};
pub use session::{PlaybackState, SessionController, SessionEvent, GAIN_SCALE};
pub use timeline::{Clock, ManualClock, Scheduler, SystemClock, Ticker};
pub use timer::{format_clock, Countdown, TickOutcome};
