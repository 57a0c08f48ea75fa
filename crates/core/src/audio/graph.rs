//! Sample-level tone graph: two sine voices, each with its own gain and a
//! stereo panner, summed into interleaved stereo frames.

use std::f64::consts::TAU;

use crate::SessionConfig;

/// Lowest level an exponential ramp can start from or aim for. An exponential
/// curve never leaves zero, so ramps are computed against this floor.
pub const GAIN_FLOOR: f32 = 0.001;

/// One side of the stereo image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Left,
    Right,
}

/// Frequencies for the two voices of a binaural pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSpec {
    pub left_hz: f32,
    pub right_hz: f32,
}

impl From<&SessionConfig> for ToneSpec {
    fn from(config: &SessionConfig) -> Self {
        Self {
            left_hz: config.carrier_hz,
            right_hz: config.right_hz(),
        }
    }
}

/// Phase-accumulating sine generator.
#[derive(Debug, Clone)]
pub struct SineOscillator {
    frequency: f64,
    phase: f64,
    sample_rate: f64,
}

impl SineOscillator {
    pub fn new(frequency: f32, sample_rate: u32) -> Self {
        Self {
            frequency: frequency as f64,
            phase: 0.0,
            sample_rate: sample_rate as f64,
        }
    }

    pub fn frequency(&self) -> f32 {
        self.frequency as f32
    }

    pub fn next_sample(&mut self) -> f32 {
        let sample = (TAU * self.phase).sin();
        self.phase += self.frequency / self.sample_rate;
        self.phase -= self.phase.floor();
        sample as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Automation {
    Hold,
    Ramp {
        from: f32,
        to: f32,
        target: f32,
        total: u64,
        elapsed: u64,
    },
}

/// Gain control supporting an immediate set and a timed exponential ramp.
#[derive(Debug, Clone)]
pub struct GainParam {
    value: f32,
    automation: Automation,
    sample_rate: f32,
}

impl GainParam {
    pub fn new(value: f32, sample_rate: u32) -> Self {
        Self {
            value,
            automation: Automation::Hold,
            sample_rate: sample_rate as f32,
        }
    }

    /// Current value. Does not advance any ramp in progress.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// The value the parameter settles at once automation finishes.
    pub fn target(&self) -> f32 {
        match self.automation {
            Automation::Hold => self.value,
            Automation::Ramp { target, .. } => target,
        }
    }

    pub fn is_ramping(&self) -> bool {
        matches!(self.automation, Automation::Ramp { .. })
    }

    /// Jumps to `value` and cancels any ramp in progress.
    pub fn set(&mut self, value: f32) {
        self.value = value;
        self.automation = Automation::Hold;
    }

    /// Schedules an exponential approach to `target`, reached `seconds` from
    /// now. The exact target is applied on the last sample of the ramp.
    pub fn exponential_ramp(&mut self, target: f32, seconds: f32) {
        let total = (seconds.max(0.0) * self.sample_rate).round() as u64;
        if total == 0 {
            self.set(target);
            return;
        }
        self.automation = Automation::Ramp {
            from: self.value.max(GAIN_FLOOR),
            to: target.max(GAIN_FLOOR),
            target,
            total,
            elapsed: 0,
        };
    }

    /// Advances automation by one sample and returns the new value.
    pub fn next_value(&mut self) -> f32 {
        if let Automation::Ramp {
            from,
            to,
            target,
            total,
            elapsed,
        } = self.automation
        {
            let elapsed = elapsed + 1;
            if elapsed >= total {
                self.value = target;
                self.automation = Automation::Hold;
            } else {
                self.value = from * (to / from).powf(elapsed as f32 / total as f32);
                self.automation = Automation::Ramp {
                    from,
                    to,
                    target,
                    total,
                    elapsed,
                };
            }
        }
        self.value
    }
}

/// Equal-power stereo positioner at a fixed position in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Panner {
    left: f32,
    right: f32,
}

impl Panner {
    pub fn new(position: f32) -> Self {
        let x = (position.clamp(-1.0, 1.0) + 1.0) * 0.5;
        let angle = x * std::f32::consts::FRAC_PI_2;
        Self {
            left: angle.cos(),
            right: angle.sin(),
        }
    }

    pub fn hard_left() -> Self {
        Self {
            left: 1.0,
            right: 0.0,
        }
    }

    pub fn hard_right() -> Self {
        Self {
            left: 0.0,
            right: 1.0,
        }
    }

    pub fn gains(&self) -> (f32, f32) {
        (self.left, self.right)
    }
}

#[derive(Debug, Clone)]
struct Voice {
    oscillator: SineOscillator,
    gain: GainParam,
    panner: Panner,
}

impl Voice {
    fn next_frame(&mut self) -> (f32, f32) {
        let sample = self.oscillator.next_sample() * self.gain.next_value();
        (sample * self.panner.left, sample * self.panner.right)
    }
}

/// The live sound-producing graph of a session.
#[derive(Debug, Clone)]
pub struct ToneGraph {
    left: Voice,
    right: Voice,
    closed: bool,
}

impl ToneGraph {
    /// Builds a silent graph: both gains start at zero.
    pub fn new(spec: ToneSpec, sample_rate: u32) -> Self {
        let voice = |hz: f32, panner: Panner| Voice {
            oscillator: SineOscillator::new(hz, sample_rate),
            gain: GainParam::new(0.0, sample_rate),
            panner,
        };
        Self {
            left: voice(spec.left_hz, Panner::hard_left()),
            right: voice(spec.right_hz, Panner::hard_right()),
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Marks the graph as released; it renders silence from now on.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn frequency(&self, channel: Channel) -> f32 {
        self.voice(channel).oscillator.frequency()
    }

    pub fn gain(&self, channel: Channel) -> f32 {
        self.voice(channel).gain.value()
    }

    pub fn set_gain(&mut self, value: f32) {
        self.left.gain.set(value);
        self.right.gain.set(value);
    }

    pub fn ramp_gain(&mut self, target: f32, seconds: f32) {
        self.left.gain.exponential_ramp(target, seconds);
        self.right.gain.exponential_ramp(target, seconds);
    }

    /// Adds interleaved stereo frames into `out`. A trailing odd sample is
    /// left untouched.
    pub fn mix(&mut self, out: &mut [f32]) {
        if self.closed {
            return;
        }
        for frame in out.chunks_exact_mut(2) {
            let (ll, lr) = self.left.next_frame();
            let (rl, rr) = self.right.next_frame();
            frame[0] += ll + rl;
            frame[1] += lr + rr;
        }
    }

    /// Overwrites `out` with interleaved stereo frames.
    pub fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        self.mix(out);
    }

    fn voice(&self, channel: Channel) -> &Voice {
        match channel {
            Channel::Left => &self.left,
            Channel::Right => &self.right,
        }
    }
}
