//! Audio output boundary and the live session handle.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, MutexGuard,
};

use crate::{BinauralError, Result};

#[cfg(feature = "device")]
mod device;
pub mod graph;

#[cfg(feature = "device")]
pub use device::DeviceOutput;
pub use graph::{Channel, GainParam, Panner, SineOscillator, ToneGraph, ToneSpec, GAIN_FLOOR};

/// Tone graph shared between the controller and whatever pulls samples out
/// of it.
pub type SharedGraph = Arc<Mutex<ToneGraph>>;

/// Platform capability that turns a tone graph into sound.
pub trait AudioOutput {
    /// Sample rate graphs must be built at for this output.
    fn sample_rate(&self) -> u32;

    /// Connects `graph` to the output. Implementations report refusal as
    /// [`BinauralError::AudioUnavailable`].
    fn open(&mut self, graph: SharedGraph) -> Result<Box<dyn OutputStream>>;
}

/// A connected graph. Closing releases the underlying output context.
pub trait OutputStream {
    fn close(self: Box<Self>) -> Result<()>;
}

/// Output with no device behind it. Graphs only advance when their owner
/// renders them, which makes it suitable for offline rendering and tests.
#[derive(Debug, Clone)]
pub struct HeadlessOutput {
    sample_rate: u32,
    stats: Arc<OutputStats>,
}

#[derive(Debug, Default)]
struct OutputStats {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl HeadlessOutput {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            stats: Arc::default(),
        }
    }

    /// Number of streams opened so far, shared across clones.
    pub fn opened(&self) -> usize {
        self.stats.opened.load(Ordering::SeqCst)
    }

    /// Number of streams closed so far, shared across clones.
    pub fn closed(&self) -> usize {
        self.stats.closed.load(Ordering::SeqCst)
    }
}

impl AudioOutput for HeadlessOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn open(&mut self, _graph: SharedGraph) -> Result<Box<dyn OutputStream>> {
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(HeadlessStream {
            stats: self.stats.clone(),
        }))
    }
}

struct HeadlessStream {
    stats: Arc<OutputStats>,
}

impl OutputStream for HeadlessStream {
    fn close(self: Box<Self>) -> Result<()> {
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// The live sound-producing state of one session: a tone graph connected to
/// an output. Tagged with the generation that created it.
pub struct AudioSession {
    generation: u64,
    graph: SharedGraph,
    stream: Box<dyn OutputStream>,
}

impl AudioSession {
    /// Builds a silent graph for `spec` and connects it to `output`.
    pub fn open(output: &mut dyn AudioOutput, generation: u64, spec: ToneSpec) -> Result<Self> {
        let graph = Arc::new(Mutex::new(ToneGraph::new(spec, output.sample_rate())));
        let stream = output.open(graph.clone()).map_err(|err| match err {
            BinauralError::AudioUnavailable(_) => err,
            other => BinauralError::AudioUnavailable(other.to_string()),
        })?;
        Ok(Self {
            generation,
            graph,
            stream,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Immediately sets both channel gains.
    pub fn set_gain(&self, value: f32) -> Result<()> {
        self.live_graph()?.set_gain(value);
        Ok(())
    }

    /// Ramps both channel gains to `target` over `seconds`.
    pub fn ramp_gain(&self, target: f32, seconds: f32) -> Result<()> {
        self.live_graph()?.ramp_gain(target, seconds);
        Ok(())
    }

    pub fn gains(&self) -> Result<(f32, f32)> {
        let graph = self.lock()?;
        Ok((graph.gain(Channel::Left), graph.gain(Channel::Right)))
    }

    pub fn frequencies(&self) -> Result<(f32, f32)> {
        let graph = self.lock()?;
        Ok((graph.frequency(Channel::Left), graph.frequency(Channel::Right)))
    }

    /// Adds this session's next frames into an interleaved stereo buffer.
    pub fn mix_into(&self, out: &mut [f32]) -> Result<()> {
        self.lock()?.mix(out);
        Ok(())
    }

    /// Silences the graph and releases the output.
    pub fn release(self) -> Result<()> {
        if let Ok(mut graph) = self.graph.lock() {
            graph.close();
        }
        self.stream.close()
    }

    fn live_graph(&self) -> Result<MutexGuard<'_, ToneGraph>> {
        let graph = self.lock()?;
        if graph.is_closed() {
            return Err(BinauralError::VolumeApply(format!(
                "session {} has already been released",
                self.generation
            )));
        }
        Ok(graph)
    }

    fn lock(&self) -> Result<MutexGuard<'_, ToneGraph>> {
        self.graph
            .lock()
            .map_err(|_| BinauralError::VolumeApply("tone graph has been poisoned".into()))
    }
}

impl std::fmt::Debug for AudioSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioSession")
            .field("generation", &self.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RefusingOutput;

    impl AudioOutput for RefusingOutput {
        fn sample_rate(&self) -> u32 {
            48_000
        }

        fn open(&mut self, _graph: SharedGraph) -> Result<Box<dyn OutputStream>> {
            Err(BinauralError::msg("device busy"))
        }
    }

    fn spec() -> ToneSpec {
        ToneSpec {
            left_hz: 100.0,
            right_hz: 102.0,
        }
    }

    #[test]
    fn opens_silent_session_and_counts_streams() {
        let mut output = HeadlessOutput::new(1_000);
        let session = AudioSession::open(&mut output, 1, spec()).unwrap();

        assert_eq!(session.gains().unwrap(), (0.0, 0.0));
        assert_eq!(session.frequencies().unwrap(), (100.0, 102.0));
        assert_eq!(output.opened(), 1);

        session.release().unwrap();
        assert_eq!(output.closed(), 1);
    }

    #[test]
    fn refusal_is_reported_as_audio_unavailable() {
        let err = AudioSession::open(&mut RefusingOutput, 1, spec()).unwrap_err();
        assert!(err.is_audio_unavailable());
        assert!(format!("{err}").contains("device busy"));
    }

    #[test]
    fn gain_on_released_graph_fails_with_volume_apply() {
        let mut output = HeadlessOutput::new(1_000);
        let session = AudioSession::open(&mut output, 7, spec()).unwrap();
        session.graph.lock().unwrap().close();

        let err = session.set_gain(0.2).unwrap_err();
        assert!(matches!(err, BinauralError::VolumeApply(_)));
    }

    #[test]
    fn mixes_into_existing_buffer() {
        let mut output = HeadlessOutput::new(1_000);
        let session = AudioSession::open(&mut output, 1, spec()).unwrap();
        session.set_gain(0.5).unwrap();

        let mut buf = vec![1.0; 8];
        session.mix_into(&mut buf).unwrap();
        assert_eq!(buf[0], 1.0);
        assert!(buf[2] != 1.0);
    }
}
