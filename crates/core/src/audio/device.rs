//! Output through the host's default audio device.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::{AudioOutput, OutputStream, SharedGraph};
use crate::{BinauralError, Result};

fn unavailable(context: &str, err: impl std::fmt::Display) -> BinauralError {
    BinauralError::AudioUnavailable(format!("{context}: {err}"))
}

/// Default output device of the default host.
pub struct DeviceOutput {
    device: cpal::Device,
    config: cpal::StreamConfig,
}

impl DeviceOutput {
    /// Opens the default device, asking for callbacks of `block_size`
    /// frames when the device reports a supported range.
    pub fn open_default(block_size: usize) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| BinauralError::AudioUnavailable("no audio output device found".into()))?;
        let supported = device
            .default_output_config()
            .map_err(|err| unavailable("failed to query output config", err))?;
        if supported.sample_format() != cpal::SampleFormat::F32 {
            return Err(BinauralError::AudioUnavailable(format!(
                "unsupported sample format {:?}",
                supported.sample_format()
            )));
        }

        let buffer_size = match *supported.buffer_size() {
            cpal::SupportedBufferSize::Range { min, max } => {
                let frames = u32::try_from(block_size).unwrap_or(u32::MAX);
                cpal::BufferSize::Fixed(frames.clamp(min, max))
            }
            cpal::SupportedBufferSize::Unknown => cpal::BufferSize::Default,
        };

        tracing::info!(
            device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate = supported.sample_rate().0,
            channels = supported.channels(),
            ?buffer_size,
            "opened audio device"
        );

        let mut config: cpal::StreamConfig = supported.into();
        config.buffer_size = buffer_size;
        Ok(Self { device, config })
    }
}

impl AudioOutput for DeviceOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn open(&mut self, graph: SharedGraph) -> Result<Box<dyn OutputStream>> {
        let channels = self.config.channels as usize;
        let mut stereo: Vec<f32> = Vec::new();

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels.max(1);
                    stereo.resize(frames * 2, 0.0);
                    match graph.lock() {
                        Ok(mut graph) => graph.render(&mut stereo),
                        Err(_) => stereo.fill(0.0),
                    }

                    for (frame, pair) in data.chunks_mut(channels.max(1)).zip(stereo.chunks(2)) {
                        match frame.len() {
                            1 => frame[0] = (pair[0] + pair[1]) * 0.5,
                            _ => {
                                frame[0] = pair[0];
                                frame[1] = pair[1];
                                frame[2..].fill(0.0);
                            }
                        }
                    }
                },
                |err| tracing::error!(%err, "audio stream error"),
                None,
            )
            .map_err(|err| unavailable("failed to build output stream", err))?;

        stream
            .play()
            .map_err(|err| unavailable("failed to start output stream", err))?;

        Ok(Box::new(DeviceStream { stream }))
    }
}

struct DeviceStream {
    stream: cpal::Stream,
}

impl OutputStream for DeviceStream {
    fn close(self: Box<Self>) -> Result<()> {
        self.stream
            .pause()
            .map_err(|err| BinauralError::msg(format!("failed to pause output stream: {err}")))?;
        Ok(())
    }
}
