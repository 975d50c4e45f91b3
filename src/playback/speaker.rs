//! Audio playback to speakers

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use super::engine::{
    AudioEngine, AudioFormat, AudioResource, EngineError, EngineStatus, StatusReceiver,
    StatusSender, status_channel,
};
use crate::{Error, Result};

/// Sample rate for playback (matches common TTS output)
pub const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Decoded clip shared with the audio callback
#[derive(Default)]
struct Clip {
    samples: Vec<f32>,
    position: usize,
    finished: bool,
}

/// Plays clips on the default output device
///
/// The output stream is built on `load` and kept paused until `play`. The
/// audio callback reports the natural end of a clip on the status channel.
pub struct SpeakerEngine {
    device: Device,
    config: StreamConfig,
    status: StatusSender,
    clip: Arc<Mutex<Clip>>,
    stream: Option<Stream>,
}

impl SpeakerEngine {
    /// Open the default output device
    ///
    /// Returns the engine together with the receiving end of its status
    /// channel.
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new() -> Result<(Self, StatusReceiver)> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            })
            .or_else(|| {
                // Fallback: try stereo
                device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == 2
                        && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                        && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
                })
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "audio playback initialized"
        );

        let (status, receiver) = status_channel();

        Ok((
            Self {
                device,
                config,
                status,
                clip: Arc::new(Mutex::new(Clip::default())),
                stream: None,
            },
            receiver,
        ))
    }

    fn report(&self, playing: bool) {
        // Receiver gone means the card is being torn down
        let _ = self.status.send(EngineStatus { playing });
    }

    fn build_stream(&self) -> std::result::Result<Stream, EngineError> {
        let channels = self.config.channels as usize;
        let clip = Arc::clone(&self.clip);
        let status = self.status.clone();

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let Ok(mut clip) = clip.lock() else {
                        data.fill(0.0);
                        return;
                    };

                    for frame in data.chunks_mut(channels) {
                        let sample = clip.samples.get(clip.position).copied();
                        match sample {
                            Some(sample) => {
                                frame.fill(sample);
                                clip.position += 1;
                            }
                            None => {
                                frame.fill(0.0);
                                if !clip.finished {
                                    clip.finished = true;
                                    let _ = status.send(EngineStatus { playing: false });
                                }
                            }
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| EngineError::Load(e.to_string()))?;

        // Some backends start streams immediately
        stream
            .pause()
            .map_err(|e| EngineError::Playback(e.to_string()))?;

        Ok(stream)
    }
}

impl AudioEngine for SpeakerEngine {
    fn load(&mut self, resource: &AudioResource) -> std::result::Result<(), EngineError> {
        let samples = decode(resource)?;
        if samples.is_empty() {
            return Err(EngineError::Load("clip contains no audio".to_string()));
        }

        self.unload();

        {
            let mut clip = self
                .clip
                .lock()
                .map_err(|_| EngineError::Load("clip buffer poisoned".to_string()))?;
            *clip = Clip {
                samples,
                position: 0,
                finished: false,
            };
        }

        self.stream = Some(self.build_stream()?);
        tracing::debug!(id = %resource.id(), bytes = resource.len(), "clip loaded");
        Ok(())
    }

    fn play(&mut self) -> std::result::Result<(), EngineError> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| EngineError::Playback("no clip loaded".to_string()))?;

        if let Ok(mut clip) = self.clip.lock() {
            if clip.finished {
                clip.position = 0;
                clip.finished = false;
            }
        }

        stream
            .play()
            .map_err(|e| EngineError::Playback(e.to_string()))?;
        self.report(true);
        Ok(())
    }

    fn pause(&mut self) -> std::result::Result<(), EngineError> {
        let Some(stream) = self.stream.as_ref() else {
            return Ok(());
        };

        stream
            .pause()
            .map_err(|e| EngineError::Playback(e.to_string()))?;
        self.report(false);
        Ok(())
    }

    fn unload(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("clip unloaded");
        }
        if let Ok(mut clip) = self.clip.lock() {
            *clip = Clip::default();
        }
    }

    fn name(&self) -> &'static str {
        "speaker"
    }
}

impl Drop for SpeakerEngine {
    fn drop(&mut self) {
        self.unload();
    }
}

/// Decode a clip to mono f32 samples at [`PLAYBACK_SAMPLE_RATE`]
///
/// # Errors
///
/// Returns [`EngineError::Load`] if the bytes are not valid audio
pub fn decode(resource: &AudioResource) -> std::result::Result<Vec<f32>, EngineError> {
    let (samples, sample_rate) = match resource.format() {
        AudioFormat::Mp3 => decode_mp3(resource.bytes())?,
        AudioFormat::Wav => decode_wav(resource.bytes())?,
    };

    if sample_rate == PLAYBACK_SAMPLE_RATE || samples.is_empty() {
        return Ok(samples);
    }

    tracing::debug!(
        from = sample_rate,
        to = PLAYBACK_SAMPLE_RATE,
        samples = samples.len(),
        "resampling clip"
    );
    resample(&samples, sample_rate)
}

/// Decode MP3 bytes to f32 samples and their sample rate
fn decode_mp3(mp3_data: &[u8]) -> std::result::Result<(Vec<f32>, u32), EngineError> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut sample_rate = PLAYBACK_SAMPLE_RATE;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                sample_rate = u32::try_from(frame.sample_rate).map_err(|_| {
                    EngineError::Load(format!("invalid MP3 sample rate {}", frame.sample_rate))
                })?;

                if frame.channels == 2 {
                    // Stereo: average channels
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(EngineError::Load(format!("MP3 decode error: {e}"))),
        }
    }

    Ok((samples, sample_rate))
}

/// Decode WAV bytes to f32 samples and their sample rate
#[allow(clippy::cast_precision_loss)]
fn decode_wav(wav_data: &[u8]) -> std::result::Result<(Vec<f32>, u32), EngineError> {
    let reader = hound::WavReader::new(Cursor::new(wav_data))
        .map_err(|e| EngineError::Load(format!("WAV decode error: {e}")))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>(),
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 / scale))
                .collect::<std::result::Result<_, _>>()
        }
    }
    .map_err(|e| EngineError::Load(format!("WAV decode error: {e}")))?;

    let channels = usize::from(spec.channels.max(1));
    let mono = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    Ok((mono, spec.sample_rate))
}

/// Resample mono audio to [`PLAYBACK_SAMPLE_RATE`] using rubato
#[allow(clippy::cast_possible_truncation)]
fn resample(samples: &[f32], from_rate: u32) -> std::result::Result<Vec<f32>, EngineError> {
    use rubato::{FftFixedIn, Resampler};

    const CHUNK_SIZE: usize = 1024;
    const SUB_CHUNKS: usize = 2;
    const MAX_FLUSHES: usize = 16;

    if from_rate == 0 {
        return Err(EngineError::Load("clip has a sample rate of 0".to_string()));
    }

    let mut resampler = FftFixedIn::<f64>::new(
        from_rate as usize,
        PLAYBACK_SAMPLE_RATE as usize,
        CHUNK_SIZE,
        SUB_CHUNKS,
        1,
    )
    .map_err(|e| EngineError::Load(format!("resampler init failed: {e}")))?;

    let input: Vec<f64> = samples.iter().map(|&s| f64::from(s)).collect();
    let expected = (input.len() as u64 * u64::from(PLAYBACK_SAMPLE_RATE) / u64::from(from_rate))
        as usize;
    let delay = resampler.output_delay();
    let chunk_size = resampler.input_frames_next();
    let mut output = Vec::with_capacity(expected + delay + chunk_size);

    let mut chunks = input.chunks_exact(chunk_size);
    for chunk in &mut chunks {
        let result = resampler
            .process(&[chunk], None)
            .map_err(|e| EngineError::Load(format!("resample failed: {e}")))?;
        output.extend_from_slice(&result[0]);
    }

    let rest = [chunks.remainder()];
    if !rest[0].is_empty() {
        let result = resampler
            .process_partial(Some(&rest[..]), None)
            .map_err(|e| EngineError::Load(format!("resample failed: {e}")))?;
        output.extend_from_slice(&result[0]);
    }

    // Flush the filter delay so the tail of the clip is not cut off
    for _ in 0..MAX_FLUSHES {
        if output.len() >= delay + expected {
            break;
        }
        let result = resampler
            .process_partial::<Vec<f64>>(None, None)
            .map_err(|e| EngineError::Load(format!("resample failed: {e}")))?;
        output.extend_from_slice(&result[0]);
    }

    let end = (delay + expected).min(output.len());
    let start = delay.min(end);
    Ok(output[start..end].iter().map(|&s| s as f32).collect())
}
