//! Background keep-alive and audition sources
//!
//! Monitoring has to keep running while the app is backgrounded, and the
//! platform only spares a process from suspension while it is audibly
//! playing. The [`KeepAliveSource`] exists for exactly that: an endless,
//! near-silent tone that a background-capable playback session loops
//! forever. The [`TestToneSource`] shares the same sample interface and
//! lets a host audition a preset level with a short audible tone.
//!
//! Starting and stopping the platform playback session is behind the
//! [`KeepAlive`] trait; this module only generates samples.

use crate::error::Result;

/// Amplitude of the keep-alive tone (about -80 dBFS, inaudible but nonzero)
const KEEPALIVE_AMPLITUDE: f32 = 1e-4;

/// Keep-alive tone frequency (Hz); low enough to stay below most speakers
const KEEPALIVE_FREQUENCY_HZ: f32 = 30.0;

/// Audition tone frequency (Hz)
const TEST_TONE_FREQUENCY_HZ: f32 = 440.0;

/// Background-capable playback session owned by the enforcer
///
/// Implementations configure the platform audio session for background
/// playback and loop a [`KeepAliveSource`] on a dedicated engine.
pub trait KeepAlive {
    /// Begin looping the near-silent buffer
    ///
    /// # Errors
    /// Returns an error if background playback could not start
    fn start(&mut self) -> Result<()>;

    /// Stop playback and release the engine
    fn stop(&mut self);

    /// Whether the loop is currently running
    fn is_running(&self) -> bool;
}

/// Generator of interleaved stereo f32 samples
///
/// Same shape as an audio decoder source, narrowed to what the keep-alive
/// and audition paths need.
pub trait SampleSource {
    /// Fill `buffer` with interleaved stereo samples
    ///
    /// Returns the number of samples written (0 once finished).
    fn read_samples(&mut self, buffer: &mut [f32]) -> usize;

    /// Whether the source has produced all of its samples
    fn is_finished(&self) -> bool;
}

/// Endless near-silent sine used to defeat background suspension
#[derive(Debug)]
pub struct KeepAliveSource {
    sample_rate: u32,
    phase: f32,
}

impl KeepAliveSource {
    /// Create a keep-alive source at the given sample rate
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            phase: 0.0,
        }
    }
}

impl SampleSource for KeepAliveSource {
    fn read_samples(&mut self, buffer: &mut [f32]) -> usize {
        let step = std::f32::consts::TAU * KEEPALIVE_FREQUENCY_HZ / self.sample_rate as f32;

        for frame in buffer.chunks_exact_mut(2) {
            let sample = self.phase.sin() * KEEPALIVE_AMPLITUDE;
            frame[0] = sample;
            frame[1] = sample;
            self.phase = (self.phase + step) % std::f32::consts::TAU;
        }

        buffer.len() - buffer.len() % 2
    }

    fn is_finished(&self) -> bool {
        false
    }
}

/// Finite audible sine for auditioning a preset level
#[derive(Debug)]
pub struct TestToneSource {
    sample_rate: u32,
    gain: f32,
    remaining_frames: usize,
    phase: f32,
}

impl TestToneSource {
    /// Create a tone at the given fractional level for `duration`
    #[must_use]
    pub fn new(sample_rate: u32, level: f32, duration: std::time::Duration) -> Self {
        let gain = crisis_core::types::clamp_level(level);
        let remaining_frames = (duration.as_secs_f64() * f64::from(sample_rate)) as usize;

        Self {
            sample_rate,
            gain,
            remaining_frames,
            phase: 0.0,
        }
    }
}

impl SampleSource for TestToneSource {
    fn read_samples(&mut self, buffer: &mut [f32]) -> usize {
        let step = std::f32::consts::TAU * TEST_TONE_FREQUENCY_HZ / self.sample_rate as f32;
        let frames = (buffer.len() / 2).min(self.remaining_frames);

        for frame in buffer.chunks_exact_mut(2).take(frames) {
            let sample = self.phase.sin() * self.gain;
            frame[0] = sample;
            frame[1] = sample;
            self.phase = (self.phase + step) % std::f32::consts::TAU;
        }

        self.remaining_frames -= frames;
        frames * 2
    }

    fn is_finished(&self) -> bool {
        self.remaining_frames == 0
    }
}
