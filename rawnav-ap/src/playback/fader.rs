//! Pause/resume fade envelope
//!
//! A pause ramps the output to silence over a fixed number of buffer
//! writes instead of muting abruptly; a resume ramps back up. The fade
//! level is an integer step in `[0, steps]`: `steps` is full volume and
//! `0` is silence. Each write moves the level by one step, and within the
//! written chunk the gain is interpolated linearly per frame between the
//! gains at the old and new level, so consecutive chunks join without
//! discontinuities.

use crate::audio::format::CHANNELS;
use rawnav_common::FadeCurve;

/// Fade state of the output
///
/// Exactly one holds at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeState {
    /// Steady state, full volume
    Audible,
    FadingOut,
    /// Steady state, nothing is written
    Silent,
    FadingIn,
}

/// Gain range for one chunk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ramp {
    pub start_gain: f32,
    pub end_gain: f32,
}

/// Step-based envelope shared by pause and resume
#[derive(Debug, Clone, Copy)]
pub struct FadeEnvelope {
    steps: u32,
    curve: FadeCurve,
}

impl FadeEnvelope {
    pub fn new(steps: u32, curve: FadeCurve) -> Self {
        Self {
            steps: steps.max(1),
            curve,
        }
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn gain_at(&self, step: u32) -> f32 {
        self.curve.gain(step.min(self.steps) as f32 / self.steps as f32)
    }

    /// Advance the envelope by one buffer write
    ///
    /// Returns the ramp to apply to the chunk about to be written, or
    /// `None` at steady full volume. A fade-out reaching step 0 becomes
    /// [`FadeState::Silent`]; a fade-in reaching `steps` becomes
    /// [`FadeState::Audible`].
    pub fn advance(&self, state: &mut FadeState, step: &mut u32) -> Option<Ramp> {
        match *state {
            FadeState::Audible => {
                *step = self.steps;
                None
            }
            FadeState::FadingOut => {
                let start_gain = self.gain_at(*step);
                *step = step.saturating_sub(1).min(self.steps);
                if *step == 0 {
                    *state = FadeState::Silent;
                }
                Some(Ramp {
                    start_gain,
                    end_gain: self.gain_at(*step),
                })
            }
            FadeState::FadingIn | FadeState::Silent => {
                let start_gain = self.gain_at(*step);
                *step = (*step + 1).min(self.steps);
                *state = if *step == self.steps {
                    FadeState::Audible
                } else {
                    FadeState::FadingIn
                };
                Some(Ramp {
                    start_gain,
                    end_gain: self.gain_at(*step),
                })
            }
        }
    }
}

/// Apply a linear per-frame gain ramp to interleaved samples
pub fn apply_ramp(samples: &mut [i16], ramp: Ramp) {
    let channels = CHANNELS as usize;
    let frames = samples.len() / channels;
    if frames == 0 {
        return;
    }

    let delta = (ramp.end_gain - ramp.start_gain) / frames as f32;
    for (i, frame) in samples.chunks_exact_mut(channels).enumerate() {
        let gain = ramp.start_gain + delta * i as f32;
        for sample in frame {
            let scaled = (*sample as f32 * gain).round();
            *sample = scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        }
    }
}
