//! Filter chain: static low-pass, LED low-pass, high-pass
//!
//! Stage selection is resolved into a [`Pipeline`] whenever the model, rate
//! or LED switch changes. Per block, one match picks a monomorphised loop, so
//! the per-sample path carries no stage branching.

use super::{LedFilter, OnePole};
use crate::config::AmigaModel;
use crate::constants::{
    rc_cutoff, A1200_HIGHPASS_C, A1200_HIGHPASS_R, A1200_LOWPASS_C, A1200_LOWPASS_R,
    A500_HIGHPASS_C, A500_HIGHPASS_R, A500_LOWPASS_C, A500_LOWPASS_R,
};

/// Static low-pass cutoff for a model
fn lowpass_cutoff(model: AmigaModel) -> f64 {
    match model {
        AmigaModel::A500 => rc_cutoff(A500_LOWPASS_R, A500_LOWPASS_C),
        AmigaModel::A1200 => rc_cutoff(A1200_LOWPASS_R, A1200_LOWPASS_C),
    }
}

/// High-pass cutoff for a model
fn highpass_cutoff(model: AmigaModel) -> f64 {
    match model {
        AmigaModel::A500 => rc_cutoff(A500_HIGHPASS_R, A500_HIGHPASS_C),
        AmigaModel::A1200 => rc_cutoff(A1200_HIGHPASS_R, A1200_HIGHPASS_C),
    }
}

/// Active stages for the current configuration
///
/// The high-pass is always active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pipeline {
    /// Static RC low-pass
    pub static_lowpass: bool,
    /// LED low-pass
    pub led: bool,
}

impl Pipeline {
    /// Resolve the stages for a model, rate and LED switch
    ///
    /// The A500 low-pass is always audible. The A1200 one only matters when
    /// its cutoff lies below Nyquist.
    pub fn resolve(model: AmigaModel, rate: f64, led: bool) -> Self {
        let static_lowpass = match model {
            AmigaModel::A500 => true,
            AmigaModel::A1200 => rate * 0.5 > lowpass_cutoff(model),
        };
        Self {
            static_lowpass,
            led,
        }
    }
}

/// Stereo analog filter chain
#[derive(Debug, Clone, PartialEq)]
pub struct FilterChain {
    model: AmigaModel,
    rate: f64,
    led_enabled: bool,
    lowpass: OnePole,
    led: LedFilter,
    highpass: OnePole,
    pipeline: Pipeline,
}

impl FilterChain {
    /// Build a chain with cleared state
    ///
    /// # Arguments
    ///
    /// * `model` - Machine whose components are emulated
    /// * `rate` - Rate the chain runs at (doubled when filtering oversampled)
    /// * `led_enabled` - Initial LED switch state
    pub fn new(model: AmigaModel, rate: f64, led_enabled: bool) -> Self {
        Self {
            model,
            rate,
            led_enabled,
            lowpass: OnePole::low_pass(lowpass_cutoff(model), rate),
            led: LedFilter::new(rate),
            highpass: OnePole::high_pass(highpass_cutoff(model), rate),
            pipeline: Pipeline::resolve(model, rate, led_enabled),
        }
    }

    /// Change the rate: new coefficients, all state cleared
    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
        self.lowpass.set_rate(rate);
        self.led.set_rate(rate);
        self.highpass.set_rate(rate);
        self.pipeline = Pipeline::resolve(self.model, rate, self.led_enabled);
        self.clear();
    }

    /// Change the emulated model: new cutoffs, all state cleared
    pub fn set_model(&mut self, model: AmigaModel) {
        self.model = model;
        self.lowpass.set_cutoff(lowpass_cutoff(model), self.rate);
        self.highpass.set_cutoff(highpass_cutoff(model), self.rate);
        self.pipeline = Pipeline::resolve(model, self.rate, self.led_enabled);
        self.clear();
    }

    /// Flip the LED switch
    ///
    /// Only the LED stage is cleared, and only on an actual change. While
    /// disabled its state stays zero, so switching on and straight back off
    /// leaves the chain exactly as it was.
    pub fn set_led_enabled(&mut self, enabled: bool) {
        if enabled == self.led_enabled {
            return;
        }
        self.led_enabled = enabled;
        self.led.clear();
        self.pipeline = Pipeline::resolve(self.model, self.rate, enabled);
    }

    /// Zero the history of every stage
    pub fn clear(&mut self) {
        self.lowpass.clear();
        self.led.clear();
        self.highpass.clear();
    }

    /// Emulated model
    pub fn model(&self) -> AmigaModel {
        self.model
    }

    /// Rate the chain runs at
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// LED switch state
    pub fn led_enabled(&self) -> bool {
        self.led_enabled
    }

    /// Stages currently in use
    pub fn pipeline(&self) -> Pipeline {
        self.pipeline
    }

    /// Filter a stereo block in place
    ///
    /// Only the common prefix of the two buffers is processed.
    pub fn process(&mut self, left: &mut [f64], right: &mut [f64]) {
        match (self.pipeline.static_lowpass, self.pipeline.led) {
            (true, true) => self.run::<true, true>(left, right),
            (true, false) => self.run::<true, false>(left, right),
            (false, true) => self.run::<false, true>(left, right),
            (false, false) => self.run::<false, false>(left, right),
        }
    }

    fn run<const LOWPASS: bool, const LED: bool>(&mut self, left: &mut [f64], right: &mut [f64]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let (mut a, mut b) = (*l, *r);
            if LOWPASS {
                (a, b) = self.lowpass.process(a, b);
            }
            if LED {
                (a, b) = self.led.process(a, b);
            }
            (*l, *r) = self.highpass.process(a, b);
        }
    }
}
