//! Tick driver
//!
//! A tracker replayer advances in ticks (50 per second at the default
//! tempo) and writes registers at each one. [`TickDriver`] interleaves those
//! ticks with rendering so every write lands on the right output sample, and
//! stamps the writes with the time they become audible for the sync queue.
//!
//! Tick lengths rarely divide evenly into samples; the remainder is carried
//! from tick to tick so the long-term tick rate stays exact.

use crate::engine::{Engine, SharedEngine};

const NANOS_PER_SEC: f64 = 1e9;

/// Source of register writes, called once per tick
pub trait Sequencer {
    /// Perform one tick's register writes
    fn tick(&mut self, engine: &mut Engine);

    /// Length of the next tick in seconds
    fn tick_duration_secs(&self) -> f64;
}

/// Runs a [`Sequencer`] in step with rendering
#[derive(Debug)]
pub struct TickDriver<S> {
    sequencer: S,
    samples_until_tick: f64,
    frames_rendered: u64,
}

impl<S: Sequencer> TickDriver<S> {
    /// Wrap a sequencer; its first tick runs before the first sample
    pub fn new(sequencer: S) -> Self {
        Self {
            sequencer,
            samples_until_tick: 0.0,
            frames_rendered: 0,
        }
    }

    /// The wrapped sequencer
    pub fn sequencer(&self) -> &S {
        &self.sequencer
    }

    /// Mutable access to the wrapped sequencer
    pub fn sequencer_mut(&mut self) -> &mut S {
        &mut self.sequencer
    }

    /// Unwrap the sequencer
    pub fn into_inner(self) -> S {
        self.sequencer
    }

    /// Output frames rendered so far
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Render one block, running ticks as they fall due
    ///
    /// # Arguments
    ///
    /// * `engine` - Engine to drive (the caller holds the audio lock)
    /// * `left` / `right` - Output buffers; the common prefix is rendered
    /// * `base_ns` - Time at which the first frame of this block is heard
    pub fn render(
        &mut self,
        engine: &mut Engine,
        left: &mut [f32],
        right: &mut [f32],
        base_ns: u64,
    ) {
        let frames = left.len().min(right.len());
        let rate = f64::from(engine.config().output_rate);

        let mut pos = 0;
        while pos < frames {
            if self.samples_until_tick <= 0.0 {
                let offset_ns = (pos as f64 * NANOS_PER_SEC / rate) as u64;
                engine.set_sync_timestamp(base_ns.saturating_add(offset_ns));
                self.sequencer.tick(engine);
                self.samples_until_tick += self.tick_samples(rate);
                continue;
            }

            let n = (self.samples_until_tick.ceil() as usize).min(frames - pos);
            engine.render(&mut left[pos..pos + n], &mut right[pos..pos + n]);
            pos += n;
            self.samples_until_tick -= n as f64;
        }
        self.frames_rendered += frames as u64;
    }

    /// Live path: one lock for the whole callback
    pub fn render_shared(
        &mut self,
        engine: &SharedEngine,
        left: &mut [f32],
        right: &mut [f32],
        base_ns: u64,
    ) {
        let mut guard = engine.lock();
        self.render(&mut guard, left, right, base_ns);
    }

    /// Offline path: render `frames` into owned buffers
    ///
    /// Timestamps continue from the frames already rendered.
    pub fn render_offline(&mut self, engine: &mut Engine, frames: usize) -> (Vec<f32>, Vec<f32>) {
        let rate = f64::from(engine.config().output_rate);
        let base_ns = (self.frames_rendered as f64 * NANOS_PER_SEC / rate) as u64;

        let mut left = vec![0.0; frames];
        let mut right = vec![0.0; frames];
        self.render(engine, &mut left, &mut right, base_ns);
        (left, right)
    }

    /// Next tick length in samples, at least one
    fn tick_samples(&self, rate: f64) -> f64 {
        let samples = self.sequencer.tick_duration_secs() * rate;
        if samples.is_finite() && samples >= 1.0 {
            samples
        } else {
            1.0
        }
    }
}
