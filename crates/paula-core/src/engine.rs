//! Engine: Paula, filters, decimator and sync queue behind one owner
//!
//! All state lives in one [`Engine`]. The audio callback and the sequencer
//! share it through [`SharedEngine`], whose mutex is the audio lock: register
//! writes hold it for a single call, rendering holds it for one callback.
//!
//! Scratch buffers are allocated once in [`Engine::new`]; rendering never
//! allocates. Blocks longer than `max_block_frames` are rendered in chunks.

use std::sync::Arc;

use log::{debug, info};
use parking_lot::{Mutex, MutexGuard};

use crate::config::{
    validate_output_rate, AmigaModel, EngineConfig, Oversampling, VideoStandard,
};
use crate::constants::{DMACON_AUDIO_MASK, DMACON_SET, NUM_VOICES};
use crate::decimator::StereoDecimator;
use crate::filters::FilterChain;
use crate::memory::SampleMemory;
use crate::output::StereoMix;
use crate::paula::Paula;
use crate::sync::{SyncConsumer, SyncFlags, SyncProducer, SyncQueue, SyncRecord};
use crate::Result;

/// Rate the filter chain runs at for a configuration
fn filter_rate(config: &EngineConfig) -> f64 {
    match config.oversampling {
        Oversampling::FilterAtHighRate => config.paula_rate(),
        Oversampling::Off | Oversampling::FilterAtOutputRate => f64::from(config.output_rate),
    }
}

/// Allocate a zeroed buffer, reporting failure instead of aborting
fn alloc_scratch(len: usize) -> Result<Vec<f64>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)?;
    buf.resize(len, 0.0);
    Ok(buf)
}

/// Paula audio engine
///
/// # Example
///
/// ```
/// use paula::{Engine, EngineConfig, Oversampling, SampleMemory};
///
/// let config = EngineConfig::default().oversampling(Oversampling::FilterAtHighRate);
/// let mut engine = Engine::new(config).unwrap();
/// engine.attach_sample_memory(SampleMemory::from_vec(vec![100; 64]));
///
/// engine.set_data(1, Some(0));
/// engine.set_length(1, 32);
/// engine.set_period(1, 254);
/// engine.set_volume(1, 48);
/// engine.write_dmacon(0x8002);
///
/// let mut left = [0.0f32; 256];
/// let mut right = [0.0f32; 256];
/// engine.render(&mut left, &mut right);
/// ```
pub struct Engine {
    config: EngineConfig,
    paula: Paula,
    filters: FilterChain,
    decimator: StereoDecimator,
    mix: StereoMix,
    scratch_left: Vec<f64>,
    scratch_right: Vec<f64>,
    sync: SyncProducer,
    sync_consumer: Option<SyncConsumer>,
    sync_timestamp: u64,
}

impl Engine {
    /// Build an engine
    ///
    /// # Errors
    ///
    /// `ConfigError` for an invalid configuration, `Allocation` if the
    /// scratch buffers or the sync queue cannot be allocated.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        // Room for one oversampled block, whatever the current mode
        let scratch_len = config.max_block_frames.saturating_mul(2);
        let scratch_left = alloc_scratch(scratch_len)?;
        let scratch_right = alloc_scratch(scratch_len)?;
        let (sync, sync_consumer) = SyncQueue::with_capacity_bits(config.sync_queue_bits)?.split();

        let paula = Paula::with_clock(config.video_standard.paula_clock(), config.paula_rate());
        let filters = FilterChain::new(config.model, filter_rate(&config), config.led_filter);
        let mix = StereoMix::new(config.stereo_separation, config.master_gain);

        info!(
            "Paula engine: {} Hz output, oversampling {:?}, {:?} {:?}",
            config.output_rate, config.oversampling, config.model, config.video_standard
        );

        Ok(Self {
            config,
            paula,
            filters,
            decimator: StereoDecimator::new(),
            mix,
            scratch_left,
            scratch_right,
            sync,
            sync_consumer: Some(sync_consumer),
            sync_timestamp: 0,
        })
    }

    /// Current configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Chip state (voices, DMA bits)
    pub fn paula(&self) -> &Paula {
        &self.paula
    }

    /// Filter chain state
    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    /// Change the host output rate
    ///
    /// Coefficients are recomputed and all filter and decimator state is
    /// cleared.
    ///
    /// # Errors
    ///
    /// `ConfigError` if the rate is outside 32000-384000 Hz; the engine is
    /// left unchanged.
    pub fn set_output_rate(&mut self, rate: u32) -> Result<()> {
        validate_output_rate(rate)?;
        self.config.output_rate = rate;
        self.apply_rates();
        info!("Output rate set to {rate} Hz");
        Ok(())
    }

    /// Change the oversampling mode (state is cleared as for a rate change)
    pub fn set_oversampling(&mut self, mode: Oversampling) {
        self.config.oversampling = mode;
        self.apply_rates();
        info!("Oversampling set to {mode:?}");
    }

    /// Change the emulated machine (filter state is cleared)
    pub fn set_model(&mut self, model: AmigaModel) {
        self.config.model = model;
        self.filters.set_model(model);
        debug!("Filter model set to {model:?}");
    }

    /// Change the Paula clock
    pub fn set_video_standard(&mut self, standard: VideoStandard) {
        self.config.video_standard = standard;
        self.paula
            .set_rates(standard.paula_clock(), self.config.paula_rate());
        debug!("Video standard set to {standard:?}");
    }

    /// Stereo separation in percent (clamped to 100)
    pub fn set_stereo_separation(&mut self, percent: u8) {
        self.config.stereo_separation = percent.min(100);
        self.mix.set_separation(percent);
    }

    /// Linear output gain (negative or non-finite values are ignored)
    pub fn set_master_gain(&mut self, gain: f32) {
        if gain.is_finite() && gain >= 0.0 {
            self.config.master_gain = gain;
            self.mix.set_gain(gain);
        }
    }

    /// Attach the sample arena; stops all DMA
    pub fn attach_sample_memory(&mut self, memory: SampleMemory) {
        debug!("Attached {} bytes of sample memory", memory.len());
        self.paula.attach_memory(memory);
    }

    /// Reset voices, filters and decimator (configuration is kept)
    pub fn reset(&mut self) {
        self.paula.reset();
        self.filters.clear();
        self.decimator.reset();
    }

    fn apply_rates(&mut self) {
        let clock = self.config.video_standard.paula_clock();
        self.paula.set_rates(clock, self.config.paula_rate());
        self.filters.set_rate(filter_rate(&self.config));
        self.decimator.reset();
    }

    // ========================================================================
    // Register writes
    // ========================================================================

    /// AUDxPER write
    ///
    /// # Arguments
    ///
    /// * `voice` - Voice index (0-3, others ignored)
    /// * `period` - Period register value
    pub fn set_period(&mut self, voice: usize, period: u16) {
        self.paula.set_period(voice, period);
        self.mirror(voice, SyncFlags::PERIOD);
    }

    /// AUDxVOL write (clamped to 64)
    pub fn set_volume(&mut self, voice: usize, volume: u16) {
        self.paula.set_volume(voice, volume);
        self.mirror(voice, SyncFlags::VOLUME);
    }

    /// AUDxLEN write (words, 0 means 65536)
    pub fn set_length(&mut self, voice: usize, length: u16) {
        self.paula.set_length(voice, length);
        self.mirror(voice, SyncFlags::LENGTH);
    }

    /// AUDxLC write as a byte offset into the attached memory
    ///
    /// `None` or an offset outside the arena selects the silent buffer.
    pub fn set_data(&mut self, voice: usize, offset: Option<usize>) {
        self.paula.set_data(voice, offset);
        self.mirror(voice, SyncFlags::DATA);
    }

    /// Start DMA (trigger) for the voices in `mask`
    pub fn start_dma(&mut self, mask: u16) {
        self.paula.start_dma(mask);
        self.mirror_mask(mask, SyncFlags::TRIGGER);
    }

    /// Stop DMA for the voices in `mask`
    pub fn stop_dma(&mut self, mask: u16) {
        self.paula.stop_dma(mask);
        self.mirror_mask(mask, SyncFlags::STOP);
    }

    /// DMACON write (bit 15 set/clear, bits 0-3 voices)
    pub fn write_dmacon(&mut self, value: u16) {
        let mask = value & DMACON_AUDIO_MASK;
        if value & DMACON_SET != 0 {
            self.start_dma(mask);
        } else {
            self.stop_dma(mask);
        }
    }

    /// Switch the LED filter
    pub fn set_led_filter(&mut self, enabled: bool) {
        if enabled != self.filters.led_enabled() {
            debug!("LED filter {}", if enabled { "on" } else { "off" });
        }
        self.config.led_filter = enabled;
        self.filters.set_led_enabled(enabled);
    }

    /// LED filter state
    pub fn led_filter(&self) -> bool {
        self.filters.led_enabled()
    }

    // ========================================================================
    // Visual sync
    // ========================================================================

    /// Timestamp (ns) attached to subsequent register writes
    ///
    /// Set by the driver to the time the written state becomes audible.
    pub fn set_sync_timestamp(&mut self, timestamp_ns: u64) {
        self.sync_timestamp = timestamp_ns;
    }

    /// Current sync timestamp
    pub fn sync_timestamp(&self) -> u64 {
        self.sync_timestamp
    }

    /// Hand out the read side of the sync queue (once)
    pub fn take_sync_consumer(&mut self) -> Option<SyncConsumer> {
        self.sync_consumer.take()
    }

    /// Overflow resets of the sync queue so far
    pub fn sync_reset_count(&self) -> u64 {
        self.sync.reset_count()
    }

    fn mirror_mask(&mut self, mask: u16, flags: SyncFlags) {
        for voice in 0..NUM_VOICES {
            if mask & (1 << voice) != 0 {
                self.mirror(voice, flags);
            }
        }
    }

    fn mirror(&mut self, voice: usize, flags: SyncFlags) {
        let Some(state) = self.paula.voice(voice) else {
            return;
        };
        let record = SyncRecord {
            timestamp: self.sync_timestamp,
            voice: voice as u8,
            flags,
            volume: state.volume() as u8,
            period: state.period(),
            length: state.length(),
            data: state.data().offset(),
        };
        self.sync.push(record);
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Render filtered stereo output at the output rate
    ///
    /// Only the common prefix of `left` and `right` is written.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        let block = self.config.max_block_frames;

        let mut done = 0;
        while done < frames {
            let n = (frames - done).min(block);
            self.render_block(&mut left[done..done + n], &mut right[done..done + n]);
            done += n;
        }
    }

    fn render_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        let n = left.len();
        let high = n * self.config.oversampling.factor();
        let buf_l = &mut self.scratch_left[..high];
        let buf_r = &mut self.scratch_right[..high];

        self.paula.generate(buf_l, buf_r);

        let produced = match self.config.oversampling {
            Oversampling::Off => {
                self.filters.process(buf_l, buf_r);
                n
            }
            Oversampling::FilterAtHighRate => {
                self.filters.process(buf_l, buf_r);
                self.decimator.process_in_place(buf_l, buf_r)
            }
            Oversampling::FilterAtOutputRate => {
                let produced = self.decimator.process_in_place(buf_l, buf_r);
                self.filters
                    .process(&mut buf_l[..produced], &mut buf_r[..produced]);
                produced
            }
        };

        // An even input count with no carried sample yields exactly n frames
        self.mix
            .apply_block(&buf_l[..produced], &buf_r[..produced], left, right);
    }

    /// Unfiltered mixer output at the Paula rate
    ///
    /// When oversampling, the Paula rate is twice the output rate and the
    /// buffers are filled at that rate. Nothing downstream of the mixer runs.
    pub fn render_raw(&mut self, left: &mut [f64], right: &mut [f64]) {
        self.paula.generate(left, right);
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("paula", &self.paula)
            .field("led_filter", &self.filters.led_enabled())
            .field("sync_timestamp", &self.sync_timestamp)
            .finish_non_exhaustive()
    }
}

/// Engine shared between the sequencer and the audio callback
///
/// Cloning shares the same engine.
#[derive(Clone, Debug)]
pub struct SharedEngine {
    inner: Arc<Mutex<Engine>>,
}

impl SharedEngine {
    /// Wrap an engine
    pub fn new(engine: Engine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Take the audio lock
    ///
    /// Hold it only for the register writes of one sequencer step.
    pub fn lock(&self) -> MutexGuard<'_, Engine> {
        self.inner.lock()
    }

    /// Run `f` under the audio lock
    pub fn with<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Render one callback's worth of audio under a single lock
    pub fn render(&self, left: &mut [f32], right: &mut [f32]) {
        self.inner.lock().render(left, right);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PaulaError;

    /// Square wave: 16 bytes high, 16 bytes low
    fn square_memory() -> SampleMemory {
        let mut bytes = vec![96i8; 16];
        bytes.extend(std::iter::repeat(-96).take(16));
        SampleMemory::from_vec(bytes)
    }

    fn playing_engine(config: EngineConfig) -> Engine {
        let mut engine = Engine::new(config).unwrap();
        engine.attach_sample_memory(square_memory());
        engine.set_data(0, Some(0));
        engine.set_length(0, 16);
        engine.set_period(0, 428);
        engine.set_volume(0, 64);
        engine.write_dmacon(DMACON_SET | 0b0001);
        engine
    }

    fn render_vec(engine: &mut Engine, frames: usize) -> (Vec<f32>, Vec<f32>) {
        let mut left = vec![0.0; frames];
        let mut right = vec![0.0; frames];
        engine.render(&mut left, &mut right);
        (left, right)
    }

    fn rms(buf: &[f32]) -> f64 {
        let sum: f64 = buf.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
        (sum / buf.len() as f64).sqrt()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = Engine::new(EngineConfig::default().output_rate(1000));
        assert!(matches!(result, Err(PaulaError::ConfigError(_))));
    }

    #[test]
    fn test_set_output_rate_validates() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        assert!(engine.set_output_rate(500_000).is_err());
        assert_eq!(engine.config().output_rate, 48_000);
        assert!(engine.set_output_rate(96_000).is_ok());
        assert_eq!(engine.filters().rate(), 96_000.0);
    }

    #[test]
    fn test_oversampling_sets_paula_and_filter_rates() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        engine.set_oversampling(Oversampling::FilterAtHighRate);
        assert_eq!(engine.paula().paula_rate(), 96_000.0);
        assert_eq!(engine.filters().rate(), 96_000.0);

        engine.set_oversampling(Oversampling::FilterAtOutputRate);
        assert_eq!(engine.paula().paula_rate(), 96_000.0);
        assert_eq!(engine.filters().rate(), 48_000.0);
    }

    #[test]
    fn test_idle_engine_is_near_silent() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        let (left, right) = render_vec(&mut engine, 1024);
        assert!(left.iter().chain(&right).all(|s| s.abs() < 1e-15));

        let mut raw_l = vec![1.0; 64];
        let mut raw_r = vec![1.0; 64];
        engine.render_raw(&mut raw_l, &mut raw_r);
        assert!(raw_l.iter().chain(&raw_r).all(|&s| s == 0.0));
    }

    #[test]
    fn test_all_modes_render_the_same_tone() {
        let reference = {
            let mut engine = playing_engine(EngineConfig::default());
            let (left, _) = render_vec(&mut engine, 9600);
            rms(&left[4800..])
        };
        assert!(reference > 0.05);

        for mode in [Oversampling::FilterAtHighRate, Oversampling::FilterAtOutputRate] {
            let mut engine = playing_engine(EngineConfig::default().oversampling(mode));
            let (left, right) = render_vec(&mut engine, 9600);
            assert!(left.iter().all(|s| s.is_finite()));
            let level = rms(&left[4800..]);
            assert!(
                (level - reference).abs() / reference < 0.1,
                "{mode:?}: {level} vs {reference}"
            );
            // 20% separation leaks the left-only voice into the right channel
            assert!(rms(&right[4800..]) > 0.0);
        }
    }

    /// Rebuild one block by hand from the individual stages
    fn render_by_stages(config: &EngineConfig, frames: usize) -> (Vec<f32>, Vec<f32>) {
        let clock = config.video_standard.paula_clock();
        let mut paula = Paula::with_clock(clock, config.paula_rate());
        paula.attach_memory(square_memory());
        paula.set_data(0, Some(0));
        paula.set_length(0, 16);
        paula.set_period(0, 428);
        paula.set_volume(0, 64);
        paula.start_dma(0b0001);

        let mut filters = FilterChain::new(config.model, filter_rate(config), config.led_filter);
        let mut decimator = StereoDecimator::new();
        let mix = StereoMix::new(config.stereo_separation, config.master_gain);

        let high = frames * config.oversampling.factor();
        let mut buf_l = vec![0.0; high];
        let mut buf_r = vec![0.0; high];
        paula.generate(&mut buf_l, &mut buf_r);

        match config.oversampling {
            Oversampling::Off => filters.process(&mut buf_l, &mut buf_r),
            Oversampling::FilterAtHighRate => {
                filters.process(&mut buf_l, &mut buf_r);
                assert_eq!(decimator.process_in_place(&mut buf_l, &mut buf_r), frames);
            }
            Oversampling::FilterAtOutputRate => {
                assert_eq!(decimator.process_in_place(&mut buf_l, &mut buf_r), frames);
                filters.process(&mut buf_l[..frames], &mut buf_r[..frames]);
            }
        }

        let mut left = vec![0.0; frames];
        let mut right = vec![0.0; frames];
        mix.apply_block(&buf_l[..frames], &buf_r[..frames], &mut left, &mut right);
        (left, right)
    }

    #[test]
    fn test_render_matches_stage_order_per_mode() {
        let mut outputs = Vec::new();
        for mode in [
            Oversampling::Off,
            Oversampling::FilterAtHighRate,
            Oversampling::FilterAtOutputRate,
        ] {
            let config = EngineConfig::default().oversampling(mode).led_filter(true);
            let expected = render_by_stages(&config, 2000);
            let mut engine = playing_engine(config);
            let actual = render_vec(&mut engine, 2000);
            assert_eq!(actual, expected, "{mode:?}");
            outputs.push(actual);
        }
        // Filtering before and after decimation gives audibly close but distinct results
        assert_ne!(outputs[1], outputs[2]);
    }

    #[test]
    fn test_chunked_render_matches_single_block() {
        for mode in [
            Oversampling::Off,
            Oversampling::FilterAtHighRate,
            Oversampling::FilterAtOutputRate,
        ] {
            let config = EngineConfig::default().oversampling(mode);
            let mut whole = playing_engine(config.clone().max_block_frames(8192));
            let mut chunked = playing_engine(config.max_block_frames(100));

            let expected = render_vec(&mut whole, 5000);
            let actual = render_vec(&mut chunked, 5000);
            assert_eq!(expected, actual, "{mode:?}");
        }
    }

    #[test]
    fn test_register_writes_are_mirrored() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        let mut rx = engine.take_sync_consumer().unwrap();
        assert!(engine.take_sync_consumer().is_none());

        engine.attach_sample_memory(square_memory());
        engine.set_sync_timestamp(1_000);
        engine.set_period(2, 300);
        engine.set_volume(2, 80);
        engine.set_data(2, Some(16));
        engine.start_dma(0b0100);
        engine.set_period(9, 300);

        let mut records = Vec::new();
        rx.drain_due(u64::MAX, |r| records.push(r));
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.timestamp == 1_000 && r.voice == 2));
        assert_eq!(records[0].flags, SyncFlags::PERIOD);
        assert_eq!(records[1].volume, 64);
        assert_eq!(records[2].data, Some(16));
        assert_eq!(records[3].flags, SyncFlags::TRIGGER);
        assert_eq!(records[3].period, 300);
    }

    #[test]
    fn test_dmacon_clear_mirrors_stop() {
        let mut engine = playing_engine(EngineConfig::default());
        let mut rx = engine.take_sync_consumer().unwrap();
        rx.drain_due(u64::MAX, |_| {});

        engine.write_dmacon(0b1001);
        assert_eq!(engine.paula().dma_enabled(), 0);
        let mut flags = Vec::new();
        rx.drain_due(u64::MAX, |r| flags.push((r.voice, r.flags)));
        assert_eq!(flags, vec![(0, SyncFlags::STOP), (3, SyncFlags::STOP)]);
    }

    #[test]
    fn test_reset_restores_power_on_state() {
        let mut engine = playing_engine(EngineConfig::default());
        render_vec(&mut engine, 256);
        engine.reset();
        assert_eq!(engine.paula().dma_enabled(), 0);
        let fresh = Engine::new(EngineConfig::default()).unwrap();
        assert_eq!(engine.filters(), fresh.filters());
    }

    #[test]
    fn test_shared_engine_renders_under_lock() {
        let shared = SharedEngine::new(playing_engine(EngineConfig::default()));
        let writer = shared.clone();
        writer.with(|engine| engine.set_volume(0, 32));
        assert_eq!(shared.lock().paula().voice(0).map(|v| v.volume()), Some(32));

        let mut left = [0.0f32; 128];
        let mut right = [0.0f32; 128];
        shared.render(&mut left, &mut right);
        assert!(left.iter().any(|&s| s != 0.0));
    }
}
