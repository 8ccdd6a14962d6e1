//! End-to-end behaviour of the chip, the filter chain and the engine

use approx::assert_abs_diff_eq;
use paula::constants::{rc_cutoff, A1200_HIGHPASS_C, A1200_HIGHPASS_R, PAULA_PAL_CLOCK};
use paula::filters::{FilterChain, OnePole};
use paula::voice::Voice;
use paula::{AmigaModel, Engine, EngineConfig, Oversampling, Paula, SampleMemory};

/// Paula whose clock / rate ratio is exactly 32
fn exact_paula() -> Paula {
    let rate = PAULA_PAL_CLOCK / 32.0;
    let mut chip = Paula::with_clock(PAULA_PAL_CLOCK, rate);
    chip.attach_memory(SampleMemory::from_vec(vec![127, -128]));
    chip
}

fn sign_changes(buf: &[f64]) -> Vec<usize> {
    buf.windows(2)
        .enumerate()
        .filter(|(_, w)| (w[0] >= 0.0) != (w[1] >= 0.0))
        .map(|(i, _)| i + 1)
        .collect()
}

#[test]
fn square_wave_has_exact_integer_period() {
    for &period in &[256u16, 512, 1024] {
        let samples_per_byte = usize::from(period) / 32;
        let mut chip = exact_paula();
        chip.set_data(0, Some(0));
        chip.set_length(0, 1);
        chip.set_period(0, period);
        chip.set_volume(0, 64);
        chip.start_dma(0b0001);

        let len = samples_per_byte * 2 * 16;
        let mut left = vec![0.0; len];
        let mut right = vec![0.0; len];
        chip.generate(&mut left, &mut right);

        // Zero crossings are evenly spaced by one byte duration
        let crossings = sign_changes(&left);
        assert_eq!(crossings.len(), 31, "period {period}");
        for pair in crossings.windows(2) {
            assert_eq!(pair[1] - pair[0], samples_per_byte, "period {period}");
        }

        // The last sample of every half cycle has settled on the held value
        for half in 0..32 {
            let expected = if half % 2 == 0 { 127.0 / 128.0 } else { -1.0 };
            let settled = left[half * samples_per_byte + samples_per_byte - 1];
            assert_abs_diff_eq!(settled, expected, epsilon = 1e-3);
        }

        // With more than 8 samples per byte the BLEP drains completely
        if samples_per_byte > 8 {
            for half in 0..32 {
                let expected = if half % 2 == 0 { 127.0 / 128.0 } else { -1.0 };
                for i in 8..samples_per_byte {
                    assert_eq!(left[half * samples_per_byte + i], expected);
                }
            }
        }
    }
}

#[test]
fn wraparound_spacing_follows_period() {
    let rate = 48_000.0;
    for period in (113u16..=1000).step_by(37) {
        let mut chip = Paula::with_clock(PAULA_PAL_CLOCK, rate);
        chip.attach_memory(SampleMemory::from_vec(vec![1; 2]));
        chip.set_data(0, Some(0));
        chip.set_length(0, 1);
        chip.set_period(0, period);
        chip.set_volume(0, 64);
        chip.start_dma(0b0001);

        let samples_per_byte = f64::from(period) * rate / PAULA_PAL_CLOCK;
        let mut wraps = Vec::new();
        let mut left = [0.0];
        let mut right = [0.0];
        for i in 0..4000 {
            let before = chip.voice(0).map_or(0.0, Voice::phase);
            chip.generate(&mut left, &mut right);
            if chip.voice(0).map_or(0.0, Voice::phase) < before {
                wraps.push(i);
            }
        }

        for pair in wraps.windows(2) {
            let gap = (pair[1] - pair[0]) as f64;
            assert!(
                gap == samples_per_byte.floor() || gap == samples_per_byte.ceil(),
                "period {period}: gap {gap} vs {samples_per_byte}"
            );
        }
        let first = wraps[0];
        let last = wraps[wraps.len() - 1];
        let mean = (last - first) as f64 / (wraps.len() - 1) as f64;
        assert_abs_diff_eq!(mean, samples_per_byte, epsilon = samples_per_byte * 0.01);
    }
}

#[test]
fn generate_with_all_voices_inactive_is_silent() {
    let mut chip = exact_paula();
    chip.set_data(0, Some(0));
    chip.set_length(0, 1);
    chip.set_volume(0, 64);
    chip.start_dma(0b1111);
    chip.stop_dma(0b1111);
    chip.stop_dma(0b1111);

    for len in [0usize, 1, 333, 4096] {
        let mut left = vec![0.25; len];
        let mut right = vec![-0.25; len];
        chip.generate(&mut left, &mut right);
        assert_eq!(left.len(), len);
        assert!(left.iter().chain(&right).all(|&s| s == 0.0));
    }
}

#[test]
fn led_toggle_without_audio_leaves_state_untouched() {
    let mut engine = Engine::new(EngineConfig::default()).unwrap();
    engine.attach_sample_memory(SampleMemory::from_vec(vec![127, -128]));
    engine.set_data(0, Some(0));
    engine.set_length(0, 1);
    engine.set_period(0, 300);
    engine.set_volume(0, 64);
    engine.start_dma(0b0001);

    let mut left = vec![0.0f32; 2048];
    let mut right = vec![0.0f32; 2048];
    engine.render(&mut left, &mut right);

    let before = engine.filters().clone();
    engine.set_led_filter(true);
    engine.set_led_filter(false);
    assert_eq!(engine.filters(), &before);
}

#[test]
fn bypassed_chain_is_pure_high_pass() {
    let rate = 44_100.0;
    let mut chain = FilterChain::new(AmigaModel::A1200, rate, false);
    assert!(!chain.pipeline().static_lowpass);
    assert!(!chain.pipeline().led);

    let cutoff = rc_cutoff(A1200_HIGHPASS_R, A1200_HIGHPASS_C);
    let mut highpass = OnePole::high_pass(cutoff, rate);

    let mut left: Vec<f64> = (0..4096).map(|i| ((i * 7919) % 257) as f64 / 128.0 - 1.0).collect();
    let mut right: Vec<f64> = left.iter().rev().copied().collect();
    let expected: Vec<(f64, f64)> = left
        .iter()
        .zip(&right)
        .map(|(&l, &r)| highpass.process(l, r))
        .collect();

    chain.process(&mut left, &mut right);
    for (i, &(l, r)) in expected.iter().enumerate() {
        assert_eq!((left[i], right[i]), (l, r), "frame {i}");
    }
}

#[test]
fn volume_doubling_doubles_raw_output() {
    let render = |volume: u16| {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        engine.attach_sample_memory(SampleMemory::from_vec(vec![-77; 8]));
        engine.set_data(3, Some(0));
        engine.set_length(3, 4);
        engine.set_period(3, 500);
        engine.set_volume(3, volume);
        engine.start_dma(0b1000);
        let mut left = vec![0.0; 256];
        let mut right = vec![0.0; 256];
        engine.render_raw(&mut left, &mut right);
        left
    };

    for volume in [1u16, 5, 16, 32] {
        let single = render(volume);
        let double = render(volume * 2);
        for (a, b) in single.iter().zip(&double) {
            assert_eq!(*b, 2.0 * *a);
        }
    }
}

#[test]
fn oversampled_engines_keep_separate_decimator_state() {
    let config = EngineConfig::default().oversampling(Oversampling::FilterAtOutputRate);
    let setup = |engine: &mut Engine| {
        engine.attach_sample_memory(SampleMemory::from_vec(vec![90, -90, 40, -40]));
        engine.set_data(1, Some(0));
        engine.set_length(1, 2);
        engine.set_period(1, 160);
        engine.set_volume(1, 64);
        engine.start_dma(0b0010);
    };

    let mut live = Engine::new(config.clone()).unwrap();
    let mut offline = Engine::new(config).unwrap();
    setup(&mut live);
    setup(&mut offline);

    let mut a = (vec![0.0f32; 1000], vec![0.0f32; 1000]);
    let mut b = (vec![0.0f32; 1000], vec![0.0f32; 1000]);
    // Interleaved rendering must not leak state between engines
    for chunk in 0..10 {
        let range = chunk * 100..(chunk + 1) * 100;
        live.render(&mut a.0[range.clone()], &mut a.1[range.clone()]);
        offline.render(&mut b.0[range.clone()], &mut b.1[range]);
    }
    assert_eq!(a, b);
}
