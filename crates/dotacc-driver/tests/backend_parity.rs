//! Integration tests for hardware/software parity
//!
//! The hardware path encodes each factor and multiplies in fixed point; the
//! software path multiplies in f64 and encodes once. Results agree to within
//! a few Q16.16 steps per element, never bit-exactly in general.

use dotacc_driver::{
    from_fixed, ChunkBackend, DotProductEngine, HardwareBackend, SimulatedAccelerator,
    SoftwareBackend,
};
use proptest::prelude::*;

const STEP: f64 = 1.0 / 65_536.0;

/// Per-element divergence bound for factors within [-1, 1]:
/// two encodings (≤1 step each, scaled by the other factor), the fixed-point
/// renormalising shift (≤1 step) and the software encoding (≤1 step).
const ELEMENT_TOLERANCE: f64 = 4.0 * STEP;

fn simulated_engine() -> DotProductEngine {
    DotProductEngine::new(Box::new(HardwareBackend::simulated(SimulatedAccelerator::new())))
}

#[test]
fn exact_values_agree_bit_for_bit() {
    // Dyadic values encode exactly, so both orders give the same word
    let x = [0.5, -0.25, 1.0, 0.125];
    let w = [2.0, 4.0, -1.5, 8.0];
    let mut hw = HardwareBackend::simulated(SimulatedAccelerator::new());
    let mut sw = SoftwareBackend::new();
    assert_eq!(hw.compute_chunk(&x, &w, 4), sw.compute_chunk(&x, &w, 4));
}

#[test]
fn inexact_values_diverge_slightly() {
    let x = [0.3, 0.3, 0.3, 0.3];
    let mut hw = HardwareBackend::simulated(SimulatedAccelerator::new());
    let mut sw = SoftwareBackend::new();
    let h = hw.compute_chunk(&x, &x, 4);
    let s = sw.compute_chunk(&x, &x, 4);
    assert_ne!(h, s, "encode-then-multiply and multiply-then-encode should differ here");
    assert!((from_fixed(h, 16) - from_fixed(s, 16)).abs() <= 4.0 * ELEMENT_TOLERANCE);
}

#[test]
fn digits_sized_vectors_agree() {
    // 64 features, the 8×8 digits model size
    let x: Vec<f64> = (0..64).map(|i| f64::from(i % 17) / 16.0).collect();
    let w: Vec<f64> = (0..64).map(|i| (f64::from(i) * 0.37).sin()).collect();
    let hw = simulated_engine().dot_product(64, &x, &w);
    let sw = DotProductEngine::software().dot_product(64, &x, &w);
    let exact: f64 = x.iter().zip(&w).map(|(a, b)| a * b).sum();
    assert!((hw - sw).abs() <= 64.0 * ELEMENT_TOLERANCE, "hw={hw} sw={sw}");
    assert!((sw - exact).abs() <= 64.0 * STEP, "sw={sw} exact={exact}");
}

proptest! {
    #[test]
    fn chunk_parity(
        x in prop::array::uniform4(-1.0f64..1.0),
        w in prop::array::uniform4(-1.0f64..1.0),
    ) {
        let mut hw = HardwareBackend::simulated(SimulatedAccelerator::new());
        let mut sw = SoftwareBackend::new();
        let h = from_fixed(hw.compute_chunk(&x, &w, 4), 16);
        let s = from_fixed(sw.compute_chunk(&x, &w, 4), 16);
        prop_assert!((h - s).abs() <= 4.0 * ELEMENT_TOLERANCE, "hw={h} sw={s}");
    }

    #[test]
    fn engine_parity(v in prop::collection::vec((-1.0f64..1.0, -1.0f64..1.0), 0..128)) {
        let (x, w): (Vec<f64>, Vec<f64>) = v.into_iter().unzip();
        let n = x.len();
        let h = simulated_engine().dot_product(n, &x, &w);
        let s = DotProductEngine::software().dot_product(n, &x, &w);
        prop_assert!((h - s).abs() <= n as f64 * ELEMENT_TOLERANCE + STEP);
    }
}
