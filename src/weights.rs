use crate::config::WEIGHT_EPSILON;
use crate::rng::SeededRng;

/// Equal weights over `n` assets.
pub fn uniform(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    vec![1.0 / n as f64; n]
}

/// Clips to non-negative and rescales to sum 1. All-zero input becomes uniform.
pub fn normalize(weights: &[f64]) -> Vec<f64> {
    let clipped: Vec<f64> = weights
        .iter()
        .map(|&w| if w.is_finite() && w > 0.0 { w } else { 0.0 })
        .collect();
    let sum: f64 = clipped.iter().sum();
    if sum <= WEIGHT_EPSILON {
        return uniform(weights.len());
    }
    clipped.into_iter().map(|w| w / sum).collect()
}

/// Sets `weights[index]` to `value` and rescales the others so the vector still sums to 1.
///
/// Others keep their relative shares. If they held no mass, the remainder is split
/// evenly between them. A one-asset vector is always `[1.0]`.
pub fn set_weight(weights: &[f64], index: usize, value: f64) -> Vec<f64> {
    let n = weights.len();
    if n <= 1 {
        return uniform(n);
    }
    if index >= n {
        return normalize(weights);
    }

    let v = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
    let remaining = 1.0 - v;
    let other_sum: f64 = weights
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != index)
        .map(|(_, &w)| w.max(0.0))
        .sum();

    let next: Vec<f64> = weights
        .iter()
        .enumerate()
        .map(|(i, &w)| {
            if i == index {
                v
            } else if other_sum <= WEIGHT_EPSILON {
                remaining / (n - 1) as f64
            } else {
                w.max(0.0) * remaining / other_sum
            }
        })
        .collect();

    normalize(&next)
}

/// Resizes to `n` slots, keeping existing values by index.
///
/// New slots share whatever the kept slots fall short of 1, then the whole vector
/// is renormalized.
pub fn resize(weights: &[f64], n: usize) -> Vec<f64> {
    let kept = weights.len().min(n);
    let mut next: Vec<f64> = weights[..kept].iter().map(|w| w.max(0.0)).collect();
    if n > kept {
        let deficit = (1.0 - next.iter().sum::<f64>()).max(0.0);
        let share = deficit / (n - kept) as f64;
        next.resize(n, share);
    }
    normalize(&next)
}

/// Random long-only weights: normalized unit exponentials (flat Dirichlet).
pub fn random(n: usize, rng: &mut SeededRng) -> Vec<f64> {
    let raw: Vec<f64> = (0..n).map(|_| rng.exponential()).collect();
    normalize(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_valid(w: &[f64]) {
        let sum: f64 = w.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6, "weights should sum to 1, got {}", sum);
        assert!(w.iter().all(|&v| v >= 0.0), "weights should be non-negative: {:?}", w);
    }

    fn assert_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-9, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn test_proportional_rescale() {
        let w = set_weight(&[0.5, 0.3, 0.2], 0, 0.8);
        assert_close(&w, &[0.8, 0.12, 0.08]);
        assert_valid(&w);
    }

    #[test]
    fn test_zero_base_spreads_uniformly() {
        let w = set_weight(&[1.0, 0.0, 0.0], 0, 0.4);
        assert_close(&w, &[0.4, 0.3, 0.3]);
    }

    #[test]
    fn test_single_asset_is_always_one() {
        assert_eq!(set_weight(&[1.0], 0, 0.3), vec![1.0]);
        assert_eq!(set_weight(&[0.2], 0, 0.0), vec![1.0]);
    }

    #[test]
    fn test_out_of_range_value_is_clamped() {
        let w = set_weight(&[0.25; 4], 1, 1.7);
        assert_close(&w, &[0.0, 1.0, 0.0, 0.0]);
        let w = set_weight(&[0.25; 4], 1, -0.5);
        assert_close(&w, &[1.0 / 3.0, 0.0, 1.0 / 3.0, 1.0 / 3.0]);
    }

    #[test]
    fn test_invariant_under_random_edit_sequences() {
        let mut rng = SeededRng::new(17);
        let mut w = uniform(6);
        for _ in 0..2_000 {
            let idx = (rng.uniform() * 6.0) as usize;
            let value = rng.uniform() * 1.2 - 0.1;
            w = set_weight(&w, idx, value);
            assert_valid(&w);
        }
    }

    #[test]
    fn test_resize_grow_fills_deficit() {
        let w = resize(&[0.6, 0.4], 3);
        // No deficit: the new slot gets nothing.
        assert_close(&w, &[0.6, 0.4, 0.0]);

        let w = resize(&[0.5, 0.3], 4);
        assert_close(&w, &[0.5, 0.3, 0.1, 0.1]);
        assert_valid(&w);
    }

    #[test]
    fn test_resize_shrink_renormalizes() {
        let w = resize(&[0.5, 0.3, 0.2], 2);
        assert_close(&w, &[0.625, 0.375]);
        assert!(resize(&[0.5, 0.5], 0).is_empty());
        assert_close(&resize(&[], 2), &[0.5, 0.5]);
    }

    #[test]
    fn test_normalize_all_zero_is_uniform() {
        assert_close(&normalize(&[0.0, 0.0, 0.0, 0.0]), &[0.25; 4]);
        assert_close(&normalize(&[-1.0, f64::NAN, 2.0]), &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_random_weights_valid_and_seeded() {
        let mut a = SeededRng::new(5);
        let mut b = SeededRng::new(5);
        for _ in 0..100 {
            let wa = random(5, &mut a);
            let wb = random(5, &mut b);
            assert_valid(&wa);
            assert_eq!(wa, wb);
        }
    }
}
