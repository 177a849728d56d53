//! Next-token selection: greedy argmax, temperature scaling, numerically
//! stable softmax and nucleus (top-p) sampling.

use rand::Rng;

use crate::model::TokenId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    /// `<= 0` selects greedy decoding.
    pub temperature: f32,
    /// Nucleus threshold in (0, 1]; `1.0` disables truncation.
    pub top_p: f32,
}

impl SamplingParams {
    pub fn greedy() -> Self {
        Self {
            temperature: 0.0,
            top_p: 1.0,
        }
    }

    pub fn is_greedy(&self) -> bool {
        self.temperature <= 0.0
    }
}

/// Picks one token from `logits`. Greedy requests never touch `rng`.
pub fn sample_token<R: Rng + ?Sized>(
    logits: &[f32],
    params: &SamplingParams,
    rng: &mut R,
) -> TokenId {
    if params.is_greedy() {
        return greedy(logits);
    }
    match sampling_distribution(logits, params) {
        Some(candidates) => draw(&candidates, rng.r#gen::<f32>()),
        None => greedy(logits),
    }
}

/// Index of the largest logit, lowest index on ties. NaN entries never win.
pub fn greedy(logits: &[f32]) -> TokenId {
    let mut best_idx = 0usize;
    let mut best = f32::NEG_INFINITY;
    for (idx, &value) in logits.iter().enumerate() {
        if value > best {
            best = value;
            best_idx = idx;
        }
    }
    best_idx as TokenId
}

/// Softmax with the row maximum subtracted before exponentiating. Returns
/// `None` for degenerate rows (empty, no finite maximum, zero mass).
pub fn softmax(logits: &[f32]) -> Option<Vec<f32>> {
    let max = logits
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return None;
    }

    let exps: Vec<f64> = logits
        .iter()
        .map(|&v| if v.is_nan() { 0.0 } else { f64::from(v - max).exp() })
        .collect();
    let total: f64 = exps.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return None;
    }
    Some(exps.iter().map(|&e| (e / total) as f32).collect())
}

/// The `(token index, probability)` pairs a non-greedy draw selects from,
/// renormalized to sum to one. With `top_p >= 1` this is the full softmax in
/// vocabulary order; otherwise the shortest descending-probability prefix
/// whose cumulative mass reaches `top_p`.
pub fn sampling_distribution(
    logits: &[f32],
    params: &SamplingParams,
) -> Option<Vec<(usize, f32)>> {
    let scaled: Vec<f32> = logits.iter().map(|&v| v / params.temperature).collect();
    let probs = softmax(&scaled)?;

    if params.top_p >= 1.0 {
        return Some(probs.into_iter().enumerate().collect());
    }
    nucleus(&probs, params.top_p)
}

fn nucleus(probs: &[f32], top_p: f32) -> Option<Vec<(usize, f32)>> {
    let mut order: Vec<usize> = (0..probs.len()).collect();
    // stable: equal probabilities keep ascending index order
    order.sort_by(|&a, &b| probs[b].total_cmp(&probs[a]));

    let mut kept = Vec::new();
    let mut cumulative = 0.0f32;
    for idx in order {
        let prob = probs[idx];
        if !(prob > 0.0) {
            break;
        }
        kept.push((idx, prob));
        cumulative += prob;
        if cumulative >= top_p {
            break;
        }
    }

    let mass: f32 = kept.iter().map(|&(_, p)| p).sum();
    if kept.is_empty() || !(mass > 0.0) {
        return None;
    }
    Some(kept.into_iter().map(|(idx, p)| (idx, p / mass)).collect())
}

/// Inverse-CDF draw for a uniform deviate `u` in `[0, 1)`.
fn draw(candidates: &[(usize, f32)], u: f32) -> TokenId {
    let mut cumulative = 0.0f32;
    for &(idx, prob) in candidates {
        cumulative += prob;
        if u < cumulative {
            return idx as TokenId;
        }
    }
    // rounding left the total just below u
    candidates
        .iter()
        .rev()
        .find(|&&(_, p)| p > 0.0)
        .map(|&(idx, _)| idx as TokenId)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn sampled(temperature: f32, top_p: f32) -> SamplingParams {
        SamplingParams { temperature, top_p }
    }

    #[test]
    fn greedy_picks_max_and_breaks_ties_low() {
        assert_eq!(greedy(&[0.1, 3.0, -2.0, 3.0]), 1);
        assert_eq!(greedy(&[5.0, 5.0]), 0);
        assert_eq!(greedy(&[f32::NAN, 1.0, 0.5]), 1);
    }

    #[test]
    fn softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        let total: f64 = probs.iter().map(|&p| f64::from(p)).sum();
        assert!((total - 1.0).abs() < 1e-6, "total = {total}");
        assert!(probs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn softmax_is_stable_for_large_logits() {
        for logits in [
            vec![1.0e4f32, 1.0e4 - 1.0, -1.0e4],
            vec![-3.0e38f32, -3.0e38 + 1.0e32, 0.0],
            vec![88.0f32, 89.0, 1000.0, 3.0e38],
        ] {
            let probs = softmax(&logits).unwrap();
            assert!(probs.iter().all(|p| p.is_finite()), "{logits:?} -> {probs:?}");
            let total: f64 = probs.iter().map(|&p| f64::from(p)).sum();
            assert!((total - 1.0).abs() < 1e-6, "{logits:?} sums to {total}");
        }
    }

    #[test]
    fn softmax_rejects_degenerate_rows() {
        assert!(softmax(&[]).is_none());
        assert!(softmax(&[f32::NEG_INFINITY, f32::NEG_INFINITY]).is_none());
        assert!(softmax(&[f32::NAN]).is_none());
        assert!(softmax(&[f32::INFINITY, 0.0]).is_none());
    }

    #[test]
    fn top_p_one_keeps_full_distribution() {
        let logits = [0.5f32, 2.0, -1.0, 1.0];
        let dist = sampling_distribution(&logits, &sampled(1.0, 1.0)).unwrap();
        let expected = softmax(&logits).unwrap();
        assert_eq!(dist.len(), logits.len());
        for (pos, &(idx, p)) in dist.iter().enumerate() {
            assert_eq!(idx, pos);
            assert_eq!(p, expected[idx]);
        }
    }

    #[test]
    fn top_p_at_max_probability_keeps_only_argmax() {
        let logits = [1.0f32, 3.0, 2.5, 0.0];
        let temperature = 0.8f32;
        let scaled: Vec<f32> = logits.iter().map(|v| v / temperature).collect();
        let top = softmax(&scaled).unwrap()[1];
        let params = sampled(temperature, top);

        let dist = sampling_distribution(&logits, &params).unwrap();
        assert_eq!(dist, vec![(1, 1.0)]);

        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            assert_eq!(sample_token(&logits, &params, &mut rng), 1);
        }
    }

    #[test]
    fn nucleus_is_renormalized_prefix() {
        // probabilities 0.5, 0.3, 0.2 after softmax of their logs
        let logits = [0.2f32.ln(), 0.5f32.ln(), 0.3f32.ln()];
        let dist = sampling_distribution(&logits, &sampled(1.0, 0.7)).unwrap();
        let indices: Vec<usize> = dist.iter().map(|&(idx, _)| idx).collect();
        assert_eq!(indices, vec![1, 2]);
        assert!((dist[0].1 - 0.625).abs() < 1e-5);
        assert!((dist[1].1 - 0.375).abs() < 1e-5);
    }

    #[test]
    fn sampled_tokens_stay_inside_nucleus() {
        let logits = [0.2f32.ln(), 0.5f32.ln(), 0.3f32.ln()];
        let params = sampled(1.0, 0.7);
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = [0usize; 3];
        for _ in 0..2000 {
            seen[sample_token(&logits, &params, &mut rng) as usize] += 1;
        }
        assert_eq!(seen[0], 0);
        assert!(seen[1] > seen[2]);
        assert!(seen[2] > 0);
    }

    #[test]
    fn zero_temperature_is_greedy() {
        let mut rng = StdRng::seed_from_u64(0);
        let logits = [0.0, 0.1, 9.0, 0.2];
        assert_eq!(sample_token(&logits, &SamplingParams::greedy(), &mut rng), 2);
        assert_eq!(sample_token(&logits, &sampled(-1.0, 0.5), &mut rng), 2);
    }

    #[test]
    fn degenerate_distribution_falls_back_to_greedy() {
        let mut rng = StdRng::seed_from_u64(0);
        let logits = [f32::NEG_INFINITY, f32::INFINITY, f32::INFINITY];
        assert_eq!(sample_token(&logits, &sampled(0.7, 0.9), &mut rng), 1);
    }

    #[test]
    fn draw_walks_cumulative_distribution() {
        let candidates = [(4, 0.25), (7, 0.5), (9, 0.25)];
        assert_eq!(draw(&candidates, 0.0), 4);
        assert_eq!(draw(&candidates, 0.3), 7);
        assert_eq!(draw(&candidates, 0.8), 9);
        assert_eq!(draw(&candidates, 0.99999), 9);
    }
}
