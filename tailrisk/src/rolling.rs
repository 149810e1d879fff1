//! Rolling-window statistics
//!
//! Every statistic is a pure function of (series, window, position): the
//! value at position `t` only looks at `values[t + 1 - window ..= t]`.
//! Positions without a full window, or whose window holds a missing value,
//! produce `NaN`.

/// Trailing window ending at `pos` (inclusive), if it is full and complete
pub fn window_at(values: &[f64], window: usize, pos: usize) -> Option<&[f64]> {
    if window == 0 || pos >= values.len() || pos + 1 < window {
        return None;
    }
    let slice = &values[pos + 1 - window..=pos];
    if slice.iter().any(|v| v.is_nan()) {
        None
    } else {
        Some(slice)
    }
}

/// Apply `f` to every trailing window, `NaN` where no window exists
pub fn rolling_map<F>(values: &[f64], window: usize, f: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    (0..values.len())
        .map(|pos| window_at(values, window, pos).map_or(f64::NAN, &f))
        .collect()
}

/// Empirical quantile with linear interpolation between order statistics
///
/// Uses the position `(n - 1) · q` in the sorted sample.
pub fn quantile_linear(sample: &[f64], q: f64) -> f64 {
    if sample.is_empty() {
        return f64::NAN;
    }
    let mut sorted = sample.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    quantile_sorted(&sorted, q)
}

/// Same as [`quantile_linear`] on an already sorted sample
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let frac = h - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Mean of observations at or beyond `threshold`, `NaN` for an empty tail
pub fn tail_mean(sample: &[f64], threshold: f64) -> f64 {
    let (sum, count) = sample
        .iter()
        .filter(|&&x| x >= threshold)
        .fold((0.0, 0usize), |(s, n), &x| (s + x, n + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

pub fn mean(sample: &[f64]) -> f64 {
    if sample.is_empty() {
        return f64::NAN;
    }
    sample.iter().sum::<f64>() / sample.len() as f64
}

/// Unbiased sample standard deviation (divisor n - 1)
pub fn std_dev(sample: &[f64]) -> f64 {
    if sample.len() < 2 {
        return f64::NAN;
    }
    let m = mean(sample);
    let ss: f64 = sample.iter().map(|x| (x - m).powi(2)).sum();
    (ss / (sample.len() - 1) as f64).sqrt()
}

/// Running state of the exponentially weighted variance recursion
#[derive(Debug, Clone, Copy, Default)]
struct EwmaState {
    variance: Option<f64>,
    observations: usize,
}

impl EwmaState {
    fn update(self, r: f64, lambda: f64) -> Self {
        if r.is_nan() {
            return self;
        }
        let sq = r * r;
        let variance = match self.variance {
            None => sq,
            Some(prev) => lambda * prev + (1.0 - lambda) * sq,
        };
        Self {
            variance: Some(variance),
            observations: self.observations + 1,
        }
    }
}

/// EWMA volatility: v_t = λ · v_{t-1} + (1 - λ) · r_t²
///
/// The recursion starts from the first squared return. Output is `NaN`
/// until `min_periods` observations have been folded in; missing returns
/// leave the state unchanged.
pub fn ewma_volatility(returns: &[f64], lambda: f64, min_periods: usize) -> Vec<f64> {
    returns
        .iter()
        .scan(EwmaState::default(), |state, &r| {
            *state = state.update(r, lambda);
            Some(match state.variance {
                Some(v) if state.observations >= min_periods => v.sqrt(),
                _ => f64::NAN,
            })
        })
        .collect()
}
