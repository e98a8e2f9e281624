use arbitrary::Unstructured;
use rand::Rng;

/// Maps `draw` in `[0, 1)` onto an index of `weights`, each index owning a
/// share of the unit interval proportional to its weight. All-zero weights
/// fall back to a uniform pick. `None` only for an empty slice.
pub fn weighted_index(weights: &[f64], draw: f64) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }
    let sum: f64 = weights.iter().sum();
    if !(sum > 0.0) {
        let idx = (draw * weights.len() as f64) as usize;
        return Some(idx.min(weights.len() - 1));
    }
    let target = draw * sum;
    let mut acc = 0.0;
    for (i, w) in weights.iter().enumerate() {
        acc += w;
        if target < acc {
            return Some(i);
        }
    }
    // rounding can leave `target` a hair past the last boundary
    weights.iter().rposition(|w| *w > 0.0)
}

pub fn choose_weighted<R, T>(rng: &mut R, choices: &[(T, f64)]) -> Option<T>
where R: Rng + ?Sized, T: Copy {
    let weights: Vec<f64> = choices.iter().map(|(_, w)| *w).collect();
    let draw: f64 = rng.gen();
    weighted_index(&weights, draw).map(|i| choices[i].0)
}

/// Version of `choose_weighted` driven by raw fuzzer bytes. An exhausted
/// buffer draws zero, so the first alternative wins from then on.
pub fn choose_weighted_unstructured<T: Copy>(u: &mut Unstructured, choices: &[(T, f64)]) -> Option<T> {
    let weights: Vec<f64> = choices.iter().map(|(_, w)| *w).collect();
    let draw = unit_draw(u);
    weighted_index(&weights, draw).map(|i| choices[i].0)
}

/// A number in `[0, 1)` from the next four bytes.
pub fn unit_draw(u: &mut Unstructured) -> f64 {
    let raw: u32 = u.int_in_range(0..=u32::MAX).unwrap_or(0);
    raw as f64 / (u32::MAX as f64 + 1.0)
}
