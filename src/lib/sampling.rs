//! Uniform reservoir down-sampling.

use rand::Rng;

/// Sample at most `k` items uniformly from a stream of unknown length.
///
/// The first `k` items fill the reservoir; each later item `i` (0-based)
/// replaces a uniformly chosen slot with probability `k / (i + 1)`. When the
/// stream holds `k` or fewer items they are all returned in input order.
/// Deterministic for a fixed generator state and input order.
pub fn reservoir_sample<T, R: Rng>(
    items: impl IntoIterator<Item = T>,
    k: usize,
    rng: &mut R,
) -> Vec<T> {
    let mut sample: Vec<T> = Vec::with_capacity(k);
    for (i, item) in items.into_iter().enumerate() {
        if sample.len() < k {
            sample.push(item);
        } else {
            let j = rng.gen_range(0..=i);
            if j < k {
                sample[j] = item;
            }
        }
    }
    sample
}
