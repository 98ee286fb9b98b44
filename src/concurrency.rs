//! Thread-partitioned summation: split an ordered sequence of per-item
//! contributions across a fixed number of worker threads and reduce the
//! partial sums back together in index order, so the result is
//! identical (up to floating-point summation order within a single thread)
//! regardless of how many threads did the work.

use crate::MAX_THREAD_FACTOR;

/// Clamp a requested thread count to `MAX_THREAD_FACTOR * num_cpus::get()`,
/// warning if the request had to be reduced.
pub fn clamp_threads(requested: usize) -> usize {
    let cap = MAX_THREAD_FACTOR * num_cpus::get().max(1);
    if requested > cap {
        #[cfg(feature = "std")]
        log::warn!("requested {requested} threads, clamping to {cap}");
        cap
    } else {
        requested.max(1)
    }
}

/// Split `items` into at most `n_threads` contiguous, index-ordered chunks,
/// compute `f` for every item (possibly on separate worker threads), and sum
/// the per-item contributions.
///
/// `n_threads == 1` runs entirely on the calling thread. Chunk boundaries
/// never reorder items, so the partial sums are added back together in the
/// same order a single-threaded pass would have produced them.
pub fn sum_partitioned<T, F>(items: &[T], n_threads: usize, f: F) -> f64
where
    T: Sync,
    F: Fn(&T) -> f64 + Sync,
{
    let n_threads = clamp_threads(n_threads);
    if n_threads <= 1 || items.len() <= 1 {
        return items.iter().map(&f).sum();
    }

    let chunk_size = items.len().div_ceil(n_threads);
    let chunks: Vec<&[T]> = items.chunks(chunk_size.max(1)).collect();

    let partials: Vec<f64> = std::thread::scope(|scope| {
        let handles: Vec<_> = chunks
            .iter()
            .map(|chunk| scope.spawn(|| chunk.iter().map(&f).sum::<f64>()))
            .collect();
        handles.into_iter().map(|h| h.join().expect("worker thread panicked")).collect()
    });

    partials.into_iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_threaded_matches_plain_sum() {
        let items: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let expected: f64 = items.iter().sum();
        assert_eq!(sum_partitioned(&items, 1, |x| *x), expected);
    }

    #[test]
    fn multi_threaded_matches_single_threaded() {
        let items: Vec<f64> = (0..1000).map(|i| (i as f64).sin()).collect();
        let single = sum_partitioned(&items, 1, |x| *x);
        let multi = sum_partitioned(&items, 8, |x| *x);
        assert!((single - multi).abs() < 1e-9);
    }

    #[test]
    fn excessive_thread_request_is_clamped_not_rejected() {
        let items: Vec<f64> = vec![1.0; 4];
        let result = sum_partitioned(&items, 1_000_000, |x| *x);
        assert_eq!(result, 4.0);
    }
}
