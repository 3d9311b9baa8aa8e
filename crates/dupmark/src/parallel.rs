//! Bounded parallel map on a per-run rayon pool

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::debug;

/// Run `task(0..count)` on at most `jobs` threads and return the results in
/// index order.
///
/// With `jobs <= 1` everything runs on the calling thread and the lowest
/// failing index wins. In parallel, remaining tasks are skipped once one
/// fails and any one of the failures is returned. If no pool can be built
/// the tasks run sequentially.
pub(crate) fn run_indexed<T, E, F>(count: usize, jobs: usize, task: F) -> Result<Vec<T>, E>
where
    T: Send,
    E: Send,
    F: Fn(usize) -> Result<T, E> + Sync + Send,
{
    let workers = jobs.min(count);
    if workers <= 1 {
        return (0..count).map(task).collect();
    }

    match ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool.install(|| (0..count).into_par_iter().map(&task).collect()),
        Err(e) => {
            debug!("no worker pool ({e}), running {count} task(s) sequentially");
            (0..count).map(task).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_results_keep_index_order() {
        for jobs in [1, 2, 8] {
            let out: Result<Vec<usize>, ()> = run_indexed(20, jobs, |i| Ok(i * i));
            assert_eq!(out.unwrap(), (0..20).map(|i| i * i).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_failure_stops_the_map() {
        let out: Result<Vec<usize>, usize> =
            run_indexed(10, 1, |i| if i >= 3 { Err(i) } else { Ok(i) });
        assert_eq!(out, Err(3));

        let out: Result<Vec<usize>, usize> =
            run_indexed(10, 4, |i| if i == 5 { Err(i) } else { Ok(i) });
        assert_eq!(out, Err(5));
    }

    #[test]
    fn test_sequential_stops_at_first_failure() {
        let calls = AtomicUsize::new(0);
        let out: Result<Vec<()>, usize> = run_indexed(10, 1, |i| {
            calls.fetch_add(1, Ordering::Relaxed);
            if i == 2 {
                Err(i)
            } else {
                Ok(())
            }
        });
        assert_eq!(out, Err(2));
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_empty() {
        let out: Result<Vec<()>, ()> = run_indexed(0, 4, |_| Ok(()));
        assert_eq!(out, Ok(vec![]));
    }
}
