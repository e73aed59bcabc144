//! Running fetch units on a bounded worker pool.

use std::num::NonZeroUsize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::error::Error;

/// The result of one unit and how long it ran.
#[derive(Debug)]
pub struct Outcome<A> {
    pub result: Result<A, Error>,
    pub elapsed: Duration,
}

/// Run `unit` once per item on a dedicated pool of `parallelism` threads.
///
/// At most `parallelism` units execute at any instant. Every unit runs to completion: an error or
/// panic in one is captured in its [`Outcome`] and does not affect the others. Outcomes are
/// returned in the order of `items`, once all units have finished.
pub fn run_bounded<T, A, F>(
    parallelism: NonZeroUsize,
    items: &[T],
    unit: F,
) -> Result<Vec<Outcome<A>>, Error>
where
    T: Sync,
    A: Send,
    F: Fn(&T) -> Result<A, Error> + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(parallelism.get())
        .thread_name(|k| format!("lockfetch-worker-{k}"))
        .build()?;
    Ok(pool.install(|| {
        items
            .par_iter()
            .with_max_len(1)
            .map(|item| {
                let start = Instant::now();
                let result = catch_unwind(AssertUnwindSafe(|| unit(item)))
                    .unwrap_or_else(|payload| Err(panic_error(payload)));
                Outcome {
                    result,
                    elapsed: start.elapsed(),
                }
            })
            .collect()
    }))
}

fn panic_error(payload: Box<dyn std::any::Any + Send>) -> Error {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    Error::Panicked { message }
}

#[cfg(test)]
mod test_run_bounded {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn never_exceeds_ceiling() {
        let running = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let items: Vec<usize> = (0..5).collect();
        let outcomes = run_bounded(nz(2), &items, |k| {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(60));
            running.fetch_sub(1, Ordering::SeqCst);
            Ok(*k)
        })
        .unwrap();
        assert_eq!(outcomes.len(), 5);
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(outcomes.iter().all(|o| o.elapsed >= Duration::from_millis(60)));
    }

    #[test]
    fn uses_available_slots() {
        let running = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let items: Vec<usize> = (0..4).collect();
        run_bounded(nz(4), &items, |_| {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(200));
            running.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        assert!(peak.load(Ordering::SeqCst) > 1);
    }

    #[test]
    fn failures_do_not_stop_other_units() {
        let items = ["ok-1", "bad", "ok-2", "ok-3"];
        let outcomes = run_bounded(nz(2), &items, |name| {
            if *name == "bad" {
                Err(Error::MissingRevision {
                    name: name.to_string(),
                })
            } else {
                Ok(name.to_string())
            }
        })
        .unwrap();
        let results: Vec<_> = outcomes.iter().map(|o| o.result.as_ref().ok().cloned()).collect();
        assert_eq!(
            results,
            vec![
                Some("ok-1".to_string()),
                None,
                Some("ok-2".to_string()),
                Some("ok-3".to_string())
            ]
        );
    }

    #[test]
    fn panics_become_failures() {
        let items = [1, 2, 3];
        let outcomes = run_bounded(nz(3), &items, |k| {
            if *k == 2 {
                panic!("unit {k} exploded");
            }
            Ok(*k)
        })
        .unwrap();
        assert!(outcomes[0].result.is_ok());
        assert!(matches!(
            &outcomes[1].result,
            Err(Error::Panicked { message }) if message == "unit 2 exploded"
        ));
        assert!(outcomes[2].result.is_ok());
    }

    #[test]
    fn empty_input_finishes() {
        let items: Vec<u8> = Vec::new();
        let outcomes = run_bounded(nz(4), &items, |_| Ok(())).unwrap();
        assert!(outcomes.is_empty());
    }
}
