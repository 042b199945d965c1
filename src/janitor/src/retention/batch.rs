//! Bounded-concurrency wave controller.

use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Process `items` in consecutive waves of at most `width` concurrent
/// operations.
///
/// Input order is preserved across waves; within a wave the operations run
/// unordered. Each wave completes fully before the next starts. The
/// cancellation signal is checked before each wave — never mid-wave, so a
/// cancellation request can be delayed by the longest-running operation of
/// the current wave. Outcomes of completed waves are returned either way so
/// the caller can finish its bookkeeping on the processed subset.
///
/// No per-element timeout is enforced here; a stuck operation stalls its
/// wave.
pub async fn run_in_waves<T, F, Fut, O>(
    items: Vec<T>,
    width: usize,
    signal: &CancellationToken,
    op: F,
) -> Vec<O>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = O>,
{
    let width = width.max(1);
    let mut outcomes = Vec::with_capacity(items.len());
    let mut remaining = items.into_iter();

    loop {
        if signal.is_cancelled() {
            break;
        }
        let wave: Vec<T> = remaining.by_ref().take(width).collect();
        if wave.is_empty() {
            break;
        }
        outcomes.extend(futures::future::join_all(wave.into_iter().map(&op)).await);
    }

    outcomes
}
