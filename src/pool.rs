use futures::future::join_all;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const MIN_CONCURRENCY: usize = 1;
pub const MAX_CONCURRENCY: usize = 8;

/// Concurrency-limited ordered map.
///
/// `limit` workers (clamped to [1, 8]) pull the next unclaimed index from a
/// shared cursor and await `op` on it before pulling again. Output `i`
/// always corresponds to input `i`, whatever order the operations finish
/// in. Every item is attempted; `op` is expected to turn its own failures
/// into a value (usually `None`), so nothing here aborts early.
pub async fn map_bounded<'a, T, R, F, Fut>(items: &'a [T], limit: usize, op: F) -> Vec<R>
where
    F: Fn(&'a T) -> Fut,
    Fut: Future<Output = R>,
{
    if items.is_empty() {
        return Vec::new();
    }
    let workers = limit.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY).min(items.len());
    let cursor = AtomicUsize::new(0);
    let cursor = &cursor;
    let op = &op;

    let runs = (0..workers).map(|_| async move {
        let mut done: Vec<(usize, R)> = Vec::new();
        loop {
            let idx = cursor.fetch_add(1, Ordering::SeqCst);
            let Some(item) = items.get(idx) else {
                break;
            };
            done.push((idx, op(item).await));
        }
        done
    });

    let mut slots: Vec<Option<R>> = (0..items.len()).map(|_| None).collect();
    for (idx, out) in join_all(runs).await.into_iter().flatten() {
        slots[idx] = Some(out);
    }
    // Each index is claimed exactly once, so every slot is filled.
    slots.into_iter().flatten().collect()
}
