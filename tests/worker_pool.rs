use music_link_resolver::pool::map_bounded;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::test]
async fn output_order_matches_input_when_completion_order_is_reversed() {
    let items: Vec<u64> = (0..5).collect();
    let out = map_bounded(&items, 2, |n| async move {
        // later items finish first
        tokio::time::sleep(Duration::from_millis((5 - n) * 15)).await;
        n * 10
    })
    .await;
    assert_eq!(out, vec![0, 10, 20, 30, 40]);
}

struct Gauge {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    fn new() -> Self {
        Self { active: AtomicUsize::new(0), peak: AtomicUsize::new(0) }
    }

    async fn run(&self, n: usize) -> usize {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        n
    }
}

#[tokio::test]
async fn never_exceeds_the_limit() {
    let gauge = Gauge::new();
    let items: Vec<usize> = (0..10).collect();
    let out = map_bounded(&items, 2, |n| gauge.run(*n)).await;
    assert_eq!(out, items);
    assert!(gauge.peak.load(Ordering::SeqCst) <= 2);
    assert!(gauge.peak.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn large_limits_are_capped() {
    let gauge = Gauge::new();
    let items: Vec<usize> = (0..40).collect();
    let out = map_bounded(&items, 100, |n| gauge.run(*n)).await;
    assert_eq!(out.len(), 40);
    assert!(gauge.peak.load(Ordering::SeqCst) <= 8);
}

#[tokio::test]
async fn zero_limit_still_processes_everything() {
    let gauge = Gauge::new();
    let items: Vec<usize> = (0..4).collect();
    let out = map_bounded(&items, 0, |n| gauge.run(*n)).await;
    assert_eq!(out, items);
    assert_eq!(gauge.peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_input_yields_empty_output() {
    let items: Vec<u32> = Vec::new();
    let out: Vec<u32> = map_bounded(&items, 4, |n| async move { *n }).await;
    assert!(out.is_empty());
}

#[tokio::test]
async fn failures_become_values_without_aborting_the_batch() {
    let items = vec!["1", "x", "3"];
    let out = map_bounded(&items, 2, |s| async move { s.parse::<u32>().ok() }).await;
    assert_eq!(out, vec![Some(1), None, Some(3)]);
}
