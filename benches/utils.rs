use iter_shared::{Reader, Source};
use std::sync::Arc;

// --- Data Types and Constants ---

#[derive(Debug)]
pub struct HeavyPayload {
    pub _id: u64,
    pub _payload: [u8; 1024], // 1KB array
}
pub type ArcData = Arc<HeavyPayload>;
pub const NUM_CONSUMERS: usize = 5;

// --- Source Generators ---

pub fn generate_payloads(count: u64) -> impl Iterator<Item = ArcData> {
    (0..count).map(|i| {
        Arc::new(HeavyPayload {
            _id: i,
            _payload: [0; 1024],
        })
    })
}

// --- Vec Fan-Out Baseline ---

// Materializes everything up front and hands each consumer its own iterator.
pub fn run_vec_fan_out<I>(source: I) -> Vec<std::vec::IntoIter<ArcData>>
where
    I: Iterator<Item = ArcData>,
{
    let items: Vec<ArcData> = source.collect();
    (0..NUM_CONSUMERS).map(|_| items.clone().into_iter()).collect()
}

// --- Consumption Strategies ---

// Drives every reader one step at a time, so they stay at the frontier together.
pub fn consume_in_lockstep<S>(mut readers: Vec<Reader<S>>) -> usize
where
    S: Source<Item = ArcData>,
    S::Error: std::fmt::Debug,
{
    let mut consumed = 0;
    loop {
        let mut progressed = false;
        for reader in readers.iter_mut() {
            if reader.move_next().expect("bench source is infallible") {
                consumed += 1;
                progressed = true;
            }
        }
        if !progressed {
            return consumed;
        }
    }
}

// Drains each consumer fully before starting the next one.
pub fn consume_one_by_one<I, T>(consumers: Vec<I>) -> usize
where
    I: Iterator<Item = T>,
{
    consumers.into_iter().map(Iterator::count).sum()
}
