use tokio::{
    sync::watch::{self, Receiver, Sender},
    time::Instant,
};

use crate::pvt::FixSample;

/// Latest PVT frame and its arrival time
#[derive(Debug, Clone)]
pub struct Sample {
    pub frame: FixSample,
    pub received: Instant,
}

/// Single slot, last writer wins, [Sample] store.
/// Publications coalesce: the reader is woken once, however many
/// samples were published in between two reads, and only sees the latest.
#[derive(Debug, Clone)]
pub struct SampleStore {
    tx: Sender<Option<Sample>>,
}

impl SampleStore {
    pub fn new() -> (Self, Receiver<Option<Sample>>) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, rx)
    }

    /// Replaces the stored [Sample] wholesale and wakes the reader
    pub fn publish(&self, frame: FixSample, received: Instant) {
        self.tx.send_replace(Some(Sample { frame, received }));
    }

    /// Copy of the latest [Sample], if any
    #[cfg(test)]
    pub fn latest(&self) -> Option<Sample> {
        self.tx.borrow().clone()
    }
}
