use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
};

use log::{error, trace, warn};

use tokio::{
    sync::mpsc::{Sender, error::TrySendError},
    time::Instant,
};

use crate::{
    device::{Event, Readout},
    pipeline::{
        sentence::{PooledSentence, SentencePool},
        store::SampleStore,
    },
    pvt::FixSample,
};

#[derive(Debug)]
struct Inner {
    /// Reusable PVT read-out buffer
    scratch: Mutex<FixSample>,

    /// PVT destination
    store: SampleStore,

    /// NMEA destination
    sentences: Sender<PooledSentence>,

    /// NMEA buffers
    pool: SentencePool,

    /// Failed PVT read-outs
    pvt_failures: AtomicUsize,

    /// Dropped NMEA sentences
    nmea_dropped: AtomicUsize,
}

/// Receiver notification handler.
///
/// Invoked by the positioning subsystem on every [Event], from whatever
/// context the subsystem runs in. It never blocks: data that cannot
/// be handed over right away is dropped.
#[derive(Debug, Clone)]
pub struct EventHandler {
    inner: Arc<Inner>,
}

impl EventHandler {
    pub fn new(store: SampleStore, sentences: Sender<PooledSentence>, pool: SentencePool) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                sentences,
                pool,
                scratch: Mutex::new(FixSample::default()),
                pvt_failures: AtomicUsize::new(0),
                nmea_dropped: AtomicUsize::new(0),
            }),
        }
    }

    /// Handles one receiver [Event]
    pub fn handle(&self, event: Event, readout: &dyn Readout) {
        match event {
            Event::Pvt => self.on_pvt(readout),
            Event::Nmea => self.on_nmea(readout),
            Event::Other(code) => {
                trace!("ignored receiver event #{}", code);
            },
        }
    }

    fn on_pvt(&self, readout: &dyn Readout) {
        let mut scratch = self
            .inner
            .scratch
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match readout.read_pvt(&mut scratch) {
            Ok(_) => {
                self.inner.store.publish(scratch.clone(), Instant::now());
            },
            Err(e) => {
                self.inner.pvt_failures.fetch_add(1, Ordering::Relaxed);
                error!("failed to read PVT data: {}", e);
            },
        }
    }

    fn on_nmea(&self, readout: &dyn Readout) {
        let Some(mut sentence) = self.inner.pool.acquire() else {
            self.inner.nmea_dropped.fetch_add(1, Ordering::Relaxed);
            error!("no NMEA buffer available: sentence dropped");
            return;
        };

        if let Err(e) = readout.read_nmea(&mut sentence) {
            self.inner.nmea_dropped.fetch_add(1, Ordering::Relaxed);
            error!("failed to read NMEA data: {}", e);
            return;
        }

        // a refused sentence is released right here, when dropped
        match self.inner.sentences.try_send(sentence) {
            Ok(_) => {},
            Err(TrySendError::Full(sentence)) => {
                self.inner.nmea_dropped.fetch_add(1, Ordering::Relaxed);
                warn!("NMEA queue full: dropped \"{}\"", sentence.as_str());
            },
            Err(TrySendError::Closed(_)) => {
                self.inner.nmea_dropped.fetch_add(1, Ordering::Relaxed);
                trace!("NMEA queue closed");
            },
        }
    }

    /// Number of failed PVT read-outs
    pub fn pvt_failures(&self) -> usize {
        self.inner.pvt_failures.load(Ordering::Relaxed)
    }

    /// Number of NMEA sentences that could not be queued
    pub fn nmea_dropped(&self) -> usize {
        self.inner.nmea_dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        device::{GnssError, mock::MockReadout},
        pipeline::{Pipeline, sentence::QUEUE_CAPACITY},
        pvt::PvtFlags,
    };

    fn frame(latitude: f64, valid: bool) -> FixSample {
        FixSample {
            latitude,
            flags: if valid {
                PvtFlags::FIX_VALID
            } else {
                PvtFlags::empty()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn failed_read_never_overwrites() {
        let pipeline = Pipeline::new();
        let handler = pipeline.handler.clone();
        let mut samples = pipeline.samples;
        let readout = MockReadout::default();

        readout.push_pvt(Ok(frame(59.3293, true)));
        handler.handle(Event::Pvt, &readout);

        assert!(samples.has_changed().unwrap());
        let first = samples.borrow_and_update().clone().unwrap();
        assert_eq!(first.frame.latitude, 59.3293);

        readout.push_pvt(Err(GnssError::NoData(-11)));
        handler.handle(Event::Pvt, &readout);

        // no signal, previous sample retained
        assert!(!samples.has_changed().unwrap());
        let latest = samples.borrow().clone().unwrap();
        assert_eq!(latest.frame, first.frame);
        assert_eq!(handler.pvt_failures(), 1);

        readout.push_pvt(Ok(frame(60.1695, false)));
        handler.handle(Event::Pvt, &readout);

        assert!(samples.has_changed().unwrap());
        let latest = samples.borrow_and_update().clone().unwrap();
        assert_eq!(latest.frame.latitude, 60.1695);
        assert!(!latest.frame.is_valid());
    }

    #[tokio::test]
    async fn sentence_queue_is_bounded() {
        let pipeline = Pipeline::new();
        let handler = pipeline.handler.clone();
        let pool = pipeline.pool.clone();
        let mut sentences = pipeline.sentences;
        let readout = MockReadout::default();

        let total = QUEUE_CAPACITY + 5;

        for i in 0..total {
            readout.push_nmea(Ok(format!("$GPGGA,{}", i).as_str()));
            handler.handle(Event::Nmea, &readout);
        }

        assert_eq!(sentences.len(), QUEUE_CAPACITY);
        assert_eq!(handler.nmea_dropped(), total - QUEUE_CAPACITY);

        // every refused buffer went straight back to the pool
        assert_eq!(pool.available(), pool.capacity() - QUEUE_CAPACITY);

        // strict arrival order
        for i in 0..QUEUE_CAPACITY {
            let sentence = sentences.try_recv().unwrap();
            assert_eq!(sentence.as_str(), format!("$GPGGA,{}", i));
        }

        assert!(sentences.try_recv().is_err());
        assert_eq!(pool.available(), pool.capacity());
        assert_eq!(pool.acquired(), total);
        assert_eq!(pool.released(), total);
    }

    #[tokio::test]
    async fn failed_sentence_read_releases_buffer() {
        let pipeline = Pipeline::new();
        let handler = pipeline.handler.clone();
        let pool = pipeline.pool.clone();
        let mut sentences = pipeline.sentences;
        let readout = MockReadout::default();

        readout.push_nmea(Err(GnssError::Code(-5)));
        handler.handle(Event::Nmea, &readout);

        assert!(sentences.try_recv().is_err());
        assert_eq!(handler.nmea_dropped(), 1);
        assert_eq!(pool.available(), pool.capacity());
        assert_eq!(pool.released(), 1);
    }

    #[tokio::test]
    async fn exhausted_pool_drops_sentence() {
        let pipeline = Pipeline::new();
        let handler = pipeline.handler.clone();
        let pool = pipeline.pool.clone();
        let readout = MockReadout::default();

        let borrowed = (0..pool.capacity())
            .map(|_| pool.acquire().unwrap())
            .collect::<Vec<_>>();

        readout.push_nmea(Ok("$GPRMC"));
        handler.handle(Event::Nmea, &readout);

        assert_eq!(handler.nmea_dropped(), 1);

        // scripted sentence was never read
        assert_eq!(readout.nmea.lock().unwrap().len(), 1);

        drop(borrowed);
        assert_eq!(pool.available(), pool.capacity());
    }

    #[tokio::test]
    async fn other_events_are_ignored() {
        let pipeline = Pipeline::new();
        let handler = pipeline.handler.clone();
        let samples = pipeline.samples;
        let readout = MockReadout::default();

        readout.push_pvt(Ok(frame(1.0, true)));
        handler.handle(Event::Other(7), &readout);

        assert!(!samples.has_changed().unwrap());
        assert_eq!(readout.pvt.lock().unwrap().len(), 1);
    }
}
