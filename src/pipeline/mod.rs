use tokio::sync::{mpsc, watch::Receiver};

pub mod handler;
pub mod reporter;
pub mod sentence;
pub mod store;

use handler::EventHandler;
use sentence::{PooledSentence, QUEUE_CAPACITY, SentencePool};
use store::{Sample, SampleStore};

/// Fix acquisition pipeline: the producing side ([EventHandler])
/// and the consuming side (sample watch, sentence queue).
pub struct Pipeline {
    /// Notification handler, to register with the receiver
    pub handler: EventHandler,

    /// Latest [Sample]
    pub samples: Receiver<Option<Sample>>,

    /// Pending NMEA sentences
    pub sentences: mpsc::Receiver<PooledSentence>,

    /// Sentence buffers
    pub pool: SentencePool,
}

impl Pipeline {
    pub fn new() -> Self {
        let (store, samples) = SampleStore::new();
        let (tx, sentences) = mpsc::channel(QUEUE_CAPACITY);

        // one buffer being filled by the handler, one being released by the reporter
        let pool = SentencePool::new(QUEUE_CAPACITY + 2);

        Self {
            samples,
            sentences,
            pool: pool.clone(),
            handler: EventHandler::new(store, tx, pool),
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
