use std::{
    ops::{Deref, DerefMut},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

/// Maximal NMEA sentence length, including framing
pub const NMEA_MAX_LEN: usize = 83;

/// Sentence queue depth
pub const QUEUE_CAPACITY: usize = 10;

/// One NMEA sentence, stored in a fixed size buffer
#[derive(Clone)]
pub struct RawSentence {
    buf: [u8; NMEA_MAX_LEN],
    len: usize,
}

impl Default for RawSentence {
    fn default() -> Self {
        Self {
            buf: [0; NMEA_MAX_LEN],
            len: 0,
        }
    }
}

impl std::fmt::Debug for RawSentence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RawSentence").field(&self.as_str()).finish()
    }
}

impl RawSentence {
    /// Copies `bytes` in, truncating to [NMEA_MAX_LEN].
    pub fn fill(&mut self, bytes: &[u8]) {
        let len = bytes.len().min(NMEA_MAX_LEN);
        self.buf[..len].copy_from_slice(&bytes[..len]);
        self.len = len;
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Sentence content, trailing CR/LF excluded.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(self.as_bytes())
            .unwrap_or("<invalid utf-8>")
            .trim_end_matches(['\r', '\n'])
    }
}

#[derive(Debug)]
struct Inner {
    free: Mutex<Vec<Box<RawSentence>>>,
    capacity: usize,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl Inner {
    fn release(&self, mut buf: Box<RawSentence>) {
        buf.clear();
        self.free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(buf);
        self.released.fetch_add(1, Ordering::Relaxed);
    }
}

/// Fixed size pool of [RawSentence] buffers. Nothing is allocated
/// past construction: an exhausted pool simply refuses to lend.
#[derive(Debug, Clone)]
pub struct SentencePool {
    inner: Arc<Inner>,
}

impl SentencePool {
    pub fn new(capacity: usize) -> Self {
        let free = (0..capacity)
            .map(|_| Box::new(RawSentence::default()))
            .collect();

        Self {
            inner: Arc::new(Inner {
                capacity,
                free: Mutex::new(free),
                acquired: AtomicUsize::new(0),
                released: AtomicUsize::new(0),
            }),
        }
    }

    /// Lends one buffer, or None when all buffers are in use
    pub fn acquire(&self) -> Option<PooledSentence> {
        let buf = self
            .inner
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()?;

        self.inner.acquired.fetch_add(1, Ordering::Relaxed);

        Some(PooledSentence {
            buf: Some(buf),
            pool: Arc::clone(&self.inner),
        })
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Number of buffers ready to be lent
    pub fn available(&self) -> usize {
        self.inner
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Total number of buffers lent so far
    pub fn acquired(&self) -> usize {
        self.inner.acquired.load(Ordering::Relaxed)
    }

    /// Total number of buffers returned so far
    pub fn released(&self) -> usize {
        self.inner.released.load(Ordering::Relaxed)
    }
}

/// A [RawSentence] lent by the [SentencePool].
/// The buffer returns to its pool when this handle is dropped.
#[derive(Debug)]
pub struct PooledSentence {
    buf: Option<Box<RawSentence>>,
    pool: Arc<Inner>,
}

impl Deref for PooledSentence {
    type Target = RawSentence;

    fn deref(&self) -> &RawSentence {
        self.buf.as_deref().expect("internal error: released sentence")
    }
}

impl DerefMut for PooledSentence {
    fn deref_mut(&mut self) -> &mut RawSentence {
        self.buf
            .as_deref_mut()
            .expect("internal error: released sentence")
    }
}

impl Drop for PooledSentence {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.release(buf);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn raw_sentence() {
        let mut sentence = RawSentence::default();
        assert!(sentence.is_empty());

        sentence.fill(b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n");
        assert_eq!(
            sentence.as_str(),
            "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47"
        );

        sentence.fill(&[b'A'; 200]);
        assert_eq!(sentence.len(), NMEA_MAX_LEN);

        sentence.clear();
        assert!(sentence.as_bytes().is_empty());
    }

    #[test]
    fn pool_exhaustion() {
        let pool = SentencePool::new(2);

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert!(pool.acquire().is_none());
        assert_eq!(pool.available(), 0);

        drop(a);
        assert_eq!(pool.available(), 1);

        let c = pool.acquire().unwrap();
        drop(b);
        drop(c);

        assert_eq!(pool.available(), 2);
        assert_eq!(pool.acquired(), 3);
        assert_eq!(pool.released(), 3);
    }

    #[test]
    fn released_buffers_are_cleared() {
        let pool = SentencePool::new(1);

        let mut sentence = pool.acquire().unwrap();
        sentence.fill(b"$GPRMC");
        drop(sentence);

        let sentence = pool.acquire().unwrap();
        assert!(sentence.is_empty());
    }
}
