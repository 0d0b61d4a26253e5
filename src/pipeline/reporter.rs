use std::io::Write;

use log::{debug, error, info, trace};

use tokio::{
    sync::{mpsc, watch},
    time::Instant,
};

use crate::{
    display::{self, Display, Layout},
    pipeline::{Pipeline, sentence::PooledSentence, store::Sample},
    runtime::Runtime,
    settings::ReferencePoint,
};

/// Reporter wake-up cause
#[derive(Debug)]
enum Wake {
    /// A new [Sample] is pending
    Sample,

    /// A sentence was dequeued
    Sentence(PooledSentence),

    /// Shutdown requested, or producer gone
    Shutdown,
}

/// Reporting loop: consumes the [Pipeline] outputs and renders them.
pub struct Reporter<W: Write> {
    /// Latest [Sample]
    samples: watch::Receiver<Option<Sample>>,

    /// Pending sentences
    sentences: mpsc::Receiver<PooledSentence>,

    /// Shutdown signal
    shutdown: watch::Receiver<bool>,

    /// Search state
    runtime: Runtime,

    /// Console renderer
    display: Display,

    /// Possible [ReferencePoint]
    reference: Option<ReferencePoint>,

    /// Console
    out: W,
}

impl<W: Write> Reporter<W> {
    /// Creates a new [Reporter]. `baseline` is the instant tracking started.
    pub fn new(
        samples: watch::Receiver<Option<Sample>>,
        sentences: mpsc::Receiver<PooledSentence>,
        shutdown: watch::Receiver<bool>,
        baseline: Instant,
        reference: Option<ReferencePoint>,
        out: W,
    ) -> Self {
        Self {
            samples,
            sentences,
            shutdown,
            reference,
            out,
            runtime: Runtime::new(baseline),
            display: Display::default(),
        }
    }

    /// Creates a [Reporter] consuming this [Pipeline]
    pub fn from_pipeline(
        pipeline: Pipeline,
        shutdown: watch::Receiver<bool>,
        baseline: Instant,
        reference: Option<ReferencePoint>,
        out: W,
    ) -> Self {
        Self::new(
            pipeline.samples,
            pipeline.sentences,
            shutdown,
            baseline,
            reference,
            out,
        )
    }

    /// Search state
    #[cfg(test)]
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Console
    #[cfg(test)]
    pub fn out(&self) -> &W {
        &self.out
    }

    /// Runs until shutdown is requested or the producing side is gone.
    pub async fn run(&mut self) {
        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let wake = tokio::select! {
                biased;

                _ = self.shutdown.changed() => Wake::Shutdown,

                changed = self.samples.changed() => match changed {
                    Ok(_) => Wake::Sample,
                    Err(_) => Wake::Shutdown,
                },

                sentence = self.sentences.recv() => match sentence {
                    Some(sentence) => Wake::Sentence(sentence),
                    None => Wake::Shutdown,
                },
            };

            if !self.process(wake) {
                break;
            }
        }

        info!(
            "Reporter stopped after {} s",
            self.runtime.uptime(Instant::now()).as_secs()
        );
    }

    /// Processes one wake-up, then checks the other branch without blocking.
    /// Returns false when the loop should stop.
    fn process(&mut self, wake: Wake) -> bool {
        match wake {
            Wake::Shutdown => return false,
            Wake::Sample => {
                self.on_sample();

                if let Ok(sentence) = self.sentences.try_recv() {
                    self.on_sentence(sentence);
                }
            },
            Wake::Sentence(sentence) => {
                self.on_sentence(sentence);

                if self.samples.has_changed().unwrap_or(false) {
                    self.on_sample();
                }
            },
        }

        true
    }

    fn on_sample(&mut self) {
        let Some(sample) = self.samples.borrow_and_update().clone() else {
            return;
        };

        if let Err(e) = self.render(&sample) {
            error!("console error: {}", e);
        }
    }

    fn render(&mut self, sample: &Sample) -> std::io::Result<()> {
        let pvt = &sample.frame;

        self.runtime.latch_conditions(pvt.flags);

        let layout = if pvt.is_valid() {
            self.runtime.latch_fix(sample.received);
            Layout::Fixed
        } else {
            self.runtime.latch_search();
            Layout::Searching
        };

        let mut frame = self.display.begin(&mut self.out, layout)?;

        display::print_satellite_stats(&mut frame, pvt)?;
        display::print_flags(&mut frame, pvt)?;

        match layout {
            Layout::Fixed => {
                display::print_fix_data(&mut frame, pvt)?;
                display::print_distance_from_reference(&mut frame, self.reference.as_ref(), pvt)?;
            },
            Layout::Searching => {
                let seconds = self.runtime.time_since_fix(Instant::now()).as_secs();
                display::print_search_status(&mut frame, seconds, self.runtime.next_indicator())?;
            },
        }

        frame.finish()
    }

    fn on_sentence(&mut self, sentence: PooledSentence) {
        trace!("NMEA: {}", sentence.as_str());
        // buffer goes back to the pool right here
        drop(sentence);
    }
}

impl<W: Write> Drop for Reporter<W> {
    fn drop(&mut self) {
        let mut pending = 0;

        while let Ok(sentence) = self.sentences.try_recv() {
            drop(sentence);
            pending += 1;
        }

        if pending > 0 {
            debug!("{} pending sentences released", pending);
        }
    }
}
