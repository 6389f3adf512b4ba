//! Background parser that decodes examples on its own thread
//!
//! The parser owns a producer thread which repeatedly decodes one example
//! from the shared byte source and pushes it into a bounded channel. The
//! channel depth is the only read-ahead; with the default depth of one the
//! producer holds at most one decoded example besides the one in the
//! channel.
//!
//! Stopping drops the stop sender. The producer waits on the stop channel
//! and the event channel together, so a producer blocked on a full channel
//! wakes up, hands back the example it was trying to push, and exits.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Select, Sender, TryRecvError};
use parking_lot::Mutex;

use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::example::Example;
use crate::registry::ExampleReader;
use crate::source::ByteSource;
use crate::vector::FeatureVector;

/// A byte source shared between a stream and its parser thread
pub type SharedSource<S> = Arc<Mutex<S>>;

type Event<V> = Result<Example<V>>;

/// Handle to a running producer thread
pub struct InputParser<V> {
    /// Decoded examples, in source order
    events: Receiver<Event<V>>,

    /// Dropping this sender tells the producer to stop
    stop: Option<Sender<()>>,

    /// The producer; yields the event it could not deliver, if any
    handle: Option<JoinHandle<Option<Event<V>>>>,

    /// Whether the producer reported the end of the source
    exhausted: bool,
}

impl<V: FeatureVector> InputParser<V> {
    /// Spawn a producer decoding from `source` with `reader`
    pub fn begin<S: ByteSource>(
        source: SharedSource<S>,
        reader: ExampleReader<S, V>,
        config: &StreamConfig,
    ) -> Result<Self> {
        let (event_tx, event_rx) = channel::bounded(config.buffer_depth);
        let (stop_tx, stop_rx) = channel::bounded::<()>(0);

        let handle = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || produce(&source, reader, &event_tx, &stop_rx))?;

        tracing::debug!(
            thread = %config.thread_name,
            depth = config.buffer_depth,
            representation = %V::representation(),
            "parser started"
        );

        Ok(Self {
            events: event_rx,
            stop: Some(stop_tx),
            handle: Some(handle),
            exhausted: false,
        })
    }

    /// Block until the next example is decoded
    ///
    /// Returns `Ok(None)` once the source is exhausted. A decode error is
    /// returned once; the parser is exhausted afterwards.
    pub fn pop_one(&mut self) -> Result<Option<Example<V>>> {
        if self.exhausted {
            return Ok(None);
        }

        match self.events.recv() {
            Ok(event) => self.accept(event),
            Err(_) => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }

    /// Take the next example if one is already decoded
    pub fn try_pop_one(&mut self) -> Result<Option<Example<V>>> {
        if self.exhausted {
            return Ok(None);
        }

        match self.events.try_recv() {
            Ok(event) => self.accept(event),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }

    /// Whether the source has been permanently exhausted
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Stop the producer and wait for it to exit
    ///
    /// Returns the examples that were decoded but never popped, in order.
    pub fn request_stop_and_join(mut self) -> Result<Vec<Example<V>>> {
        self.shutdown()
    }

    fn accept(&mut self, event: Event<V>) -> Result<Option<Example<V>>> {
        match event {
            Ok(example) => Ok(Some(example)),
            Err(err) => {
                self.exhausted = true;
                Err(err)
            }
        }
    }

    fn shutdown(&mut self) -> Result<Vec<Example<V>>> {
        drop(self.stop.take());

        let undelivered = match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| {
                tracing::error!("parser thread panicked");
                Error::ParserPanicked
            })?,
            None => None,
        };

        let mut leftover = Vec::new();
        for event in self.events.try_iter().chain(undelivered) {
            match event {
                Ok(example) => leftover.push(example),
                Err(err) => tracing::warn!(error = %err, "discarding decode error raised during shutdown"),
            }
        }

        tracing::debug!(leftover = leftover.len(), "parser stopped");
        Ok(leftover)
    }
}

impl<V> Drop for InputParser<V> {
    fn drop(&mut self) {
        drop(self.stop.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn produce<S, V>(
    source: &SharedSource<S>,
    reader: ExampleReader<S, V>,
    events: &Sender<Event<V>>,
    stop: &Receiver<()>,
) -> Option<Event<V>>
where
    S: ByteSource,
    V: FeatureVector,
{
    loop {
        if !matches!(stop.try_recv(), Err(TryRecvError::Empty)) {
            return None;
        }

        let event = match reader.read(&mut source.lock()) {
            Ok(Some(example)) => Ok(example),
            Ok(None) => return None,
            Err(err) => Err(err),
        };
        let failed = event.is_err();

        let mut select = Select::new();
        let send_index = select.send(events);
        let stop_index = select.recv(stop);
        let operation = select.select();

        if operation.index() == send_index {
            // The consumer is gone when the send fails.
            if operation.send(events, event).is_err() || failed {
                return None;
            }
        } else {
            debug_assert_eq!(operation.index(), stop_index);
            let _ = operation.recv(stop);
            return Some(event);
        }
    }
}
