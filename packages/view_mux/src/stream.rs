use std::fmt;
use std::io;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::decoder::{DEFAULT_MAX_LINE_BYTES, LineDecoder};
use crate::history::{Capacity, HistoryBuffer};

/// Receiver of every line a stream ingests.
///
/// Called from the stream's ingestion task while the stream's history lock
/// is held, so a broadcast is never observed before the line is cached.
/// Implementations must not call back into the same stream's history.
pub trait Listener: Send + Sync + 'static {
    fn broadcast(&self, source: &str, line: &str) -> impl Future<Output = ()> + Send;
}

/// A named, independently ingested line source with bounded history.
///
/// Cloning is cheap; clones share the same sink and history.
#[derive(Clone)]
pub struct Stream {
    inner: Arc<StreamInner>,
}

struct StreamInner {
    name: String,
    history: Mutex<HistoryBuffer>,
    sink: mpsc::UnboundedSender<Vec<u8>>,
    // Taken by the first `start`.
    source: Mutex<Option<mpsc::UnboundedReceiver<Vec<u8>>>>,
    cancel: CancellationToken,
    max_line_bytes: usize,
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("name", &self.inner.name)
            .field("stopped", &self.inner.cancel.is_cancelled())
            .finish()
    }
}

impl Stream {
    pub fn new(name: impl Into<String>, capacity: impl Into<Capacity>) -> Self {
        Self::with_max_line_bytes(name, capacity, DEFAULT_MAX_LINE_BYTES)
    }

    /// Like [`Stream::new`], with a custom limit on the length of a single line.
    pub fn with_max_line_bytes(
        name: impl Into<String>,
        capacity: impl Into<Capacity>,
        max_line_bytes: usize,
    ) -> Self {
        let (sink, source) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(StreamInner {
                name: name.into(),
                history: Mutex::new(HistoryBuffer::new(capacity.into())),
                sink,
                source: Mutex::new(Some(source)),
                cancel: CancellationToken::new(),
                max_line_bytes,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Bind the listener and begin ingesting the sink on a background task.
    ///
    /// A stream can only be started once; later calls are logged and ignored.
    pub async fn start<L: Listener>(&self, listener: Arc<L>) {
        let Some(source) = self.inner.source.lock().await.take() else {
            warn!(stream = %self.inner.name, "Stream already started, ignoring");
            return;
        };

        debug!(stream = %self.inner.name, "Starting stream ingestion");
        tokio::spawn(ingest(self.inner.clone(), source, listener));
    }

    /// Push raw bytes into the stream. Never waits on ingestion.
    ///
    /// # Errors
    ///
    /// Fails with [`io::ErrorKind::BrokenPipe`] once ingestion has ended.
    pub fn write(&self, bytes: &[u8]) -> io::Result<usize> {
        send(&self.inner.sink, bytes)
    }

    /// Push text into the stream. Same semantics as [`Stream::write`].
    pub fn log(&self, text: &str) -> io::Result<usize> {
        self.write(text.as_bytes())
    }

    /// A cloneable `io::Write` handle onto this stream's sink.
    ///
    /// Suitable as a `tracing-subscriber` writer so a producer's log output
    /// becomes this stream's content.
    pub fn writer(&self) -> StreamWriter {
        StreamWriter {
            sink: self.inner.sink.clone(),
        }
    }

    /// Point-in-time copy of the history, oldest first.
    pub async fn cached(&self) -> Vec<String> {
        self.inner.history.lock().await.snapshot()
    }

    pub async fn len(&self) -> usize {
        self.inner.history.lock().await.len()
    }

    pub async fn capacity(&self) -> usize {
        self.inner.history.lock().await.capacity()
    }

    /// Signal the ingestion task to exit.
    ///
    /// Lines already cached stay cached. Bytes still queued in the sink are
    /// discarded, and writes fail once the task has exited.
    pub fn stop(&self) {
        self.inner.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Hold the history lock; ingestion of this stream is paused meanwhile.
    pub(crate) async fn lock_history(&self) -> MutexGuard<'_, HistoryBuffer> {
        self.inner.history.lock().await
    }

    pub(crate) fn ptr_eq(&self, other: &Stream) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// `io::Write` adapter over a stream's sink.
#[derive(Clone, Debug)]
pub struct StreamWriter {
    sink: mpsc::UnboundedSender<Vec<u8>>,
}

impl io::Write for StreamWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        send(&self.sink, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn send(sink: &mpsc::UnboundedSender<Vec<u8>>, bytes: &[u8]) -> io::Result<usize> {
    if bytes.is_empty() {
        return Ok(0);
    }
    sink.send(bytes.to_vec())
        .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "stream ingestion has ended"))?;
    Ok(bytes.len())
}

async fn ingest<L: Listener>(
    inner: Arc<StreamInner>,
    mut source: mpsc::UnboundedReceiver<Vec<u8>>,
    listener: Arc<L>,
) {
    let mut decoder = LineDecoder::new(inner.max_line_bytes);

    loop {
        let chunk = tokio::select! {
            biased;
            _ = inner.cancel.cancelled() => {
                debug!(stream = %inner.name, "Stream ingestion cancelled");
                return;
            }
            chunk = source.recv() => chunk,
        };
        // The sender lives in `inner`, so the queue only closes with it.
        let Some(chunk) = chunk else {
            return;
        };

        decoder.push(&chunk);
        loop {
            match decoder.next_line() {
                Ok(Some(line)) => publish(&inner, listener.as_ref(), &line).await,
                Ok(None) => break,
                Err(e) => {
                    warn!(stream = %inner.name, "Stream ingestion stopped: {}", e);
                    return;
                }
            }
        }
    }
}

async fn publish<L: Listener>(inner: &StreamInner, listener: &L, line: &str) {
    // Broadcast under the history lock: cache-then-broadcast is atomic.
    let mut history = inner.history.lock().await;
    if history.append(line) {
        listener.broadcast(&inner.name, line).await;
    }
}
