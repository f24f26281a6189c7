use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::stream::{Listener, Stream};

/// Written to the output device before each replay.
pub const CLEAR_SCREEN: &str = "\r\n\x1b[H\x1b[2J";

/// Tunables for a [`Multiplexer`].
#[derive(Clone, Debug)]
pub struct MuxOptions {
    /// Control sequence emitted on every successful view switch.
    pub reset_sequence: String,
}

impl Default for MuxOptions {
    fn default() -> Self {
        Self {
            reset_sequence: CLEAR_SCREEN.to_string(),
        }
    }
}

/// Registered streams and the key of the active one.
struct Views {
    streams: HashMap<String, Stream>,
    active: String,
}

/// Presents one of several streams on a shared output device.
///
/// Every registered stream keeps ingesting and caching in the background,
/// but only lines from the active stream reach the output. Switching views
/// clears the display and replays the target stream's history.
///
/// Lock order is always stream history first, then `views`. Ingestion holds
/// its history lock while broadcasting, and [`Multiplexer::set_view`] takes
/// the target's history lock before the exclusive `views` hold.
pub struct Multiplexer {
    views: RwLock<Views>,
    output: Mutex<Box<dyn Write + Send>>,
    reset_sequence: String,
    output_failed: AtomicBool,
}

impl std::fmt::Debug for Multiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Multiplexer")
            .field("reset_sequence", &self.reset_sequence)
            .finish_non_exhaustive()
    }
}

impl Multiplexer {
    /// Create a multiplexer showing `initial`, which is registered and started.
    pub async fn new(output: impl Write + Send + 'static, initial: Stream) -> Arc<Self> {
        Self::with_options(output, initial, MuxOptions::default()).await
    }

    pub async fn with_options(
        output: impl Write + Send + 'static,
        initial: Stream,
        options: MuxOptions,
    ) -> Arc<Self> {
        let name = initial.name().to_string();
        let mux = Arc::new(Self {
            views: RwLock::new(Views {
                streams: HashMap::from([(name.clone(), initial.clone())]),
                active: name.clone(),
            }),
            output: Mutex::new(Box::new(output) as Box<dyn Write + Send>),
            reset_sequence: options.reset_sequence,
            output_failed: AtomicBool::new(false),
        });

        initial.start(mux.clone()).await;
        info!(view = %name, "Multiplexer created");
        mux
    }

    /// Add streams keyed by name and start them with this multiplexer as listener.
    ///
    /// A name that is already taken by a different stream is replaced and the
    /// superseded stream is stopped. Registering the same stream twice is a
    /// no-op.
    pub async fn register(self: &Arc<Self>, streams: impl IntoIterator<Item = Stream>) {
        let mut views = self.views.write().await;
        for stream in streams {
            let name = stream.name().to_string();
            match views.streams.insert(name.clone(), stream.clone()) {
                Some(previous) if previous.ptr_eq(&stream) => {
                    debug!(stream = %name, "Stream already registered");
                    continue;
                }
                Some(previous) => {
                    warn!(stream = %name, "Replacing registered stream, stopping the old one");
                    previous.stop();
                }
                None => {}
            }

            stream.start(self.clone()).await;
            debug!(stream = %name, "Registered stream");
        }
    }

    /// Make `name` the active view and replay its history.
    ///
    /// The display reset, the replay and the switch happen while broadcasts
    /// are excluded, so no line is both replayed and broadcast live. Switching
    /// to the already active view still resets and replays. Unknown names
    /// leave output and active view untouched and return `false`.
    pub async fn set_view(&self, name: &str) -> bool {
        loop {
            let Some(target) = self.get(name).await else {
                debug!(view = %name, "Ignoring switch to unknown view");
                return false;
            };

            let history = target.lock_history().await;
            let mut views = self.views.write().await;
            // Re-registered while we waited for the history lock.
            if !views.streams.get(name).is_some_and(|s| s.ptr_eq(&target)) {
                continue;
            }

            {
                let mut output = self.output.lock().await;
                let result = replay(&mut **output, &self.reset_sequence, history.iter());
                self.note_output_result(result);
            }

            views.active = name.to_string();
            debug!(view = %name, replayed = history.len(), "Switched view");
            return true;
        }
    }

    /// Name of the active stream.
    pub async fn active(&self) -> String {
        self.views.read().await.active.clone()
    }

    /// Registered stream names, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.views.read().await.streams.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn get(&self, name: &str) -> Option<Stream> {
        self.views.read().await.streams.get(name).cloned()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.views.read().await.streams.contains_key(name)
    }

    fn note_output_result(&self, result: io::Result<()>) {
        match result {
            Ok(()) => self.output_failed.store(false, Ordering::Relaxed),
            // Warn once per failure run: the warning itself may be routed
            // back through this output.
            Err(e) => {
                if !self.output_failed.swap(true, Ordering::Relaxed) {
                    warn!("Failed to write to mux output: {}", e);
                }
            }
        }
    }
}

impl Listener for Multiplexer {
    /// Forward `line` to the output iff `source` is the active stream.
    async fn broadcast(&self, source: &str, line: &str) {
        let views = self.views.read().await;
        if views.active != source {
            return;
        }

        let mut output = self.output.lock().await;
        let result = write_line(&mut **output, line).and_then(|()| output.flush());
        self.note_output_result(result);
    }
}

fn replay<'a>(
    output: &mut dyn Write,
    reset_sequence: &str,
    lines: impl Iterator<Item = &'a str>,
) -> io::Result<()> {
    output.write_all(reset_sequence.as_bytes())?;
    for line in lines {
        write_line(output, line)?;
    }
    output.flush()
}

fn write_line(output: &mut dyn Write, line: &str) -> io::Result<()> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }
    output.write_all(line.as_bytes())?;
    output.write_all(b"\n")
}
