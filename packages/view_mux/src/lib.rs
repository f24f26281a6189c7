//! View Mux - several line streams, one terminal
//!
//! Each [`Stream`] ingests whatever its producers write, splits it into
//! lines and keeps a bounded history. A [`Multiplexer`] owns the streams
//! and forwards live lines from exactly one of them, the active view, to a
//! shared output. [`Multiplexer::set_view`] clears the output, replays the
//! new view's history and makes it active in one step.
//!
//! # Example
//!
//! ```no_run
//! use view_mux::{Capacity, Multiplexer, Stream};
//!
//! #[tokio::main]
//! async fn main() {
//!     let logs = Stream::new("logs", 100usize);
//!     let console = Stream::new("cmd", Capacity::Default);
//!
//!     let mux = Multiplexer::new(std::io::stdout(), console.clone()).await;
//!     mux.register([logs.clone()]).await;
//!
//!     // Captured in the background, not shown.
//!     logs.log("GET / 200\n").unwrap();
//!
//!     // Clears the screen and replays "GET / 200".
//!     mux.set_view("logs").await;
//! }
//! ```

mod decoder;
mod error;
mod history;
mod mux;
mod stream;

#[cfg(test)]
mod test_support;

pub use decoder::{DEFAULT_MAX_LINE_BYTES, LineDecoder};
pub use error::DecodeError;
pub use history::{Capacity, DEFAULT_MAX_ENTRIES, HistoryBuffer};
pub use mux::{CLEAR_SCREEN, Multiplexer, MuxOptions};
pub use stream::{Listener, Stream, StreamWriter};
