//! # status-bar-rs
//!
//! This crate turns a byte stream of known size into live progress
//! statistics: bytes transferred, percentage, smoothed speed, elapsed and
//! remaining time, plus a textual progress bar. It is meant for command line
//! tools that pipe data around (downloads, uploads, copies) and want a status
//! line that keeps moving even when the source hangs.
//!
//! ## Usage
//!
//! Build a [`StatusBar`] with the total size and a render callback, then feed
//! it chunk lengths. The callback runs once immediately, on a fixed cadence
//! while the transfer is active, and once more when the last byte arrives.
//!
//! ```rust
//! use status_bar::{StatusBar, StatusBarOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut bar = StatusBar::builder(StatusBarOptions::with_total(1000))
//!         .render(|stats, format| {
//!             eprint!(
//!                 "\x1b[2K\r{} {} {} [{}] {}",
//!                 format.storage(stats.current_size),
//!                 format.speed(stats.speed),
//!                 format.time(stats.remaining_time),
//!                 format.progress_bar(stats.percentage),
//!                 format.percentage(stats.percentage),
//!             );
//!         })
//!         .on_finish(|| eprintln!())
//!         .build()
//!         .unwrap();
//!
//!     for _ in 0..4 {
//!         bar.ingest(250u64).unwrap();
//!     }
//!     assert!(!bar.is_active());
//! }
//! ```
//!
//! To observe an `AsyncWrite` pipeline, wrap the destination in a
//! [`ProgressWriter`]. The statistics engine itself, [`StatsTracker`], takes
//! explicit instants and can be driven without a runtime.

#![forbid(unsafe_code)]

#[macro_use]
extern crate log;

pub mod bar;
pub mod config;
pub mod error;
pub mod format;
pub mod stats;
pub mod status_bar;
mod timer;
pub mod util;
pub mod writer;

pub use bar::ProgressBar;
pub use config::{BarStyle, StatusBarOptions};
pub use error::StatusBarError;
pub use format::Formatter;
pub use stats::{ChunkLength, Ingested, Phase, StatsTracker, Tick, TransferStats};
pub use status_bar::{StatusBar, StatusBarBuilder};
pub use writer::ProgressWriter;
