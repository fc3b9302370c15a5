//! Transfer statistics and the tracker that derives them from chunk arrivals.
//!
//! [`StatsTracker`] is a plain state machine: it never reads the clock and
//! never spawns anything. Callers hand it the instant a chunk arrived and
//! drive [`StatsTracker::tick`] once per second. [`crate::StatusBar`] does
//! exactly that with two tokio timers.

use std::time::Instant;

use serde::Serialize;

use crate::error::StatusBarError;

const NANOS_PER_SEC: f64 = 1e9;

/// Snapshot of a transfer, as handed to render callbacks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferStats {
    pub current_size: u64,
    pub total_size: u64,
    pub remaining_size: u64,
    /// Fraction done in `[0, 1]`.
    pub percentage: f64,
    /// Smoothed bytes per second.
    pub speed: u64,
    /// Seconds since the first chunk, counted by the elapsed-time tick.
    pub elapsed_time: u64,
    /// Estimated seconds left, `None` while unknown or stalled.
    pub remaining_time: Option<u64>,
}

impl TransferStats {
    pub fn new(total_size: u64) -> Self {
        let done = total_size == 0;
        Self {
            current_size: 0,
            total_size,
            remaining_size: total_size,
            percentage: if done { 1.0 } else { 0.0 },
            speed: 0,
            elapsed_time: 0,
            remaining_time: if done { Some(0) } else { None },
        }
    }

    pub fn is_complete(&self) -> bool {
        self.current_size == self.total_size
    }
}

/// Anything that can report how many bytes a chunk carries.
///
/// Signed and floating point values are accepted so that lengths coming from
/// loosely typed sources are checked instead of silently wrapped.
pub trait ChunkLength {
    fn chunk_len(&self) -> Result<u64, StatusBarError>;
}

macro_rules! unsigned_chunk_length {
    ($($t:ty),*) => {
        $(impl ChunkLength for $t {
            fn chunk_len(&self) -> Result<u64, StatusBarError> {
                Ok(*self as u64)
            }
        })*
    };
}

macro_rules! signed_chunk_length {
    ($($t:ty),*) => {
        $(impl ChunkLength for $t {
            fn chunk_len(&self) -> Result<u64, StatusBarError> {
                u64::try_from(*self).map_err(|_| {
                    StatusBarError::invalid(format!("negative chunk length {}", self))
                })
            }
        })*
    };
}

unsigned_chunk_length!(u8, u16, u32, u64, usize);
signed_chunk_length!(i8, i16, i32, i64, isize);

impl ChunkLength for f64 {
    fn chunk_len(&self) -> Result<u64, StatusBarError> {
        if !self.is_finite() || *self < 0.0 || self.fract() != 0.0 || *self > u64::MAX as f64 {
            return Err(StatusBarError::invalid(format!(
                "chunk length {} is not a byte count",
                self
            )));
        }
        Ok(*self as u64)
    }
}

impl ChunkLength for &[u8] {
    fn chunk_len(&self) -> Result<u64, StatusBarError> {
        Ok(self.len() as u64)
    }
}

impl<const N: usize> ChunkLength for &[u8; N] {
    fn chunk_len(&self) -> Result<u64, StatusBarError> {
        Ok(N as u64)
    }
}

impl ChunkLength for &Vec<u8> {
    fn chunk_len(&self) -> Result<u64, StatusBarError> {
        Ok(self.len() as u64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No chunk seen yet.
    Idle,
    Active,
    Completed,
    Cancelled,
}

/// What an [`StatsTracker::ingest`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingested {
    /// First chunk of a transfer that is not done yet; the elapsed timer should start now.
    Started,
    Progressed,
    /// This chunk finished the transfer. Returned exactly once.
    Completed,
    /// The tracker was already stopped.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Counted,
    /// The stall threshold was reached on this tick.
    Stalled,
    Ignored,
}

pub struct StatsTracker {
    stats: TransferStats,
    phase: Phase,
    smoothing: f64,
    stall_ticks: u32,
    ticks_without_update: u32,
    started_at: Option<Instant>,
    last_chunk_at: Option<Instant>,
}

impl StatsTracker {
    pub fn new(
        total: Option<u64>,
        stall_ticks: u32,
        smoothing: f64,
    ) -> Result<Self, StatusBarError> {
        let total = total.ok_or_else(|| StatusBarError::invalid("missing total size"))?;
        if stall_ticks == 0 {
            return Err(StatusBarError::invalid(
                "stall threshold must be at least one tick",
            ));
        }
        if !(smoothing > 0.0 && smoothing <= 1.0) {
            return Err(StatusBarError::invalid(format!(
                "smoothing must be in (0, 1], got {}",
                smoothing
            )));
        }

        // An empty transfer is finished before it starts.
        let phase = if total == 0 {
            Phase::Completed
        } else {
            Phase::Idle
        };

        Ok(Self {
            stats: TransferStats::new(total),
            phase,
            smoothing,
            stall_ticks,
            ticks_without_update: 0,
            started_at: None,
            last_chunk_at: None,
        })
    }

    pub fn stats(&self) -> &TransferStats {
        &self.stats
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self.phase, Phase::Completed | Phase::Cancelled)
    }

    /// Accounts for one chunk that arrived at `now`.
    ///
    /// A stopped tracker ignores every chunk, valid or not. Otherwise invalid
    /// lengths and lengths overshooting the total are rejected without
    /// touching the current state.
    pub fn ingest<C: ChunkLength>(
        &mut self,
        chunk: C,
        now: Instant,
    ) -> Result<Ingested, StatusBarError> {
        if self.is_stopped() {
            return Ok(Ingested::Ignored);
        }
        let length = chunk.chunk_len()?;

        let current = self
            .stats
            .current_size
            .checked_add(length)
            .filter(|c| *c <= self.stats.total_size)
            .ok_or_else(|| {
                StatusBarError::invalid(format!(
                    "chunk of {} bytes overshoots the {} bytes remaining",
                    length, self.stats.remaining_size
                ))
            })?;

        let started_at = *self.started_at.get_or_insert(now);

        let mut next = self.stats.clone();
        next.current_size = current;
        next.remaining_size = next.total_size - current;
        next.percentage = current as f64 / next.total_size as f64;

        let complete = next.is_complete();
        if complete {
            // No smoothing on the terminal sample.
            next.speed = 0;
            next.remaining_time = Some(0);
        } else if let Some(prev) = self.last_chunk_at {
            let dt = now.saturating_duration_since(prev).as_nanos().max(1) as f64;
            let last_speed = length as f64 * NANOS_PER_SEC / dt;
            let previous = if next.speed == 0 {
                last_speed
            } else {
                next.speed as f64
            };
            next.speed = (self.smoothing * last_speed + (1.0 - self.smoothing) * previous) as u64;

            // ETA comes from the average rate since the start, not the smoothed speed.
            if current > 0 {
                let elapsed_ms = now.saturating_duration_since(started_at).as_millis() as f64;
                let seconds = 0.001 * elapsed_ms * next.remaining_size as f64 / current as f64;
                next.remaining_time = Some((seconds as u64).saturating_add(1));
            }
        }

        self.stats = next;
        self.last_chunk_at = Some(now);
        self.ticks_without_update = 0;

        let outcome = if complete {
            self.phase = Phase::Completed;
            Ingested::Completed
        } else if self.phase == Phase::Idle {
            self.phase = Phase::Active;
            Ingested::Started
        } else {
            Ingested::Progressed
        };
        Ok(outcome)
    }

    /// One period of the elapsed-time clock.
    pub fn tick(&mut self) -> Tick {
        if self.phase != Phase::Active {
            return Tick::Ignored;
        }

        let mut next = self.stats.clone();
        next.elapsed_time += 1;
        self.ticks_without_update = self.ticks_without_update.saturating_add(1);

        let tick = if self.ticks_without_update == self.stall_ticks {
            next.speed = 0;
            next.remaining_time = None;
            Tick::Stalled
        } else {
            Tick::Counted
        };
        self.stats = next;
        tick
    }

    /// Stops the tracker. Returns `false` if it was already stopped.
    pub fn cancel(&mut self) -> bool {
        if self.is_stopped() {
            return false;
        }
        self.phase = Phase::Cancelled;
        true
    }
}
