use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::{
    runtime::Handle,
    sync::watch,
    time::{Instant, MissedTickBehavior},
};

use crate::{
    bar::ProgressBar,
    config::StatusBarOptions,
    error::StatusBarError,
    format::Formatter,
    stats::{ChunkLength, Ingested, Phase, StatsTracker, Tick, TransferStats},
    timer::Ticker,
};

const ELAPSED_PERIOD: Duration = Duration::from_secs(1);

pub type RenderFn = Box<dyn FnMut(&TransferStats, &Formatter) + Send>;
pub type FinishFn = Box<dyn FnOnce() + Send>;

/// State reachable from the timer tasks.
struct Shared {
    tracker: Mutex<StatsTracker>,
    snapshot: watch::Sender<TransferStats>,
    render: Mutex<RenderFn>,
    format: Formatter,
}

impl Shared {
    fn tracker(&self) -> MutexGuard<'_, StatsTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn render(&self, stats: &TransferStats) {
        let mut render = self.render.lock().unwrap_or_else(PoisonError::into_inner);
        (*render)(stats, &self.format);
    }

    fn render_tick(&self) -> ControlFlow<()> {
        // Holding the render lock first keeps a late periodic render from
        // landing after the final one.
        let mut render = self.render.lock().unwrap_or_else(PoisonError::into_inner);
        let stats = {
            let tracker = self.tracker();
            if tracker.is_stopped() {
                return ControlFlow::Break(());
            }
            tracker.stats().clone()
        };
        (*render)(&stats, &self.format);
        ControlFlow::Continue(())
    }

    fn elapsed_tick(&self) -> ControlFlow<()> {
        let mut tracker = self.tracker();
        match tracker.tick() {
            Tick::Ignored => return ControlFlow::Break(()),
            Tick::Stalled => debug!(
                "no data for a while at {} of {} bytes, marking transfer as stalled",
                tracker.stats().current_size,
                tracker.stats().total_size
            ),
            Tick::Counted => (),
        }
        self.snapshot.send_replace(tracker.stats().clone());
        ControlFlow::Continue(())
    }
}

/// Builds a [`StatusBar`]. A render callback is mandatory.
pub struct StatusBarBuilder {
    options: StatusBarOptions,
    render: Option<RenderFn>,
    finish: Option<FinishFn>,
}

impl StatusBarBuilder {
    pub fn render<F>(mut self, render: F) -> Self
    where
        F: FnMut(&TransferStats, &Formatter) + Send + 'static,
    {
        self.render = Some(Box::new(render));
        self
    }

    /// Called once, right after the final render of a completed transfer.
    pub fn on_finish<F>(mut self, finish: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.finish = Some(Box::new(finish));
        self
    }

    /// Creates the status bar and renders it once.
    ///
    /// A non-empty transfer needs a tokio runtime to drive its timers; an
    /// empty one never creates any and can be built anywhere.
    pub fn build(self) -> Result<StatusBar, StatusBarError> {
        let options = self.options;
        let render = self
            .render
            .ok_or_else(|| StatusBarError::invalid("missing render function"))?;
        options.validate()?;

        let tracker = StatsTracker::new(options.total, options.stall_ticks, options.smoothing)?;
        let runtime = if tracker.is_stopped() {
            None
        } else {
            Some(Handle::try_current()?)
        };

        let stats = tracker.stats().clone();
        let (snapshot, _) = watch::channel(stats.clone());
        let shared = Arc::new(Shared {
            tracker: Mutex::new(tracker),
            snapshot,
            render: Mutex::new(render),
            format: Formatter::new(ProgressBar::new(options.progress_bar.clone())),
        });

        shared.render(&stats);

        let mut bar = StatusBar {
            shared,
            runtime,
            render_timer: Ticker::new("render"),
            elapsed_timer: Ticker::new("elapsed"),
            finish: self.finish,
        };

        if let (Some(handle), Some(period)) = (&bar.runtime, options.render_period()) {
            let shared = bar.shared.clone();
            bar.render_timer
                .start(handle, period, MissedTickBehavior::Skip, move || {
                    shared.render_tick()
                });
        }

        Ok(bar)
    }
}

/// Live progress statistics for one transfer.
///
/// Feed it with [`StatusBar::ingest`]; it renders through the callback given
/// to the builder on a fixed cadence and once more when the last byte
/// arrives. Call [`StatusBar::cancel`] (or drop it) when the transfer is
/// abandoned.
pub struct StatusBar {
    shared: Arc<Shared>,
    runtime: Option<Handle>,
    render_timer: Ticker,
    elapsed_timer: Ticker,
    finish: Option<FinishFn>,
}

impl StatusBar {
    pub fn builder(options: StatusBarOptions) -> StatusBarBuilder {
        StatusBarBuilder {
            options,
            render: None,
            finish: None,
        }
    }

    /// Accounts for one chunk. Never blocks on I/O.
    ///
    /// Returns [`Ingested::Ignored`] once the bar is stopped.
    pub fn ingest<C: ChunkLength>(&mut self, chunk: C) -> Result<Ingested, StatusBarError> {
        let now = Instant::now().into_std();
        let (outcome, stats) = {
            let mut tracker = self.shared.tracker();
            let outcome = tracker.ingest(chunk, now)?;
            let stats = tracker.stats().clone();
            if outcome != Ingested::Ignored {
                self.shared.snapshot.send_replace(stats.clone());
            }
            (outcome, stats)
        };

        match outcome {
            Ingested::Started => self.start_elapsed_timer(),
            Ingested::Completed => self.complete(&stats),
            Ingested::Ignored => warn!("chunk ingested after the status bar stopped, ignoring it"),
            Ingested::Progressed => (),
        }
        Ok(outcome)
    }

    /// Stops both timers. Safe to call any number of times.
    ///
    /// Once this returns the render callback is not running and will not
    /// be called again.
    pub fn cancel(&mut self) {
        if self.shared.tracker().cancel() {
            debug!("status bar cancelled");
        }
        self.stop_timers();
        // Wait out a periodic render that read the tracker before it stopped.
        drop(self.shared.render.lock().unwrap_or_else(PoisonError::into_inner));
    }

    /// Latest published snapshot.
    pub fn stats(&self) -> TransferStats {
        self.shared.snapshot.borrow().clone()
    }

    /// Receiver notified on every ingest and elapsed tick.
    pub fn subscribe(&self) -> watch::Receiver<TransferStats> {
        self.shared.snapshot.subscribe()
    }

    pub fn format(&self) -> &Formatter {
        &self.shared.format
    }

    pub fn phase(&self) -> Phase {
        self.shared.tracker().phase()
    }

    pub fn is_active(&self) -> bool {
        !self.shared.tracker().is_stopped()
    }

    pub fn has_running_timers(&self) -> bool {
        self.render_timer.is_running() || self.elapsed_timer.is_running()
    }

    fn start_elapsed_timer(&mut self) {
        if let Some(handle) = &self.runtime {
            let shared = self.shared.clone();
            self.elapsed_timer.start(
                handle,
                ELAPSED_PERIOD,
                MissedTickBehavior::Burst,
                move || shared.elapsed_tick(),
            );
        }
    }

    fn stop_timers(&mut self) {
        self.render_timer.stop();
        self.elapsed_timer.stop();
    }

    fn complete(&mut self, stats: &TransferStats) {
        self.stop_timers();
        info!("transfer of {} bytes complete", stats.total_size);
        self.shared.render(stats);
        if let Some(finish) = self.finish.take() {
            finish();
        }
    }
}

impl Drop for StatusBar {
    fn drop(&mut self) {
        self.cancel();
    }
}
