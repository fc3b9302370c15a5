use std::ops::ControlFlow;
use std::time::Duration;

use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tokio_stream::{wrappers::IntervalStream, StreamExt};

/// A periodic task with an explicit start/stop lifecycle.
///
/// The first tick fires one period after [`Ticker::start`]. Stopping is
/// idempotent and dropping a running ticker stops it.
#[derive(Debug)]
pub(crate) struct Ticker {
    name: &'static str,
    task: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn new(name: &'static str) -> Self {
        Self { name, task: None }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map_or(false, |t| !t.is_finished())
    }

    /// Spawns the task on `handle`. Does nothing if already started.
    ///
    /// `on_tick` returning `Break` ends the task from the inside.
    pub fn start<F>(
        &mut self,
        handle: &Handle,
        period: Duration,
        missed: MissedTickBehavior,
        mut on_tick: F,
    ) where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        if self.task.is_some() {
            return;
        }

        let name = self.name;
        let first = Instant::now() + period;
        debug!("starting {} timer every {:?}", name, period);

        self.task = Some(handle.spawn(async move {
            let mut interval = interval_at(first, period);
            interval.set_missed_tick_behavior(missed);

            let mut ticks = IntervalStream::new(interval);
            while ticks.next().await.is_some() {
                if on_tick().is_break() {
                    break;
                }
            }
            debug!("{} timer finished", name);
        }));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("stopping {} timer", self.name);
            task.abort();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
