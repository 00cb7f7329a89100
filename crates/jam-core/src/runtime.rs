//! Scheduler thread.
//!
//! [`Scheduler`] moves a [`ScriptHost`] onto its own thread and feeds it
//! [`HostMessage`]s from a channel. Every call is processed to completion
//! before the next one starts, so ticks, messages, loads and resets never
//! overlap no matter how many threads hold a [`SchedulerHandle`].

use crate::config::JamConfig;
use crate::events::Atom;
use crate::host::ScriptHost;
use crate::loader::ScriptLoader;
use crate::messages::HostMessage;
use crate::sink::EventSink;
use crate::timing::ClockState;
use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Cloneable sender side of a running scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    message_tx: Sender<HostMessage>,
}

impl SchedulerHandle {
    /// Send a message to the scheduler thread.
    pub fn send(&self, msg: HostMessage) -> Result<()> {
        self.message_tx
            .send(msg)
            .map_err(|e| anyhow::anyhow!("Failed to send message: {}", e))
    }

    pub fn tick(&self) -> Result<()> {
        self.send(HostMessage::Tick)
    }

    pub fn message(&self, values: Vec<Atom>) -> Result<()> {
        self.send(HostMessage::Message(values))
    }

    pub fn load(&self, identifier: impl Into<String>) -> Result<()> {
        self.send(HostMessage::Load(identifier.into()))
    }

    pub fn reset(&self) -> Result<()> {
        self.send(HostMessage::Reset)
    }

    /// Ask the thread to stop after the messages already queued.
    pub fn shutdown(&self) -> Result<()> {
        self.send(HostMessage::Shutdown)
    }
}

/// A script host running on a dedicated thread.
pub struct Scheduler {
    handle: SchedulerHandle,
    thread_handle: Option<JoinHandle<ClockState>>,
}

impl Scheduler {
    /// Build the host on the calling thread, then start the scheduler thread.
    pub fn spawn(
        config: &JamConfig,
        loader: Box<dyn ScriptLoader>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let host = ScriptHost::new(config, loader, sink)?;
        Ok(Self::start(host))
    }

    /// Start the scheduler thread around an existing host.
    pub fn start(host: ScriptHost) -> Self {
        let (message_tx, message_rx) = unbounded();

        let thread_handle = thread::spawn(move || run(host, message_rx));

        Self {
            handle: SchedulerHandle { message_tx },
            thread_handle: Some(thread_handle),
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Stop the thread after the queued messages and return the final clock.
    pub fn join(mut self) -> Result<ClockState> {
        self.handle.shutdown()?;
        let thread_handle = self
            .thread_handle
            .take()
            .ok_or_else(|| anyhow::anyhow!("Scheduler thread already joined"))?;
        thread_handle
            .join()
            .map_err(|_| anyhow::anyhow!("Scheduler thread panicked"))
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(thread_handle) = self.thread_handle.take() {
            let _ = self.handle.shutdown();
            let _ = thread_handle.join();
        }
    }
}

fn run(mut host: ScriptHost, message_rx: Receiver<HostMessage>) -> ClockState {
    log::debug!("jam: scheduler thread started");

    for msg in message_rx.iter() {
        if msg == HostMessage::Shutdown {
            break;
        }
        host.handle(msg);
    }

    log::debug!("jam: scheduler thread stopped at tick {}", host.clock().tick_count());
    host.clock().clone()
}
