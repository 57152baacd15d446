//! The in-process event bus.
//!
//! The bus associates machines with bounded event queues. Each registered
//! machine gets a processor task that pulls messages, merges the message
//! context into the machine's context, applies the event via `send_event`,
//! and fans the message out to subscribers. Subscriber delivery never
//! blocks the processor: a full subscriber buffer drops the delivery.

use crate::error::BusError;
use crate::log::EventLog;
use crate::message::EventMessage;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{broadcast, mpsc};
use trellis_core::Machine;

/// Bus configuration.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Capacity of each machine's event queue.
    pub buffer_size: usize,
    /// How many times a publish retries a full queue.
    pub retry_attempts: u32,
    /// Delay between publish retries.
    pub retry_delay: Duration,
    /// How long one enqueue attempt may block.
    pub timeout: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            buffer_size: 100,
            retry_attempts: 3,
            retry_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }
}

impl BusConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Handles messages delivered to a subscriber.
pub type EventHandler = Box<dyn Fn(EventMessage) -> Result<(), BusError> + Send + Sync>;

struct MachineEntry {
    queue: mpsc::Sender<EventMessage>,
    subscribers: Arc<RwLock<Vec<mpsc::Sender<EventMessage>>>>,
}

/// In-process event broker for machine instances.
pub struct EventBus {
    config: BusConfig,
    machines: DashMap<String, MachineEntry>,
    log: Option<Arc<EventLog>>,
    shutdown: broadcast::Sender<()>,
    closed: AtomicBool,
}

impl EventBus {
    /// Creates a bus with the given configuration.
    pub fn new(config: BusConfig) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            config,
            machines: DashMap::new(),
            log: None,
            shutdown,
            closed: AtomicBool::new(false),
        }
    }

    /// Attaches an append-only log; every published message is recorded.
    pub fn with_log(mut self, log: Arc<EventLog>) -> Self {
        self.log = Some(log);
        self
    }

    /// Registers a machine and starts its processor task.
    ///
    /// Messages for the machine merge their context entries into the
    /// machine's context (key-wise overwrite) before the event is sent;
    /// rejected events are logged and do not stop the processor.
    pub fn register_machine(&self, id: impl Into<String>, machine: Arc<Machine>) {
        let id = id.into();
        let (queue, mut rx) = mpsc::channel::<EventMessage>(self.config.buffer_size);
        let subscribers: Arc<RwLock<Vec<mpsc::Sender<EventMessage>>>> =
            Arc::new(RwLock::new(Vec::new()));

        self.machines.insert(
            id.clone(),
            MachineEntry {
                queue,
                subscribers: subscribers.clone(),
            },
        );

        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    msg = rx.recv() => {
                        let Some(msg) = msg else { break };
                        process_message(&machine, &msg);

                        let targets = subscribers.read().clone();
                        for target in targets {
                            if target.try_send(msg.clone()).is_err() {
                                tracing::warn!(
                                    machine = %msg.machine_id,
                                    message = %msg.id,
                                    "subscriber buffer full, dropping delivery"
                                );
                            }
                        }
                    }
                }
            }
            tracing::debug!(machine = %id, "bus processor stopped");
        });
    }

    /// Subscribes to a machine's event stream. The handler runs on its
    /// own consumer task.
    pub fn subscribe(&self, id: &str, handler: EventHandler) -> Result<(), BusError> {
        let entry = self
            .machines
            .get(id)
            .ok_or_else(|| BusError::MachineNotRegistered { id: id.to_string() })?;

        let (tx, mut rx) = mpsc::channel::<EventMessage>(self.config.buffer_size);
        entry.subscribers.write().push(tx);

        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    msg = rx.recv() => {
                        let Some(msg) = msg else { break };
                        if let Err(err) = handler(msg) {
                            tracing::warn!(error = %err, "subscriber handler failed");
                        }
                    }
                }
            }
        });

        Ok(())
    }

    /// Publishes a message to its machine's queue.
    ///
    /// A missing id or timestamp is filled in. The enqueue waits up to the
    /// configured timeout and is retried `retry_attempts` times with
    /// `retry_delay` between attempts before giving up.
    pub async fn publish(&self, mut msg: EventMessage) -> Result<(), BusError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BusError::Closed);
        }

        msg.fill_defaults();

        let queue = self
            .machines
            .get(&msg.machine_id)
            .map(|entry| entry.queue.clone())
            .ok_or_else(|| BusError::MachineNotRegistered {
                id: msg.machine_id.clone(),
            })?;

        if let Some(log) = &self.log {
            log.append(msg.clone());
        }

        let attempts = self.config.retry_attempts.max(1);
        for attempt in 1..=attempts {
            match queue.send_timeout(msg, self.config.timeout).await {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Closed(_)) => return Err(BusError::Closed),
                Err(SendTimeoutError::Timeout(returned)) => {
                    msg = returned;
                    if attempt < attempts {
                        tracing::debug!(
                            machine = %msg.machine_id,
                            attempt,
                            "queue full, retrying publish"
                        );
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
            }
        }

        Err(BusError::PublishTimeout {
            id: msg.machine_id,
        })
    }

    /// Publishes one synthesized message per registered machine.
    /// Returns an aggregate error if any publish failed.
    pub async fn broadcast(
        &self,
        event: &str,
        context: HashMap<String, Value>,
    ) -> Result<(), BusError> {
        let ids: Vec<String> = self.machines.iter().map(|e| e.key().clone()).collect();

        let mut failures = 0;
        for id in ids {
            let msg = EventMessage::new(&id, event)
                .with_context(context.clone())
                .with_source("broadcast");
            if let Err(err) = self.publish(msg).await {
                tracing::warn!(machine = %id, error = %err, "broadcast publish failed");
                failures += 1;
            }
        }

        if failures > 0 {
            return Err(BusError::Broadcast { failures });
        }
        Ok(())
    }

    /// Returns the ids of all registered machines.
    pub fn machine_ids(&self) -> Vec<String> {
        self.machines.iter().map(|e| e.key().clone()).collect()
    }

    /// Returns the attached event log, if any.
    pub fn log(&self) -> Option<&Arc<EventLog>> {
        self.log.as_ref()
    }

    /// Cooperative shutdown: signals all processor and consumer tasks,
    /// then drops the machine queues. Publishing afterwards fails with
    /// `Closed`. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown.send(());
        self.machines.clear();
        tracing::info!("event bus closed");
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        self.close();
    }
}

/// Merges the message context into the machine, then applies the event.
pub(crate) fn process_message(machine: &Machine, msg: &EventMessage) {
    let ctx = machine.context();
    for (key, value) in &msg.context {
        ctx.set(key.clone(), value.clone());
    }

    if let Err(err) = machine.send_event(msg.event.as_str()) {
        tracing::debug!(
            machine = %msg.machine_id,
            event = %msg.event,
            error = %err,
            "event rejected by machine"
        );
    }
}
