use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::task::TaskTracker;

use crate::builder;
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigSnapshot, Settings};
use crate::cooldown;
use crate::interpret::{interpret, report, Outcome};
use crate::model::{ActivityEvent, Heartbeat};
use crate::transport::{HttpResult, Transport};

/// What `dispatch` did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Disabled,
    Suppressed,
    BackingOff,
    Sent,
}

/// One finished submission, as seen by an outcome sink.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub heartbeat: Heartbeat,
    pub outcome: Outcome,
    pub rolled_back: bool,
}

/// A heartbeat tagged with the dispatch that recorded it.
struct Recorded {
    heartbeat: Heartbeat,
    generation: u64,
}

struct DispatchState {
    /// A rollback only applies while this still carries the generation of
    /// the dispatch being rolled back.
    last_sent: Recorded,
    next_generation: u64,
    backoff_until: Option<f64>,
}

struct Shared<T, C> {
    config: ConfigSnapshot,
    settings: Settings,
    transport: T,
    clock: C,
    state: Mutex<DispatchState>,
    tracker: TaskTracker,
    sink: Option<UnboundedSender<Delivery>>,
    closed: AtomicBool,
}

/// Turns editor activity into heartbeat submissions.
///
/// `dispatch` never waits on the network: each send runs as its own task and
/// reconciles the dedup state when it completes. It must be called from
/// inside a tokio runtime.
pub struct Dispatcher<T, C = SystemClock> {
    shared: Option<Arc<Shared<T, C>>>,
}

impl<T, C> Clone for Dispatcher<T, C> {
    fn clone(&self) -> Self {
        Dispatcher {
            shared: self.shared.clone(),
        }
    }
}

pub struct DispatcherBuilder<T, C> {
    config: ConfigSnapshot,
    transport: T,
    settings: Settings,
    clock: C,
    sink: Option<UnboundedSender<Delivery>>,
}

impl<T: Transport> Dispatcher<T, SystemClock> {
    pub fn new(config: ConfigSnapshot, settings: Settings, transport: T) -> Self {
        Self::builder(config, transport).settings(settings).build()
    }

    pub fn builder(config: ConfigSnapshot, transport: T) -> DispatcherBuilder<T, SystemClock> {
        DispatcherBuilder {
            config,
            transport,
            settings: Settings::default(),
            clock: SystemClock,
            sink: None,
        }
    }
}

impl<T: Transport, C: Clock> DispatcherBuilder<T, C> {
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn clock<C2: Clock>(self, clock: C2) -> DispatcherBuilder<T, C2> {
        DispatcherBuilder {
            config: self.config,
            transport: self.transport,
            settings: self.settings,
            clock,
            sink: self.sink,
        }
    }

    pub fn outcome_sink(mut self, sink: UnboundedSender<Delivery>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// The enabled flag and key are checked here, once.
    pub fn build(self) -> Dispatcher<T, C> {
        if !self.config.is_active() {
            let has_key = !self.config.api_key.is_empty();
            tracing::info!(enabled = self.config.enabled, has_key, "heartbeats disabled");
            return Dispatcher { shared: None };
        }

        let shared = Shared {
            config: self.config,
            settings: self.settings,
            transport: self.transport,
            clock: self.clock,
            state: Mutex::new(DispatchState {
                last_sent: Recorded {
                    heartbeat: Heartbeat::sentinel(),
                    generation: 0,
                },
                next_generation: 1,
                backoff_until: None,
            }),
            tracker: TaskTracker::new(),
            sink: self.sink,
            closed: AtomicBool::new(false),
        };

        Dispatcher {
            shared: Some(Arc::new(shared)),
        }
    }
}

impl<T: Transport, C: Clock> Dispatcher<T, C> {
    pub fn is_enabled(&self) -> bool {
        self.shared
            .as_ref()
            .map_or(false, |s| !s.closed.load(Ordering::Acquire))
    }

    pub fn dispatch(&self, event: &ActivityEvent) -> Decision {
        let shared = match &self.shared {
            Some(s) if !s.closed.load(Ordering::Acquire) => s,
            _ => return Decision::Disabled,
        };

        let heartbeat = builder::build(event, &shared.config, &shared.clock);

        let (previous, generation) = {
            let mut state = shared.lock_state();

            if let Some(until) = state.backoff_until {
                if heartbeat.time < until {
                    shared.note_skipped("backing off after rate limit", &heartbeat);
                    return Decision::BackingOff;
                }
                state.backoff_until = None;
            }

            if !cooldown::should_send(
                &heartbeat,
                &state.last_sent.heartbeat,
                event.is_forced_write,
                shared.settings.cooldown_secs,
            ) {
                shared.note_skipped("within cooldown", &heartbeat);
                return Decision::Suppressed;
            }

            let generation = state.next_generation;
            state.next_generation += 1;

            let recorded = Recorded {
                heartbeat: heartbeat.clone(),
                generation,
            };
            let previous = std::mem::replace(&mut state.last_sent, recorded);
            (previous, generation)
        };

        let send = shared.transport.send(&heartbeat, &shared.config.api_key);
        let task = Arc::clone(shared);

        shared.tracker.spawn(async move {
            let result = send.await;
            task.complete(heartbeat, previous, generation, &result);
        });

        Decision::Sent
    }

    /// Waits for every in-flight submission to finish.
    ///
    /// Not meant to be called concurrently with itself: one caller reopening
    /// the tracker can leave another caller waiting until the next close.
    pub async fn drain(&self) {
        if let Some(shared) = &self.shared {
            shared.tracker.close();
            shared.tracker.wait().await;
            if !shared.closed.load(Ordering::Acquire) {
                shared.tracker.reopen();
            }
        }
    }

    /// Drains and turns every later `dispatch` into a no-op.
    pub async fn shutdown(&self) {
        if let Some(shared) = &self.shared {
            shared.closed.store(true, Ordering::Release);
            shared.tracker.close();
            shared.tracker.wait().await;
        }
    }

    pub fn in_flight(&self) -> usize {
        self.shared.as_ref().map_or(0, |s| s.tracker.len())
    }

    pub fn last_sent(&self) -> Option<Heartbeat> {
        self.shared
            .as_ref()
            .map(|s| s.lock_state().last_sent.heartbeat.clone())
    }
}

impl<T: Transport, C: Clock> Shared<T, C> {
    fn lock_state(&self) -> MutexGuard<'_, DispatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn note_skipped(&self, reason: &str, heartbeat: &Heartbeat) {
        if self.config.debug {
            tracing::info!(entity = %heartbeat.entity, "heartbeat skipped: {}", reason);
        } else {
            tracing::trace!(entity = %heartbeat.entity, "heartbeat skipped: {}", reason);
        }
    }

    fn complete(
        &self,
        heartbeat: Heartbeat,
        previous: Recorded,
        generation: u64,
        result: &HttpResult,
    ) {
        let outcome = interpret(result);
        let mut rolled_back = false;

        {
            let mut state = self.lock_state();

            if outcome.requires_rollback() {
                if state.last_sent.generation == generation {
                    state.last_sent = previous;
                    rolled_back = true;
                } else {
                    tracing::debug!(
                        entity = %heartbeat.entity,
                        "newer heartbeat recorded, keeping it"
                    );
                }
            }

            if outcome.triggers_backoff() {
                let until = self.clock.now() + self.settings.rate_limit_backoff_secs;
                state.backoff_until = Some(state.backoff_until.map_or(until, |u| u.max(until)));
            }
        }

        report(&outcome, &heartbeat.entity, self.config.debug);

        if let Some(sink) = &self.sink {
            let _ = sink.send(Delivery {
                heartbeat,
                outcome,
                rolled_back,
            });
        }
    }
}
