use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, error, trace, warn};

use crate::clock::{Clock, TokioClock};
use crate::close::{CloseCode, CloseReason};
use crate::config::ClientConfig;
use crate::dispatch::{DispatchQueue, ImmediateDispatch};
use crate::error::Error;
use crate::listener::{Listener, NoopListener};
use crate::message::Message;
use crate::monitor::Reachability;
use crate::pinger::{Pinger, PingMode, PingingConfig};
use crate::retry::RetryPolicy;
use crate::status::Status;
use crate::transport::{
    Challenge, ChallengeDisposition, Transport, TransportEvents, TransportHandle,
};

enum Notification {
    Status(Status, Status),
    Message(Message),
    Error(Error),
}

#[derive(Default)]
struct Effects(Vec<Notification>);

impl Effects {
    fn status(&mut self, old: Status, new: Status) {
        self.0.push(Notification::Status(old, new));
    }
    fn message(&mut self, message: Message) {
        self.0.push(Notification::Message(message));
    }
    fn error(&mut self, error: Error) {
        self.0.push(Notification::Error(error));
    }
}

struct SupervisorState {
    status: Status,
    transport_handle: Option<Box<dyn TransportHandle>>,
    generation: u64,
    retry_times: u32,
    retry_task: Option<Box<dyn crate::clock::DelayHandle>>,
    monitor_enabled: bool,
    monitor_satisfied: bool,
    last_close_reason_was_manual: bool,
    manual_close_pending: bool,
    retrier: Option<RetryPolicy>,
    pinger: Option<Pinger>,
    ping_generation: u64,
}

struct Shared {
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    dispatch: Arc<dyn DispatchQueue>,
    listener: Arc<dyn Listener>,
    config: ClientConfig,
    state: Mutex<SupervisorState>,
}

/// Bridges transport callbacks back to the owning [`Shared`], tagged with
/// the generation the transport was connected under so events from a
/// superseded connection attempt are silently dropped.
struct EventSink {
    shared: Weak<Shared>,
    generation: u64,
}

impl TransportEvents for EventSink {
    fn did_open(&self, subprotocol: Option<String>) {
        if let Some(shared) = self.shared.upgrade() {
            shared.handle_did_open(self.generation, subprotocol);
        }
    }

    fn did_receive(&self, message: Message) {
        if let Some(shared) = self.shared.upgrade() {
            shared.handle_did_receive(self.generation, message);
        }
    }

    fn did_close(&self, code: CloseCode, reason: Option<Vec<u8>>) {
        if let Some(shared) = self.shared.upgrade() {
            shared.handle_did_close(self.generation, code, reason);
        }
    }

    fn did_fail(&self, message: String) {
        if let Some(shared) = self.shared.upgrade() {
            shared.handle_did_fail(self.generation, message);
        }
    }

    fn did_receive_challenge(&self, challenge: Challenge) -> ChallengeDisposition {
        match self.shared.upgrade() {
            Some(shared) => shared.handle_did_receive_challenge(challenge),
            None => ChallengeDisposition::UseDefault,
        }
    }
}

impl Shared {
    fn run_effects(&self, effects: Effects) {
        for notification in effects.0 {
            match notification {
                Notification::Status(old, new) => {
                    let listener = self.listener.clone();
                    self.dispatch
                        .dispatch(Box::new(move || listener.on_status(old, new)));
                }
                Notification::Message(message) => {
                    let listener = self.listener.clone();
                    self.dispatch
                        .dispatch(Box::new(move || listener.on_message(message)));
                }
                Notification::Error(error) => {
                    let listener = self.listener.clone();
                    self.dispatch
                        .dispatch(Box::new(move || listener.on_error(error)));
                }
            }
        }
    }

    fn set_status_locked(
        self: &Arc<Self>,
        state: &mut SupervisorState,
        effects: &mut Effects,
        new: Status,
    ) {
        if state.status == new {
            return;
        }
        trace!(?new, "status transition");
        let old = std::mem::replace(&mut state.status, new.clone());
        let standard_ping = matches!(
            state.pinger.as_ref().map(|p| &p.mode),
            Some(PingMode::Standard)
        );
        if standard_ping {
            if new.is_opened() {
                self.pinger_resume_locked(state);
            } else {
                self.pinger_suspend_locked(state);
            }
        }
        effects.status(old, new);
    }

    fn try_close_locked(
        self: &Arc<Self>,
        state: &mut SupervisorState,
        effects: &mut Effects,
        code: CloseCode,
        reason: Option<CloseReason>,
    ) {
        if state.retry_task.is_some() {
            return;
        }
        if !state.monitor_satisfied {
            self.settle_closed_locked(state, effects, code, reason);
            return;
        }
        if reason.is_none() {
            self.settle_closed_locked(state, effects, code, reason);
            return;
        }
        let Some(policy) = state.retrier.clone() else {
            self.settle_closed_locked(state, effects, code, reason);
            return;
        };
        state.retry_times += 1;
        let attempt = state.retry_times;
        let Some(delay) = policy.retry(code, reason.as_ref(), attempt) else {
            self.settle_closed_locked(state, effects, code, reason);
            return;
        };
        debug!(attempt, ?delay, "scheduling reconnect");
        self.set_status_locked(state, effects, Status::Opening);
        let weak = Arc::downgrade(self);
        let task = self.clock.schedule(
            delay,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.reopen();
                }
            }),
        );
        state.retry_task = Some(task);
    }

    fn settle_closed_locked(
        self: &Arc<Self>,
        state: &mut SupervisorState,
        effects: &mut Effects,
        code: CloseCode,
        reason: Option<CloseReason>,
    ) {
        warn!(?code, ?reason, "settling closed");
        state.last_close_reason_was_manual = reason.is_none();
        state.retry_times = 0;
        let new = Status::Closed {
            code,
            reason,
            will_retry: false,
        };
        self.set_status_locked(state, effects, new);
    }

    fn connect_locked(self: &Arc<Self>, state: &mut SupervisorState, effects: &mut Effects) {
        self.set_status_locked(state, effects, Status::Opening);
        state.generation = state.generation.wrapping_add(1);
        let generation = state.generation;
        debug!(url = %self.config.connect_target.url(), generation, "connecting");
        let sink: Arc<dyn TransportEvents> = Arc::new(EventSink {
            shared: Arc::downgrade(self),
            generation,
        });
        match self.transport.connect(
            &self.config.connect_target,
            &self.config.subprotocols,
            sink,
        ) {
            Ok(handle) => {
                state.transport_handle = Some(handle);
            }
            Err(err) => {
                error!(%err, "connect failed");
                let message = err.to_string();
                effects.error(err);
                self.try_close_locked(
                    state,
                    effects,
                    CloseCode::Invalid,
                    Some(CloseReason::Error {
                        code: -1,
                        domain: message,
                    }),
                );
            }
        }
    }

    fn reopen(self: &Arc<Self>) {
        let mut effects = Effects::default();
        let mut state = self.state.lock().unwrap();
        state.retry_task = None;
        self.connect_locked(&mut state, &mut effects);
        drop(state);
        self.run_effects(effects);
    }

    fn open(self: &Arc<Self>) {
        let mut effects = Effects::default();
        let mut state = self.state.lock().unwrap();
        if state.status.is_opening() || state.status.is_opened() {
            return;
        }
        self.connect_locked(&mut state, &mut effects);
        drop(state);
        self.run_effects(effects);
    }

    fn close(self: &Arc<Self>, code: CloseCode) {
        let mut effects = Effects::default();
        let mut state = self.state.lock().unwrap();
        if state.status.is_closing() || state.status.is_closed() {
            return;
        }
        if let Some(task) = state.retry_task.take() {
            task.cancel();
        }
        let was_opened = state.status.is_opened();
        let was_opening = state.status.is_opening();
        if was_opened {
            state.manual_close_pending = true;
            let send_code = if code.is_transmittable() {
                code
            } else {
                CloseCode::Invalid
            };
            if let Some(handle) = &state.transport_handle {
                handle.cancel(send_code, None);
            }
            self.set_status_locked(&mut state, &mut effects, Status::Closing);
        } else if was_opening {
            if let Some(handle) = state.transport_handle.take() {
                handle.cancel(CloseCode::Invalid, None);
            }
            self.try_close_locked(&mut state, &mut effects, code, None);
        }
        drop(state);
        self.run_effects(effects);
    }

    fn send(&self, message: Message) -> Result<(), Error> {
        let state = self.state.lock().unwrap();
        match (&state.status, &state.transport_handle) {
            (Status::Opened { .. }, Some(handle)) => handle.send(message),
            _ => Err(Error::NotOpened),
        }
    }

    fn send_ping(&self) -> Result<(), Error> {
        let state = self.state.lock().unwrap();
        match (&state.status, &state.transport_handle) {
            (Status::Opened { .. }, Some(handle)) => handle.send_ping(),
            _ => Err(Error::NotOpened),
        }
    }

    fn using_pinging(self: &Arc<Self>, config: Option<PingingConfig>) {
        let mut state = self.state.lock().unwrap();
        let opened = state.status.is_opened();
        state.pinger = config.map(Pinger::new);
        if opened {
            let standard = matches!(
                state.pinger.as_ref().map(|p| &p.mode),
                Some(PingMode::Standard)
            );
            if standard {
                self.pinger_resume_locked(&mut state);
            }
        }
    }

    /// Manually resumes the liveness cycle. A no-op for `PingMode::Standard`,
    /// whose lifecycle is driven automatically by status transitions; this
    /// is the host's entry point for `PingMode::Provider`, per §4.3.
    fn resume_pinging(self: &Arc<Self>) {
        let mut state = self.state.lock().unwrap();
        if matches!(state.pinger.as_ref().map(|p| &p.mode), Some(PingMode::Provider(_))) {
            self.pinger_resume_locked(&mut state);
        }
    }

    /// Manually suspends the liveness cycle. See [`Shared::resume_pinging`].
    fn suspend_pinging(&self) {
        let mut state = self.state.lock().unwrap();
        if matches!(state.pinger.as_ref().map(|p| &p.mode), Some(PingMode::Provider(_))) {
            self.pinger_suspend_locked(&mut state);
        }
    }

    fn using_retrier(&self, policy: Option<RetryPolicy>) {
        self.state.lock().unwrap().retrier = policy;
    }

    fn using_monitor(&self, enabled: bool) {
        let mut state = self.state.lock().unwrap();
        state.monitor_enabled = enabled;
        if !enabled {
            state.monitor_satisfied = true;
        }
    }

    fn handle_did_open(self: &Arc<Self>, generation: u64, subprotocol: Option<String>) {
        let mut effects = Effects::default();
        let mut state = self.state.lock().unwrap();
        if state.generation != generation || !state.status.is_opening() {
            return;
        }
        state.retry_times = 0;
        if let Some(task) = state.retry_task.take() {
            task.cancel();
        }
        self.set_status_locked(&mut state, &mut effects, Status::Opened { subprotocol });
        drop(state);
        self.run_effects(effects);
    }

    fn handle_did_receive(self: &Arc<Self>, generation: u64, message: Message) {
        let mut effects = Effects::default();
        let mut state = self.state.lock().unwrap();
        if state.generation != generation {
            return;
        }
        if let Some(pinger) = &mut state.pinger {
            pinger.observe(&message);
        }
        effects.message(message);
        drop(state);
        self.run_effects(effects);
    }

    fn handle_did_close(self: &Arc<Self>, generation: u64, code: CloseCode, data: Option<Vec<u8>>) {
        let mut effects = Effects::default();
        let mut state = self.state.lock().unwrap();
        if state.generation != generation {
            return;
        }
        debug!(?code, generation, "transport closed");
        let manual = state.manual_close_pending;
        state.manual_close_pending = false;
        let reason = if manual {
            None
        } else {
            Some(CloseReason::Server(data.unwrap_or_default()))
        };
        state.transport_handle = None;
        self.try_close_locked(&mut state, &mut effects, code, reason);
        drop(state);
        self.run_effects(effects);
    }

    fn handle_did_fail(self: &Arc<Self>, generation: u64, message: String) {
        let mut effects = Effects::default();
        let mut state = self.state.lock().unwrap();
        if state.generation != generation {
            return;
        }
        error!(generation, %message, "transport failed");
        effects.error(Error::TransportFailure(message.clone()));
        state.transport_handle = None;
        self.try_close_locked(
            &mut state,
            &mut effects,
            CloseCode::Invalid,
            Some(CloseReason::Error {
                code: -1,
                domain: message,
            }),
        );
        drop(state);
        self.run_effects(effects);
    }

    fn handle_did_receive_challenge(&self, challenge: Challenge) -> ChallengeDisposition {
        self.listener.on_challenge(challenge)
    }

    fn on_monitor_event(self: &Arc<Self>, reachability: Reachability) {
        let mut effects = Effects::default();
        let mut state = self.state.lock().unwrap();
        if !state.monitor_enabled {
            return;
        }
        let satisfied = matches!(reachability, Reachability::Satisfied);
        if state.monitor_satisfied == satisfied {
            return;
        }
        debug!(satisfied, "reachability changed");
        state.monitor_satisfied = satisfied;
        if satisfied {
            if state.status.is_closed() && !state.last_close_reason_was_manual {
                self.connect_locked(&mut state, &mut effects);
            }
        } else {
            if let Some(task) = state.retry_task.take() {
                task.cancel();
            }
            let active =
                state.status.is_opened() || state.status.is_opening() || state.status.is_closing();
            if active {
                if let Some(handle) = state.transport_handle.take() {
                    handle.cancel(CloseCode::Invalid, None);
                }
                self.try_close_locked(
                    &mut state,
                    &mut effects,
                    CloseCode::Invalid,
                    Some(CloseReason::Monitor),
                );
            }
        }
        drop(state);
        self.run_effects(effects);
    }

    // -- pinger cycle, all entered and exited under `state`'s lock --

    fn pinger_start_cycle(self: &Arc<Self>, state: &mut SupervisorState) {
        if state.pinger.is_none() {
            return;
        }
        let ping_message = {
            let pinger = state.pinger.as_mut().unwrap();
            pinger.pong_received = false;
            pinger.build_ping()
        };
        if let Some(handle) = &state.transport_handle {
            let _ = match &ping_message {
                Message::Ping(_) => handle.send_ping(),
                other => handle.send(other.clone()),
            };
        }
        let timeout = state.pinger.as_ref().unwrap().timeout;
        let generation = state.ping_generation;
        let weak = Arc::downgrade(self);
        let task = self.clock.schedule(
            timeout,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.pinger_on_deadline(generation);
                }
            }),
        );
        state.pinger.as_mut().unwrap().task = Some(task);
    }

    fn pinger_resume_locked(self: &Arc<Self>, state: &mut SupervisorState) {
        let suspended = state.pinger.as_ref().map(|p| p.suspended).unwrap_or(false);
        if !suspended {
            return;
        }
        state.pinger.as_mut().unwrap().suspended = false;
        state.ping_generation = state.ping_generation.wrapping_add(1);
        self.pinger_start_cycle(state);
    }

    fn pinger_suspend_locked(&self, state: &mut SupervisorState) {
        let Some(pinger) = &mut state.pinger else {
            return;
        };
        if pinger.suspended {
            return;
        }
        pinger.suspended = true;
        if let Some(task) = pinger.task.take() {
            task.cancel();
        }
        state.ping_generation = state.ping_generation.wrapping_add(1);
    }

    fn pinger_on_deadline(self: &Arc<Self>, generation: u64) {
        let mut effects = Effects::default();
        let mut state = self.state.lock().unwrap();
        if state.ping_generation != generation {
            return;
        }
        match &state.pinger {
            Some(pinger) if !pinger.suspended => {}
            _ => return,
        }
        let pong_received = state.pinger.as_ref().unwrap().pong_received;
        if !pong_received {
            warn!("ping timed out");
            self.try_close_locked(
                &mut state,
                &mut effects,
                CloseCode::Invalid,
                Some(CloseReason::Pinging),
            );
        } else {
            let interval = state.pinger.as_ref().unwrap().interval;
            let weak = Arc::downgrade(self);
            let gen = state.ping_generation;
            let task = self.clock.schedule(
                interval,
                Box::new(move || {
                    if let Some(shared) = weak.upgrade() {
                        shared.pinger_interval_elapsed(gen);
                    }
                }),
            );
            state.pinger.as_mut().unwrap().task = Some(task);
        }
        drop(state);
        self.run_effects(effects);
    }

    fn pinger_interval_elapsed(self: &Arc<Self>, generation: u64) {
        let mut state = self.state.lock().unwrap();
        if state.ping_generation != generation {
            return;
        }
        match &state.pinger {
            Some(pinger) if !pinger.suspended => {}
            _ => return,
        }
        self.pinger_start_cycle(&mut state);
    }
}

/// A long-lived client owning a single logical connection to a remote
/// WebSocket endpoint, kept healthy across transient failures.
///
/// Cheap to clone; every clone shares the same underlying supervisor.
#[derive(Clone)]
pub struct Client {
    shared: Arc<Shared>,
}

impl Client {
    /// Begins (or resumes) connecting. A no-op if already opening or open.
    pub fn open(&self) {
        self.shared.open();
    }

    /// Requests a close. A no-op if already closing or closed. `code` is
    /// sent in the outgoing close frame when transmittable, otherwise the
    /// transport is asked to close abruptly.
    pub fn close(&self, code: CloseCode) {
        self.shared.close(code);
    }

    pub fn send(&self, message: Message) -> Result<(), Error> {
        self.shared.send(message)
    }

    pub fn send_ping(&self) -> Result<(), Error> {
        self.shared.send_ping()
    }

    /// Replaces the liveness configuration. `None` disables pinging.
    pub fn using_pinging(&self, config: Option<PingingConfig>) {
        self.shared.using_pinging(config);
    }

    /// Manually resumes the ping cycle. Only meaningful for
    /// `PingMode::Provider` — `PingMode::Standard` is driven automatically
    /// by status transitions and ignores this call.
    pub fn resume_pinging(&self) {
        self.shared.resume_pinging();
    }

    /// Manually suspends the ping cycle. See [`Client::resume_pinging`].
    pub fn suspend_pinging(&self) {
        self.shared.suspend_pinging();
    }

    /// Replaces the retry policy. `None` disables automatic reconnection.
    pub fn using_retrier(&self, policy: Option<RetryPolicy>) {
        self.shared.using_retrier(policy);
    }

    /// Gates retrying behind reachability. Disabling treats the path as
    /// always satisfied.
    pub fn using_monitor(&self, enabled: bool) {
        self.shared.using_monitor(enabled);
    }

    /// Informs the supervisor of a reachability transition observed by the
    /// host's monitor. Duplicate reports of the same state are ignored.
    pub fn notify_reachability(&self, reachability: Reachability) {
        self.shared.on_monitor_event(reachability);
    }

    pub fn status(&self) -> Status {
        self.shared.state.lock().unwrap().status.clone()
    }

    pub fn is_open(&self) -> bool {
        self.shared.state.lock().unwrap().status.is_opened()
    }
}

/// Builds a [`Client`], fixing its transport and config and optionally
/// overriding the clock, dispatch queue, listener, retry policy, and
/// liveness configuration.
pub struct ClientBuilder {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    clock: Arc<dyn Clock>,
    dispatch: Arc<dyn DispatchQueue>,
    listener: Arc<dyn Listener>,
    retrier: Option<RetryPolicy>,
    pinging: Option<PingingConfig>,
    monitor_enabled: bool,
}

impl ClientBuilder {
    pub fn new(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            clock: Arc::new(TokioClock),
            dispatch: Arc::new(ImmediateDispatch),
            listener: Arc::new(NoopListener),
            retrier: None,
            pinging: None,
            monitor_enabled: false,
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn dispatch(mut self, dispatch: Arc<dyn DispatchQueue>) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn listener(mut self, listener: Arc<dyn Listener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn retrier(mut self, retrier: RetryPolicy) -> Self {
        self.retrier = Some(retrier);
        self
    }

    pub fn pinging(mut self, pinging: PingingConfig) -> Self {
        self.pinging = Some(pinging);
        self
    }

    pub fn monitor_enabled(mut self, enabled: bool) -> Self {
        self.monitor_enabled = enabled;
        self
    }

    pub fn build(self) -> Client {
        let state = SupervisorState {
            status: Status::default(),
            transport_handle: None,
            generation: 0,
            retry_times: 0,
            retry_task: None,
            monitor_enabled: self.monitor_enabled,
            monitor_satisfied: true,
            last_close_reason_was_manual: true,
            manual_close_pending: false,
            retrier: self.retrier,
            pinger: self.pinging.map(Pinger::new),
            ping_generation: 0,
        };
        let shared = Arc::new(Shared {
            transport: self.transport,
            clock: self.clock,
            dispatch: self.dispatch,
            listener: self.listener,
            config: self.config,
            state: Mutex::new(state),
        });
        Client { shared }
    }
}
