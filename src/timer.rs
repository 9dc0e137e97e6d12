//! Timer & AlarmId registry.
//!
//! A single background task owns a min-heap of pending alarms and sleeps
//! until the next deadline, so firings are delivered in fire-time order with
//! ties broken by schedule order. Cancellation just marks an id dead; a dead
//! id popped off the heap is silently dropped instead of delivered.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::event::Event;

/// Opaque alarm handle. `AlarmId::INVALID` denotes "no alarm".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlarmId(u64);

impl AlarmId {
    pub const INVALID: AlarmId = AlarmId(0);

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl Default for AlarmId {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Timer & AlarmId registry contract.
pub trait Timer: Send + Sync {
    /// Monotonic clock, strictly increasing across the process lifetime.
    fn now(&self) -> Instant;

    /// Schedule a one-shot alarm that fires after `duration`. A zero
    /// duration is legal and fires at the next event-loop turn.
    fn schedule_alarm_in(&self, duration: Duration) -> AlarmId;

    /// Idempotent cancellation; a previously-fired id is a no-op.
    fn cancel_alarm(&self, id: AlarmId);
}

#[derive(Debug)]
struct PendingAlarm {
    deadline: Instant,
    seq: u64,
    id: AlarmId,
}

impl PartialEq for PendingAlarm {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}
impl Eq for PendingAlarm {}

impl Ord for PendingAlarm {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the earliest deadline (and,
        // on ties, the earliest schedule order) sorts to the top.
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for PendingAlarm {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Tokio-backed [`Timer`] implementation used by the running daemon.
///
/// A dedicated background task owns the heap so that cancellation and
/// scheduling from the event-loop thread never race the firing logic: all
/// heap mutation happens on one task, driven by a control channel.
pub struct TokioTimer {
    next_id: AtomicU64,
    control_tx: mpsc::UnboundedSender<Control>,
    started_at: Instant,
}

enum Control {
    Schedule { deadline: Instant, id: AlarmId },
    Cancel { id: AlarmId },
}

impl TokioTimer {
    /// Spawn the scheduler task; fired alarms are pushed onto `event_tx` as
    /// [`Event::Alarm`].
    pub fn spawn(event_tx: mpsc::UnboundedSender<Event>) -> Arc<Self> {
        let (control_tx, mut control_rx) = mpsc::unbounded_channel::<Control>();
        let started_at = Instant::now();

        tokio::spawn(async move {
            let mut heap: BinaryHeap<PendingAlarm> = BinaryHeap::new();
            let mut cancelled: HashSet<AlarmId> = HashSet::new();
            let mut seq: u64 = 0;

            loop {
                let sleep_until = heap.peek().map(|a| a.deadline);

                tokio::select! {
                    biased;

                    msg = control_rx.recv() => {
                        match msg {
                            Some(Control::Schedule { deadline, id }) => {
                                heap.push(PendingAlarm { deadline, seq, id });
                                seq += 1;
                            }
                            Some(Control::Cancel { id }) => {
                                cancelled.insert(id);
                            }
                            None => return,
                        }
                    }

                    _ = async {
                        match sleep_until {
                            Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
                            None => std::future::pending().await,
                        }
                    }, if sleep_until.is_some() => {
                        while let Some(top) = heap.peek() {
                            if top.deadline > Instant::now() {
                                break;
                            }
                            let fired = heap.pop().unwrap();
                            if !cancelled.remove(&fired.id) && event_tx.send(Event::Alarm(fired.id)).is_err() {
                                return;
                            }
                        }
                    }
                }
            }
        });

        Arc::new(Self {
            next_id: AtomicU64::new(1),
            control_tx,
            started_at,
        })
    }
}

impl Timer for TokioTimer {
    fn now(&self) -> Instant {
        // Delegate to the real monotonic clock; `started_at` exists only to
        // document that alarms are scheduled relative to process start.
        let _ = self.started_at;
        Instant::now()
    }

    fn schedule_alarm_in(&self, duration: Duration) -> AlarmId {
        let id = AlarmId(self.next_id.fetch_add(1, AtomicOrdering::Relaxed));
        let deadline = Instant::now() + duration;
        let _ = self.control_tx.send(Control::Schedule { deadline, id });
        id
    }

    fn cancel_alarm(&self, id: AlarmId) {
        if !id.is_valid() {
            return;
        }
        let _ = self.control_tx.send(Control::Cancel { id });
    }
}

/// Deterministic, manually-advanced [`Timer`] for tests.
///
/// `advance` fires all alarms whose deadline has passed, in fire-time order
/// with ties broken by schedule order, delivering them synchronously instead
/// of via the async runtime — this is the fake described in the test-tooling
/// section of SPEC_FULL.md.
pub struct ManualTimer {
    inner: Mutex<ManualTimerState>,
}

struct ManualTimerState {
    now: Instant,
    next_id: u64,
    seq: u64,
    pending: Vec<(Instant, u64, AlarmId)>,
    cancelled: HashSet<AlarmId>,
    fired: Vec<AlarmId>,
}

impl ManualTimer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(ManualTimerState {
                now: Instant::now(),
                next_id: 1,
                seq: 0,
                pending: Vec::new(),
                cancelled: HashSet::new(),
                fired: Vec::new(),
            }),
        })
    }

    /// Advance the clock and return alarms that fired, in delivery order.
    pub fn advance(&self, duration: Duration) -> Vec<AlarmId> {
        let mut state = self.inner.lock().unwrap();
        state.now += duration;
        state.pending.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let now = state.now;
        let mut fired = Vec::new();
        let ManualTimerState { pending, cancelled, .. } = &mut *state;
        pending.retain(|(deadline, _, id)| {
            if *deadline <= now {
                if !cancelled.contains(id) {
                    fired.push(*id);
                }
                false
            } else {
                true
            }
        });
        state.fired.extend(fired.iter().copied());
        fired
    }
}

impl Timer for ManualTimer {
    fn now(&self) -> Instant {
        self.inner.lock().unwrap().now
    }

    fn schedule_alarm_in(&self, duration: Duration) -> AlarmId {
        let mut state = self.inner.lock().unwrap();
        let id = AlarmId(state.next_id);
        state.next_id += 1;
        let deadline = state.now + duration;
        let seq = state.seq;
        state.seq += 1;
        state.pending.push((deadline, seq, id));
        id
    }

    fn cancel_alarm(&self, id: AlarmId) {
        if !id.is_valid() {
            return;
        }
        let mut state = self.inner.lock().unwrap();
        state.cancelled.insert(id);
        state.pending.retain(|(_, _, pending_id)| *pending_id != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_alarm_id_is_not_valid() {
        assert!(!AlarmId::INVALID.is_valid());
        assert!(!AlarmId::default().is_valid());
    }

    #[test]
    fn manual_timer_fires_in_deadline_order() {
        let timer = ManualTimer::new();
        let far = timer.schedule_alarm_in(Duration::from_secs(10));
        let near = timer.schedule_alarm_in(Duration::from_secs(1));
        let fired = timer.advance(Duration::from_secs(10));
        assert_eq!(fired, vec![near, far]);
    }

    #[test]
    fn manual_timer_cancel_is_idempotent_and_suppresses_firing() {
        let timer = ManualTimer::new();
        let id = timer.schedule_alarm_in(Duration::from_secs(1));
        timer.cancel_alarm(id);
        timer.cancel_alarm(id);
        let fired = timer.advance(Duration::from_secs(5));
        assert!(fired.is_empty());
    }

    #[test]
    fn manual_timer_zero_duration_fires_on_next_advance() {
        let timer = ManualTimer::new();
        let id = timer.schedule_alarm_in(Duration::from_secs(0));
        let fired = timer.advance(Duration::from_millis(1));
        assert_eq!(fired, vec![id]);
    }
}
