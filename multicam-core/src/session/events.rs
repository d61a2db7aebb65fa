use crossbeam_channel::{Receiver, Sender};
use uuid::Uuid;

use crate::traits::stream_handle::StreamEvent;

/// What a landed seek was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SeekPurpose {
    /// Part of a fan-out seek batch.
    Batch(u64),
    /// Re-positioning the new active stream during an angle switch.
    Switch(u64),
    /// Re-aligning every angle when entering multi-angle mode.
    Align,
}

/// Asynchronous completions, delivered to the owner thread through the
/// session's queue. Each carries enough identity to be discarded once
/// superseded.
#[derive(Debug, Clone)]
pub(crate) enum SessionEvent {
    Stream {
        generation: Uuid,
        index: usize,
        event: StreamEvent,
    },
    SeekLanded {
        generation: Uuid,
        index: usize,
        purpose: SeekPurpose,
        finished: bool,
    },
    SampleTick {
        generation: Uuid,
        sampler: u64,
    },
    DurationHint {
        generation: Uuid,
        duration_secs: f64,
    },
    FreezeExpired {
        freeze: u64,
    },
    SettleElapsed {
        generation: Uuid,
        transition: u64,
    },
}

/// Cloneable posting end of the session queue.
#[derive(Debug, Clone)]
pub(crate) struct EventSender {
    tx: Sender<SessionEvent>,
}

impl EventSender {
    /// Enqueue an event. Events posted after the session is gone are dropped.
    pub(crate) fn post(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}

/// Unbounded multi-producer queue drained by the owner thread.
#[derive(Debug)]
pub(crate) struct EventQueue {
    tx: Sender<SessionEvent>,
    rx: Receiver<SessionEvent>,
}

impl EventQueue {
    pub(crate) fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    pub(crate) fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    pub(crate) fn try_next(&self) -> Option<SessionEvent> {
        self.rx.try_recv().ok()
    }

    pub(crate) fn len(&self) -> usize {
        self.rx.len()
    }
}
