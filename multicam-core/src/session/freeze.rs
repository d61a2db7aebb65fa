use std::time::Duration;

use crate::models::state::FreezeState;
use crate::session::events::{EventSender, SessionEvent};
use crate::traits::scheduler::{Scheduler, TimerHandle};

struct ActiveFreeze {
    id: u64,
    state: FreezeState,
    timer: TimerHandle,
}

/// One-shot timed suspension of playback.
///
/// Only tracks the freeze; pausing and resuming streams is left to the
/// session so resumption goes through its normal play path.
pub struct FreezeScheduler {
    active: Option<ActiveFreeze>,
    next_id: u64,
}

impl FreezeScheduler {
    pub fn new() -> Self {
        Self {
            active: None,
            next_id: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn state(&self) -> Option<FreezeState> {
        self.active.as_ref().map(|freeze| freeze.state)
    }

    /// Start a freeze of `duration`. Returns `false` if one is already
    /// active or the duration is zero.
    pub(crate) fn begin(
        &mut self,
        duration: Duration,
        was_playing: bool,
        scheduler: &dyn Scheduler,
        events: &EventSender,
    ) -> bool {
        if self.active.is_some() || duration.is_zero() {
            return false;
        }

        self.next_id += 1;
        let id = self.next_id;
        let expiry = events.clone();
        let timer = scheduler.schedule_once(
            duration,
            Box::new(move || expiry.post(SessionEvent::FreezeExpired { freeze: id })),
        );

        self.active = Some(ActiveFreeze {
            id,
            state: FreezeState {
                scheduled_resume_at: scheduler.now() + duration,
                was_playing_before_freeze: was_playing,
            },
            timer,
        });
        true
    }

    /// Handle the expiry of freeze `id`. Returns its state if it was still
    /// the active freeze.
    pub(crate) fn expire(&mut self, id: u64) -> Option<FreezeState> {
        match &self.active {
            Some(freeze) if freeze.id == id => self.active.take().map(|freeze| freeze.state),
            _ => None,
        }
    }

    /// Invalidate the pending timer and clear the freeze without resuming.
    /// Returns whether a freeze was active.
    pub fn cancel(&mut self) -> bool {
        match self.active.take() {
            Some(freeze) => {
                freeze.timer.cancel();
                true
            }
            None => false,
        }
    }
}

impl Default for FreezeScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::manual_scheduler::ManualScheduler;
    use crate::session::events::EventQueue;

    #[test]
    fn begin_schedules_expiry() {
        let scheduler = ManualScheduler::new();
        let queue = EventQueue::new();
        let mut freeze = FreezeScheduler::new();

        assert!(freeze.begin(Duration::from_secs(2), true, &scheduler, &queue.sender()));
        let state = freeze.state().unwrap();
        assert_eq!(state.scheduled_resume_at, Duration::from_secs(2));
        assert!(state.was_playing_before_freeze);

        scheduler.advance(Duration::from_secs(2));
        let Some(SessionEvent::FreezeExpired { freeze: id }) = queue.try_next() else {
            panic!("expected expiry event");
        };
        assert_eq!(freeze.expire(id), Some(state));
        assert!(!freeze.is_active());
    }

    #[test]
    fn second_freeze_is_rejected() {
        let scheduler = ManualScheduler::new();
        let queue = EventQueue::new();
        let mut freeze = FreezeScheduler::new();

        assert!(freeze.begin(Duration::from_secs(1), false, &scheduler, &queue.sender()));
        assert!(!freeze.begin(Duration::from_secs(5), true, &scheduler, &queue.sender()));
        assert_eq!(scheduler.pending_timers(), 1);
    }

    #[test]
    fn zero_duration_is_rejected() {
        let scheduler = ManualScheduler::new();
        let queue = EventQueue::new();
        let mut freeze = FreezeScheduler::new();

        assert!(!freeze.begin(Duration::ZERO, true, &scheduler, &queue.sender()));
        assert!(!freeze.is_active());
    }

    #[test]
    fn cancel_invalidates_timer() {
        let scheduler = ManualScheduler::new();
        let queue = EventQueue::new();
        let mut freeze = FreezeScheduler::new();

        freeze.begin(Duration::from_secs(2), true, &scheduler, &queue.sender());
        scheduler.advance(Duration::from_secs(1));
        assert!(freeze.cancel());

        scheduler.advance(Duration::from_secs(5));
        assert!(queue.try_next().is_none());
        assert!(!freeze.cancel());
    }

    #[test]
    fn stale_expiry_is_ignored() {
        let scheduler = ManualScheduler::new();
        let queue = EventQueue::new();
        let mut freeze = FreezeScheduler::new();

        freeze.begin(Duration::from_secs(1), true, &scheduler, &queue.sender());
        freeze.cancel();
        freeze.begin(Duration::from_secs(3), false, &scheduler, &queue.sender());

        assert_eq!(freeze.expire(1), None);
        assert!(freeze.is_active());
    }
}
