//! Sequencing for coordinators that allow only the newest request to land.

use parking_lot::Mutex;
use std::future::Future;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::WeatherError;

/// Lifecycle of a coordinator's current request.
///
/// `Success` and `Failure` are resting states like `Idle`: a new request may
/// start from any of them. A request replaced while `Pending` never reports
/// back; its result is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestPhase {
    #[default]
    Idle,
    Pending,
    Success,
    Failure,
}

/// Handle for one issued request.
#[derive(Debug, Clone)]
pub(crate) struct Ticket {
    epoch: u64,
    token: CancellationToken,
}

#[derive(Debug, Default)]
struct GuardState {
    epoch: u64,
    in_flight: Option<CancellationToken>,
}

/// Epoch counter plus cancellation handle owned by one coordinator.
#[derive(Debug)]
pub(crate) struct RequestGuard {
    state: Mutex<GuardState>,
    phase: watch::Sender<RequestPhase>,
}

impl RequestGuard {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(GuardState::default()),
            phase: watch::Sender::new(RequestPhase::Idle),
        }
    }

    /// Start a request, cancelling whichever one is still in flight.
    pub(crate) fn begin(&self) -> Ticket {
        let mut state = self.state.lock();
        if let Some(previous) = state.in_flight.take() {
            previous.cancel();
        }
        state.epoch += 1;
        let token = CancellationToken::new();
        state.in_flight = Some(token.clone());
        self.phase.send_replace(RequestPhase::Pending);
        Ticket { epoch: state.epoch, token }
    }

    /// Drive `fut` unless the ticket is cancelled first.
    pub(crate) async fn run<T, F>(&self, ticket: &Ticket, fut: F) -> Result<T, WeatherError>
    where
        F: Future<Output = Result<T, WeatherError>>,
    {
        tokio::select! {
            biased;
            _ = ticket.token.cancelled() => Err(WeatherError::Cancelled),
            res = fut => res,
        }
    }

    /// Settle a request. `apply` only runs, under the guard's lock, when the
    /// ticket is still the newest one; returns whether it ran.
    pub(crate) fn finish<F: FnOnce()>(&self, ticket: &Ticket, succeeded: bool, apply: F) -> bool {
        let mut state = self.state.lock();
        if state.epoch != ticket.epoch || ticket.token.is_cancelled() {
            return false;
        }
        apply();
        state.in_flight = None;
        let phase = if succeeded { RequestPhase::Success } else { RequestPhase::Failure };
        self.phase.send_replace(phase);
        true
    }

    /// Supersede whatever is in flight without starting anything new.
    pub(crate) fn cancel(&self) {
        let mut state = self.state.lock();
        state.epoch += 1;
        if let Some(token) = state.in_flight.take() {
            token.cancel();
        }
        self.phase.send_replace(RequestPhase::Idle);
    }

    pub(crate) fn phase(&self) -> RequestPhase {
        *self.phase.borrow()
    }

    pub(crate) fn subscribe_phase(&self) -> watch::Receiver<RequestPhase> {
        self.phase.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_ticket_supersedes_older() {
        let guard = RequestGuard::new();
        let first = guard.begin();
        let second = guard.begin();

        assert!(first.token.is_cancelled());
        assert!(!guard.finish(&first, true, || panic!("stale result applied")));

        let mut applied = false;
        assert!(guard.finish(&second, true, || applied = true));
        assert!(applied);
        assert_eq!(guard.phase(), RequestPhase::Success);
    }

    #[test]
    fn cancel_discards_in_flight_and_returns_to_idle() {
        let guard = RequestGuard::new();
        let ticket = guard.begin();
        assert_eq!(guard.phase(), RequestPhase::Pending);

        guard.cancel();
        assert_eq!(guard.phase(), RequestPhase::Idle);
        assert!(!guard.finish(&ticket, false, || panic!("cancelled result applied")));
    }

    #[test]
    fn failure_is_recorded_for_current_ticket() {
        let guard = RequestGuard::new();
        let ticket = guard.begin();
        assert!(guard.finish(&ticket, false, || {}));
        assert_eq!(guard.phase(), RequestPhase::Failure);
    }

    #[tokio::test]
    async fn run_stops_when_ticket_is_cancelled() {
        let guard = RequestGuard::new();
        let ticket = guard.begin();
        guard.cancel();

        let res: Result<(), WeatherError> = guard.run(&ticket, std::future::pending()).await;
        assert!(matches!(res, Err(WeatherError::Cancelled)));
    }
}
