//! Adapter state machine.
//!
//! ```text
//!  Initializing ──InitComplete──> Paused ──Restart──> Restarting
//!                                   ▲                     │
//!                                   │              RestartComplete
//!                                   │                     ▼
//!                                   │◀──Pause(idle)──── Running
//!                                   │                     │
//!                                   │               Pause(busy)
//!                                   │                     ▼
//!                                   └──PauseComplete─── Pausing
//! ```
//!
//! `Halted` and `Shutdown` complete the state space but are never held by a
//! live adapter; the instance is destroyed instead of entering them.

/// Lifecycle state of one adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterState {
    Halted,
    Initializing,
    Paused,
    Restarting,
    Running,
    Pausing,
    Shutdown,
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateEvent {
    /// First-stage setup finished.
    InitComplete,
    /// Host asked to pause; `busy` when work is still outstanding.
    Pause { busy: bool },
    /// Last outstanding work drained while pausing.
    PauseComplete,
    /// Host asked to restart.
    Restart,
    /// Link is up again.
    RestartComplete,
}

impl AdapterState {
    /// Next state, or `None` when `event` is not allowed here.
    pub const fn next(self, event: StateEvent) -> Option<Self> {
        use AdapterState::*;
        use StateEvent as E;

        match (self, event) {
            (Initializing, E::InitComplete) => Some(Paused),
            (Paused, E::Restart) => Some(Restarting),
            (Restarting, E::RestartComplete) => Some(Running),
            (Running, E::Pause { busy: false }) => Some(Paused),
            (Running, E::Pause { busy: true }) => Some(Pausing),
            (Pausing, E::PauseComplete) => Some(Paused),
            _ => None,
        }
    }

    /// True while send and receive traffic may flow.
    pub const fn accepts_traffic(self) -> bool {
        matches!(self, Self::Running)
    }

    /// States a live instance can actually be in.
    pub const fn is_live(self) -> bool {
        !matches!(self, Self::Halted | Self::Shutdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [AdapterState; 7] = [
        AdapterState::Halted,
        AdapterState::Initializing,
        AdapterState::Paused,
        AdapterState::Restarting,
        AdapterState::Running,
        AdapterState::Pausing,
        AdapterState::Shutdown,
    ];

    #[test]
    fn test_full_cycle() {
        let state = AdapterState::Initializing;
        let state = state.next(StateEvent::InitComplete).unwrap();
        assert_eq!(state, AdapterState::Paused);
        let state = state.next(StateEvent::Restart).unwrap();
        let state = state.next(StateEvent::RestartComplete).unwrap();
        assert_eq!(state, AdapterState::Running);
        let state = state.next(StateEvent::Pause { busy: true }).unwrap();
        assert_eq!(state, AdapterState::Pausing);
        assert_eq!(state.next(StateEvent::PauseComplete), Some(AdapterState::Paused));
    }

    #[test]
    fn test_pause_only_from_running() {
        for state in ALL {
            let allowed = state.next(StateEvent::Pause { busy: false }).is_some();
            assert_eq!(allowed, state == AdapterState::Running, "{:?}", state);
        }
    }

    #[test]
    fn test_restart_only_from_paused() {
        for state in ALL {
            let allowed = state.next(StateEvent::Restart).is_some();
            assert_eq!(allowed, state == AdapterState::Paused, "{:?}", state);
        }
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        let events = [
            StateEvent::InitComplete,
            StateEvent::Pause { busy: false },
            StateEvent::Pause { busy: true },
            StateEvent::PauseComplete,
            StateEvent::Restart,
            StateEvent::RestartComplete,
        ];
        for state in [AdapterState::Halted, AdapterState::Shutdown] {
            assert!(!state.is_live());
            for event in events {
                assert_eq!(state.next(event), None);
            }
        }
    }

    #[test]
    fn test_only_running_accepts_traffic() {
        for state in ALL {
            assert_eq!(state.accepts_traffic(), state == AdapterState::Running);
        }
    }
}
