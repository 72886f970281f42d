use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle phases every component passes through, in order
///
/// A component is `Created` as soon as it has been constructed.
/// [crate::InjectorBuilder::build] drives every component up to `Started`,
/// `Stopped` is only reached through [crate::Injector::stop].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum State {
    Created = 0,
    Initialized = 1,
    Resolved = 2,
    Started = 3,
    Stopped = 4,
}

impl State {
    /// All states in ascending order
    pub const ALL: [State; 5] = [
        State::Created,
        State::Initialized,
        State::Resolved,
        State::Started,
        State::Stopped,
    ];

    /// States driven by the build - in order
    pub const BUILD: [State; 3] = [State::Initialized, State::Resolved, State::Started];

    pub fn is_before(self, other: State) -> bool {
        self < other
    }

    pub fn is_after(self, other: State) -> bool {
        self > other
    }

    pub fn is_equal_or_after(self, other: State) -> bool {
        self >= other
    }

    pub fn next(self) -> Option<State> {
        Self::from_repr(self as u8 + 1)
    }

    pub fn previous(self) -> Option<State> {
        (self as u8).checked_sub(1).and_then(Self::from_repr)
    }

    fn from_repr(repr: u8) -> Option<State> {
        Self::ALL.get(repr as usize).copied()
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            State::Created => "CREATED",
            State::Initialized => "INITIALIZED",
            State::Resolved => "RESOLVED",
            State::Started => "STARTED",
            State::Stopped => "STOPPED",
        };
        f.write_str(name)
    }
}

/// State of a single node, which only ever moves forward
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new(state: State) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(crate) fn get(&self) -> State {
        State::from_repr(self.0.load(Ordering::Acquire)).unwrap_or(State::Stopped)
    }

    /// Moves the state forward to `state`, returns the previous one
    pub(crate) fn advance(&self, state: State) -> State {
        let previous = self.0.fetch_max(state as u8, Ordering::AcqRel);
        debug_assert!(
            previous <= state as u8,
            "state of a node must never decrease"
        );
        State::from_repr(previous).unwrap_or(State::Stopped)
    }
}
