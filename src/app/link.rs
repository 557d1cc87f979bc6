//! Connectivity state and the single broker session handle.
//!
//! Both live behind one mutex so every reader sees a consistent pair.
//! The controller task is the only writer; all access goes through the
//! methods below, which enforce the at-most-one-session rule.
//!
//! ```text
//!            AddressAcquired           SessionOpened
//!   Down ───────────────────▶ NetworkUp ──────────────▶ SessionUp
//!    ▲                          ▲   ▲                      │
//!    │        Disconnected      │   └──── SessionClosed ───┤
//!    └──────────────────────────┴──────── Disconnected ────┘
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::events::SessionId;

/// Where the node is in bringing its links up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Down,
    NetworkUp,
    SessionUp,
}

struct Slot<S> {
    id: SessionId,
    session: S,
    live: bool,
    subscribed: bool,
}

struct LinkInner<S> {
    state: ConnectivityState,
    slot: Option<Slot<S>>,
}

/// Returned by [`SessionLink::install`] when a handle already exists.
/// Carries the rejected session back so the caller decides how to drop it.
#[derive(Debug)]
pub struct SlotOccupied<S>(pub S);

pub struct SessionLink<S> {
    inner: Mutex<LinkInner<S>>,
}

impl<S> SessionLink<S> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LinkInner {
                state: ConnectivityState::Down,
                slot: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LinkInner<S>> {
        // A panic while holding the lock leaves plain data behind; keep going.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ConnectivityState {
        self.lock().state
    }

    /// `true` if a handle exists, live or not.
    pub fn has_session(&self) -> bool {
        self.lock().slot.is_some()
    }

    /// `true` if a handle exists and the broker confirmed it open.
    pub fn is_live(&self) -> bool {
        self.lock().slot.as_ref().is_some_and(|s| s.live)
    }

    /// Id of the current handle, if any.
    pub fn session_id(&self) -> Option<SessionId> {
        self.lock().slot.as_ref().map(|s| s.id)
    }

    /// Network has an address.  Returns `true` if no session handle
    /// exists yet, i.e. the caller should open one.
    pub fn network_up(&self) -> bool {
        let mut inner = self.lock();
        if inner.state == ConnectivityState::Down {
            inner.state = ConnectivityState::NetworkUp;
        }
        inner.slot.is_none()
    }

    /// Network lost.  Demotes to `Down` and hands back the session handle
    /// (if any) so the caller can tear it down outside the lock.
    pub fn network_down(&self) -> Option<(SessionId, S)> {
        let mut inner = self.lock();
        inner.state = ConnectivityState::Down;
        inner.slot.take().map(|s| (s.id, s.session))
    }

    /// Store a freshly opened, not yet live, session handle.
    pub fn install(&self, id: SessionId, session: S) -> Result<(), SlotOccupied<S>> {
        let mut inner = self.lock();
        if inner.slot.is_some() {
            return Err(SlotOccupied(session));
        }
        inner.slot = Some(Slot {
            id,
            session,
            live: false,
            subscribed: false,
        });
        Ok(())
    }

    /// The broker confirmed session `id` open.  Returns `true` only on the
    /// transition to live; replays and stale ids return `false`.
    pub fn session_opened(&self, id: SessionId) -> bool {
        let mut inner = self.lock();
        let Some(slot) = inner.slot.as_mut() else {
            return false;
        };
        if slot.id != id || slot.live {
            return false;
        }
        slot.live = true;
        slot.subscribed = false;
        inner.state = ConnectivityState::SessionUp;
        true
    }

    /// Session `id` closed.  The handle stays installed (the client owns
    /// its reconnect) but is no longer publishable.  Returns `true` if
    /// the live session was demoted.
    pub fn session_closed(&self, id: SessionId) -> bool {
        let mut inner = self.lock();
        let Some(slot) = inner.slot.as_mut() else {
            return false;
        };
        if slot.id != id || !slot.live {
            return false;
        }
        slot.live = false;
        slot.subscribed = false;
        if inner.state == ConnectivityState::SessionUp {
            inner.state = ConnectivityState::NetworkUp;
        }
        true
    }

    /// Run `f` against the live session, marking it subscribed.  Returns
    /// `None` if there is no live session or it was already subscribed.
    pub fn subscribe_once<R>(&self, f: impl FnOnce(&mut S) -> R) -> Option<R> {
        let mut inner = self.lock();
        let slot = inner.slot.as_mut().filter(|s| s.live && !s.subscribed)?;
        slot.subscribed = true;
        Some(f(&mut slot.session))
    }

    /// Run `f` against the live session.  `None` if there is none.
    pub fn with_live_session<R>(&self, f: impl FnOnce(&mut S) -> R) -> Option<R> {
        let mut inner = self.lock();
        let slot = inner.slot.as_mut().filter(|s| s.live)?;
        Some(f(&mut slot.session))
    }
}

impl<S> Default for SessionLink<S> {
    fn default() -> Self {
        Self::new()
    }
}
