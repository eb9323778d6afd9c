//! Shared coordination state.
//!
//! Four flags drive the whole protocol: the robot mode, the movement
//! permit, the path gate, and the link-health flag. They are only ever
//! touched through the named operations below; no worker sees the raw
//! atomics. Both synchronization primitives (permit and gate) tolerate
//! release-when-not-held, since mode changes race with pending
//! acknowledgements by design.

use std::sync::atomic::{AtomicBool, Ordering};

use roverhub_types::RobotMode;
use tokio::sync::Notify;

/// Mode flag, movement permit, path gate, and link health in one place.
///
/// All waits follow the register-then-check pattern against a
/// [`Notify`], so a signal arriving between the check and the await is
/// never lost.
pub struct SharedState {
    manual_mode: AtomicBool,
    permit_free: AtomicBool,
    gate_open: AtomicBool,
    link_down: AtomicBool,
    permit_notify: Notify,
    gate_notify: Notify,
    link_notify: Notify,
}

impl SharedState {
    /// Initial state: [`RobotMode::Path`], permit free, gate closed (a
    /// `control:start` must open it), link healthy.
    pub fn new() -> Self {
        Self {
            manual_mode: AtomicBool::new(false),
            permit_free: AtomicBool::new(true),
            gate_open: AtomicBool::new(false),
            link_down: AtomicBool::new(false),
            permit_notify: Notify::new(),
            gate_notify: Notify::new(),
            link_notify: Notify::new(),
        }
    }

    // ── Robot mode ───────────────────────────────────────────────────────

    pub fn mode(&self) -> RobotMode {
        if self.manual_mode.load(Ordering::Acquire) {
            RobotMode::Manual
        } else {
            RobotMode::Path
        }
    }

    /// Switch to `target`. Returns `false` (and changes nothing) when the
    /// robot is already in that mode.
    pub fn try_set_mode(&self, target: RobotMode) -> bool {
        let want_manual = target == RobotMode::Manual;
        self.manual_mode.swap(want_manual, Ordering::AcqRel) != want_manual
    }

    // ── Movement permit ──────────────────────────────────────────────────

    /// Take the movement permit, waiting while a motion command is
    /// already in flight.
    pub async fn acquire_permit(&self) {
        loop {
            let notified = self.permit_notify.notified();
            if self
                .permit_free
                .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return;
            }
            notified.await;
        }
    }

    /// Release the permit. Returns whether it was actually held; callers
    /// downgrade a release-of-free-permit to a log line.
    pub fn release_permit(&self) -> bool {
        let was_held = !self.permit_free.swap(true, Ordering::AcqRel);
        self.permit_notify.notify_waiters();
        was_held
    }

    pub fn permit_held(&self) -> bool {
        !self.permit_free.load(Ordering::Acquire)
    }

    // ── Path gate ────────────────────────────────────────────────────────

    pub fn open_gate(&self) {
        self.gate_open.store(true, Ordering::Release);
        self.gate_notify.notify_waiters();
    }

    pub fn close_gate(&self) {
        self.gate_open.store(false, Ordering::Release);
    }

    pub fn gate_is_open(&self) -> bool {
        self.gate_open.load(Ordering::Acquire)
    }

    /// Wait until the gate is open. Returns immediately when it already is.
    pub async fn wait_gate(&self) {
        loop {
            let notified = self.gate_notify.notified();
            if self.gate_open.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }

    // ── Link health ──────────────────────────────────────────────────────

    /// Flag the radio link as down and wake the supervisor.
    pub fn report_link_failure(&self) {
        self.link_down.store(true, Ordering::Release);
        self.link_notify.notify_waiters();
    }

    pub fn clear_link_failure(&self) {
        self.link_down.store(false, Ordering::Release);
    }

    pub fn link_is_down(&self) -> bool {
        self.link_down.load(Ordering::Acquire)
    }

    /// Wait until a link failure is reported.
    pub async fn wait_link_failure(&self) {
        loop {
            let notified = self.link_notify.notified();
            if self.link_down.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
