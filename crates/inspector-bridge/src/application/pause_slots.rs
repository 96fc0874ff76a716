//! The two pieces of pause state shared between commands and backend events.
//!
//! * **next pause** – a one-shot slot.  `setScriptSource` arms it before
//!   stepping in after a live edit; the break handler fires it on the next
//!   backend `break` instead of sending `Debugger.paused`.
//! * **continue-to** – the id of the temporary breakpoint set by
//!   `continueToLocation`; the break handler clears it on the next `break`.
//!
//! Both are guarded by `std::sync::Mutex`: every critical section is a swap
//! and no lock is held across an `.await`.
//!
//! # What is a one-shot channel? (for beginners)
//!
//! `tokio::sync::oneshot` is a channel that carries at most one value.  The
//! sending half is consumed by `send`, and the receiving half is a future
//! that resolves once:
//!
//! - `Ok(())` when the sender sends;
//! - `Err(RecvError)` when the sender is dropped without sending.
//!
//! The slot stores the sender.  Firing the slot sends; disarming it drops the
//! sender.  A live edit waiting on the receiver is released either way, which
//! is what lets a debuggee hang-up end the wait instead of leaving the
//! command unanswered.

use std::sync::Mutex;

use tokio::sync::oneshot;
use tracing::debug;

/// Result of [`PauseSlots::arm_next_pause`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmOutcome {
    /// The slot was empty.
    Armed,
    /// The slot was already armed; the earlier waiter has been released.
    Rearmed,
}

/// Resolves when the next pause fires, when a later arm replaces this one,
/// or with `Err` when the slot is disarmed.
pub type PauseWaiter = oneshot::Receiver<()>;

#[derive(Debug, Default)]
enum NextPause {
    #[default]
    Unarmed,
    Armed(oneshot::Sender<()>),
}

#[derive(Debug, Default)]
pub struct PauseSlots {
    next_pause: Mutex<NextPause>,
    continue_to: Mutex<Option<u64>>,
}

impl PauseSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the next-pause slot and returns the receiver to await.
    pub fn arm_next_pause(&self) -> (PauseWaiter, ArmOutcome) {
        let (tx, rx) = oneshot::channel();
        let previous = std::mem::replace(&mut *lock(&self.next_pause), NextPause::Armed(tx));
        let outcome = match previous {
            NextPause::Unarmed => ArmOutcome::Armed,
            NextPause::Armed(earlier) => {
                // The earlier waiter may already be gone; nothing to release then.
                let _ = earlier.send(());
                debug!("next-pause slot re-armed; earlier waiter released");
                ArmOutcome::Rearmed
            }
        };
        (rx, outcome)
    }

    /// Fires the slot if armed.  Returns `true` when a waiter was armed, in
    /// which case the caller must not emit its own pause notification.
    pub fn fire_next_pause(&self) -> bool {
        match std::mem::take(&mut *lock(&self.next_pause)) {
            NextPause::Unarmed => false,
            NextPause::Armed(tx) => {
                let _ = tx.send(());
                true
            }
        }
    }

    /// Empties the slot without firing it; the waiter sees `Err`.
    pub fn disarm_next_pause(&self) {
        *lock(&self.next_pause) = NextPause::Unarmed;
    }

    pub fn is_armed(&self) -> bool {
        matches!(*lock(&self.next_pause), NextPause::Armed(_))
    }

    /// Records the continue-to breakpoint id, returning any id it replaced.
    pub fn set_continue_to(&self, breakpoint: u64) -> Option<u64> {
        lock(&self.continue_to).replace(breakpoint)
    }

    pub fn take_continue_to(&self) -> Option<u64> {
        lock(&self.continue_to).take()
    }
}

/// Locks `m`, recovering the data if a previous holder panicked.  The
/// guarded values are plain swaps, so they are never left half-updated.
fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
