//! Single-slot reply handoff between a batch worker and one caller.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;

use ob_core::TensorMap;

/// Per-call failures delivered through a reply slot.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallError {
    #[error("call cancelled by scheduler shutdown")]
    Cancelled,
    #[error("model invocation failed: {0}")]
    ModelInvocationFailed(String),
    #[error("reply slot fulfilled twice")]
    DoubleFulfillment,
    #[error("reply producer dropped without fulfilling")]
    Abandoned,
    #[error("timed out waiting for reply")]
    Timeout,
}

#[derive(Debug)]
enum SlotState {
    Pending,
    Done(Result<TensorMap, CallError>),
}

#[derive(Debug)]
struct Slot {
    state: Mutex<SlotState>,
    cv: Condvar,
}

/// Consumer half: exactly one caller blocks on `recv`.
#[derive(Debug)]
pub struct FutureReply {
    slot: Arc<Slot>,
}

/// Producer half: fulfilled exactly once by the owning worker.
#[derive(Debug)]
pub struct Fulfiller {
    slot: Arc<Slot>,
    done: bool,
}

pub fn reply_slot() -> (FutureReply, Fulfiller) {
    let slot = Arc::new(Slot {
        state: Mutex::new(SlotState::Pending),
        cv: Condvar::new(),
    });
    (
        FutureReply {
            slot: Arc::clone(&slot),
        },
        Fulfiller { slot, done: false },
    )
}

impl FutureReply {
    /// Block until the worker fulfills or cancels this call.
    pub fn recv(self) -> Result<TensorMap, CallError> {
        let mut st = self.slot.state.lock().unwrap();
        while matches!(*st, SlotState::Pending) {
            st = self.slot.cv.wait(st).unwrap();
        }
        match std::mem::replace(&mut *st, SlotState::Done(Err(CallError::DoubleFulfillment))) {
            SlotState::Done(r) => r,
            SlotState::Pending => unreachable!(),
        }
    }

    /// Like `recv`, with a deadline. The reply is lost on timeout.
    pub fn recv_timeout(self, timeout: Duration) -> Result<TensorMap, CallError> {
        let deadline = Instant::now() + timeout;
        let mut st = self.slot.state.lock().unwrap();
        while matches!(*st, SlotState::Pending) {
            let now = Instant::now();
            if now >= deadline {
                return Err(CallError::Timeout);
            }
            let (guard, res) = self.slot.cv.wait_timeout(st, deadline - now).unwrap();
            st = guard;
            if res.timed_out() && matches!(*st, SlotState::Pending) {
                return Err(CallError::Timeout);
            }
        }
        match std::mem::replace(&mut *st, SlotState::Done(Err(CallError::DoubleFulfillment))) {
            SlotState::Done(r) => r,
            SlotState::Pending => unreachable!(),
        }
    }
}

impl Fulfiller {
    /// Set the reply exactly once and wake the waiter.
    ///
    /// A slot that is already resolved reports `DoubleFulfillment`; that is a
    /// scheduler bug, never expected in correct operation.
    pub fn fulfill(mut self, result: Result<TensorMap, CallError>) -> Result<(), CallError> {
        self.done = true;
        self.set(result)
    }

    fn set(&self, result: Result<TensorMap, CallError>) -> Result<(), CallError> {
        let mut st = self.slot.state.lock().unwrap();
        match *st {
            SlotState::Pending => {
                *st = SlotState::Done(result);
                self.slot.cv.notify_one();
                Ok(())
            }
            SlotState::Done(_) => Err(CallError::DoubleFulfillment),
        }
    }
}

impl Drop for Fulfiller {
    fn drop(&mut self) {
        if !self.done {
            let _ = self.set(Err(CallError::Abandoned));
        }
    }
}
