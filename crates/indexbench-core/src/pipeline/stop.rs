//! One-shot broadcast stop signal.
//!
//! Firing the trigger drops the only sender of a channel that never carries a
//! message, so every clone of the signal observes the disconnect at once.
//! Clients check the signal between operations; nothing in flight is
//! interrupted.

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::time::Duration;

/// Owner side of a stop signal
#[derive(Debug)]
pub struct StopTrigger {
    _sender: Sender<()>,
}

/// Observer side of a stop signal
#[derive(Debug, Clone)]
pub struct StopSignal {
    receiver: Receiver<()>,
}

/// Create a connected trigger and signal
pub fn stop_signal() -> (StopTrigger, StopSignal) {
    let (sender, receiver) = crossbeam_channel::bounded(0);
    (StopTrigger { _sender: sender }, StopSignal { receiver })
}

impl StopTrigger {
    /// Broadcast the stop to every signal clone
    pub fn fire(self) {}
}

impl StopSignal {
    pub fn is_stopped(&self) -> bool {
        matches!(self.receiver.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Block until stopped or until `timeout` elapses; true if stopped
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.receiver.recv_timeout(timeout).is_err() && self.is_stopped()
    }

    /// Channel that becomes ready when the signal fires, for use in `select!`
    pub fn receiver(&self) -> &Receiver<()> {
        &self.receiver
    }
}
