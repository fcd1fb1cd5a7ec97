//! Command channel between host environments and the scheduler.
//!
//! Terminal listeners, signal handlers and tests never touch scheduler
//! state directly; they send [`Command`]s, which the scheduler applies at
//! the next tick boundary.

use tokio::sync::mpsc;

/// A request to the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Suspend ticking
    Pause,
    /// Resume ticking
    Resume,
    /// Stop the run
    Stop,
    /// Host interrupt (Ctrl-C): toggles pause/resume, a second one while
    /// the first is still pending stops the run
    Interrupt,
    /// Write a checkpoint now
    Checkpoint,
}

/// Cloneable sender side of the command channel
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl ControlHandle {
    /// Send a command; false once the scheduler is gone
    pub fn send(&self, command: Command) -> bool {
        self.tx.send(command).is_ok()
    }

    /// Request a pause
    pub fn pause(&self) -> bool {
        self.send(Command::Pause)
    }

    /// Request a resume
    pub fn resume(&self) -> bool {
        self.send(Command::Resume)
    }

    /// Request a stop
    pub fn stop(&self) -> bool {
        self.send(Command::Stop)
    }

    /// Forward a host interrupt
    pub fn interrupt(&self) -> bool {
        self.send(Command::Interrupt)
    }

    /// Request a checkpoint
    pub fn checkpoint(&self) -> bool {
        self.send(Command::Checkpoint)
    }
}

/// Create a command channel
pub fn channel() -> (ControlHandle, mpsc::UnboundedReceiver<Command>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ControlHandle { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commands_arrive_in_order() {
        let (handle, mut rx) = channel();
        let other = handle.clone();
        assert!(handle.pause());
        assert!(other.interrupt());
        assert!(handle.stop());
        assert_eq!(rx.recv().await, Some(Command::Pause));
        assert_eq!(rx.recv().await, Some(Command::Interrupt));
        assert_eq!(rx.recv().await, Some(Command::Stop));
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (handle, rx) = channel();
        drop(rx);
        assert!(!handle.resume());
    }
}
