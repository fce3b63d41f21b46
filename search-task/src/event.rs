//! Notifications delivered from a task to its consumer.
//!
//! Events travel through an unbounded channel, so a worker thread that
//! triggers one never runs consumer code; the consumer picks events up on its
//! own context.

use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver, UnboundedSender};

/// Something the consumer should react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    /// The unread buffer went from empty to non-empty; call `read_buffer`.
    Matched,
    /// Every worker is done. Sent at most once per task.
    Finished,
}

/// Receiving side of a task's event stream.
///
/// The stream ends (`recv` yields `None`) once the task is destroyed.
#[derive(Debug)]
pub struct TaskEvents {
    rx: UnboundedReceiver<TaskEvent>,
}

impl TaskEvents {
    pub(crate) fn channel() -> (UnboundedSender<TaskEvent>, Self) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// Wait for the next event.
    pub async fn recv(&mut self) -> Option<TaskEvent> {
        self.rx.recv().await
    }

    /// Take the next event if one is queued.
    pub fn try_recv(&mut self) -> Result<TaskEvent, TryRecvError> {
        self.rx.try_recv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_arrive_in_send_order() {
        let (tx, mut events) = TaskEvents::channel();
        tx.send(TaskEvent::Matched).expect("send");
        tx.send(TaskEvent::Finished).expect("send");
        assert_eq!(events.try_recv(), Ok(TaskEvent::Matched));
        assert_eq!(events.try_recv(), Ok(TaskEvent::Finished));
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn stream_ends_when_sender_dropped() {
        let (tx, mut events) = TaskEvents::channel();
        drop(tx);
        assert_eq!(events.recv().await, None);
    }
}
