use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError, Receiver, Sender};
use tracing::warn;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("no participant is listening")]
    NoListeners,
    #[error("bus closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Debug)]
struct Stamped<T> {
    origin: Uuid,
    payload: T,
}

/// One participant on the component bus. A participant never receives its
/// own sends, and a participant that falls behind resumes at the oldest
/// retained event.
pub struct IdentifiedBroadcast<T> {
    id: Uuid,
    sender: Sender<Stamped<T>>,
    receiver: Receiver<Stamped<T>>,
}

impl<T: Clone> IdentifiedBroadcast<T> {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = broadcast::channel(capacity);
        Self {
            id: Uuid::new_v4(),
            sender,
            receiver,
        }
    }

    /// New participant subscribed from this point on.
    pub fn participate(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: self.sender.clone(),
            receiver: self.sender.subscribe(),
        }
    }

    pub fn send(&self, payload: T) -> Result<()> {
        let stamped = Stamped {
            origin: self.id,
            payload,
        };
        self.sender
            .send(stamped)
            .map(|_| ())
            .map_err(|_| Error::NoListeners)
    }

    pub async fn recv(&mut self) -> Result<T> {
        loop {
            match self.receiver.recv().await {
                Ok(stamped) if stamped.origin == self.id => continue,
                Ok(stamped) => return Ok(stamped.payload),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(participant = %self.id, skipped, "bus participant lagged");
                }
                Err(RecvError::Closed) => return Err(Error::Closed),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn own_sends_are_skipped() {
        let root = IdentifiedBroadcast::<u32>::new(8);
        let mut first = root.participate();
        let mut second = root.participate();

        first.send(1).unwrap();
        second.send(2).unwrap();

        assert_eq!(first.recv().await.unwrap(), 2);
        assert_eq!(second.recv().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn lagging_participant_keeps_receiving() {
        let root = IdentifiedBroadcast::<u32>::new(2);
        let mut slow = root.participate();
        let sender = root.participate();

        for n in 0..5 {
            sender.send(n).unwrap();
        }

        assert_eq!(slow.recv().await.unwrap(), 3);
        assert_eq!(slow.recv().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn late_participant_misses_earlier_events() {
        let root = IdentifiedBroadcast::<u32>::new(8);
        let sender = root.participate();
        sender.send(1).unwrap();
        let mut late = root.participate();
        sender.send(2).unwrap();

        assert_eq!(late.recv().await.unwrap(), 2);
    }
}
