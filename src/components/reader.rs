use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tracing::{info, warn};

use crate::common::{
    broadcast::{self, IdentifiedBroadcast},
    events::{self, Event, EventComponent, Trigger},
};

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("broadcast error: {0}")]
    Broadcast(#[from] broadcast::Error),
}

/// Reads one JSON trigger per line and publishes it on the bus.
/// Announces `InputClosed` and stops when the input ends.
pub struct TriggerReader<R> {
    input: R,
}

impl TriggerReader<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin + Send> TriggerReader<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }

    async fn run_internal(
        &mut self,
        broadcast: IdentifiedBroadcast<Event>,
    ) -> Result<(), Error> {
        info!("start trigger reader");

        let mut lines = (&mut self.input).lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Trigger>(line) {
                Ok(trigger) => broadcast.send(Event::Trigger(trigger))?,
                Err(e) => warn!(error = %e, "unrecognized trigger line"),
            }
        }

        info!("trigger input closed");
        broadcast.send(Event::InputClosed)?;
        Ok(())
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> EventComponent for TriggerReader<R> {
    async fn run(&mut self, broadcast: IdentifiedBroadcast<Event>) -> Result<(), events::Error> {
        self.run_internal(broadcast)
            .await
            .map_err(|e| events::Error::Component(format!("trigger reader: {}", e)))
    }
}
