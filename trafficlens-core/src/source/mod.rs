//! Producers of network-state snapshots.
//!
//! The relay only depends on [`SnapshotSource`]; the traffic simulator, the
//! HTTP bridge and the in-process mock are interchangeable behind it.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use crate::{Error, Snapshot};

pub mod mock;

pub use mock::{MockNetwork, MockSource};

pub trait SnapshotSource: Send + Sync {
    /// Produces the next full snapshot.
    fn fetch(&self) -> impl Future<Output = Result<Snapshot, Error>> + Send;
}

/// Replays a fixed sequence of results, one per fetch.
///
/// Once exhausted every fetch fails, which reads as an unreachable upstream.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<Snapshot, String>>>,
}

impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = Result<Snapshot, String>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl SnapshotSource for ScriptedSource {
    async fn fetch(&self) -> Result<Snapshot, Error> {
        let step = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match step {
            Some(Ok(snapshot)) => Ok(snapshot),
            Some(Err(message)) => Err(Error::Upstream(message)),
            None => Err(Error::Upstream("script exhausted".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_source_replays_in_order() {
        let source = ScriptedSource::new([
            Ok(Snapshot::new(1.0, vec![], vec![])),
            Err("connection refused".to_string()),
        ]);
        assert_eq!(source.fetch().await.unwrap().timestamp, 1.0);
        assert!(matches!(source.fetch().await, Err(Error::Upstream(m)) if m == "connection refused"));
        assert!(source.fetch().await.is_err());
        assert_eq!(source.remaining(), 0);
    }
}
