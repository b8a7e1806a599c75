//! Snapshot sources: where fleet snapshots come from.
//!
//! The map core only consumes materialized [`FleetSnapshot`]s. Sources are the boundary to
//! whatever produces them; polling cadence and retries belong to the caller.
//!
//! - **`ReplaySource`**: plays back a captured JSON array of snapshots.
//! - **`HttpSnapshotSource`** (feature `http`): fetches `/drivers` and `/rides` from the
//!   dashboard backend.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::entity::FleetSnapshot;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read snapshots from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse snapshots: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("request failed: {0}")]
    Http(String),
    #[error("source exhausted")]
    Exhausted,
}

pub trait SnapshotSource: Send {
    fn fetch(&mut self) -> Result<FleetSnapshot, SourceError>;
}

/// Plays a fixed sequence of snapshots, optionally starting over at the end.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    snapshots: Vec<FleetSnapshot>,
    cursor: usize,
    looping: bool,
}

impl ReplaySource {
    pub fn new(snapshots: Vec<FleetSnapshot>) -> Self {
        Self {
            snapshots,
            cursor: 0,
            looping: false,
        }
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn from_json_str(data: &str) -> Result<Self, SourceError> {
        let snapshots: Vec<FleetSnapshot> = serde_json::from_str(data)?;
        Ok(Self::new(snapshots))
    }

    pub fn from_file(path: &Path) -> Result<Self, SourceError> {
        let contents = fs::read_to_string(path).map_err(|source| SourceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let source = Self::from_json_str(&contents)?;
        tracing::info!(
            target: "fleet_map::source",
            path = %path.display(),
            snapshots = source.snapshots.len(),
            "replay.loaded"
        );
        Ok(source)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.snapshots.len().saturating_sub(self.cursor)
    }
}

impl SnapshotSource for ReplaySource {
    fn fetch(&mut self) -> Result<FleetSnapshot, SourceError> {
        if self.cursor >= self.snapshots.len() {
            if !self.looping || self.snapshots.is_empty() {
                return Err(SourceError::Exhausted);
            }
            self.cursor = 0;
        }
        let snapshot = self.snapshots[self.cursor].clone();
        self.cursor += 1;
        Ok(snapshot)
    }
}

#[cfg(feature = "http")]
pub mod http {
    use super::*;
    use crate::entity::decode_records;
    use reqwest::blocking::Client;
    use serde_json::Value;
    use std::time::Duration;

    /// Fetches driver and ride lists from the dashboard REST API.
    pub struct HttpSnapshotSource {
        client: Client,
        endpoint: String,
    }

    impl HttpSnapshotSource {
        pub fn new(endpoint: &str) -> Result<Self, SourceError> {
            let client = Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .map_err(|error| SourceError::Http(error.to_string()))?;
            Ok(Self {
                client,
                endpoint: endpoint.trim_end_matches('/').to_string(),
            })
        }

        fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, SourceError> {
            let url = format!("{}/{}", self.endpoint, path);
            self.client
                .get(&url)
                .send()
                .and_then(|response| response.error_for_status())
                .and_then(|response| response.json::<T>())
                .map_err(|error| SourceError::Http(error.to_string()))
        }
    }

    impl SnapshotSource for HttpSnapshotSource {
        fn fetch(&mut self) -> Result<FleetSnapshot, SourceError> {
            let drivers: Vec<Value> = self.get("drivers")?;
            let rides: Vec<Value> = self.get("rides")?;
            Ok(FleetSnapshot::new(
                decode_records("drivers", drivers),
                decode_records("rides", rides),
            ))
        }
    }
}
