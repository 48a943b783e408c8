use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
#[cfg(test)]
use std::sync::mpsc::RecvTimeoutError;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
#[cfg(test)]
use std::time::{Duration, Instant};

use tracing::debug;

use super::{Dataset, FetchError};
use crate::layout::{DistanceMatrix, LinkRecord};

#[derive(Clone, Debug, PartialEq)]
pub enum FetchRequest {
    Text {
        query: String,
        limit: usize,
    },
    BySelection {
        current: Vec<String>,
        negative: Vec<String>,
        limit: usize,
    },
    Layout {
        ids: Vec<String>,
    },
}

/// Everything the layout engine needs for one item set.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutPayload {
    pub ids: Vec<String>,
    pub matrix: DistanceMatrix,
    pub links: Vec<LinkRecord>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FetchPayload {
    Results(Vec<String>),
    Layout(LayoutPayload),
}

struct FetchResponse {
    generation: u64,
    result: Result<FetchPayload, FetchError>,
}

/// Answers requests on worker threads. Only the answer to the most recent
/// request is ever handed out; anything older is dropped on arrival.
pub struct Fetcher {
    dataset: Arc<Dataset>,
    generation: u64,
    tx: Sender<FetchResponse>,
    rx: Receiver<FetchResponse>,
    in_flight: bool,
}

fn answer(dataset: &Dataset, request: FetchRequest) -> Result<FetchPayload, FetchError> {
    match request {
        FetchRequest::Text { query, limit } => {
            Ok(FetchPayload::Results(dataset.search_text(&query, limit)))
        }
        FetchRequest::BySelection {
            current,
            negative,
            limit,
        } => dataset
            .search_by_selection(&current, &negative, limit)
            .map(FetchPayload::Results),
        FetchRequest::Layout { ids } => {
            let matrix = dataset.distance_matrix(&ids)?;
            let links = dataset.links_among(&ids);
            Ok(FetchPayload::Layout(LayoutPayload { ids, matrix, links }))
        }
    }
}

impl Fetcher {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            dataset,
            generation: 0,
            tx,
            rx,
            in_flight: false,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight
    }

    /// Starts a request and returns its generation. Any request still in
    /// flight becomes stale.
    pub fn request(&mut self, request: FetchRequest) -> u64 {
        self.generation += 1;
        self.in_flight = true;
        let generation = self.generation;
        let dataset = Arc::clone(&self.dataset);
        let tx = self.tx.clone();
        debug!(generation, ?request, "fetch started");

        thread::spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| answer(&dataset, request)))
                .unwrap_or(Err(FetchError::WorkerLost));
            let _ = tx.send(FetchResponse { generation, result });
        });
        generation
    }

    /// Makes every in-flight request stale.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.in_flight = false;
    }

    /// Returns the answer to the latest request if it has arrived.
    pub fn poll(&mut self) -> Option<Result<FetchPayload, FetchError>> {
        loop {
            match self.rx.try_recv() {
                Ok(response) => {
                    if let Some(result) = self.accept(response) {
                        return Some(result);
                    }
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return None,
            }
        }
    }

    /// Blocks until the latest request is answered or `timeout` runs out.
    #[cfg(test)]
    pub fn wait(&mut self, timeout: Duration) -> Option<Result<FetchPayload, FetchError>> {
        let deadline = Instant::now() + timeout;
        while self.in_flight {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(response) => {
                    if let Some(result) = self.accept(response) {
                        return Some(result);
                    }
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
        None
    }

    fn accept(&mut self, response: FetchResponse) -> Option<Result<FetchPayload, FetchError>> {
        if response.generation != self.generation || !self.in_flight {
            debug!(
                generation = response.generation,
                latest = self.generation,
                "stale fetch response ignored"
            );
            return None;
        }
        self.in_flight = false;
        Some(response.result)
    }
}
