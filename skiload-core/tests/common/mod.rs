#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use skiload_core::{LiftRide, RequestExecutor, RequestMethod, VerticalQuery};
use tokio::sync::Semaphore;

#[derive(Debug, thiserror::Error)]
#[error("simulated transport failure")]
pub struct SimulatedError;

/// Executor whose writes block until a permit is released.
#[derive(Debug)]
pub struct GatedExecutor {
    pub gate: Arc<Semaphore>,
}

impl GatedExecutor {
    pub fn new() -> Self {
        Self {
            gate: Arc::new(Semaphore::new(0)),
        }
    }
}

impl RequestExecutor for GatedExecutor {
    type Error = SimulatedError;

    async fn write(&self, _ride: &LiftRide) -> Result<u16, Self::Error> {
        let permit = self.gate.acquire().await.map_err(|_| SimulatedError)?;
        permit.forget();
        Ok(201)
    }

    async fn read(&self, _query: &VerticalQuery) -> Result<u16, Self::Error> {
        Ok(200)
    }
}

/// Executor that records every request and fails on a fixed schedule.
///
/// Call `n` (1-based, counted across writes and reads) is a transport error when
/// `n % transport_every == 0`, otherwise a `500` when `n % server_error_every == 0`.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    pub transport_every: Option<u64>,
    pub server_error_every: Option<u64>,
    pub calls: AtomicU64,
    pub transport_errors: AtomicU64,
    pub server_errors: AtomicU64,
    pub rides: Mutex<Vec<LiftRide>>,
    pub queries: Mutex<Vec<VerticalQuery>>,
}

impl ScriptedExecutor {
    fn outcome(&self, success: u16) -> Result<u16, SimulatedError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.transport_every.is_some_and(|every| n % every == 0) {
            self.transport_errors.fetch_add(1, Ordering::SeqCst);
            return Err(SimulatedError);
        }
        if self.server_error_every.is_some_and(|every| n % every == 0) {
            self.server_errors.fetch_add(1, Ordering::SeqCst);
            return Ok(500);
        }
        Ok(success)
    }
}

impl RequestExecutor for ScriptedExecutor {
    type Error = SimulatedError;

    async fn write(&self, ride: &LiftRide) -> Result<u16, Self::Error> {
        self.rides.lock().push(ride.clone());
        tokio::task::yield_now().await;
        self.outcome(201)
    }

    async fn read(&self, query: &VerticalQuery) -> Result<u16, Self::Error> {
        self.queries.lock().push(query.clone());
        tokio::task::yield_now().await;
        self.outcome(200)
    }
}

/// One request as seen by [`RecordingExecutor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedCall {
    /// Global issue order across every worker.
    pub seq: u64,
    pub method: RequestMethod,
    pub skier_id: u32,
    /// Minute of day for writes; reads carry none.
    pub time: Option<u32>,
}

/// Executor that logs every call in issue order and always succeeds.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    next_seq: AtomicU64,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingExecutor {
    pub fn calls(&self) -> Vec<RecordedCall> {
        let mut calls = self.calls.lock().clone();
        calls.sort_by_key(|c| c.seq);
        calls
    }

    fn record(&self, method: RequestMethod, skier_id: u32, time: Option<u32>) {
        let mut calls = self.calls.lock();
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        calls.push(RecordedCall {
            seq,
            method,
            skier_id,
            time,
        });
    }
}

impl RequestExecutor for RecordingExecutor {
    type Error = SimulatedError;

    async fn write(&self, ride: &LiftRide) -> Result<u16, Self::Error> {
        self.record(RequestMethod::Post, ride.skier_id, Some(ride.time));
        tokio::task::yield_now().await;
        Ok(201)
    }

    async fn read(&self, query: &VerticalQuery) -> Result<u16, Self::Error> {
        self.record(RequestMethod::Get, query.skier_id, None);
        tokio::task::yield_now().await;
        Ok(200)
    }
}
