//! Method registry and worker lifecycles.
//!
//! One worker thread per registered method: it blocks on that method's
//! queue, stacks whatever is pending into one model invocation, and routes
//! the per-row replies back to their callers in drain order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use rustc_hash::FxHashMap;
use thiserror::Error;

use ob_core::{stack, unstack, TensorError, TensorMap};

use crate::batcher::{Batcher, QueueEntry};
use crate::future::{CallError, FutureReply};
use crate::model::{BatchModel, ModelError};

/// Configuration and lifecycle errors; all fatal to the offending call site.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("unknown method: {0}")]
    UnknownMethod(String),
    #[error("duplicate method registration: {0}")]
    DuplicateMethod(String),
    #[error("method {0} registered after start")]
    RegisterAfterStart(String),
    #[error("scheduler already started")]
    AlreadyStarted,
    #[error("scheduler stopped")]
    SchedulerStopped,
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Tensor(#[from] TensorError),
}

/// Per-method aggregate counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodStats {
    /// Model invocations performed.
    pub calls: u64,
    /// Total rows across all invocations.
    pub rows: u64,
    /// Invocations that raised a model error.
    pub failures: u64,
    /// Replies routed into an already-resolved slot. Always zero unless the
    /// worker has a routing bug.
    pub double_fulfillments: u64,
}

impl MethodStats {
    pub fn mean_rows(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.rows as f64 / self.calls as f64
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunnerStatsSnapshot {
    pub methods: Vec<(String, MethodStats)>,
}

struct Registry {
    batchers: FxHashMap<String, Arc<Batcher>>,
    started: bool,
}

/// Registry of per-method batchers sharing one model.
pub struct BatchRunner {
    model: Arc<dyn BatchModel>,
    registry: Mutex<Registry>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    stopped: AtomicBool,
    stats: Arc<Mutex<FxHashMap<String, MethodStats>>>,
}

impl BatchRunner {
    pub fn new(model: Arc<dyn BatchModel>) -> Self {
        Self {
            model,
            registry: Mutex::new(Registry {
                batchers: FxHashMap::default(),
                started: false,
            }),
            workers: Mutex::new(Vec::new()),
            stopped: AtomicBool::new(false),
            stats: Arc::new(Mutex::new(FxHashMap::default())),
        }
    }

    /// Register `method` with its batch-size bound. Must precede `start`.
    pub fn register_method(&self, method: &str, max_batch: usize) -> Result<(), SchedulerError> {
        let mut reg = self.registry.lock().unwrap();
        if reg.started {
            return Err(SchedulerError::RegisterAfterStart(method.to_string()));
        }
        if reg.batchers.contains_key(method) {
            return Err(SchedulerError::DuplicateMethod(method.to_string()));
        }
        reg.batchers
            .insert(method.to_string(), Arc::new(Batcher::new(max_batch)));
        Ok(())
    }

    /// Spin up one worker thread per registered method.
    pub fn start(&self) -> Result<(), SchedulerError> {
        let mut reg = self.registry.lock().unwrap();
        if reg.started {
            return Err(SchedulerError::AlreadyStarted);
        }
        reg.started = true;

        let mut workers = self.workers.lock().unwrap();
        let methods: Vec<(String, Arc<Batcher>)> = reg
            .batchers
            .iter()
            .map(|(m, b)| (m.clone(), Arc::clone(b)))
            .collect();
        for (method, batcher) in methods {
            let model = Arc::clone(&self.model);
            let stats = Arc::clone(&self.stats);
            let handle = thread::Builder::new()
                .name(format!("ob-batch-{method}"))
                .spawn(move || worker_loop(&method, &batcher, &*model, &stats))
                .expect("failed to spawn batch worker");
            workers.push(handle);
        }
        Ok(())
    }

    /// Enqueue `request` for `method`; never blocks.
    pub fn submit(&self, method: &str, request: TensorMap) -> Result<FutureReply, SchedulerError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(SchedulerError::SchedulerStopped);
        }
        let batcher = {
            let reg = self.registry.lock().unwrap();
            reg.batchers
                .get(method)
                .cloned()
                .ok_or_else(|| SchedulerError::UnknownMethod(method.to_string()))?
        };
        // Queuing before start() is fine: the worker drains the backlog as
        // its first batch once start() runs.
        Ok(batcher.send(request))
    }

    /// One-shot direct invocation bypassing the batcher entirely: a batch of
    /// one row, evaluated on the caller's thread. For debugging and calls
    /// where batching overhead is not worth it.
    pub fn block_call(
        &self,
        method: &str,
        request: &TensorMap,
    ) -> Result<TensorMap, SchedulerError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(SchedulerError::SchedulerStopped);
        }
        let batch = stack(&[request])?;
        let out = self.model.invoke(method, &batch)?;
        let mut rows = unstack(&out, 1)?;
        Ok(rows.pop().expect("unstack(_, 1) yields one row"))
    }

    /// Fresh recurrent cells from the shared model.
    pub fn initial_hidden(&self, batch_size: usize) -> TensorMap {
        self.model.initial_hidden(batch_size)
    }

    /// Shut every batcher down, cancel pending calls, and join the workers.
    /// Safe to call more than once; later submits fail with
    /// `SchedulerStopped`.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        let batchers: Vec<Arc<Batcher>> = {
            let reg = self.registry.lock().unwrap();
            reg.batchers.values().cloned().collect()
        };
        for b in batchers {
            b.exit();
        }
        let workers = std::mem::take(&mut *self.workers.lock().unwrap());
        for handle in workers {
            let _ = handle.join();
        }
    }

    pub fn stats_snapshot(&self) -> RunnerStatsSnapshot {
        let stats = self.stats.lock().unwrap();
        let mut methods: Vec<(String, MethodStats)> =
            stats.iter().map(|(m, s)| (m.clone(), *s)).collect();
        methods.sort_by(|a, b| a.0.cmp(&b.0));
        RunnerStatsSnapshot { methods }
    }
}

impl Drop for BatchRunner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(
    method: &str,
    batcher: &Batcher,
    model: &dyn BatchModel,
    stats: &Mutex<FxHashMap<String, MethodStats>>,
) {
    loop {
        let entries = batcher.get();
        if entries.is_empty() {
            // Terminated and fully drained.
            break;
        }
        let n = entries.len();
        let rows: Vec<&TensorMap> = entries.iter().map(|e| &e.request).collect();
        let result = stack(&rows)
            .map_err(|e| ModelError::new(e.to_string()))
            .and_then(|batch| model.invoke(method, &batch))
            .and_then(|out| {
                unstack(&out, n).map_err(|e| ModelError::new(e.to_string()))
            });

        // Counted before routing so a caller that has its reply in hand
        // already sees the invocation in the snapshot.
        let mut st = stats.lock().unwrap();
        let entry = st.entry(method.to_string()).or_default();
        entry.calls += 1;
        entry.rows += n as u64;
        if result.is_err() {
            entry.failures += 1;
        }
        drop(st);

        let mut double_fulfillments = 0u64;
        match result {
            Ok(replies) => {
                for (entry, reply) in entries.into_iter().zip(replies) {
                    if entry.fulfiller.fulfill(Ok(reply)).is_err() {
                        double_fulfillments += 1;
                    }
                }
            }
            Err(e) => {
                // Isolated per-batch failure: every member gets the error,
                // the worker keeps draining subsequent batches.
                let msg = e.to_string();
                for entry in entries {
                    if entry
                        .fulfiller
                        .fulfill(Err(CallError::ModelInvocationFailed(msg.clone())))
                        .is_err()
                    {
                        double_fulfillments += 1;
                    }
                }
            }
        }

        if double_fulfillments > 0 {
            let mut st = stats.lock().unwrap();
            let entry = st.entry(method.to_string()).or_default();
            entry.double_fulfillments += double_fulfillments;
        }
    }
}
