use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};

use ndarray::ArrayD;
use parking_lot::Mutex;
use rayon::{prelude::*, ThreadPool};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{Concurrency, EngineConfig},
    errors::{EngineError, Result},
    operators::{Curl, Divergence, Gradient, Laplacian, PartialDerivative, Spacing},
    stencil::StencilBuilder,
    telemetry,
};

/// Operator requested for a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperatorSpec {
    Derivative { axis: usize, order: usize },
    Gradient,
    Divergence,
    Laplacian,
    Curl,
}

/// One field to differentiate.
#[derive(Debug, Clone)]
pub struct FieldRequest {
    pub id: u64,
    pub field: ArrayD<f64>,
    pub operator: OperatorSpec,
}

/// Fields sharing one grid, processed together by the engine.
#[derive(Debug, Clone)]
pub struct FieldBatch {
    pub spacing: Spacing,
    /// Falls back to the configured default accuracy when unset.
    pub accuracy: Option<usize>,
    pub requests: Vec<FieldRequest>,
}

/// Output for a request that succeeded.
#[derive(Debug, Clone)]
pub struct FieldResult {
    pub id: u64,
    pub operator: OperatorSpec,
    pub values: ArrayD<f64>,
}

/// Request that failed, with the rendered error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFailure {
    pub id: u64,
    pub error: String,
}

/// Aggregated report returned to the caller.
#[derive(Debug, Clone, Default)]
pub struct EngineReport {
    pub results: Vec<FieldResult>,
    pub failures: Vec<RequestFailure>,
}

impl EngineReport {
    pub fn summary(&self) -> String {
        format!(
            "results={}, failures={}",
            self.results.len(),
            self.failures.len()
        )
    }
}

/// Handle representing a completed job awaiting collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle(Uuid);

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for JobHandle {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(JobHandle)
            .map_err(|err| EngineError::other(format!("invalid job handle {s:?}: {err}")))
    }
}

pub trait DifferentiationEngine {
    fn prepare(&mut self, cfg: EngineConfig) -> Result<()>;
    fn submit(&self, batch: FieldBatch) -> Result<JobHandle>;
    fn join(&self, handle: JobHandle) -> Result<EngineReport>;
    fn shutdown(&mut self) -> Result<()>;
}

/// Concrete engine implementation.
pub struct Engine {
    cfg: Option<EngineConfig>,
    pool: Option<Arc<ThreadPool>>,
    builder: StencilBuilder,
    jobs: Arc<Mutex<HashMap<Uuid, EngineReport>>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            cfg: None,
            pool: None,
            builder: StencilBuilder::new(),
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder(&self) -> &StencilBuilder {
        &self.builder
    }

    fn evaluate_request(
        builder: &StencilBuilder,
        spacing: &Spacing,
        accuracy: usize,
        request: &FieldRequest,
    ) -> Result<ArrayD<f64>> {
        let field = &request.field;
        match request.operator {
            OperatorSpec::Derivative { axis, order } => PartialDerivative::new(axis, order)
                .with_accuracy(accuracy)
                .apply(builder, spacing, field),
            OperatorSpec::Gradient => Gradient::new(spacing.clone())?
                .with_accuracy(accuracy)
                .apply(builder, field),
            OperatorSpec::Divergence => Divergence::new(spacing.clone())?
                .with_accuracy(accuracy)
                .apply(builder, field),
            OperatorSpec::Laplacian => Laplacian::new(spacing.clone())?
                .with_accuracy(accuracy)
                .apply(builder, field),
            OperatorSpec::Curl => Curl::new(spacing.clone())?
                .with_accuracy(accuracy)
                .apply(builder, field),
        }
    }

    fn evaluate_batch(
        cfg: &EngineConfig,
        builder: &StencilBuilder,
        batch: FieldBatch,
        parallel: bool,
    ) -> EngineReport {
        let accuracy = batch.accuracy.unwrap_or(cfg.stencil.default_accuracy);
        let run = |request: &FieldRequest| {
            Self::evaluate_request(builder, &batch.spacing, accuracy, request)
        };
        let outcomes: Vec<Result<ArrayD<f64>>> = if parallel {
            batch.requests.par_iter().map(run).collect()
        } else {
            batch.requests.iter().map(run).collect()
        };

        let mut report = EngineReport::default();
        for (request, outcome) in batch.requests.iter().zip(outcomes) {
            match outcome {
                Ok(values) => report.results.push(FieldResult {
                    id: request.id,
                    operator: request.operator,
                    values,
                }),
                Err(err) => {
                    tracing::warn!(target: "engine", request_id = request.id, "request failed: {err}");
                    report.failures.push(RequestFailure {
                        id: request.id,
                        error: err.to_string(),
                    });
                }
            }
        }
        telemetry::record_report(&report);
        tracing::info!(target: "engine", "batch complete: {}", report.summary());
        report
    }
}

impl DifferentiationEngine for Engine {
    fn prepare(&mut self, cfg: EngineConfig) -> Result<()> {
        self.pool = match cfg.concurrency {
            Concurrency::Rayon { workers } => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .build()
                    .map_err(|err| {
                        EngineError::other(format!("failed to build rayon pool: {err}"))
                    })?;
                Some(Arc::new(pool))
            }
            Concurrency::Single => None,
        };
        self.builder = if cfg.stencil.cache {
            StencilBuilder::new()
        } else {
            StencilBuilder::uncached()
        };
        self.cfg = Some(cfg);
        Ok(())
    }

    fn submit(&self, batch: FieldBatch) -> Result<JobHandle> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| EngineError::other("engine not prepared"))?;
        let report = if let Some(pool) = &self.pool {
            pool.install(|| Engine::evaluate_batch(cfg, &self.builder, batch, true))
        } else {
            Engine::evaluate_batch(cfg, &self.builder, batch, false)
        };

        let id = Uuid::new_v4();
        self.jobs.lock().insert(id, report);
        Ok(JobHandle(id))
    }

    fn join(&self, handle: JobHandle) -> Result<EngineReport> {
        self.jobs
            .lock()
            .remove(&handle.0)
            .ok_or_else(|| EngineError::other("unknown job handle"))
    }

    fn shutdown(&mut self) -> Result<()> {
        self.cfg = None;
        self.pool = None;
        self.jobs.lock().clear();
        Ok(())
    }
}
