use ndarray::{ArrayBase, ArrayD, Data, Dimension, IxDyn};
use serde::{Deserialize, Serialize};

use crate::{
    errors::{EngineError, Result},
    operators::Spacing,
    runtime::{EngineReport, FieldBatch, FieldRequest, OperatorSpec, RequestFailure},
};

/// Row-major flat form of an N-dimensional array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredField {
    pub shape: Vec<usize>,
    pub values: Vec<f64>,
}

impl StoredField {
    pub fn from_array<S, D>(array: &ArrayBase<S, D>) -> Self
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        Self {
            shape: array.shape().to_vec(),
            values: array.iter().copied().collect(),
        }
    }

    pub fn into_array(self) -> Result<ArrayD<f64>> {
        Ok(ArrayD::from_shape_vec(IxDyn(&self.shape), self.values)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRequest {
    pub id: u64,
    pub operator: OperatorSpec,
    pub field: StoredField,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredBatch {
    pub spacing: Spacing,
    #[serde(default)]
    pub accuracy: Option<usize>,
    pub requests: Vec<StoredRequest>,
}

impl TryFrom<StoredBatch> for FieldBatch {
    type Error = EngineError;

    fn try_from(value: StoredBatch) -> Result<Self> {
        let requests = value
            .requests
            .into_iter()
            .map(|req| {
                Ok(FieldRequest {
                    id: req.id,
                    operator: req.operator,
                    field: req.field.into_array()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(FieldBatch {
            spacing: value.spacing,
            accuracy: value.accuracy,
            requests,
        })
    }
}

impl From<&FieldBatch> for StoredBatch {
    fn from(batch: &FieldBatch) -> Self {
        StoredBatch {
            spacing: batch.spacing.clone(),
            accuracy: batch.accuracy,
            requests: batch
                .requests
                .iter()
                .map(|req| StoredRequest {
                    id: req.id,
                    operator: req.operator,
                    field: StoredField::from_array(&req.field),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResult {
    pub id: u64,
    pub operator: OperatorSpec,
    pub field: StoredField,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
    pub results: Vec<StoredResult>,
    pub failures: Vec<RequestFailure>,
}

impl From<&EngineReport> for StoredReport {
    fn from(report: &EngineReport) -> Self {
        StoredReport {
            results: report
                .results
                .iter()
                .map(|res| StoredResult {
                    id: res.id,
                    operator: res.operator,
                    field: StoredField::from_array(&res.values),
                })
                .collect(),
            failures: report.failures.clone(),
        }
    }
}
