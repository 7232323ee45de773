//! Stencil construction for uniform grids.

use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{
    coefficients,
    errors::{EngineError, Result},
    telemetry,
};

pub mod apply;
pub mod nonuniform;

pub use apply::apply_stencil;
pub use nonuniform::{apply_nonuniform, NonUniformStencils};

/// Offsets and spacing-scaled weights for one finite-difference template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stencil {
    pub offsets: Vec<isize>,
    /// Weights already divided by `spacing^derivative_order`.
    pub coefficients: Vec<f64>,
    pub spacing: f64,
    pub derivative_order: usize,
    pub accuracy_order: usize,
}

impl Stencil {
    fn solve(
        offsets: Vec<isize>,
        spacing: f64,
        derivative_order: usize,
        accuracy_order: usize,
    ) -> Result<Self> {
        let raw: Vec<f64> = offsets.iter().map(|&o| o as f64).collect();
        let solved = coefficients::solve(&raw, derivative_order)?;
        let scale = spacing.powi(derivative_order as i32);
        Ok(Self {
            offsets,
            coefficients: solved.weights.iter().map(|w| w / scale).collect(),
            spacing,
            derivative_order,
            accuracy_order,
        })
    }

    /// Number of points the stencil reaches below its anchor.
    pub fn left_width(&self) -> usize {
        self.offsets.iter().map(|o| (-o).max(0) as usize).max().unwrap_or(0)
    }

    /// Number of points the stencil reaches above its anchor.
    pub fn right_width(&self) -> usize {
        self.offsets.iter().map(|o| (*o).max(0) as usize).max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Offset/weight pairs.
    pub fn terms(&self) -> impl Iterator<Item = (isize, f64)> + '_ {
        self.offsets.iter().copied().zip(self.coefficients.iter().copied())
    }
}

/// Which part of the axis a grid point falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Low,
    Interior,
    High,
}

/// Stencil chosen for a single grid index and the first index of its window.
#[derive(Debug, Clone, Copy)]
pub struct Placement<'a> {
    pub region: Region,
    pub stencil: &'a Stencil,
    pub start: usize,
}

/// Centered and one-sided stencils for one axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StencilSet {
    pub centered: Stencil,
    pub low: Stencil,
    pub high: Stencil,
}

impl StencilSet {
    pub fn center_half_width(&self) -> usize {
        self.centered.left_width()
    }

    pub fn low_half_width(&self) -> usize {
        self.low.right_width()
    }

    pub fn high_half_width(&self) -> usize {
        self.high.left_width()
    }

    /// Smallest axis length the set can be applied to.
    pub fn min_len(&self) -> usize {
        self.low_half_width() + self.high_half_width() + 1
    }

    /// Stencil used at index `i` of an axis of length `len`.
    ///
    /// Boundary points reuse the fixed one-sided weights with the window
    /// anchored at `i`, so neighbouring boundary points differ only by a
    /// shift of one. Returns `None` when `i` is out of range or the axis is
    /// shorter than [`StencilSet::min_len`].
    pub fn placement(&self, i: usize, len: usize) -> Option<Placement<'_>> {
        if i >= len || len < self.min_len() {
            return None;
        }
        let p = self.center_half_width();
        let placement = if i < p {
            Placement {
                region: Region::Low,
                stencil: &self.low,
                start: i,
            }
        } else if i + p >= len {
            Placement {
                region: Region::High,
                stencil: &self.high,
                start: i - self.high_half_width(),
            }
        } else {
            Placement {
                region: Region::Interior,
                stencil: &self.centered,
                start: i - p,
            }
        };
        Some(placement)
    }
}

/// Build the stencil set for a uniform axis without caching.
pub fn build_stencil_set(
    spacing: f64,
    derivative_order: usize,
    accuracy_order: usize,
) -> Result<StencilSet> {
    if accuracy_order < 1 {
        return Err(EngineError::invalid_stencil(format!(
            "accuracy order must be at least 1, got {accuracy_order}"
        )));
    }
    if !(spacing.is_finite() && spacing > 0.0) {
        return Err(EngineError::invalid_stencil(format!(
            "grid spacing must be positive and finite, got {spacing}"
        )));
    }

    // Smallest p with 2p - d >= acc, and smallest m with m - d >= acc.
    let p = ((accuracy_order + derivative_order + 1) / 2) as isize;
    let m = (accuracy_order + derivative_order) as isize;

    let centered = Stencil::solve((-p..=p).collect(), spacing, derivative_order, accuracy_order)?;
    let low = Stencil::solve((0..=m).collect(), spacing, derivative_order, accuracy_order)?;
    let high = Stencil::solve((-m..=0).collect(), spacing, derivative_order, accuracy_order)?;

    tracing::debug!(
        target: "engine",
        spacing,
        derivative_order,
        accuracy_order,
        half_width = p,
        boundary_width = m,
        "built stencil set"
    );
    Ok(StencilSet {
        centered,
        low,
        high,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct StencilKey {
    spacing_bits: u64,
    derivative_order: usize,
    accuracy_order: usize,
}

impl StencilKey {
    fn new(spacing: f64, derivative_order: usize, accuracy_order: usize) -> Self {
        Self {
            spacing_bits: spacing.to_bits(),
            derivative_order,
            accuracy_order,
        }
    }
}

/// Shared store of built stencil sets keyed by construction parameters.
#[derive(Debug, Default)]
pub struct StencilCache {
    entries: RwLock<HashMap<StencilKey, Arc<StencilSet>>>,
}

impl StencilCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    fn get(&self, key: &StencilKey) -> Option<Arc<StencilSet>> {
        self.entries.read().get(key).cloned()
    }

    /// Insert unless another caller got there first; either way return the
    /// stored value so concurrent builders converge on one instance.
    fn insert(&self, key: StencilKey, set: StencilSet) -> Arc<StencilSet> {
        let mut entries = self.entries.write();
        let stored = entries.entry(key).or_insert_with(|| Arc::new(set)).clone();
        telemetry::record_cache_size(entries.len());
        stored
    }
}

/// Builds stencil sets, memoising them in an optional [`StencilCache`].
#[derive(Debug, Clone)]
pub struct StencilBuilder {
    cache: Option<Arc<StencilCache>>,
}

impl Default for StencilBuilder {
    fn default() -> Self {
        Self::with_cache(Arc::new(StencilCache::new()))
    }
}

impl StencilBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(cache: Arc<StencilCache>) -> Self {
        Self { cache: Some(cache) }
    }

    pub fn uncached() -> Self {
        Self { cache: None }
    }

    pub fn cache(&self) -> Option<&Arc<StencilCache>> {
        self.cache.as_ref()
    }

    pub fn build(
        &self,
        spacing: f64,
        derivative_order: usize,
        accuracy_order: usize,
    ) -> Result<Arc<StencilSet>> {
        let Some(cache) = &self.cache else {
            return build_stencil_set(spacing, derivative_order, accuracy_order).map(Arc::new);
        };
        let key = StencilKey::new(spacing, derivative_order, accuracy_order);
        if let Some(hit) = cache.get(&key) {
            telemetry::record_cache_hit();
            return Ok(hit);
        }
        telemetry::record_cache_miss();
        let set = build_stencil_set(spacing, derivative_order, accuracy_order)?;
        Ok(cache.insert(key, set))
    }
}
