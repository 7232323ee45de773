//! Finite-difference engine: stencil coefficients for arbitrary derivative
//! and accuracy orders, applied along any axis of N-dimensional arrays, with
//! gradient/divergence/Laplacian/curl composed on top.

pub mod coefficients;
pub mod config;
pub mod errors;
pub mod io;
pub mod operators;
pub mod runtime;
pub mod stencil;
pub mod telemetry;
pub mod utils;

pub use coefficients::{solve, solve_integer, Coefficients};
pub use config::{Concurrency, EngineConfig, IoConfig, StencilConfig};
pub use errors::EngineError;
pub use operators::{
    Curl, Divergence, Gradient, Laplacian, PartialDerivative, SpatialDimension, Spacing,
};
pub use runtime::{
    DifferentiationEngine, Engine, EngineReport, FieldBatch, FieldRequest, JobHandle,
    OperatorSpec,
};
pub use stencil::{
    apply_nonuniform, apply_stencil, build_stencil_set, NonUniformStencils, Stencil,
    StencilBuilder, StencilCache, StencilSet,
};

/// Emit a textual banner used by CLI integrations and smoke tests.
pub fn banner() -> String {
    const MSG: &str = "findiff :: finite-difference stencil engine";
    tracing::info!(target: "engine", "{}", MSG);
    MSG.to_string()
}
