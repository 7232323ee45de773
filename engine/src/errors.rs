use thiserror::Error;

/// Unified error type for the engine crate.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed stencil request: bad orders, spacing or offsets.
    #[error("invalid stencil: {0}")]
    InvalidStencil(String),
    /// Array extent along the differentiated axis cannot hold the stencil.
    #[error("array too small: axis {axis} has {len} points, stencil needs at least {required}")]
    ArrayTooSmall {
        axis: usize,
        len: usize,
        required: usize,
    },
    /// Operator applied to a field of the wrong dimensionality.
    #[error("dimension mismatch in {operator}: expected {expected}, got {actual}")]
    DimensionMismatch {
        operator: &'static str,
        expected: usize,
        actual: usize,
    },
    /// Requested axis does not exist on the array.
    #[error("axis {axis} out of range for array with {ndim} dimensions")]
    AxisOutOfRange { axis: usize, ndim: usize },
    /// Linear algebra problems such as a singular coefficient system.
    #[error("linear algebra error: {0}")]
    LinAlg(String),
    /// Flat data that does not fit the declared shape.
    #[error("shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    /// Wrapper around I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization or deserialization failures.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// YAML parsing error.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// TOML parsing error.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    /// Any other context dependent failure.
    #[error("{0}")]
    Other(String),
}

impl EngineError {
    pub fn other<T: Into<String>>(msg: T) -> Self {
        Self::Other(msg.into())
    }

    pub fn invalid_stencil<T: Into<String>>(msg: T) -> Self {
        Self::InvalidStencil(msg.into())
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
