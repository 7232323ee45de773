pub mod integrate;
pub mod linalg;

pub use integrate::cumulative_trapezoid;
pub use linalg::{moment_matrix, solve_square};
