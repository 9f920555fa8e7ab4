//! SVM solver implementations
//!
//! Sequential Minimal Optimization over dense feature vectors.

pub mod smo;

pub use self::smo::*;
