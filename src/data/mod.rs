//! Dataset loading and splitting

pub mod split;
pub mod tabular;

pub use self::split::*;
pub use self::tabular::*;
