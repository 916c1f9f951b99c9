//! Native model runtime

pub mod xgboost;

pub use xgboost::{Booster, ModelError};
