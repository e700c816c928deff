//! Parameter management
//!
//! Runtime tuning values live in a shared [`ParameterStore`]; the typed
//! [`AttitudeParams`] block registers the estimator's parameters and
//! snapshots them for the attitude task.

pub mod attitude;
pub mod error;
pub mod storage;

pub use attitude::AttitudeParams;
pub use error::ParameterError;
pub use storage::{ParamValue, ParameterStore, MAX_PARAMS, PARAM_NAME_LEN};
