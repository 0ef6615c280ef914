pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod storage;
pub mod validation;

pub use error::{PreflightError, Result};
pub use validation::{Extension, PathDescriptor, PathKind, PathRole, PathStatus, PathValidator};
