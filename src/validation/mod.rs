// Storage path validation: descriptors and the validator producing them

pub mod descriptor;
pub mod validator;

pub use descriptor::{Extension, PathDescriptor, PathKind, PathRole, PathStatus};
pub use validator::{directory_query, PathValidator};
