pub mod evaluation;
pub mod io;
pub mod params;
pub mod scaling;
pub mod workflow;

pub use evaluation::stats::{relative_errors, ErrorStats};
pub use evaluation::{compute_error, print_error, save_error, write_error, ErrorSummary, SnapshotErrors};
pub use params::AeParams;
pub use scaling::{tensor_scaling, FittedScaling, IdentityScaler, InverseScaler, ScalerKind, ScalingType};
