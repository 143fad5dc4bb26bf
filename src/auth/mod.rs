//! # Authorization
//!
//! Every draft-issue operation is authorized against the project before the
//! engine runs. The gate is a trait so deployments can plug in their own
//! membership source.

mod gate;

pub use gate::{Action, AllowAll, PermissionGate, ProjectMemberGate};
