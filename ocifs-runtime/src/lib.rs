//! Runtime: the persistent registry of containers, the OCI runtime-spec
//! bundle it writes for each one, and the thin wrapper over the external
//! `runc`-compatible binary that actually runs them.

mod bundle;
mod error;
mod host;
mod model;
mod persist;
mod pre_exec;
mod runc;
mod runtime;
mod state;

pub use bundle::{HostKind, ProcessOverride};
pub use error::{Result, RuntimeError};
pub use host::detect as detect_host;
pub use model::Container;
pub use runc::Runc;
pub use runtime::Runtime;
pub use state::{query as query_state, State};
