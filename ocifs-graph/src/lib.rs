//! Graph driver: the persistent DAG of copy-on-write filesystems and the
//! immutable image layers committed from them.

mod changeset;
mod driver;
mod error;
mod id;
mod model;
mod persist;

pub use changeset::{apply_changeset, write_changeset};
pub use driver::GraphDriver;
pub use error::{GraphError, Result};
pub use id::{random_id, short_id};
pub use model::{Descriptor, Filesystem, Layer, LAYER_MEDIA_TYPE};
