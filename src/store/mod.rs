pub mod by_ref;
pub mod by_value;
pub mod traits;

pub use by_ref::ByRefStore;
pub use by_value::{ByValueStore, CloneCopier, JsonCopier};
pub use traits::{BackingStore, CopyError, StoreError, ValueCopier};
