mod locator;
mod partition;
mod store;

pub use locator::{FileLocator, ObjectStoreLocator};
pub use partition::{DATA_FILE_SUFFIX, DatePartition};
