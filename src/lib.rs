pub mod conf;
pub mod core;
pub mod discovery;
pub mod load;
pub mod service;
pub mod warehouse;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;
