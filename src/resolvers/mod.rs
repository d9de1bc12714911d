//! Secret resolver implementations.

mod file;

#[cfg(feature = "mock")]
pub mod mock;

pub use file::FileSecretResolver;

#[cfg(feature = "mock")]
pub use mock::MockSecretResolver;
