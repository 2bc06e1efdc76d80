//! Compile-time dependency injection.
//!
//! [`crate::context::Context`] derives `Context`, so each of its fields can be
//! pulled out with [`FromRef`]. Services derive `FromContext` and are built the
//! same way:
//!
//! ```ignore
//! let ctx = Context::connect(Config::load()?).await?;
//! let service = IngestService::from_ref(&ctx);
//! ```

/// Extracts a value from a reference to `T`.
pub trait FromRef<T> {
    fn from_ref(input: &T) -> Self;
}

impl<T: Clone> FromRef<T> for T {
    fn from_ref(input: &T) -> Self {
        input.clone()
    }
}

pub use di_macros::{Context, FromContext};
