//! Derive macros for tkgraph's service wiring.
//!
//! - `#[derive(Context)]` makes every field of the shared context extractable
//! - `#[derive(FromContext)]` builds a service by extracting each of its fields
//!
//! Generated code refers to `crate::FromRef`, so the consuming crate must
//! export that trait at its root.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod context;
mod fields;
mod from_context;

/// Implements `FromRef<Self>` for each field type of the struct.
///
/// Field types must be `Clone` and distinct from one another.
///
/// ```ignore
/// #[derive(Context, Clone)]
/// pub struct Context {
///     pub store: AppStore,
///     pub embedders: Embedders,
/// }
///
/// // impl FromRef<Context> for AppStore { ... }
/// // impl FromRef<Context> for Embedders { ... }
/// ```
#[proc_macro_derive(Context)]
pub fn derive_context(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    context::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Implements `FromRef<Context>` by resolving each field from the context.
///
/// The context type defaults to an in-scope `Context` and can be overridden
/// with `#[from_context(Context = "path::To")]`.
///
/// ```ignore
/// #[derive(FromContext, Clone)]
/// pub struct IngestService {
///     store: AppStore,
///     embedders: Embedders,
/// }
/// ```
#[proc_macro_derive(FromContext, attributes(from_context))]
pub fn derive_from_context(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_context::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
