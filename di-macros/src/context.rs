//! `#[derive(Context)]`: one `FromRef` impl per field type.

use proc_macro2::TokenStream;
use quote::quote;
use syn::DeriveInput;

use crate::fields::named_fields;

pub fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let impls = named_fields(input, "Context")?.into_iter().map(|field| {
        let ident = field.ident;
        let ty = field.ty;
        quote! {
            impl #impl_generics crate::FromRef<#name #ty_generics> for #ty #where_clause {
                fn from_ref(ctx: &#name #ty_generics) -> Self {
                    ctx.#ident.clone()
                }
            }
        }
    });

    Ok(quote! { #(#impls)* })
}
