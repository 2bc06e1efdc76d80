//! Field extraction shared by both derives.

use syn::{Data, DeriveInput, Field, Ident, Type};

/// A named struct field.
pub struct NamedField<'a> {
    pub ident: &'a Ident,
    pub ty: &'a Type,
}

/// Named fields of `input`, or a spanned error naming `derive`.
pub fn named_fields<'a>(input: &'a DeriveInput, derive: &str) -> syn::Result<Vec<NamedField<'a>>> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            format!("{derive} can only be derived for structs"),
        ));
    };

    data.fields
        .iter()
        .map(|field: &'a Field| match &field.ident {
            Some(ident) => Ok(NamedField {
                ident,
                ty: &field.ty,
            }),
            None => Err(syn::Error::new_spanned(
                field,
                format!("{derive} can only be derived for structs with named fields"),
            )),
        })
        .collect()
}
