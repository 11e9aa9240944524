//! Procedural macros for the doclens project.
//!
//! `#[derive(FromRawValue)]` registers a struct as a compound conversion target: it
//! emits the struct's static attribute table and the setters the value converter
//! calls for each attribute.
//!
//! ```ignore
//! use doclens::FromRawValue;
//!
//! #[derive(Debug, Default, FromRawValue)]
//! pub struct Poi {
//!     pub address: Option<String>,
//!     #[doclens(required)]
//!     pub coordinate: Coordinate,
//!     #[doclens(rename = "zip_code")]
//!     pub zip: String,
//! }
//!
//! #[derive(Debug, Default, FromRawValue)]
//! pub struct Pair(i32, i32);
//! ```
//!
//! Named fields are looked up by name (or by the `rename` key); tuple struct fields
//! take the raw entries by position. The struct must implement `Default` and must
//! not be generic.

#[allow(unused_extern_crates)]
extern crate self as doclens_macros;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Field, Fields, Index, LitStr};

#[proc_macro_derive(FromRawValue, attributes(doclens))]
pub fn derive_from_raw_value(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[derive(Default)]
struct FieldOptions {
    rename: Option<String>,
    required: bool,
}

impl FieldOptions {
    fn parse(field: &Field) -> syn::Result<Self> {
        let mut options = FieldOptions::default();

        for attr in field.attrs.iter().filter(|a| a.path().is_ident("doclens")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let key: LitStr = meta.value()?.parse()?;
                    options.rename = Some(key.value());
                    Ok(())
                } else if meta.path.is_ident("required") {
                    options.required = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `rename = \"...\"` or `required`"))
                }
            })?;
        }

        Ok(options)
    }
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "FromRawValue cannot be derived for generic types",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return Err(syn::Error::new_spanned(
                ident,
                "FromRawValue can only be derived for structs",
            ));
        }
    };

    let mut attributes = Vec::new();
    let mut setters = Vec::new();

    for (index, field) in fields.iter().enumerate() {
        let options = FieldOptions::parse(field)?;
        let ty = &field.ty;
        let required = options.required;

        let (key, member) = match (&field.ident, fields) {
            (Some(name), Fields::Named(_)) => {
                let key = options
                    .rename
                    .unwrap_or_else(|| name.to_string());
                (quote! { ::core::option::Option::Some(#key) }, quote! { #name })
            }
            _ => {
                if options.rename.is_some() {
                    return Err(syn::Error::new_spanned(
                        field,
                        "`rename` is not supported on tuple struct fields",
                    ));
                }
                let position = Index::from(index);
                (quote! { ::core::option::Option::None }, quote! { #position })
            }
        };

        attributes.push(quote! {
            ::doclens::convert::AttributeDescriptor {
                key: #key,
                required: #required,
                target: <#ty as ::doclens::convert::FromRawValue>::target_type,
            }
        });
        setters.push(quote! {
            #index => self.#member = ::doclens::convert::ValueConverter::convert(raw)?,
        });
    }

    let name = ident.to_string();

    Ok(quote! {
        const _: () = {
            static DESCRIPTOR: ::doclens::convert::CompoundDescriptor =
                ::doclens::convert::CompoundDescriptor {
                    name: #name,
                    attributes: &[#(#attributes),*],
                };

            impl ::doclens::convert::FromRawValue for #ident {
                fn target_type() -> ::doclens::convert::TargetType {
                    ::doclens::convert::TargetType::Compound(&DESCRIPTOR)
                }

                fn from_raw(
                    raw: ::doclens::value::RawValue,
                ) -> ::core::result::Result<Self, ::doclens::error::ConversionError> {
                    ::doclens::convert::ValueConverter::convert_compound(raw)
                }
            }

            impl ::doclens::convert::Compound for #ident {
                fn descriptor() -> &'static ::doclens::convert::CompoundDescriptor {
                    &DESCRIPTOR
                }

                #[allow(unused_variables)]
                fn set_attribute(
                    &mut self,
                    index: usize,
                    raw: ::doclens::value::RawValue,
                ) -> ::core::result::Result<(), ::doclens::error::ConversionError> {
                    match index {
                        #(#setters)*
                        _ => {}
                    }

                    ::core::result::Result::Ok(())
                }
            }
        };
    })
}
