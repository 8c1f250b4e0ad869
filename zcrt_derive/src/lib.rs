//! Derive macro for `zcrt::Record`.
//!
//! Generates both the field-tagged (v2) and positional (v1) encode/decode
//! bodies for a struct, plus the all-zero constructor schema evolution
//! falls back to when a field is missing from both the wire and the
//! schema's defaults.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input,
    Data,
    DataStruct,
    DeriveInput,
    Fields,
    FieldsNamed,
};

#[proc_macro_derive(Record)]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(DataStruct { fields: Fields::Named(FieldsNamed { named, .. }), .. }) => named,
        _ => panic!("Record can only be derived for structs with named fields"),
    };

    let field_idents: Vec<_> = fields.iter().map(|f| f.ident.clone().unwrap()).collect();
    let field_names: Vec<String> = field_idents.iter().map(|i| i.to_string()).collect();
    let field_count = field_idents.len();

    let write_fields_body = write_tagged_body(&field_idents, &field_names);
    let write_fields_fixed_body = write_fixed_body(&field_idents);
    let read_fields_body = read_tagged_body(name, &field_idents, &field_names);
    let read_fields_fixed_body = read_fixed_body(name, &field_idents);
    let zero_fields_body = zero_body(name, &field_idents);

    let expanded = quote! {
        impl ::zcrt::Record for #name {
            const FIELD_COUNT: usize = #field_count;

            fn write_fields(&self, w: &mut ::zcrt::WriteCursor) -> ::zcrt::error::Result<()> {
                #write_fields_body
                Ok(())
            }

            fn write_fields_fixed(&self, w: &mut ::zcrt::WriteCursor) -> ::zcrt::error::Result<()> {
                #write_fields_fixed_body
                Ok(())
            }

            fn read_fields(
                r: &mut ::zcrt::ReadCursor,
                schema: ::core::option::Option<&::zcrt::Schema>,
            ) -> ::zcrt::error::Result<Self> {
                #read_fields_body
            }

            fn read_fields_fixed(r: &mut ::zcrt::ReadCursor) -> ::zcrt::error::Result<Self> {
                #read_fields_fixed_body
            }

            fn zero_fields() -> Self {
                #zero_fields_body
            }
        }
    };

    expanded.into()
}

fn write_tagged_body(idents: &[syn::Ident], names: &[String]) -> TokenStream2 {
    let writes = idents.iter().zip(names.iter()).map(|(ident, name)| {
        quote! {
            ::zcrt::encode_field(w, #name, &self.#ident)?;
        }
    });
    quote! { #(#writes)* }
}

fn write_fixed_body(idents: &[syn::Ident]) -> TokenStream2 {
    let writes = idents.iter().map(|ident| {
        quote! {
            ::zcrt::FieldValue::encode_fixed(&self.#ident, w)?;
        }
    });
    quote! { #(#writes)* }
}

fn read_tagged_body(name: &syn::Ident, idents: &[syn::Ident], names: &[String]) -> TokenStream2 {
    let locals = idents.iter().map(|ident| {
        quote! { let mut #ident = ::core::option::Option::None; }
    });
    let arms = idents.iter().zip(names.iter()).map(|(ident, fname)| {
        quote! {
            #fname => {
                #ident = ::core::option::Option::Some(
                    ::zcrt::FieldValue::decode_coerced(tag, cursor)?
                );
                ::core::result::Result::Ok(true)
            }
        }
    });
    let materialize = idents.iter().zip(names.iter()).map(|(ident, fname)| {
        quote! {
            let #ident = match #ident {
                ::core::option::Option::Some(v) => v,
                ::core::option::Option::None => ::zcrt::materialize_default(#fname, schema)?,
            };
        }
    });
    quote! {
        #(#locals)*
        ::zcrt::decode_struct_body(r, |name, tag, cursor| {
            match name {
                #(#arms,)*
                _ => ::core::result::Result::Ok(false),
            }
        })?;
        #(#materialize)*
        ::core::result::Result::Ok(#name { #(#idents,)* })
    }
}

fn read_fixed_body(name: &syn::Ident, idents: &[syn::Ident]) -> TokenStream2 {
    let reads = idents.iter().map(|ident| {
        quote! {
            let #ident = ::zcrt::FieldValue::decode_fixed(r)?;
        }
    });
    quote! {
        #(#reads)*
        ::core::result::Result::Ok(#name { #(#idents,)* })
    }
}

fn zero_body(name: &syn::Ident, idents: &[syn::Ident]) -> TokenStream2 {
    let inits = idents.iter().map(|ident| {
        quote! { #ident: ::zcrt::FieldValue::zero_value() }
    });
    quote! {
        #name { #(#inits,)* }
    }
}
