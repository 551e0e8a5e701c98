//! Derive macro for fixed-layout binary records.
//!
//! Generates `Encode` and `Decode` implementations (from `crate::encoding`)
//! for structs. Fields are written in declaration order with no padding and no
//! framing, which is what the bytecode instruction record needs:
//!
//! ```ignore
//! #[derive(BinaryCodec)]
//! pub struct Instruction {
//!     pub opcode: Opcode, // 1 byte
//!     pub operand: i64,   // 8 bytes, little-endian
//! }
//! ```
//!
//! Enums and unions are rejected: tagged types pick their own tag width by
//! implementing the traits by hand.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

pub fn derive_binary_codec(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let Data::Struct(data) = &input.data else {
        return syn::Error::new_spanned(
            &input,
            "BinaryCodec derive only supports structs; implement Encode/Decode by hand for tagged types",
        )
        .to_compile_error()
        .into();
    };

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let (encode_body, decode_body) = field_codecs(&data.fields);

    let expanded = quote! {
        impl #impl_generics crate::encoding::Encode for #name #ty_generics #where_clause {
            fn encode<S: crate::encoding::EncodeSink>(&self, out: &mut S) {
                #encode_body
            }
        }

        impl #impl_generics crate::encoding::Decode for #name #ty_generics #where_clause {
            fn decode(input: &mut &[u8]) -> ::std::result::Result<Self, crate::encoding::DecodeError> {
                #decode_body
            }
        }
    };

    expanded.into()
}

/// Builds the `encode` and `decode` bodies for a struct's fields.
fn field_codecs(fields: &Fields) -> (TokenStream2, TokenStream2) {
    match fields {
        Fields::Named(named) => {
            let names: Vec<_> = named.named.iter().map(|f| &f.ident).collect();
            (
                quote! {
                    let _ = &out;
                    #( crate::encoding::Encode::encode(&self.#names, out); )*
                },
                quote! {
                    let _ = &input;
                    Ok(Self {
                        #( #names: crate::encoding::Decode::decode(input)?, )*
                    })
                },
            )
        }
        Fields::Unnamed(unnamed) => {
            let indices: Vec<_> = (0..unnamed.unnamed.len())
                .map(syn::Index::from)
                .collect();
            let decodes = indices
                .iter()
                .map(|_| quote! { crate::encoding::Decode::decode(input)?, });
            (
                quote! {
                    let _ = &out;
                    #( crate::encoding::Encode::encode(&self.#indices, out); )*
                },
                quote! {
                    let _ = &input;
                    Ok(Self( #(#decodes)* ))
                },
            )
        }
        Fields::Unit => (
            quote! { let _ = out; },
            quote! {
                let _ = input;
                Ok(Self)
            },
        ),
    }
}
