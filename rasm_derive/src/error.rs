//! Derive macro for error types.
//!
//! Generates `std::fmt::Display` and `std::error::Error` implementations from
//! an `#[error("...")]` attribute on every variant (or on the struct itself).
//!
//! ```ignore
//! use rasm_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum AsmError {
//!     #[error("unknown instruction `{name}`")]
//!     UnknownInstruction { name: String },
//!
//!     #[error("expected label")]
//!     ExpectedLabel,
//!
//!     #[error("io: {0}")]
//!     Io(String),
//! }
//! ```
//!
//! Unit, tuple (`{0}`, `{1}`) and struct (`{field}`) variants are supported.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Fields, Lit, Meta, parse_macro_input};

pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Enum(data) => {
            let arms = data
                .variants
                .iter()
                .map(|variant| {
                    let ident = &variant.ident;
                    let message = message_from_attrs(
                        &variant.attrs,
                        ident,
                        &format!("variant `{ident}`"),
                    )?;
                    let (pattern, args) = bind_fields(&variant.fields, false);
                    let format = positional_to_named(&message, variant.fields.len());
                    Ok(quote! {
                        Self::#ident #pattern => write!(f, #format #args),
                    })
                })
                .collect::<syn::Result<Vec<_>>>()?;

            quote! {
                match self {
                    #(#arms)*
                }
            }
        }
        Data::Struct(data) => {
            let message = message_from_attrs(&input.attrs, name, &format!("type `{name}`"))?;
            let (_, args) = bind_fields(&data.fields, true);
            let format = positional_to_named(&message, data.fields.len());
            quote! { write!(f, #format #args) }
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Error derive does not support unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                #body
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
    })
}

/// Returns the destructuring pattern and the trailing `name = value` format
/// arguments for a set of fields.
///
/// With `on_self`, values are read through `self.` instead of a pattern.
fn bind_fields(fields: &Fields, on_self: bool) -> (TokenStream2, TokenStream2) {
    match fields {
        Fields::Unit => (TokenStream2::new(), TokenStream2::new()),
        Fields::Unnamed(unnamed) => {
            let names: Vec<_> = (0..unnamed.unnamed.len())
                .map(|i| format_ident!("f{}", i))
                .collect();
            if on_self {
                let indices = (0..unnamed.unnamed.len()).map(syn::Index::from);
                (TokenStream2::new(), quote! { #(, #names = self.#indices)* })
            } else {
                (quote! { (#(#names),*) }, quote! { #(, #names = #names)* })
            }
        }
        Fields::Named(named) => {
            let names: Vec<_> = named.named.iter().map(|f| &f.ident).collect();
            if on_self {
                (TokenStream2::new(), quote! { #(, #names = self.#names)* })
            } else {
                (quote! { { #(#names),* } }, quote! { #(, #names = #names)* })
            }
        }
    }
}

/// Finds the `#[error("...")]` message among `attrs`.
fn message_from_attrs<T: ToTokens>(
    attrs: &[Attribute],
    target: &T,
    target_desc: &str,
) -> syn::Result<String> {
    let Some(attr) = attrs.iter().find(|a| a.path().is_ident("error")) else {
        return Err(syn::Error::new_spanned(
            target,
            format!("missing #[error(\"...\")] attribute on {target_desc}"),
        ));
    };

    let Meta::List(list) = &attr.meta else {
        return Err(syn::Error::new_spanned(
            &attr.meta,
            "expected #[error(\"message\")]",
        ));
    };

    match syn::parse2::<Lit>(list.tokens.clone()) {
        Ok(Lit::Str(s)) => Ok(s.value()),
        _ => Err(syn::Error::new_spanned(
            &attr.meta,
            "#[error] message must be a string literal, e.g. #[error(\"stack underflow\")]",
        )),
    }
}

/// Rewrites `{0}`, `{1}` into `{f0}`, `{f1}` so tuple fields can be passed as
/// named format arguments. Also keeps `{0:?}`-style specs intact.
fn positional_to_named(message: &str, field_count: usize) -> String {
    (0..field_count).rev().fold(message.to_string(), |acc, i| {
        acc.replace(&format!("{{{i}}}"), &format!("{{f{i}}}"))
            .replace(&format!("{{{i}:"), &format!("{{f{i}:"))
    })
}
