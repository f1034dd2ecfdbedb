//! Event-related macros.
//!
//! This module contains:
//! - `#[derive(Event)]` - Implements `Event` and one `Extends` per declared supertype

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    DeriveInput, Ident, Member, Token, Type,
    parse::{Parse, ParseStream},
    parse_macro_input,
    punctuated::Punctuated,
};

/// One `supertype(Type)` or `supertype(Type, field = member)` entry.
struct SupertypeDecl {
    ty: Type,
    field: Option<Member>,
}

impl Parse for SupertypeDecl {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let ty: Type = input.parse()?;
        let mut field = None;

        if input.peek(Token![,]) {
            input.parse::<Token![,]>()?;
            let ident: Ident = input.parse()?;
            if ident != "field" {
                return Err(syn::Error::new(
                    ident.span(),
                    format!("unknown supertype option: {}", ident),
                ));
            }
            input.parse::<Token![=]>()?;
            field = Some(input.parse()?);
        }

        Ok(SupertypeDecl { ty, field })
    }
}

/// Arguments of one `#[event(...)]` attribute.
struct EventArgs {
    supertypes: Vec<SupertypeDecl>,
}

impl Parse for EventArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut supertypes = Vec::new();

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            match ident.to_string().as_str() {
                "supertype" => {
                    let content;
                    syn::parenthesized!(content in input);
                    supertypes.push(content.parse()?);
                }
                "supertypes" => {
                    let content;
                    syn::parenthesized!(content in input);
                    let types = Punctuated::<Type, Token![,]>::parse_terminated(&content)?;
                    for ty in types {
                        supertypes.push(SupertypeDecl { ty, field: None });
                    }
                }
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {}", other),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(EventArgs { supertypes })
    }
}

/// Implementation of `#[derive(Event)]`.
pub fn derive_event_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut supertypes = Vec::new();
    for attr in &input.attrs {
        if !attr.path().is_ident("event") {
            continue;
        }
        match attr.parse_args::<EventArgs>() {
            Ok(args) => supertypes.extend(args.supertypes),
            Err(err) => return err.to_compile_error().into(),
        }
    }

    let edges = supertypes.iter().map(|decl| {
        let ty = &decl.ty;
        quote! { ::signalbus::Supertype::of::<Self, #ty>() }
    });

    // A supertype without a field is a marker borrowed as a promoted constant
    let upcasts = supertypes.iter().map(|decl| {
        let ty = &decl.ty;
        let view = match &decl.field {
            Some(member) => quote! { &self.#member },
            None => quote! { &#ty },
        };
        quote! {
            impl #impl_generics ::signalbus::Extends<#ty> for #name #ty_generics #where_clause {
                fn upcast(&self) -> &#ty {
                    #view
                }
            }
        }
    });

    let supertypes_fn = if supertypes.is_empty() {
        None
    } else {
        Some(quote! {
            fn supertypes() -> ::std::vec::Vec<::signalbus::Supertype> {
                ::std::vec![#(#edges),*]
            }
        })
    };

    let expanded = quote! {
        impl #impl_generics ::signalbus::Event for #name #ty_generics #where_clause {
            #supertypes_fn
        }

        #(#upcasts)*
    };

    TokenStream::from(expanded)
}
