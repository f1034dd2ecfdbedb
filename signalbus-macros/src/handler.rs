//! Handler-related parsing.
//!
//! This module contains:
//! - [`HandlerArgs`] - Arguments of `#[handler(...)]`
//! - [`HandlerMethod`] - A method checked against the handler contract
//!
//! The checks mirror the ones the bus runs at registration, so a listener
//! written with the macros is rejected at compile time instead.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    Attribute, Expr, FnArg, Ident, LitBool, Meta, Signature, Token, Type,
    parse::{Parse, ParseStream},
};

/// Arguments for the `#[handler]` attribute.
#[derive(Default)]
pub(crate) struct HandlerArgs {
    pub priority: Option<Expr>,
    pub polymorphic: Option<bool>,
    pub event: Option<Type>,
    pub sealed: Option<bool>,
}

impl Parse for HandlerArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = HandlerArgs::default();

        while !input.is_empty() {
            let ident: Ident = input.parse()?;

            match ident.to_string().as_str() {
                "priority" => {
                    input.parse::<Token![=]>()?;
                    args.priority = Some(input.parse()?);
                }
                "event" => {
                    input.parse::<Token![=]>()?;
                    args.event = Some(input.parse()?);
                }
                "polymorphic" => args.polymorphic = Some(parse_flag(input)?),
                "sealed" => args.sealed = Some(parse_flag(input)?),
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

        Ok(args)
    }
}

/// Parse `flag` or `flag = bool`.
pub(crate) fn parse_flag(input: ParseStream) -> syn::Result<bool> {
    if input.peek(Token![=]) {
        input.parse::<Token![=]>()?;
        let lit: LitBool = input.parse()?;
        Ok(lit.value)
    } else {
        Ok(true)
    }
}

/// Remove every `#[handler]` attribute from `attrs`, returning the parsed arguments.
///
/// Returns `Ok(None)` if the item carries no `#[handler]` attribute.
pub(crate) fn take_handler_attr(attrs: &mut Vec<Attribute>) -> syn::Result<Option<HandlerArgs>> {
    let is_handler = |attr: &Attribute| attr.path().is_ident("handler");
    let Some(index) = attrs.iter().position(is_handler) else {
        return Ok(None);
    };
    let attr = attrs.remove(index);

    if let Some(duplicate) = attrs.iter().find(|attr| is_handler(attr)) {
        return Err(syn::Error::new_spanned(duplicate, "duplicate #[handler] attribute"));
    }

    match &attr.meta {
        Meta::Path(_) => Ok(Some(HandlerArgs::default())),
        Meta::List(_) => attr.parse_args().map(Some),
        Meta::NameValue(_) => Err(syn::Error::new_spanned(
            attr,
            "expected #[handler] or #[handler(...)]",
        )),
    }
}

/// How the generated thunk reaches the method.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Receiver {
    /// `&self`
    Borrowed,
    /// No receiver: an associated function.
    None,
}

/// A method annotated with `#[handler]` that satisfies the handler contract.
pub(crate) struct HandlerMethod {
    name: Ident,
    receiver: Receiver,
    event: Option<Type>,
    args: HandlerArgs,
}

impl HandlerMethod {
    /// Check `sig` against the handler contract.
    pub(crate) fn analyze(sig: &Signature, args: HandlerArgs) -> syn::Result<Self> {
        let name = sig.ident.clone();

        if !sig.generics.params.is_empty() {
            return Err(syn::Error::new_spanned(
                &sig.generics,
                format!("{} must not be generic", name),
            ));
        }
        if let Some(asyncness) = &sig.asyncness {
            return Err(syn::Error::new_spanned(
                asyncness,
                format!(
                    "{} must not be async; event handlers run synchronously",
                    name
                ),
            ));
        }

        let mut receiver = Receiver::None;
        let mut parameters = Vec::new();
        for input in &sig.inputs {
            match input {
                FnArg::Receiver(recv) => {
                    if recv.reference.is_none() || recv.mutability.is_some() {
                        return Err(syn::Error::new_spanned(
                            recv,
                            format!("{} must take `&self`", name),
                        ));
                    }
                    receiver = Receiver::Borrowed;
                }
                FnArg::Typed(pat_type) => parameters.push(pat_type),
            }
        }

        if parameters.len() > 1 {
            return Err(syn::Error::new_spanned(
                &sig.inputs,
                format!(
                    "{} defines more than one parameter ({})",
                    name,
                    parameters.len()
                ),
            ));
        }

        let event = match (parameters.first(), &args.event) {
            (None, None) => {
                return Err(syn::Error::new_spanned(
                    sig,
                    format!("{} does not define an event type", name),
                ));
            }
            (Some(parameter), Some(_)) => {
                return Err(syn::Error::new_spanned(
                    parameter,
                    format!("{} defines an ambiguous event type", name),
                ));
            }
            (Some(parameter), None) => match &*parameter.ty {
                Type::Reference(reference) if reference.mutability.is_none() => {
                    Some((*reference.elem).clone())
                }
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "event parameter must be a shared reference (&Event)",
                    ));
                }
            },
            (None, Some(_)) => None,
        };

        Ok(HandlerMethod {
            name,
            receiver,
            event,
            args,
        })
    }

    /// Force the sealed flag unless `#[handler(sealed = ...)]` set it.
    pub(crate) fn seal_by_default(&mut self, sealed: bool) {
        self.args.sealed.get_or_insert(sealed);
    }

    /// Tokens building the `HandlerDecl` for this method, called through `owner`.
    ///
    /// `owner` is a path such as `Self` or `<Self as Trait>`.
    pub(crate) fn decl(&self, owner: &TokenStream) -> TokenStream {
        let name = &self.name;
        let name_str = name.to_string();

        let this = match self.receiver {
            Receiver::Borrowed => quote! { __this, },
            Receiver::None => quote! {},
        };
        let this_pat = match self.receiver {
            Receiver::Borrowed => quote! { __this },
            Receiver::None => quote! { _ },
        };

        let mut decl = match &self.event {
            Some(event) => quote! {
                ::signalbus::HandlerDecl::method(
                    #name_str,
                    |#this_pat: &Self, __event: &#event| #owner::#name(#this __event),
                )
            },
            None => quote! {
                ::signalbus::HandlerDecl::bare(#name_str, |#this_pat: &Self| #owner::#name(#this))
            },
        };

        if let Some(event) = &self.args.event {
            decl = quote! { #decl.event_type::<#event>() };
        }
        if let Some(priority) = &self.args.priority {
            decl = quote! { #decl.priority(#priority) };
        }
        if let Some(polymorphic) = self.args.polymorphic {
            decl = quote! { #decl.polymorphic(#polymorphic) };
        }
        if self.args.sealed == Some(true) {
            decl = quote! { #decl.sealed() };
        }

        decl
    }
}
