//! Listener-related macros.
//!
//! This module contains:
//! - `#[listener]` on an inherent `impl` block - Implements `Listener` for the type
//! - `#[listener]` on a trait - Lets implementors pull in the trait's handlers

use crate::handler::{HandlerMethod, parse_flag, take_handler_attr};
use proc_macro::TokenStream;
use quote::quote;
use syn::{
    Expr, Ident, ImplItem, Item, ItemImpl, ItemTrait, Member, Path, Token, TraitItem, Type,
    Visibility,
    parse::{Parse, ParseStream},
    parse_quote,
    punctuated::Punctuated,
};

/// One `field: Type` entry of `extends(...)`.
struct Ancestor {
    field: Member,
    ty: Type,
}

impl Parse for Ancestor {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let field = input.parse()?;
        input.parse::<Token![:]>()?;
        let ty = input.parse()?;
        Ok(Ancestor { field, ty })
    }
}

/// Arguments for the `#[listener]` macro.
#[derive(Default)]
struct ListenerArgs {
    priority: Option<Expr>,
    polymorphic: Option<bool>,
    extends: Vec<Ancestor>,
    implements: Vec<Path>,
}

impl Parse for ListenerArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = ListenerArgs::default();

        while !input.is_empty() {
            let ident: Ident = input.parse()?;

            match ident.to_string().as_str() {
                "priority" => {
                    input.parse::<Token![=]>()?;
                    args.priority = Some(input.parse()?);
                }
                "polymorphic" => args.polymorphic = Some(parse_flag(input)?),
                "extends" => {
                    let content;
                    syn::parenthesized!(content in input);
                    let ancestors = Punctuated::<Ancestor, Token![,]>::parse_terminated(&content)?;
                    args.extends.extend(ancestors);
                }
                "implements" => {
                    let content;
                    syn::parenthesized!(content in input);
                    let traits = Punctuated::<Path, Token![,]>::parse_terminated(&content)?;
                    args.implements.extend(traits);
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

        Ok(args)
    }
}

/// Implementation of the `#[listener]` attribute macro.
pub fn listener_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = syn::parse_macro_input!(attr as ListenerArgs);
    let item = syn::parse_macro_input!(item as Item);

    let expanded = match item {
        Item::Impl(item_impl) => expand_impl(args, item_impl),
        Item::Trait(item_trait) => expand_trait(args, item_trait),
        other => Err(syn::Error::new_spanned(
            other,
            "#[listener] can only be used on inherent impl blocks and traits",
        )),
    };

    match expanded {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn interface_decls(implements: &[Path]) -> Vec<proc_macro2::TokenStream> {
    implements
        .iter()
        .map(|path| {
            quote! {
                handlers.implement(<Self as #path>::__declare_handlers);
            }
        })
        .collect()
}

fn expand_impl(
    args: ListenerArgs,
    mut item_impl: ItemImpl,
) -> syn::Result<proc_macro2::TokenStream> {
    if let Some((_, path, _)) = &item_impl.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[listener] must be placed on an inherent impl block, not a trait impl",
        ));
    }

    let owner = quote! { Self };
    let mut decls = Vec::new();
    for impl_item in &mut item_impl.items {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };
        let Some(handler_args) = take_handler_attr(&mut method.attrs)? else {
            continue;
        };
        let mut handler = HandlerMethod::analyze(&method.sig, handler_args)?;
        // Private handlers belong to the declaring type and are never overridden
        handler.seal_by_default(matches!(method.vis, Visibility::Inherited));
        let decl = handler.decl(&owner);
        decls.push(quote! { handlers.add(#decl); });
    }

    let ancestors = args.extends.iter().map(|ancestor| {
        let field = &ancestor.field;
        let ty = &ancestor.ty;
        quote! {
            handlers.inherit::<#ty>(|__this: &Self| &__this.#field);
        }
    });
    let interfaces = interface_decls(&args.implements);

    let priority = match &args.priority {
        Some(priority) => quote! { ::core::option::Option::Some(#priority) },
        None => quote! { ::core::option::Option::None },
    };
    let polymorphic = match args.polymorphic {
        Some(polymorphic) => quote! { ::core::option::Option::Some(#polymorphic) },
        None => quote! { ::core::option::Option::None },
    };

    let self_ty = &item_impl.self_ty;
    let (impl_generics, _, where_clause) = item_impl.generics.split_for_impl();

    Ok(quote! {
        #item_impl

        impl #impl_generics ::signalbus::Listener for #self_ty #where_clause {
            const PRIORITY: ::core::option::Option<i32> = #priority;
            const POLYMORPHIC: ::core::option::Option<bool> = #polymorphic;

            #[allow(unused_variables)]
            fn declare(handlers: &mut ::signalbus::Handlers<Self>) {
                #(#decls)*
                #(#ancestors)*
                #(#interfaces)*
            }
        }
    })
}

fn expand_trait(
    args: ListenerArgs,
    mut item_trait: ItemTrait,
) -> syn::Result<proc_macro2::TokenStream> {
    if args.priority.is_some() || args.polymorphic.is_some() || !args.extends.is_empty() {
        return Err(syn::Error::new_spanned(
            &item_trait.ident,
            "a trait listener only accepts `implements(...)`",
        ));
    }

    let trait_name = &item_trait.ident;
    let owner = quote! { <Self as #trait_name> };
    let mut decls = Vec::new();
    for trait_item in &mut item_trait.items {
        let TraitItem::Fn(method) = trait_item else {
            continue;
        };
        let Some(handler_args) = take_handler_attr(&mut method.attrs)? else {
            continue;
        };
        let handler = HandlerMethod::analyze(&method.sig, handler_args)?;
        let decl = handler.decl(&owner);
        decls.push(quote! { handlers.add(#decl); });
    }
    let interfaces = interface_decls(&args.implements);

    item_trait.items.push(parse_quote! {
        #[doc(hidden)]
        #[allow(unused_variables)]
        fn __declare_handlers(handlers: &mut ::signalbus::Handlers<Self>)
        where
            Self: ::core::marker::Sized + 'static,
        {
            #(#decls)*
            #(#interfaces)*
        }
    });

    Ok(quote! { #item_trait })
}
