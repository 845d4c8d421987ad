//! Procedural macros for func-factory registration.
//!
//! `#[register]` leaves the annotated function untouched and emits, next to
//! it, an adapter that decodes [`Arguments`] into the declared parameters plus
//! an `inventory` submission describing the function. `Namespace::collect`
//! turns those submissions into tagged functions.
//!
//! [`Arguments`]: https://docs.rs/func-factory/latest/func_factory/struct.Arguments.html

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote, quote_spanned};
use syn::ext::IdentExt;
use syn::meta::ParseNestedMeta;
use syn::{FnArg, ItemFn, LitStr, Meta, Pat, ReturnType, Type, parse_macro_input};

/// Registers a free function under a group and alias.
///
/// ```ignore
/// #[register]                                  // alias `ping`, group `DEFAULT`
/// fn ping() -> &'static str { "pong" }
///
/// #[register(alias = "sum", group = "math")]
/// fn add(a: i64, b: i64) -> i64 { a + b }
/// ```
///
/// Parameters must implement `serde::de::DeserializeOwned` and are matched by
/// keyword name first, then by position. The return value must implement
/// `serde::Serialize`; a `Result` return type is propagated as the call's
/// error. Methods, generic, `unsafe` and `async` functions are rejected, as is a
/// second `#[register]` on the same function naming the same group.
#[proc_macro_attribute]
pub fn register(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut args = RegisterArgs::default();
    let parser = syn::meta::parser(|meta| args.parse(&meta));
    parse_macro_input!(attr with parser);
    let function = parse_macro_input!(item as ItemFn);

    expand(&args, &function)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[derive(Default)]
struct RegisterArgs {
    alias: Option<LitStr>,
    group: Option<LitStr>,
}

impl RegisterArgs {
    fn parse(&mut self, meta: &ParseNestedMeta) -> syn::Result<()> {
        let slot = if meta.path.is_ident("alias") {
            &mut self.alias
        } else if meta.path.is_ident("group") {
            &mut self.group
        } else {
            return Err(meta.error("unsupported register argument, expected `alias` or `group`"));
        };

        if slot.is_some() {
            return Err(meta.error("argument given more than once"));
        }
        let value: LitStr = meta.value()?.parse()?;
        if value.value().trim().is_empty() {
            return Err(syn::Error::new(value.span(), "value cannot be empty"));
        }
        *slot = Some(value);
        Ok(())
    }

    /// Group name as written, `None` meaning the default group.
    fn group_name(&self) -> Option<String> {
        self.group.as_ref().map(LitStr::value)
    }
}

fn expand(args: &RegisterArgs, function: &ItemFn) -> syn::Result<TokenStream2> {
    let sig = &function.sig;
    if let Some(asyncness) = sig.asyncness {
        return Err(syn::Error::new_spanned(
            asyncness,
            "async functions cannot be registered",
        ));
    }
    if let Some(unsafety) = sig.unsafety {
        return Err(syn::Error::new_spanned(
            unsafety,
            "unsafe functions cannot be registered",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "generic functions cannot be registered",
        ));
    }
    if let Some(variadic) = &sig.variadic {
        return Err(syn::Error::new_spanned(
            variadic,
            "variadic functions cannot be registered",
        ));
    }
    reject_repeated_group(args, function)?;

    let mut decode = Vec::with_capacity(sig.inputs.len());
    let mut locals = Vec::with_capacity(sig.inputs.len());
    for (index, input) in sig.inputs.iter().enumerate() {
        let FnArg::Typed(typed) = input else {
            return Err(syn::Error::new_spanned(
                input,
                "methods cannot be registered, only free functions",
            ));
        };
        let keyword = match typed.pat.as_ref() {
            Pat::Ident(pat) => pat.ident.unraw().to_string(),
            _ => String::new(),
        };
        let local = format_ident!("__arg{}", index);
        let ty = &typed.ty;
        decode.push(quote! {
            let #local: #ty = args.take(#index, #keyword)?;
        });
        locals.push(local);
    }
    let arity = locals.len();

    let ident = &sig.ident;
    let name = ident.unraw().to_string();
    let call = if returns_result(&sig.output) {
        quote! { #ident(#(#locals),*)? }
    } else {
        quote! { #ident(#(#locals),*) }
    };
    let alias = match &args.alias {
        Some(alias) => quote! { ::core::option::Option::Some(#alias) },
        None => quote! { ::core::option::Option::None },
    };
    // Resolved at the function name, so stacked attributes agree on it.
    let site = quote_spanned! {ident.span()=>
        ::core::concat!(::core::file!(), ":", ::core::line!(), ":", ::core::column!())
    };
    let group = match &args.group {
        Some(group) => quote! { #group },
        None => quote! { ::func_factory::DEFAULT_GROUP },
    };

    Ok(quote! {
        #function

        const _: () = {
            #[allow(unused_mut)]
            fn __func_factory_call(
                mut args: ::func_factory::Arguments,
            ) -> ::func_factory::__private::anyhow::Result<::func_factory::__private::serde_json::Value> {
                #(#decode)*
                args.finish(#arity)?;
                let output = #call;
                ::core::result::Result::Ok(::func_factory::__private::serde_json::to_value(output)?)
            }

            ::func_factory::__private::inventory::submit! {
                ::func_factory::Registration::new(
                    ::core::module_path!(),
                    #name,
                    #site,
                    #alias,
                    #group,
                    __func_factory_call,
                )
            }
        };
    })
}

// Attributes still on the item are the ones written below this one.
fn reject_repeated_group(args: &RegisterArgs, function: &ItemFn) -> syn::Result<()> {
    let group = args.group_name();
    for attr in &function.attrs {
        let is_register = attr
            .path()
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "register");
        if !is_register {
            continue;
        }

        let mut other = RegisterArgs::default();
        if !matches!(attr.meta, Meta::Path(_)) {
            attr.parse_nested_meta(|meta| other.parse(&meta))?;
        }
        if same_group(group.as_deref(), other.group_name().as_deref()) {
            return Err(syn::Error::new_spanned(
                attr,
                format!(
                    "`{}` is already registered for group `{}`; a function can carry one tag per group",
                    function.sig.ident,
                    group.as_deref().unwrap_or("DEFAULT"),
                ),
            ));
        }
    }
    Ok(())
}

fn same_group(left: Option<&str>, right: Option<&str>) -> bool {
    left.unwrap_or("DEFAULT") == right.unwrap_or("DEFAULT")
}

fn returns_result(output: &ReturnType) -> bool {
    let ReturnType::Type(_, ty) = output else {
        return false;
    };
    let Type::Path(path) = ty.as_ref() else {
        return false;
    };
    path.path
        .segments
        .last()
        .is_some_and(|segment| segment.ident == "Result")
}
