//! The `#[cached]` attribute: wraps a function body in a named, statically
//! allocated [`memocache_core::Cache`], generating a key from the function's
//! own arguments and routing misses through singleflight.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{FnArg, GenericArgument, ItemFn, Pat, PathArguments, ReturnType, Type};

use memocache_macro_utils::parse_cached_attributes;

/// Emits `tokens` unchanged but preceded by a `compile_error!`, so the macro
/// fails at expansion time with a normal Rust diagnostic instead of panicking
/// the proc-macro process.
fn bail(span: proc_macro2::Span, message: &str) -> TokenStream {
    syn::Error::new(span, message).to_compile_error().into()
}

/// A function parameter recognized as the call's ambient hook context: its
/// pattern is threaded through to the cache instead of being hashed into the
/// key.
struct ContextParam {
    as_ref_expr: TokenStream2,
}

fn type_is_hook_context(ty: &Type) -> bool {
    let inner = match ty {
        Type::Reference(r) => &*r.elem,
        other => other,
    };
    matches!(inner, Type::Path(p) if p.path.segments.last().map(|s| s.ident == "HookContext").unwrap_or(false))
}

fn find_context_param(inputs: &[FnArg]) -> Option<(usize, ContextParam)> {
    for (idx, arg) in inputs.iter().enumerate() {
        if let FnArg::Typed(pat_type) = arg {
            if type_is_hook_context(&pat_type.ty) {
                let pat = &pat_type.pat;
                let as_ref_expr = match &*pat_type.ty {
                    Type::Reference(_) => quote! { #pat },
                    _ => quote! { &#pat },
                };
                return Some((idx, ContextParam { as_ref_expr }));
            }
        }
    }
    None
}

/// If `ty` is `Result<T, E>`, returns `(T, E)`.
fn result_inner_types(ty: &Type) -> Option<(Type, Type)> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Result" {
        return None;
    }
    let PathArguments::AngleBracketed(generics) = &segment.arguments else {
        return None;
    };
    let mut types = generics.args.iter().filter_map(|a| match a {
        GenericArgument::Type(t) => Some(t.clone()),
        _ => None,
    });
    let ok_ty = types.next()?;
    let err_ty = types.next()?;
    Some((ok_ty, err_ty))
}

/// Wraps a function in a static, singleflight-backed cache keyed on its own
/// arguments.
///
/// Attributes (all optional): `capacity = N`, `ttl = <seconds>`,
/// `eviction = "lru"|"lfu"|"fifo"`, `name = "..."`, `key_fn = path`,
/// `disable_cache_if = path`, `cache_errors`, `error_ttl = <seconds>`.
///
/// An ambient [`memocache_core::HookContext`] parameter (by value or by
/// reference, anywhere in the argument list) is threaded through to the
/// cache's context-aware hooks and excluded from the generated key. A
/// `Result<T, E>` return type is cached as `T` on success; `Err` values are
/// cached only when `cache_errors` is set, under `error_ttl`.
#[proc_macro_attribute]
pub fn cached(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attrs = match parse_cached_attributes(attr.into()) {
        Ok(attrs) => attrs,
        Err(err) => return err.to_compile_error().into(),
    };

    let input = syn::parse_macro_input!(item as ItemFn);
    let vis = &input.vis;
    let sig = &input.sig;
    let ident = &sig.ident;
    let block = &input.block;

    if sig.asyncness.is_some() {
        return bail(sig.fn_token.span, "#[cached] does not support async fn: singleflight coalescing blocks the calling thread");
    }
    if sig.variadic.is_some() {
        return bail(
            sig.fn_token.span,
            "#[cached] does not support variadic functions",
        );
    }
    if !sig.generics.params.is_empty() {
        return bail(
            sig.fn_token.span,
            "#[cached] does not support generic functions: the backing cache is keyed on one concrete value type",
        );
    }
    if sig.inputs.iter().any(|a| matches!(a, FnArg::Receiver(_))) {
        return bail(
            sig.fn_token.span,
            "#[cached] does not support methods: a `self` receiver has no key-arg encoding. Wrap a free function instead",
        );
    }

    let inputs: Vec<FnArg> = sig.inputs.iter().cloned().collect();
    let context = find_context_param(&inputs);
    let context_idx = context.as_ref().map(|(idx, _)| *idx);

    let key_arg_pats: Vec<TokenStream2> = inputs
        .iter()
        .enumerate()
        .filter(|(idx, _)| Some(*idx) != context_idx)
        .filter_map(|(_, arg)| match arg {
            FnArg::Typed(pat_type) => match &*pat_type.pat {
                Pat::Ident(pat_ident) => Some(quote! { #pat_ident }),
                _ => None,
            },
            FnArg::Receiver(_) => None,
        })
        .collect();

    let ctx_setup = match &context {
        Some((_, ctx)) => {
            let expr = &ctx.as_ref_expr;
            quote! { let __ctx: &::memocache_core::HookContext = #expr; }
        }
        None => quote! {
            let __ctx_owned = ::memocache_core::HookContext::new();
            let __ctx: &::memocache_core::HookContext = &__ctx_owned;
        },
    };

    let ret_syn_type: Option<Type> = match &sig.output {
        ReturnType::Type(_, ty) => Some((**ty).clone()),
        ReturnType::Default => None,
    };
    let ret_type: TokenStream2 = match &ret_syn_type {
        Some(ty) => quote! { #ty },
        None => quote! { () },
    };
    let result_types = ret_syn_type.as_ref().and_then(result_inner_types);

    let cache_name = attrs.name.clone().unwrap_or_else(|| ident.to_string());
    let cache_static = format_ident!("__MEMOCACHE_CACHE_{}", ident.to_string().to_uppercase());

    let capacity = &attrs.capacity;
    let eviction = &attrs.eviction;
    let ttl = &attrs.ttl;
    let error_ttl = &attrs.error_ttl;
    let cache_errors = attrs.cache_errors;

    let key_expr = match &attrs.key_fn {
        Some(key_fn) => quote! { (#key_fn)(&__key_args) },
        None => quote! {
            ::memocache_core::KeyGenerator::generate(&::memocache_core::DefaultKeyGenerator, &__key_args)
        },
    };

    let disable_check = attrs.disable_cache_if.as_ref().map(|pred| {
        quote! {
            if (#pred)(&__key_args) {
                return (|| #block)();
            }
        }
    });

    let body = if let Some((ok_ty, err_ty)) = result_types {
        let cache_value_type = quote! { ::memocache_core::CachedOutcome<#ok_ty, #err_ty> };
        quote! {
            static #cache_static: ::once_cell::sync::Lazy<::memocache_core::Cache<#cache_value_type>> =
                ::once_cell::sync::Lazy::new(|| {
                    ::memocache_core::CacheBuilder::<#cache_value_type>::new(#cache_name)
                        .max_entries(#capacity)
                        .eviction(#eviction)
                        .default_ttl_opt(#ttl)
                        .build()
                        .expect("invalid #[cached] cache configuration")
                });

            let __key_args: Vec<::memocache_core::KeyArg> = vec![
                #(::memocache_core::ToKeyArg::to_key_arg(&#key_arg_pats)),*
            ];
            #disable_check
            #ctx_setup
            let __key = #key_expr;

            let __outcome = #cache_static.get_or_compute_filtered_with_context(
                __ctx,
                &__key,
                &__key_args,
                || {
                    match (|| #block)() {
                        Ok(__v) => Ok(::memocache_core::CachedOutcome::Ok(__v)),
                        Err(__e) => Ok(::memocache_core::CachedOutcome::Err(__e)),
                    }
                },
                |__outcome| match __outcome {
                    ::memocache_core::CachedOutcome::Ok(_) => true,
                    ::memocache_core::CachedOutcome::Err(_) => #cache_errors,
                },
                |__outcome| match __outcome {
                    ::memocache_core::CachedOutcome::Ok(_) => #ttl,
                    ::memocache_core::CachedOutcome::Err(_) => #error_ttl,
                },
            );

            match __outcome {
                Ok(outcome) => outcome.into_result(),
                Err(err) => panic!("#[cached] computation aborted: {err}"),
            }
        }
    } else {
        quote! {
            static #cache_static: ::once_cell::sync::Lazy<::memocache_core::Cache<#ret_type>> =
                ::once_cell::sync::Lazy::new(|| {
                    ::memocache_core::CacheBuilder::<#ret_type>::new(#cache_name)
                        .max_entries(#capacity)
                        .eviction(#eviction)
                        .default_ttl_opt(#ttl)
                        .build()
                        .expect("invalid #[cached] cache configuration")
                });

            let __key_args: Vec<::memocache_core::KeyArg> = vec![
                #(::memocache_core::ToKeyArg::to_key_arg(&#key_arg_pats)),*
            ];
            #disable_check
            #ctx_setup
            let __key = #key_expr;

            let __result = #cache_static.get_or_compute_filtered_with_context(
                __ctx,
                &__key,
                &__key_args,
                || Ok((|| #block)()),
                |_| true,
                |_| #ttl,
            );

            match __result {
                Ok(value) => value,
                Err(err) => panic!("#[cached] computation aborted: {err}"),
            }
        }
    };

    let expanded = quote! {
        #vis #sig {
            #body
        }
    };

    TokenStream::from(expanded)
}
