//! Shared attribute-parsing helpers for the `#[cached]` procedural macro.

use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{Expr, Lit, Meta, Path, Token};

/// Parsed `#[cached(...)]` attribute contents.
pub struct CachedAttributes {
    /// `name = "..."`: identifies the backing static `Cache<V>`. Defaults to
    /// the function's own name.
    pub name: Option<String>,
    /// `capacity = N`: max entries, as a `usize` expression. Defaults to 1000.
    pub capacity: TokenStream2,
    /// `ttl = N` (seconds), as an `Option<Duration>` expression.
    pub ttl: TokenStream2,
    /// `eviction = "lru"|"lfu"|"fifo"`, as a `StrategyKind` expression.
    pub eviction: TokenStream2,
    /// `key_fn = path::to::fn`: overrides default key generation.
    pub key_fn: Option<Path>,
    /// `disable_cache_if = path::to::fn`: opt-out predicate over the key-args.
    pub disable_cache_if: Option<Path>,
    /// `cache_errors`: when the wrapped function returns `Result`, also cache
    /// `Err` values (under `error_ttl`).
    pub cache_errors: bool,
    /// `error_ttl = N` (seconds). Defaults to `ttl` when `cache_errors` is set.
    pub error_ttl: TokenStream2,
}

impl Default for CachedAttributes {
    fn default() -> Self {
        Self {
            name: None,
            capacity: quote! { 1000usize },
            ttl: quote! { Option::<::std::time::Duration>::None },
            eviction: quote! { ::memocache_core::StrategyKind::Lru },
            key_fn: None,
            disable_cache_if: None,
            cache_errors: false,
            error_ttl: quote! { Option::<::std::time::Duration>::None },
        }
    }
}

pub fn parse_cached_attributes(attr: TokenStream2) -> syn::Result<CachedAttributes> {
    let mut attrs = CachedAttributes::default();
    if attr.is_empty() {
        return Ok(attrs);
    }

    let metas = Punctuated::<Meta, Token![,]>::parse_terminated.parse2(attr)?;
    let mut ttl_set = false;
    let mut error_ttl_set = false;

    for meta in metas {
        match &meta {
            Meta::NameValue(nv) => {
                let ident = nv
                    .path
                    .get_ident()
                    .map(|i| i.to_string())
                    .unwrap_or_default();
                match ident.as_str() {
                    "capacity" => attrs.capacity = parse_usize_attribute(&nv.value)?,
                    "ttl" => {
                        attrs.ttl = parse_duration_attribute(&nv.value)?;
                        ttl_set = true;
                    }
                    "eviction" => attrs.eviction = parse_eviction_attribute(&nv.value)?,
                    "name" => attrs.name = Some(parse_string_attribute(&nv.value)?),
                    "key_fn" => attrs.key_fn = Some(parse_path_attribute(&nv.value)?),
                    "disable_cache_if" => {
                        attrs.disable_cache_if = Some(parse_path_attribute(&nv.value)?)
                    }
                    "error_ttl" => {
                        attrs.error_ttl = parse_duration_attribute(&nv.value)?;
                        error_ttl_set = true;
                    }
                    other => {
                        return Err(syn::Error::new_spanned(
                            &nv.path,
                            format!("unknown `#[cached]` attribute `{other}`"),
                        ))
                    }
                }
            }
            Meta::Path(path) => {
                if path.is_ident("cache_errors") {
                    attrs.cache_errors = true;
                } else {
                    return Err(syn::Error::new_spanned(
                        path,
                        "unknown `#[cached]` flag, expected `cache_errors`",
                    ));
                }
            }
            Meta::List(list) => {
                return Err(syn::Error::new_spanned(
                    list,
                    "unexpected list attribute inside `#[cached(...)]`",
                ))
            }
        }
    }

    if error_ttl_set && !ttl_set {
        // error_ttl with no base ttl is still valid: errors get their own TTL.
    }
    if attrs.cache_errors && !error_ttl_set {
        attrs.error_ttl = attrs.ttl.clone();
    }

    Ok(attrs)
}

fn parse_usize_attribute(expr: &Expr) -> syn::Result<TokenStream2> {
    match expr {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            Lit::Int(lit_int) => {
                let val = lit_int.base10_parse::<usize>()?;
                Ok(quote! { #val })
            }
            _ => Err(syn::Error::new_spanned(expr_lit, "expected an integer")),
        },
        _ => Err(syn::Error::new_spanned(expr, "expected `name = <integer>`")),
    }
}

fn parse_duration_attribute(expr: &Expr) -> syn::Result<TokenStream2> {
    match expr {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            Lit::Int(lit_int) => {
                let val = lit_int.base10_parse::<u64>()?;
                Ok(quote! { Some(::std::time::Duration::from_secs(#val)) })
            }
            _ => Err(syn::Error::new_spanned(
                expr_lit,
                "expected an integer number of seconds",
            )),
        },
        _ => Err(syn::Error::new_spanned(
            expr,
            "expected `name = <integer seconds>`",
        )),
    }
}

fn parse_eviction_attribute(expr: &Expr) -> syn::Result<TokenStream2> {
    match expr {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            Lit::Str(s) => match s.value().as_str() {
                "lru" => Ok(quote! { ::memocache_core::StrategyKind::Lru }),
                "lfu" => Ok(quote! { ::memocache_core::StrategyKind::Lfu }),
                "fifo" => Ok(quote! { ::memocache_core::StrategyKind::Fifo }),
                other => Err(syn::Error::new_spanned(
                    s,
                    format!("unknown eviction strategy `{other}`, expected lru/lfu/fifo"),
                )),
            },
            _ => Err(syn::Error::new_spanned(expr_lit, "expected a string")),
        },
        _ => Err(syn::Error::new_spanned(
            expr,
            "expected `eviction = \"lru\"|\"lfu\"|\"fifo\"`",
        )),
    }
}

fn parse_string_attribute(expr: &Expr) -> syn::Result<String> {
    match expr {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            Lit::Str(s) => Ok(s.value()),
            _ => Err(syn::Error::new_spanned(expr_lit, "expected a string")),
        },
        _ => Err(syn::Error::new_spanned(expr, "expected a string literal")),
    }
}

fn parse_path_attribute(expr: &Expr) -> syn::Result<Path> {
    match expr {
        Expr::Path(expr_path) => Ok(expr_path.path.clone()),
        _ => Err(syn::Error::new_spanned(expr, "expected a function path")),
    }
}
