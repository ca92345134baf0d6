use std::sync::Arc;

use sha2::{Digest, Sha256};

const MAX_INLINE_LEN: usize = 64;
const MAX_INLINE_SLICE: usize = 10;
const MAX_INLINE_MAP: usize = 5;
const MAX_STRUCT_FIELDS: usize = 10;

/// A typed stand-in for one positional argument of a wrapped call. Rust has
/// no runtime reflection, so a `#[cached]` call site converts each key-arg
/// via [`ToKeyArg`] before handing the list to a [`KeyGenerator`] — this is
/// the "caller-provided adapter" variant of reflective wrapping, made
/// automatic for common shapes via blanket impls below.
#[derive(Clone, Debug)]
pub enum KeyArg {
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bool(bool),
    Nil,
    Ptr(Box<KeyArg>),
    Slice(Vec<KeyArg>),
    Map(Vec<(KeyArg, KeyArg)>),
    Struct(&'static str, Vec<(&'static str, KeyArg)>),
    Iface(Box<KeyArg>),
}

impl KeyArg {
    /// The spec's type-tagged encoding for a single argument, without its
    /// positional-index prefix.
    fn encode(&self) -> String {
        match self {
            KeyArg::Int(v) => format!("i:{v}"),
            KeyArg::UInt(v) => format!("u:{v}"),
            KeyArg::Float(v) => format!("f:{v}"),
            KeyArg::Str(v) => format!("s:{v}"),
            KeyArg::Bool(v) => format!("b:{v}"),
            KeyArg::Nil => "nil".to_string(),
            KeyArg::Ptr(inner) => format!("ptr:{}", inner.encode()),
            KeyArg::Iface(inner) => format!("iface:{}", inner.encode()),
            KeyArg::Slice(items) => {
                if items.len() <= MAX_INLINE_SLICE {
                    let inline = items
                        .iter()
                        .map(KeyArg::encode)
                        .collect::<Vec<_>>()
                        .join(",");
                    format!("slice:[{inline}]")
                } else {
                    let first = items.first().map(KeyArg::encode).unwrap_or_default();
                    let last = items.last().map(KeyArg::encode).unwrap_or_default();
                    format!("slice:len{}:{first}…{last}", items.len())
                }
            }
            KeyArg::Map(pairs) => {
                if pairs.len() <= MAX_INLINE_MAP {
                    let mut sorted = pairs.clone();
                    sorted.sort_by(|a, b| a.0.encode().cmp(&b.0.encode()));
                    let inline = sorted
                        .iter()
                        .map(|(k, v)| format!("{}={}", k.encode(), v.encode()))
                        .collect::<Vec<_>>()
                        .join(",");
                    format!("map:{{{inline}}}")
                } else {
                    format!("map:len{}:map", pairs.len())
                }
            }
            KeyArg::Struct(name, fields) => {
                let fields = fields
                    .iter()
                    .take(MAX_STRUCT_FIELDS)
                    .map(|(k, v)| format!("{k}:{}", v.encode()))
                    .collect::<Vec<_>>()
                    .join(",");
                format!("struct:{name}{{{fields}}}")
            }
        }
    }
}

/// Converts a concrete argument type into a [`KeyArg`]. Blanket impls cover
/// the primitive and container shapes the spec's grammar names; a function
/// wrapped by `#[cached]` requires every key-arg type to implement this.
pub trait ToKeyArg {
    fn to_key_arg(&self) -> KeyArg;
}

macro_rules! impl_int_key_arg {
    ($($t:ty),*) => {
        $(impl ToKeyArg for $t {
            fn to_key_arg(&self) -> KeyArg { KeyArg::Int(*self as i64) }
        })*
    };
}

macro_rules! impl_uint_key_arg {
    ($($t:ty),*) => {
        $(impl ToKeyArg for $t {
            fn to_key_arg(&self) -> KeyArg { KeyArg::UInt(*self as u64) }
        })*
    };
}

impl_int_key_arg!(i8, i16, i32, i64, isize);
impl_uint_key_arg!(u8, u16, u32, u64, usize);

impl ToKeyArg for f32 {
    fn to_key_arg(&self) -> KeyArg {
        KeyArg::Float(*self as f64)
    }
}
impl ToKeyArg for f64 {
    fn to_key_arg(&self) -> KeyArg {
        KeyArg::Float(*self)
    }
}
impl ToKeyArg for bool {
    fn to_key_arg(&self) -> KeyArg {
        KeyArg::Bool(*self)
    }
}
impl ToKeyArg for str {
    fn to_key_arg(&self) -> KeyArg {
        KeyArg::Str(self.to_string())
    }
}
impl ToKeyArg for String {
    fn to_key_arg(&self) -> KeyArg {
        KeyArg::Str(self.clone())
    }
}
impl<T: ToKeyArg + ?Sized> ToKeyArg for &T {
    fn to_key_arg(&self) -> KeyArg {
        (**self).to_key_arg()
    }
}
impl<T: ToKeyArg> ToKeyArg for Option<T> {
    fn to_key_arg(&self) -> KeyArg {
        match self {
            Some(v) => KeyArg::Iface(Box::new(v.to_key_arg())),
            None => KeyArg::Nil,
        }
    }
}
impl<T: ToKeyArg> ToKeyArg for Vec<T> {
    fn to_key_arg(&self) -> KeyArg {
        KeyArg::Slice(self.iter().map(ToKeyArg::to_key_arg).collect())
    }
}
impl<T: ToKeyArg> ToKeyArg for [T] {
    fn to_key_arg(&self) -> KeyArg {
        KeyArg::Slice(self.iter().map(ToKeyArg::to_key_arg).collect())
    }
}
impl<K: ToKeyArg, V: ToKeyArg> ToKeyArg for std::collections::BTreeMap<K, V> {
    fn to_key_arg(&self) -> KeyArg {
        KeyArg::Map(
            self.iter()
                .map(|(k, v)| (k.to_key_arg(), v.to_key_arg()))
                .collect(),
        )
    }
}
impl<K: ToKeyArg, V: ToKeyArg> ToKeyArg for std::collections::HashMap<K, V> {
    fn to_key_arg(&self) -> KeyArg {
        KeyArg::Map(
            self.iter()
                .map(|(k, v)| (k.to_key_arg(), v.to_key_arg()))
                .collect(),
        )
    }
}

/// Produces a deterministic string key from an ordered, heterogeneous
/// argument list.
pub trait KeyGenerator: Send + Sync {
    fn generate(&self, args: &[KeyArg]) -> String;
}

/// Type-tagged, collision-resistant, order-sensitive key generator. Falls
/// back to the hex SHA-256 digest of the joined encoding whenever that
/// encoding exceeds 64 bytes.
#[derive(Default)]
pub struct DefaultKeyGenerator;

impl KeyGenerator for DefaultKeyGenerator {
    fn generate(&self, args: &[KeyArg]) -> String {
        let joined = args
            .iter()
            .enumerate()
            .map(|(i, a)| format!("{i}:{}", a.encode()))
            .collect::<Vec<_>>()
            .join("|");

        if joined.len() > MAX_INLINE_LEN {
            let mut hasher = Sha256::new();
            hasher.update(joined.as_bytes());
            format!("{:x}", hasher.finalize())
        } else {
            joined
        }
    }
}

/// Best-effort `value:value:…` concatenation using `Display`-style
/// stringification. Faster and collision-prone; intended for callers who
/// know their arguments have unambiguous string forms.
#[derive(Default)]
pub struct SimpleKeyGenerator;

impl KeyGenerator for SimpleKeyGenerator {
    fn generate(&self, args: &[KeyArg]) -> String {
        args.iter()
            .map(|a| match a {
                KeyArg::Int(v) => v.to_string(),
                KeyArg::UInt(v) => v.to_string(),
                KeyArg::Float(v) => v.to_string(),
                KeyArg::Str(v) => v.clone(),
                KeyArg::Bool(v) => v.to_string(),
                KeyArg::Nil => "nil".to_string(),
                other => other.encode(),
            })
            .collect::<Vec<_>>()
            .join(":")
    }
}

/// A caller-supplied key function, receiving the raw key-arg list.
pub type CustomKeyFn = Arc<dyn Fn(&[KeyArg]) -> String + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_key_is_deterministic() {
        let gen = DefaultKeyGenerator;
        let args = vec![KeyArg::Int(1), KeyArg::Str("a".into())];
        assert_eq!(gen.generate(&args), gen.generate(&args.clone()));
    }

    #[test]
    fn default_key_is_order_sensitive() {
        let gen = DefaultKeyGenerator;
        let a = vec![KeyArg::Int(1), KeyArg::Int(2)];
        let b = vec![KeyArg::Int(2), KeyArg::Int(1)];
        assert_ne!(gen.generate(&a), gen.generate(&b));
    }

    #[test]
    fn long_key_falls_back_to_sha256() {
        let gen = DefaultKeyGenerator;
        let long = "x".repeat(100);
        let args = vec![KeyArg::Str(long)];
        let key = gen.generate(&args);
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn short_key_is_not_hashed() {
        let gen = DefaultKeyGenerator;
        let args = vec![KeyArg::Int(42)];
        assert_eq!(gen.generate(&args), "0:i:42");
    }

    #[test]
    fn simple_key_joins_with_colon() {
        let gen = SimpleKeyGenerator;
        let args = vec![KeyArg::Str("a".into()), KeyArg::Int(2)];
        assert_eq!(gen.generate(&args), "a:2");
    }

    #[test]
    fn slice_beyond_inline_limit_uses_first_last() {
        let items: Vec<KeyArg> = (0..20).map(KeyArg::Int).collect();
        let arg = KeyArg::Slice(items);
        assert!(arg.encode().starts_with("slice:len20:"));
    }
}
