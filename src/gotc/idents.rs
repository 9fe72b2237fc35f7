// Copyright (c) 2025 knix
// All rights reserved.

use std::fmt::{Display, Formatter};

use string_interner::{Symbol, backend::StringBackend};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Ident(string_interner::symbol::SymbolU32);

impl Ord for Ident {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for Ident {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl From<Ident> for usize {
    fn from(value: Ident) -> Self {
        value.0.to_usize()
    }
}

impl Display for Ident {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_usize())
    }
}

#[allow(non_snake_case)]
pub struct BuiltinIdents {
    pub blank: Ident,
    pub init: Ident,
    pub byte: Ident,
    pub rune: Ident,
    pub error: Ident,
    pub Error: Ident,
    pub iota: Ident,
    pub Pointer: Ident,
}

// We use the default StringInterner, which uses a contiguous string as its backend
// and u32 symbols
pub struct IdentPool {
    intern_pool: string_interner::StringInterner<StringBackend>,
    /// b for builtins
    pub b: BuiltinIdents,
}

impl IdentPool {
    pub fn intern(&mut self, s: impl AsRef<str>) -> Ident {
        let s = self.intern_pool.get_or_intern(&s);
        Ident(s)
    }

    pub fn get(&self, s: impl AsRef<str>) -> Option<Ident> {
        self.intern_pool.get(&s).map(Ident)
    }

    pub fn get_name(&self, id: Ident) -> &str {
        self.intern_pool.resolve(id.0).expect("failed to resolve identifier")
    }

    pub fn len(&self) -> usize {
        self.intern_pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intern_pool.is_empty()
    }

    #[allow(non_snake_case)]
    pub fn make() -> Self {
        let mut pool = string_interner::StringInterner::with_capacity(4096);

        macro_rules! intern {
            ($name: expr) => {
                Ident(pool.get_or_intern_static($name))
            };
        }

        let b = BuiltinIdents {
            blank: intern!("_"),
            init: intern!("init"),
            byte: intern!("byte"),
            rune: intern!("rune"),
            error: intern!("error"),
            Error: intern!("Error"),
            iota: intern!("iota"),
            Pointer: intern!("Pointer"),
        };
        IdentPool { intern_pool: pool, b }
    }
}

#[cfg(test)]
mod test {
    use super::IdentPool;

    #[test]
    fn intern_is_stable() {
        let mut pool = IdentPool::make();
        let a = pool.intern("Buffer");
        let b = pool.intern("Buffer");
        assert_eq!(a, b);
        assert_eq!(pool.get_name(a), "Buffer");
        assert_eq!(pool.get("_"), Some(pool.b.blank));
        assert_eq!(pool.get("nope"), None);
    }
}
