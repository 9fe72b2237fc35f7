// Copyright (c) 2025 knix
// All rights reserved.

use smallvec::SmallVec;

pub mod ast;
pub mod compiler;
pub mod idents;
pub mod link;
mod pool;
pub mod span;
pub mod typer;

pub type SV8<T> = SmallVec<[T; 8]>;

#[macro_export]
macro_rules! nz_u32_id {
    ($name: ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(std::num::NonZeroU32);
        impl From<std::num::NonZeroU32> for $name {
            fn from(value: std::num::NonZeroU32) -> Self {
                Self::from_nzu32(value)
            }
        }
        impl From<$name> for std::num::NonZeroU32 {
            fn from(val: $name) -> Self {
                val.0
            }
        }
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl $name {
            pub const fn as_u32(self) -> u32 {
                self.0.get()
            }

            pub const fn from_nzu32(value: std::num::NonZeroU32) -> Self {
                $name(value)
            }

            pub const fn from_u32(value: u32) -> Option<Self> {
                match std::num::NonZeroU32::new(value) {
                    None => None,
                    Some(nz_u32) => Some($name(nz_u32)),
                }
            }

            /// Only for ids known at compile time, such as the predeclared types
            pub const fn from_const(value: u32) -> Self {
                match std::num::NonZeroU32::new(value) {
                    None => panic!("id cannot be zero"),
                    Some(nz_u32) => $name(nz_u32),
                }
            }
        }
    };
}
