//! The semantic types, storage classes and call conventions the generator
//! reasons about.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Every array the generator declares has this many elements.
pub const ARRAY_LEN: u64 = 5;

/// Arrays are only ever read and written at this index.
pub const ARRAY_SLOT: u64 = 1;

/// The right hand side of every generated `#CMP`.
pub const CMP_OPERAND: u64 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Width {
    U8,
    U16,
    U32,
    U64,
    U128,
    U256,
}

impl Width {
    pub const ALL: [Width; 6] = [Width::U8, Width::U16, Width::U32, Width::U64, Width::U128, Width::U256];

    pub fn bits(self) -> u32 {
        match self {
            Width::U8 => 8,
            Width::U16 => 16,
            Width::U32 => 32,
            Width::U64 => 64,
            Width::U128 => 128,
            Width::U256 => 256,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Width::U8 => "u8",
            Width::U16 => "u16",
            Width::U32 => "u32",
            Width::U64 => "u64",
            Width::U128 => "u128",
            Width::U256 => "u256",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    Bool,
    /// Unbounded compile-time integer
    Int,
    Word(Width),
    /// Array of `ARRAY_LEN` words
    Array(Width),
}

impl Type {
    pub const U64: Type = Type::Word(Width::U64);

    pub fn is_array(self) -> bool {
        matches!(self, Type::Array(_))
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Type::Int | Type::Word(_))
    }

    pub fn is_word(self) -> bool {
        matches!(self, Type::Word(_))
    }

    /// The type of a single element: arrays collapse to their element word,
    /// scalars are their own element type.
    pub fn element(self) -> Type {
        match self {
            Type::Array(w) => Type::Word(w),
            t => t,
        }
    }

    /// True for `u64` and arrays of `u64`, the only types `#CMP` is fed with.
    pub fn is_u64_based(self) -> bool {
        self.element() == Type::U64
    }

    /// Exclusive upper bound for literals of this type, capped at `cap`.
    pub fn literal_bound(self, cap: u64) -> u64 {
        match self.element() {
            Type::Word(w) if w.bits() < 64 => cap.min(1 << w.bits()),
            _ => cap,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Int => write!(f, "int"),
            Type::Word(w) => write!(f, "{}", w.keyword()),
            Type::Array(w) => write!(f, "{}[{}]", w.keyword(), ARRAY_LEN),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Storage {
    Reg,
    Stack,
    Inline,
}

impl Storage {
    pub fn keyword(self) -> &'static str {
        match self {
            Storage::Reg => "reg",
            Storage::Stack => "stack",
            Storage::Inline => "inline",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallConv {
    Export,
    Inline,
}

impl CallConv {
    pub fn keyword(self) -> &'static str {
        match self {
            CallConv::Export => "export",
            CallConv::Inline => "inline",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrays_collapse_to_their_element() {
        assert_eq!(Type::Array(Width::U16).element(), Type::Word(Width::U16));
        assert_eq!(Type::Bool.element(), Type::Bool);
        assert!(Type::Array(Width::U64).is_u64_based());
        assert!(!Type::Int.is_u64_based());
    }

    #[test]
    fn literal_bound_respects_width() {
        assert_eq!(Type::Word(Width::U8).literal_bound(1000), 256);
        assert_eq!(Type::Array(Width::U16).literal_bound(10000), 10000);
        assert_eq!(Type::Int.literal_bound(10000), 10000);
        assert_eq!(Type::Word(Width::U256).literal_bound(1000), 1000);
    }

    #[test]
    fn keywords() {
        assert_eq!(Type::Array(Width::U32).to_string(), "u32[5]");
        assert_eq!(Type::Word(Width::U128).to_string(), "u128");
        assert_eq!(Type::Int.to_string(), "int");
    }
}
