//! The nonterminals the walker asks the oracle about, the productions each
//! one accepts, and the weights used to pick between them.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::config::GeneratorConfig;
use crate::semantics::{Type, Width};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nonterminal {
    CallConv,
    FunReturn,
    Storage,
    Ptype,
    Utype,
    EvalType,
    Pexpr,
    LogicOp,
    CompareOp,
    ArithOp,
    Pinstr,
    Peqop,
    Plvalue,
    WhileTest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Production {
    // call_conv, storage
    Export,
    Inline,
    Reg,
    Stack,
    // fun_return
    WithReturn,
    WithoutReturn,
    // ptype, utype, eval_type
    Bool,
    Int,
    Utype,
    Array,
    U8,
    U16,
    U32,
    U64,
    U128,
    U256,
    // pexpr, plvalue
    True,
    False,
    IntLit,
    Var,
    ArraySlot,
    Neg,
    Binary,
    Paren,
    // operators
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    // pinstr
    ArrayBump,
    Assign,
    If,
    IfElse,
    ForTo,
    ForDown,
    While,
    // peqop
    Set,
    AddSet,
    SubSet,
    MulSet,
    AndSet,
    OrSet,
    XorSet,
    ShlSet,
    ShrSet,
    // while_test
    PreTest,
    PostTest,
}

use Production::*;

type WeightTable = BTreeMap<Nonterminal, Vec<(Production, u32)>>;

lazy_static! {
    static ref DEFAULT_WEIGHTS: WeightTable = {
        let mut t = BTreeMap::new();
        t.insert(Nonterminal::CallConv, vec![(Export, 1), (Inline, 1)]);
        t.insert(Nonterminal::FunReturn, vec![(WithReturn, 3), (WithoutReturn, 1)]);
        t.insert(Nonterminal::Storage, vec![(Reg, 4), (Stack, 2), (Inline, 1)]);
        t.insert(Nonterminal::Ptype, vec![(Bool, 2), (Int, 1), (Utype, 4), (Array, 2)]);
        t.insert(Nonterminal::Utype, vec![(U8, 1), (U16, 1), (U32, 1), (U64, 3), (U128, 1), (U256, 1)]);
        t.insert(Nonterminal::EvalType, vec![(Bool, 1), (Int, 1), (U8, 1), (U16, 1), (U32, 1), (U64, 2)]);
        t.insert(Nonterminal::Pexpr, vec![
            (True, 1), (False, 1), (IntLit, 2), (Var, 4), (ArraySlot, 1),
            (Neg, 1), (Binary, 3), (Paren, 1),
        ]);
        t.insert(Nonterminal::LogicOp, vec![(And, 1), (Or, 1)]);
        t.insert(Nonterminal::CompareOp, vec![(Eq, 1), (Ne, 1), (Lt, 1), (Le, 1), (Gt, 1), (Ge, 1)]);
        t.insert(Nonterminal::ArithOp, vec![
            (Add, 3), (Sub, 3), (Mul, 2), (BitAnd, 1), (BitOr, 1), (BitXor, 1), (Shl, 1), (Shr, 1),
        ]);
        t.insert(Nonterminal::Pinstr, vec![
            (ArrayBump, 1), (Assign, 8), (If, 2), (IfElse, 1), (ForTo, 1), (ForDown, 1), (While, 1),
        ]);
        t.insert(Nonterminal::Peqop, vec![
            (Set, 6), (AddSet, 1), (SubSet, 1), (MulSet, 1),
            (AndSet, 1), (OrSet, 1), (XorSet, 1), (ShlSet, 1), (ShrSet, 1),
        ]);
        t.insert(Nonterminal::Plvalue, vec![(Var, 4), (ArraySlot, 1)]);
        t.insert(Nonterminal::WhileTest, vec![(PreTest, 1), (PostTest, 1)]);
        t
    };
}

impl Nonterminal {
    pub const ALL: [Nonterminal; 14] = [
        Nonterminal::CallConv,
        Nonterminal::FunReturn,
        Nonterminal::Storage,
        Nonterminal::Ptype,
        Nonterminal::Utype,
        Nonterminal::EvalType,
        Nonterminal::Pexpr,
        Nonterminal::LogicOp,
        Nonterminal::CompareOp,
        Nonterminal::ArithOp,
        Nonterminal::Pinstr,
        Nonterminal::Peqop,
        Nonterminal::Plvalue,
        Nonterminal::WhileTest,
    ];

    /// Productions this nonterminal accepts, in table order.
    pub fn productions(self) -> impl Iterator<Item = Production> {
        DEFAULT_WEIGHTS[&self].iter().map(|&(p, _)| p)
    }

    pub fn accepts(self, production: Production) -> bool {
        self.productions().any(|p| p == production)
    }
}

impl Production {
    /// Productions that make the walker descend again.
    pub fn is_recursive(self) -> bool {
        matches!(self, Neg | Binary | Paren | If | IfElse | ForTo | ForDown | While)
    }

    /// Whether this production can be realised for a value of type `scope`.
    pub fn allowed_in(self, scope: Option<Type>) -> bool {
        match self {
            True | False => scope == Some(Type::Bool),
            IntLit | AddSet | SubSet | MulSet => scope.map_or(false, Type::is_numeric),
            BitAnd | BitOr | BitXor | Shl | Shr | AndSet | OrSet | XorSet | ShlSet | ShrSet => {
                scope.map_or(false, Type::is_word)
            }
            _ => true,
        }
    }

    pub fn width(self) -> Option<Width> {
        match self {
            U8 => Some(Width::U8),
            U16 => Some(Width::U16),
            U32 => Some(Width::U32),
            U64 => Some(Width::U64),
            U128 => Some(Width::U128),
            U256 => Some(Width::U256),
            _ => None,
        }
    }
}

/// Production weights after configuration overrides, with depth decay.
#[derive(Debug, Clone)]
pub struct ProductionTable {
    weights: WeightTable,
    depth_decay: f64,
}

impl ProductionTable {
    pub fn new(config: &GeneratorConfig) -> Self {
        let mut weights = DEFAULT_WEIGHTS.clone();
        for o in &config.weights {
            if let Some(entries) = weights.get_mut(&o.nonterminal) {
                for (production, weight) in entries.iter_mut() {
                    if *production == o.production {
                        *weight = o.weight;
                    }
                }
            }
        }
        ProductionTable { weights, depth_decay: config.depth_decay }
    }

    /// Candidates for `nt` that are valid in `scope`, weighted. Recursive
    /// productions lose weight geometrically with `depth`. Never empty: if
    /// nothing survives the scope filter the unfiltered table is returned.
    pub fn candidates(&self, nt: Nonterminal, scope: Option<Type>, depth: usize) -> Vec<(Production, f64)> {
        let entries = &self.weights[&nt];
        let decay = self.depth_decay.powi(depth.min(i32::MAX as usize) as i32);
        let filtered: Vec<_> = entries
            .iter()
            .filter(|(p, _)| p.allowed_in(scope))
            .map(|&(p, w)| {
                let w = w as f64;
                (p, if p.is_recursive() { w * decay } else { w })
            })
            .collect();
        if filtered.is_empty() {
            entries.iter().map(|&(p, w)| (p, w as f64)).collect()
        } else {
            filtered
        }
    }
}
