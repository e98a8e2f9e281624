//! Structured program tree. The generator builds this; it is only flattened
//! to tokens once post-processing is done.

use crate::semantics::{CallConv, Storage, Type, CMP_OPERAND};

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub functions: Vec<Function>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub call_conv: CallConv,
    pub name: String,
    pub params: Vec<Decl>,
    pub returns: Option<(Storage, Type)>,
    pub decls: Vec<Decl>,
    pub body: Vec<Instr>,
    /// Name of the returned variable
    pub ret: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub storage: Storage,
    pub ty: Type,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

impl AssignOp {
    pub fn symbol(self) -> &'static str {
        match self {
            AssignOp::Set => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::And => "&=",
            AssignOp::Or => "|=",
            AssignOp::Xor => "^=",
            AssignOp::Shl => "<<=",
            AssignOp::Shr => ">>=",
        }
    }

    /// Compound operators read their target before writing it.
    pub fn reads_target(self) -> bool {
        self != AssignOp::Set
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopDir {
    To,
    Downto,
}

/// Where a `while` evaluates its condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopTest {
    /// `while (c) { body }`
    Pre,
    /// `while { body } (c)`
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LValue {
    Var(String),
    /// Always element `ARRAY_SLOT`
    Slot(String),
}

impl LValue {
    pub fn name(&self) -> &str {
        match self {
            LValue::Var(n) | LValue::Slot(n) => n,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    Assign {
        target: LValue,
        op: AssignOp,
        value: Expr,
    },
    /// `_, _, _, _, b = #CMP(lhs, 42);` with up to five flag targets.
    /// `None` slots are discarded flags.
    Flags {
        targets: [Option<String>; 5],
        lhs: Expr,
        rhs: Expr,
    },
    If {
        cond: Expr,
        then: Vec<Instr>,
        otherwise: Option<Vec<Instr>>,
    },
    For {
        var: String,
        start: Expr,
        dir: LoopDir,
        end: Expr,
        body: Vec<Instr>,
    },
    While {
        test: LoopTest,
        cond: Expr,
        body: Vec<Instr>,
    },
    Call {
        result: Option<LValue>,
        function: String,
        args: Vec<Expr>,
    },
}

impl Instr {
    /// `#CMP(lhs, 42)` keeping only the equality flag, written to each of
    /// `targets` (at most five) right-aligned.
    pub fn cmp(targets: &[String], lhs: Expr) -> Self {
        let mut slots: [Option<String>; 5] = Default::default();
        let offset = 5 - targets.len().min(5);
        for (slot, name) in slots[offset..].iter_mut().zip(targets) {
            *slot = Some(name.clone());
        }
        Instr::Flags { targets: slots, lhs, rhs: Expr::Int(CMP_OPERAND) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Not,
    Neg,
}

impl UnOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnOp::Not => "!",
            UnOp::Neg => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
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
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge)
    }

    pub fn is_logic(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Bool(bool),
    Int(u64),
    Var(String),
    /// Always element `ARRAY_SLOT`
    Slot(String),
    Unary(UnOp, Box<Expr>),
    Binary(Box<Expr>, BinOp, Box<Expr>),
    Paren(Box<Expr>),
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    /// Reads a variable, indexing arrays at their only used slot.
    pub fn read(name: impl Into<String>, ty: Type) -> Self {
        if ty.is_array() {
            Expr::Slot(name.into())
        } else {
            Expr::Var(name.into())
        }
    }

    /// Every variable this expression reads, in evaluation order.
    pub fn variables(&self) -> Vec<&str> {
        let mut out = vec![];
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Bool(_) | Expr::Int(_) => {}
            Expr::Var(n) | Expr::Slot(n) => out.push(n),
            Expr::Unary(_, e) | Expr::Paren(e) => e.collect_variables(out),
            Expr::Binary(l, _, r) => {
                l.collect_variables(out);
                r.collect_variables(out);
            }
        }
    }
}

impl LValue {
    pub fn write(name: impl Into<String>, ty: Type) -> Self {
        if ty.is_array() {
            LValue::Slot(name.into())
        } else {
            LValue::Var(name.into())
        }
    }
}
