//! The exported entry point wrapped around the generated function. It turns
//! one `reg u64` input into whatever the function takes, calls it once, and
//! folds the result back into a `reg u64`.

use tracing::debug;

use crate::ast::{AssignOp, BinOp, Decl, Expr, Function, Instr, LValue};
use crate::generator::SMALL_LITERAL_CAP;
use crate::oracle::Oracle;
use crate::semantics::{CallConv, Storage, Type, CMP_OPERAND};

pub const HARNESS_NAME: &str = "main_jazz";
const INPUT: &str = "input";
const ARG: &str = "b1";
const RESULT: &str = "result";
const FINAL: &str = "final";

/// Builds the harness for `inner` and demotes `inner` to `inline`.
pub fn synthesize_harness(inner: &mut Function, o: &mut dyn Oracle) -> Function {
    inner.call_conv = CallConv::Inline;

    let mut decls = vec![];
    let mut body = vec![];

    if let Some((_, ty)) = inner.returns {
        decls.push(Decl { storage: result_storage(ty), ty, name: RESULT.into() });
    }
    decls.push(Decl { storage: Storage::Reg, ty: Type::U64, name: FINAL.into() });

    let input_ty = inner.params.first().map(|p| p.ty);
    let args = match input_ty {
        None => vec![],
        Some(Type::U64) => vec![Expr::var(INPUT)],
        Some(ty) => {
            let storage = if ty == Type::Int { Storage::Inline } else { Storage::Reg };
            decls.push(Decl { storage, ty, name: ARG.into() });
            body.push(init_arg(ty, o));
            vec![Expr::var(ARG)]
        }
    };

    body.push(Instr::Call {
        result: inner.returns.map(|_| LValue::Var(RESULT.into())),
        function: inner.name.clone(),
        args,
    });

    if let Some((_, ty)) = inner.returns {
        body.extend(fold_result(ty));
    }
    body.push(set(FINAL, Expr::var(INPUT)));

    debug!(input = ?input_ty, output = ?inner.returns.map(|(_, t)| t), "synthesized harness");

    Function {
        call_conv: CallConv::Export,
        name: HARNESS_NAME.into(),
        params: vec![Decl { storage: Storage::Reg, ty: Type::U64, name: INPUT.into() }],
        returns: Some((Storage::Reg, Type::U64)),
        decls,
        body,
        ret: Some(FINAL.into()),
    }
}

fn result_storage(ty: Type) -> Storage {
    if ty == Type::Int {
        Storage::Inline
    } else {
        Storage::Reg
    }
}

fn set(name: &str, value: Expr) -> Instr {
    Instr::Assign { target: LValue::Var(name.into()), op: AssignOp::Set, value }
}

fn bump_input(by: u64) -> Instr {
    Instr::Assign { target: LValue::Var(INPUT.into()), op: AssignOp::Add, value: Expr::Int(by) }
}

/// Derives the argument `b1` from `input`.
fn init_arg(ty: Type, o: &mut dyn Oracle) -> Instr {
    match ty {
        Type::Bool => Instr::cmp(&[ARG.to_string()], Expr::var(INPUT)),
        Type::Array(_) if ty.is_u64_based() => Instr::Assign {
            target: LValue::Slot(ARG.into()),
            op: AssignOp::Set,
            value: Expr::var(INPUT),
        },
        _ => Instr::Assign {
            target: LValue::write(ARG, ty),
            op: AssignOp::Set,
            value: Expr::Int(o.literal(ty.literal_bound(SMALL_LITERAL_CAP))),
        },
    }
}

/// Makes `input` depend on the call's result.
fn fold_result(ty: Type) -> Vec<Instr> {
    match ty {
        Type::Bool => vec![Instr::If {
            cond: Expr::var(RESULT),
            then: vec![bump_input(CMP_OPERAND)],
            otherwise: None,
        }],
        Type::Int => vec![
            set(FINAL, Expr::var(RESULT)),
            Instr::Assign { target: LValue::Var(INPUT.into()), op: AssignOp::Add, value: Expr::var(FINAL) },
        ],
        Type::Array(_) => vec![Instr::If {
            cond: greater_than(Expr::Slot(RESULT.into())),
            then: vec![bump_input(1)],
            otherwise: None,
        }],
        Type::Word(_) => vec![Instr::If {
            cond: greater_than(Expr::var(RESULT)),
            then: vec![bump_input(CMP_OPERAND)],
            otherwise: None,
        }],
    }
}

fn greater_than(lhs: Expr) -> Expr {
    Expr::Binary(Box::new(lhs), BinOp::Gt, Box::new(Expr::Int(CMP_OPERAND)))
}
