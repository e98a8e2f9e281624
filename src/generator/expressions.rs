use super::types::gen_eval_type;
use super::{choose, unexpected, EXPR_LITERAL_CAP};
use crate::ast::{BinOp, Expr, UnOp};
use crate::context::{Category, Context};
use crate::error::Result;
use crate::grammar::{Nonterminal, Production};
use crate::oracle::Oracle;
use crate::semantics::Type;

/// An expression of scalar type `ty`. `depth` is the depth of the caller;
/// top-level expressions pass 0.
pub fn gen_expr(ctx: &mut Context, o: &mut dyn Oracle, ty: Type, depth: usize) -> Result<Expr> {
    let ty = ty.element();
    let depth = depth + 1;
    let mut production = choose(o, Nonterminal::Pexpr, Some(ty), depth)?;
    if production.is_recursive() && depth > ctx.max_expr_depth {
        production = Production::Var;
    }
    if !production.allowed_in(Some(ty)) {
        return Ok(gen_literal(o, ty, EXPR_LITERAL_CAP));
    }

    match production {
        Production::True => Ok(Expr::Bool(true)),
        Production::False => Ok(Expr::Bool(false)),
        Production::IntLit => Ok(gen_literal(o, ty, EXPR_LITERAL_CAP)),
        Production::Var => read_or_literal(ctx, o, Category::Variables, ty),
        Production::ArraySlot => read_or_literal(ctx, o, Category::Arrays, ty),
        Production::Neg => {
            let e = gen_expr(ctx, o, ty, depth)?;
            let op = if ty == Type::Bool { UnOp::Not } else { UnOp::Neg };
            Ok(Expr::Unary(op, Box::new(e)))
        }
        Production::Binary => gen_binary(ctx, o, ty, depth),
        Production::Paren => Ok(Expr::Paren(Box::new(gen_expr(ctx, o, ty, depth)?))),
        p => Err(unexpected(Nonterminal::Pexpr, p)),
    }
}

/// A literal of `ty`, below `cap` and below the width's range.
pub fn gen_literal(o: &mut dyn Oracle, ty: Type, cap: u64) -> Expr {
    if ty == Type::Bool {
        return Expr::Bool(o.index(2) == 1);
    }
    Expr::Int(o.literal(ty.literal_bound(cap)))
}

fn read_or_literal(ctx: &mut Context, o: &mut dyn Oracle, category: Category, ty: Type) -> Result<Expr> {
    match ctx.lookup(o, category, Some(ty)) {
        Some(name) => {
            ctx.mark_used(&name);
            let var_ty = ctx.type_of(&name)?;
            Ok(Expr::read(name, var_ty))
        }
        None => Ok(gen_literal(o, ty, EXPR_LITERAL_CAP)),
    }
}

fn gen_binary(ctx: &mut Context, o: &mut dyn Oracle, ty: Type, depth: usize) -> Result<Expr> {
    let (operand, family) = if ty == Type::Bool {
        // a boolean is either logic over booleans or a comparison of numbers
        let operand = gen_eval_type(o)?;
        let family = if operand == Type::Bool { Nonterminal::LogicOp } else { Nonterminal::CompareOp };
        (operand, family)
    } else {
        (ty, Nonterminal::ArithOp)
    };

    let lhs = gen_expr(ctx, o, operand, depth)?;
    let op = gen_binop(o, family, operand, depth)?;
    let rhs = gen_expr(ctx, o, operand, depth)?;
    Ok(Expr::Binary(Box::new(lhs), op, Box::new(rhs)))
}

fn gen_binop(o: &mut dyn Oracle, family: Nonterminal, operand: Type, depth: usize) -> Result<BinOp> {
    let p = choose(o, family, Some(operand), depth)?;
    if !p.allowed_in(Some(operand)) {
        return Ok(BinOp::Add);
    }
    let op = match p {
        Production::And => BinOp::And,
        Production::Or => BinOp::Or,
        Production::Eq => BinOp::Eq,
        Production::Ne => BinOp::Ne,
        Production::Lt => BinOp::Lt,
        Production::Le => BinOp::Le,
        Production::Gt => BinOp::Gt,
        Production::Ge => BinOp::Ge,
        Production::Add => BinOp::Add,
        Production::Sub => BinOp::Sub,
        Production::Mul => BinOp::Mul,
        Production::BitAnd => BinOp::BitAnd,
        Production::BitOr => BinOp::BitOr,
        Production::BitXor => BinOp::BitXor,
        Production::Shl => BinOp::Shl,
        Production::Shr => BinOp::Shr,
        p => return Err(unexpected(family, p)),
    };
    Ok(op)
}
