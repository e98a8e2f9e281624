use tracing::{debug, trace};

use super::instructions::gen_instr;
use super::types::{gen_call_conv, gen_stor_type};
use super::{choose, unexpected, OUT, SMALL_LITERAL_CAP};
use crate::ast::{AssignOp, Decl, Expr, Function, Instr, LValue};
use crate::context::{Category, Context};
use crate::error::{GenerationError, Result};
use crate::grammar::{Nonterminal, Production};
use crate::oracle::Oracle;
use crate::semantics::{Storage, Type};

/// One complete function: signature, locals, body, repairs and return.
pub fn gen_function(ctx: &mut Context, o: &mut dyn Oracle) -> Result<Function> {
    let call_conv = gen_call_conv(o)?;
    let name = ctx.declare_function_name();

    let param = ctx.declare(Category::Decl);
    let (storage, ty) = gen_stor_type(o)?;
    ctx.record_type(&param, ty);
    ctx.record_storage(&param, storage);
    ctx.set_input(&param);

    let has_return = match choose(o, Nonterminal::FunReturn, None, 0)? {
        Production::WithReturn => true,
        Production::WithoutReturn => false,
        p => return Err(unexpected(Nonterminal::FunReturn, p)),
    };

    let mut locals = vec![];
    for _ in 0..o.decl_count() {
        let local = ctx.declare(Category::Decl);
        let (storage, ty) = gen_stor_type(o)?;
        ctx.record_type(&local, ty);
        ctx.record_storage(&local, storage);
        locals.push(local);
    }

    let mut body = (0..o.instruction_count())
        .map(|_| gen_instr(ctx, o))
        .collect::<Result<Vec<_>>>()?;

    let ret = if has_return {
        let (ret, init) = resolve_return(ctx, o)?;
        if let Some(init) = init {
            locals.push(ret.clone());
            body.push(init);
        }
        Some(ret)
    } else {
        None
    };

    let mut instrs = repair(ctx, o)?;
    instrs.append(&mut body);

    // fixed only after repair, which may still promote the input
    if let Some(ret) = &ret {
        let signature = match ctx.input() {
            Some(input) if input == ret => ctx.input_signature()?,
            _ => None,
        };
        let return_type = match signature {
            Some(sig) => sig,
            None => (ctx.storage_of(ret)?, ctx.type_of(ret)?),
        };
        ctx.set_return_type(return_type);
    }

    let params = match ctx.input_signature()? {
        Some((storage, ty)) => vec![Decl { storage, ty, name: param }],
        None => vec![],
    };
    let decls = locals
        .iter()
        .map(|n| decl_of(ctx, n))
        .collect::<Result<Vec<_>>>()?;

    debug!(
        function = %name,
        locals = decls.len(),
        instructions = instrs.len(),
        returns = ?ctx.return_type(),
        "assembled function"
    );

    Ok(Function {
        call_conv,
        name,
        params,
        returns: ctx.return_type(),
        decls,
        body: instrs,
        ret,
    })
}

fn decl_of(ctx: &Context, name: &str) -> Result<Decl> {
    Ok(Decl {
        storage: ctx.storage_of(name)?,
        ty: ctx.type_of(name)?,
        name: name.to_string(),
    })
}

/// Picks the variable to return. A `u64` input is copied into a fresh `out`
/// right before the return, which is handed back as the instruction to
/// append.
fn resolve_return(ctx: &mut Context, o: &mut dyn Oracle) -> Result<(String, Option<Instr>)> {
    let input = ctx.input().ok_or(GenerationError::NoAssignableVariable)?.to_string();
    let input_ty = ctx.type_of(&input)?;

    let (ret, init) = if input_ty.is_u64_based() {
        ctx.declare_fixed(OUT, Storage::Reg, Type::U64);
        ctx.mark_used(&input);
        ctx.mark_assigned(OUT);
        let init = Instr::Assign {
            target: LValue::Var(OUT.to_string()),
            op: AssignOp::Set,
            value: Expr::read(input, input_ty),
        };
        (OUT.to_string(), Some(init))
    } else if let Some(word) = ctx.lookup(o, Category::Variables, Some(Type::U64)) {
        (word, None)
    } else {
        let preferred = ctx.lookup_where(o, Category::Variables, None, |n| {
            !matches!(ctx.types().get(n), Some(Type::Bool) | Some(Type::Int))
        });
        let ret = match preferred {
            Some(v) => v,
            None => ctx
                .lookup(o, Category::Variables, None)
                .ok_or(GenerationError::NoAssignableVariable)?,
        };
        (ret, None)
    };

    if ctx.type_of(&ret)? == Type::Int {
        ctx.record_storage(&ret, Storage::Inline);
    }
    ctx.mark_used(&ret);
    Ok((ret, init))
}

/// Initialises every variable that was read before being written. The
/// returned instructions go in front of the body.
fn repair(ctx: &mut Context, o: &mut dyn Oracle) -> Result<Vec<Instr>> {
    let input = ctx.input().map(str::to_string);
    if let Some(input) = &input {
        ctx.exempt(input);
    }

    let mut bools = vec![];
    let mut others = vec![];
    for name in ctx.take_flagged() {
        if ctx.type_of(&name)? == Type::Bool {
            bools.push(name);
        } else if name != OUT {
            others.push(name);
        }
    }

    let input_ty = match &input {
        Some(input) => Some(ctx.type_of(input)?),
        None => None,
    };
    let mut out = vec![];
    if !bools.is_empty() {
        match &input {
            Some(input) if input_ty == Some(Type::Bool) => {
                for b in &bools {
                    out.push(Instr::Assign {
                        target: LValue::Var(b.clone()),
                        op: AssignOp::Set,
                        value: Expr::var(input.clone()),
                    });
                }
            }
            Some(input) => {
                ctx.promote_input()?;
                let input_ty = ctx.input_signature()?.map_or(Type::U64, |(_, t)| t);
                for chunk in bools.chunks(5) {
                    out.push(Instr::cmp(chunk, Expr::read(input.clone(), input_ty)));
                }
            }
            None => {
                for b in &bools {
                    out.push(Instr::Assign {
                        target: LValue::Var(b.clone()),
                        op: AssignOp::Set,
                        value: Expr::Bool(false),
                    });
                }
            }
        }
    }

    for name in &others {
        let ty = ctx.type_of(name)?;
        let value = Expr::Int(o.literal(ty.literal_bound(SMALL_LITERAL_CAP)));
        out.push(Instr::Assign { target: LValue::write(name.clone(), ty), op: AssignOp::Set, value });
    }

    trace!(bools = bools.len(), others = others.len(), "repaired use before assignment");
    Ok(out)
}
