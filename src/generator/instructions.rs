use super::expressions::gen_expr;
use super::{choose, unexpected, SMALL_LITERAL_CAP};
use crate::ast::{AssignOp, Expr, Instr, LValue, LoopDir, LoopTest};
use crate::context::{Category, Context};
use crate::error::{GenerationError, Result};
use crate::grammar::{Nonterminal, Production};
use crate::oracle::Oracle;
use crate::semantics::Type;

pub fn gen_block(ctx: &mut Context, o: &mut dyn Oracle) -> Result<Vec<Instr>> {
    let n = o.block_instruction_count();
    (0..n).map(|_| gen_instr(ctx, o)).collect()
}

pub fn gen_instr(ctx: &mut Context, o: &mut dyn Oracle) -> Result<Instr> {
    let depth = ctx.block_depth;
    let mut production = choose(o, Nonterminal::Pinstr, None, depth)?;
    if production.is_recursive() && depth >= ctx.max_block_depth {
        production = Production::Assign;
    }

    match production {
        Production::ArrayBump => gen_array_bump(ctx, o),
        Production::Assign => gen_assign(ctx, o),
        Production::If | Production::IfElse => {
            let cond = gen_expr(ctx, o, Type::Bool, 0)?;
            let then = nested!(ctx, gen_block(ctx, o))?;
            let otherwise = if production == Production::IfElse {
                Some(nested!(ctx, gen_block(ctx, o))?)
            } else {
                None
            };
            Ok(Instr::If { cond, then, otherwise })
        }
        Production::ForTo => gen_for(ctx, o, LoopDir::To),
        Production::ForDown => gen_for(ctx, o, LoopDir::Downto),
        Production::While => gen_while(ctx, o),
        p => Err(unexpected(Nonterminal::Pinstr, p)),
    }
}

/// `a[1] += 1;` on some array, or a plain assignment if there is none.
fn gen_array_bump(ctx: &mut Context, o: &mut dyn Oracle) -> Result<Instr> {
    let Some(array) = ctx.lookup(o, Category::Arrays, None) else {
        return gen_assign(ctx, o);
    };
    ctx.mark_used(&array);
    ctx.mark_assigned(&array);
    Ok(Instr::Assign {
        target: LValue::Slot(array),
        op: AssignOp::Add,
        value: Expr::Int(1),
    })
}

/// Counted loop over a compile-time integer other than the input.
fn gen_for(ctx: &mut Context, o: &mut dyn Oracle, dir: LoopDir) -> Result<Instr> {
    let input = ctx.input().map(str::to_string);
    let var = ctx.lookup_where(o, Category::Variables, Some(Type::Int), |n| Some(n) != input.as_deref());
    let Some(var) = var else {
        return gen_assign(ctx, o);
    };
    let start = gen_expr(ctx, o, Type::Int, 0)?;
    ctx.mark_assigned(&var);
    let end = Expr::Int(o.literal(SMALL_LITERAL_CAP));
    let body = nested!(ctx, gen_block(ctx, o))?;
    Ok(Instr::For { var, start, dir, end, body })
}

fn gen_while(ctx: &mut Context, o: &mut dyn Oracle) -> Result<Instr> {
    match choose(o, Nonterminal::WhileTest, None, 0)? {
        Production::PreTest => {
            let cond = gen_expr(ctx, o, Type::Bool, 0)?;
            let body = nested!(ctx, gen_block(ctx, o))?;
            Ok(Instr::While { test: LoopTest::Pre, cond, body })
        }
        Production::PostTest => {
            let body = nested!(ctx, gen_block(ctx, o))?;
            let cond = gen_expr(ctx, o, Type::Bool, 0)?;
            Ok(Instr::While { test: LoopTest::Post, cond, body })
        }
        p => Err(unexpected(Nonterminal::WhileTest, p)),
    }
}

fn gen_target(ctx: &mut Context, o: &mut dyn Oracle) -> Result<String> {
    if choose(o, Nonterminal::Plvalue, None, 0)? == Production::ArraySlot {
        if let Some(array) = ctx.lookup(o, Category::Arrays, None) {
            return Ok(array);
        }
    }
    ctx.lookup(o, Category::Variables, None)
        .ok_or(GenerationError::NoAssignableVariable)
}

pub fn gen_assign(ctx: &mut Context, o: &mut dyn Oracle) -> Result<Instr> {
    let target = gen_target(ctx, o)?;
    let ty = ctx.type_of(&target)?;
    let lvalue = LValue::write(target.clone(), ty);
    let element = ty.element();

    let instr = if element == Type::Bool {
        gen_bool_assign(ctx, o, &target, lvalue)?
    } else {
        let op = gen_assign_op(o, element)?;
        if op.reads_target() {
            ctx.mark_used(&target);
        }
        let value = gen_expr(ctx, o, element, 0)?;
        Instr::Assign { target: lvalue, op, value }
    };
    ctx.mark_assigned(&target);
    Ok(instr)
}

/// Booleans are written from a boolean expression when another boolean is
/// around, otherwise from the flags of a `#CMP`.
fn gen_bool_assign(ctx: &mut Context, o: &mut dyn Oracle, target: &str, lvalue: LValue) -> Result<Instr> {
    let other_bool = ctx
        .candidates(Category::Variables, Some(Type::Bool))
        .iter()
        .any(|n| n.as_str() != target);
    if other_bool {
        let value = gen_expr(ctx, o, Type::Bool, 0)?;
        return Ok(Instr::Assign { target: lvalue, op: AssignOp::Set, value });
    }

    if let Some(word) = ctx.lookup(o, Category::Variables, Some(Type::U64)) {
        ctx.mark_used(&word);
        let word_ty = ctx.type_of(&word)?;
        return Ok(Instr::cmp(&[target.to_string()], Expr::read(word, word_ty)));
    }

    let Some(input) = ctx.input().map(str::to_string) else {
        let value = gen_expr(ctx, o, Type::Bool, 0)?;
        return Ok(Instr::Assign { target: lvalue, op: AssignOp::Set, value });
    };
    ctx.mark_used(&input);
    if ctx.type_of(&input)? == Type::Bool {
        return Ok(Instr::Assign { target: lvalue, op: AssignOp::Set, value: Expr::var(input) });
    }
    ctx.promote_input()?;
    let input_ty = ctx.input_signature()?.map_or(Type::U64, |(_, t)| t);
    Ok(Instr::cmp(&[target.to_string()], Expr::read(input, input_ty)))
}

fn gen_assign_op(o: &mut dyn Oracle, element: Type) -> Result<AssignOp> {
    let p = choose(o, Nonterminal::Peqop, Some(element), 0)?;
    if !p.allowed_in(Some(element)) {
        return Ok(AssignOp::Set);
    }
    let op = match p {
        Production::Set => AssignOp::Set,
        Production::AddSet => AssignOp::Add,
        Production::SubSet => AssignOp::Sub,
        Production::MulSet => AssignOp::Mul,
        Production::AndSet => AssignOp::And,
        Production::OrSet => AssignOp::Or,
        Production::XorSet => AssignOp::Xor,
        Production::ShlSet => AssignOp::Shl,
        Production::ShrSet => AssignOp::Shr,
        p => return Err(unexpected(Nonterminal::Peqop, p)),
    };
    Ok(op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::oracle::{ScriptedOracle, SeededOracle};
    use crate::semantics::{Storage, Width};

    fn ctx_with(vars: &[Type]) -> Context {
        let mut ctx = Context::make_context(&GeneratorConfig::default());
        for (i, ty) in vars.iter().enumerate() {
            let v = ctx.declare(Category::Decl);
            ctx.record_type(&v, *ty);
            ctx.record_storage(&v, if *ty == Type::Int { Storage::Inline } else { Storage::Reg });
            if i == 0 {
                ctx.set_input(&v);
            }
        }
        ctx
    }

    #[test]
    fn lone_bool_is_set_from_a_u64() {
        let mut ctx = ctx_with(&[Type::Int, Type::Bool, Type::U64]);
        let mut o = ScriptedOracle::new();
        let instr = gen_bool_assign(&mut ctx, &mut o, "v1", LValue::Var("v1".into())).unwrap();
        assert_eq!(instr, Instr::cmp(&["v1".to_string()], Expr::var("v2")));
        assert!(ctx.is_flagged("v2"));
    }

    #[test]
    fn lone_bool_compares_the_promoted_input() {
        let mut ctx = ctx_with(&[Type::Array(Width::U8), Type::Bool]);
        let mut o = ScriptedOracle::new();
        let instr = gen_bool_assign(&mut ctx, &mut o, "v1", LValue::Var("v1".into())).unwrap();
        assert_eq!(instr, Instr::cmp(&["v1".to_string()], Expr::Slot("v0".into())));
        assert_eq!(
            ctx.input_signature().unwrap(),
            Some((Storage::Reg, Type::Array(Width::U64)))
        );
    }

    #[test]
    fn bool_with_a_sibling_gets_an_expression() {
        let mut ctx = ctx_with(&[Type::Bool, Type::Bool]);
        let mut o = ScriptedOracle::new();
        let instr = gen_bool_assign(&mut ctx, &mut o, "v1", LValue::Var("v1".into())).unwrap();
        assert_eq!(
            instr,
            Instr::Assign { target: LValue::Var("v1".into()), op: AssignOp::Set, value: Expr::Bool(true) }
        );
    }

    #[test]
    fn lone_bool_input_is_copied() {
        let mut ctx = ctx_with(&[Type::Bool]);
        let mut o = ScriptedOracle::new();
        let instr = gen_bool_assign(&mut ctx, &mut o, "v0", LValue::Var("v0".into())).unwrap();
        assert_eq!(
            instr,
            Instr::Assign { target: LValue::Var("v0".into()), op: AssignOp::Set, value: Expr::var("v0") }
        );
    }

    #[test]
    fn compound_assignment_reads_its_target() {
        let mut ctx = ctx_with(&[Type::U64]);
        let mut o = ScriptedOracle::new()
            .script(Nonterminal::Peqop, [Production::AddSet])
            .script(Nonterminal::Pexpr, [Production::IntLit])
            .literals([7]);
        let instr = gen_assign(&mut ctx, &mut o).unwrap();
        assert_eq!(
            instr,
            Instr::Assign { target: LValue::Var("v0".into()), op: AssignOp::Add, value: Expr::Int(7) }
        );
        assert!(ctx.is_flagged("v0"));
    }

    #[test]
    fn plain_assignment_counts_as_initialisation() {
        let mut ctx = ctx_with(&[Type::Word(Width::U32)]);
        let mut o = ScriptedOracle::new().script(Nonterminal::Pexpr, [Production::IntLit]);
        gen_assign(&mut ctx, &mut o).unwrap();
        assert!(ctx.is_assigned("v0"));
        assert!(!ctx.is_flagged("v0"));
    }

    #[test]
    fn array_bump_without_arrays_assigns() {
        let mut ctx = ctx_with(&[Type::U64]);
        let mut o = ScriptedOracle::new().script(Nonterminal::Pinstr, [Production::ArrayBump]);
        let instr = gen_instr(&mut ctx, &mut o).unwrap();
        assert!(matches!(instr, Instr::Assign { target: LValue::Var(_), .. }));
    }

    #[test]
    fn loops_skip_the_input() {
        let mut ctx = ctx_with(&[Type::Int, Type::U64]);
        let mut o = ScriptedOracle::new().script(Nonterminal::Pinstr, [Production::ForTo]);
        let instr = gen_instr(&mut ctx, &mut o).unwrap();
        assert!(matches!(instr, Instr::Assign { .. }));

        let mut ctx = ctx_with(&[Type::U64, Type::Int]);
        let mut o = ScriptedOracle::new()
            .script(Nonterminal::Pinstr, [Production::ForDown])
            .literals([3, 900]);
        let instr = gen_instr(&mut ctx, &mut o).unwrap();
        match instr {
            Instr::For { var, dir, end, body, .. } => {
                assert_eq!(var, "v1");
                assert_eq!(dir, LoopDir::Downto);
                assert!(matches!(end, Expr::Int(n) if n < SMALL_LITERAL_CAP));
                assert!(body.is_empty());
            }
            other => panic!("expected a loop, got {:?}", other),
        }
        assert!(ctx.is_assigned("v1"));
    }

    #[test]
    fn block_depth_is_capped() {
        let config = GeneratorConfig { max_block_depth: 2, ..GeneratorConfig::default() };
        let mut ctx = Context::make_context(&config);
        let v = ctx.declare(Category::Decl);
        ctx.record_type(&v, Type::Bool);
        ctx.set_input(&v);
        let mut o = ScriptedOracle::new()
            .repeat(Nonterminal::Pinstr, Production::If)
            .block_instructions(1);
        let instr = gen_instr(&mut ctx, &mut o).unwrap();

        fn nesting(i: &Instr) -> usize {
            match i {
                Instr::If { then, .. } => 1 + then.iter().map(nesting).max().unwrap_or(0),
                _ => 0,
            }
        }
        assert_eq!(nesting(&instr), 2);
        assert_eq!(ctx.block_depth, 0);
    }

    #[test]
    fn seeded_instructions_terminate() {
        let config = GeneratorConfig::default();
        for seed in 0..100 {
            let mut ctx = ctx_with(&[Type::Int, Type::Bool, Type::Array(Width::U64), Type::Int]);
            let mut o = SeededOracle::new(seed, &config);
            gen_block(&mut ctx, &mut o).unwrap();
            assert_eq!(ctx.block_depth, 0);
        }
    }
}
