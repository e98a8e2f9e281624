use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use proptest::prelude::*;

use jasminsmith::ast::{Expr, Function, Instr, LValue, LoopTest, UnOp};
use jasminsmith::harness::HARNESS_NAME;
use jasminsmith::postprocess::elide_dead_declarations;
use jasminsmith::semantics::Type;
use jasminsmith::tokens::linearize_function;
use jasminsmith::{generate, generate_tree, GeneratorConfig, Generated, SeededOracle, Token};

/// Inferred expression type; integer literals fit any numeric type.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Ty {
    Exact(Type),
    Lit,
}

impl Ty {
    fn is_numeric(self) -> bool {
        match self {
            Ty::Exact(t) => t.is_numeric(),
            Ty::Lit => true,
        }
    }

    fn fits(self, target: Type) -> bool {
        match self {
            Ty::Exact(t) => t == target,
            Ty::Lit => target.is_numeric(),
        }
    }
}

fn unify(a: Ty, b: Ty) -> Option<Ty> {
    match (a, b) {
        (Ty::Lit, Ty::Lit) => Some(Ty::Lit),
        (Ty::Exact(t), Ty::Lit) | (Ty::Lit, Ty::Exact(t)) if t.is_numeric() => Some(Ty::Exact(t)),
        (Ty::Exact(a), Ty::Exact(b)) if a == b => Some(Ty::Exact(a)),
        _ => None,
    }
}

fn infer(types: &IndexMap<String, Type>, e: &Expr) -> Option<Ty> {
    match e {
        Expr::Bool(_) => Some(Ty::Exact(Type::Bool)),
        Expr::Int(_) => Some(Ty::Lit),
        Expr::Var(n) => types.get(n).filter(|t| !t.is_array()).map(|t| Ty::Exact(*t)),
        Expr::Slot(n) => types.get(n).filter(|t| t.is_array()).map(|t| Ty::Exact(t.element())),
        Expr::Unary(UnOp::Not, e) => (infer(types, e)? == Ty::Exact(Type::Bool)).then_some(Ty::Exact(Type::Bool)),
        Expr::Unary(UnOp::Neg, e) => infer(types, e).filter(|t| t.is_numeric()),
        Expr::Paren(e) => infer(types, e),
        Expr::Binary(l, op, r) => {
            let u = unify(infer(types, l)?, infer(types, r)?)?;
            if op.is_logic() {
                (u == Ty::Exact(Type::Bool)).then_some(u)
            } else if op.is_comparison() {
                u.is_numeric().then_some(Ty::Exact(Type::Bool))
            } else {
                u.is_numeric().then_some(u)
            }
        }
    }
}

fn lvalue_type(types: &IndexMap<String, Type>, l: &LValue) -> Option<Type> {
    let t = *types.get(l.name())?;
    match l {
        LValue::Var(_) if !t.is_array() => Some(t),
        LValue::Slot(_) if t.is_array() => Some(t.element()),
        _ => None,
    }
}

fn check_types(types: &IndexMap<String, Type>, input: &str, instrs: &[Instr]) -> Result<(), String> {
    for i in instrs {
        match i {
            Instr::Assign { target, value, .. } => {
                let t = lvalue_type(types, target).ok_or(format!("bad target in {:?}", i))?;
                let v = infer(types, value).ok_or(format!("ill-typed value in {:?}", i))?;
                if !v.fits(t) {
                    return Err(format!("{:?} does not fit {:?} in {:?}", v, t, i));
                }
            }
            Instr::Flags { targets, lhs, .. } => {
                for t in targets.iter().flatten() {
                    if types.get(t) != Some(&Type::Bool) {
                        return Err(format!("flag written to non-bool {}", t));
                    }
                }
                let reads_input = lhs.variables() == vec![input];
                if !reads_input && infer(types, lhs) != Some(Ty::Exact(Type::U64)) {
                    return Err(format!("#CMP on a non-u64 in {:?}", i));
                }
            }
            Instr::If { cond, then, otherwise } => {
                if infer(types, cond) != Some(Ty::Exact(Type::Bool)) {
                    return Err(format!("non-bool condition {:?}", cond));
                }
                check_types(types, input, then)?;
                check_types(types, input, otherwise.as_deref().unwrap_or(&[]))?;
            }
            Instr::For { var, start, end, body, .. } => {
                if types.get(var) != Some(&Type::Int) || !infer(types, start).map_or(false, |t| t.fits(Type::Int)) {
                    return Err(format!("bad loop header {:?}", i));
                }
                if infer(types, end) != Some(Ty::Lit) {
                    return Err(format!("loop bound is not a literal: {:?}", end));
                }
                check_types(types, input, body)?;
            }
            Instr::While { cond, body, .. } => {
                if infer(types, cond) != Some(Ty::Exact(Type::Bool)) {
                    return Err(format!("non-bool condition {:?}", cond));
                }
                check_types(types, input, body)?;
            }
            Instr::Call { .. } => return Err("unexpected call in generated function".into()),
        }
    }
    Ok(())
}

fn check_assigned(instrs: &[Instr], input: &str, assigned: &mut HashSet<String>) -> Result<(), String> {
    fn reads(e: &Expr, input: &str, assigned: &HashSet<String>) -> Result<(), String> {
        for v in e.variables() {
            if v != input && !assigned.contains(v) {
                return Err(format!("{} read before assignment", v));
            }
        }
        Ok(())
    }

    for i in instrs {
        match i {
            Instr::Assign { target, op, value } => {
                reads(value, input, assigned)?;
                if op.reads_target() && target.name() != input && !assigned.contains(target.name()) {
                    return Err(format!("{} updated before assignment", target.name()));
                }
                assigned.insert(target.name().to_string());
            }
            Instr::Flags { targets, lhs, .. } => {
                reads(lhs, input, assigned)?;
                assigned.extend(targets.iter().flatten().cloned());
            }
            Instr::If { cond, then, otherwise } => {
                reads(cond, input, assigned)?;
                check_assigned(then, input, assigned)?;
                check_assigned(otherwise.as_deref().unwrap_or(&[]), input, assigned)?;
            }
            Instr::For { var, start, end, body, .. } => {
                reads(start, input, assigned)?;
                assigned.insert(var.clone());
                reads(end, input, assigned)?;
                check_assigned(body, input, assigned)?;
            }
            Instr::While { test: LoopTest::Pre, cond, body } => {
                reads(cond, input, assigned)?;
                check_assigned(body, input, assigned)?;
            }
            Instr::While { test: LoopTest::Post, cond, body } => {
                check_assigned(body, input, assigned)?;
                reads(cond, input, assigned)?;
            }
            Instr::Call { .. } => {}
        }
    }
    Ok(())
}

fn tree(seed: u64) -> Generated {
    let config = GeneratorConfig::default();
    let mut oracle = SeededOracle::new(seed, &config);
    generate_tree(&mut oracle, &config).unwrap()
}

fn name_counts(f: &Function) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for t in linearize_function(f) {
        if let Some(text) = t.text() {
            *counts.entry(text.to_string()).or_default() += 1;
        }
    }
    counts
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn same_seed_same_program(seed in any::<u64>()) {
        let config = GeneratorConfig::default();
        prop_assert_eq!(generate(seed, &config).unwrap(), generate(seed, &config).unwrap());
    }

    #[test]
    fn no_type_tokens_survive(seed in any::<u64>()) {
        let tokens = generate(seed, &GeneratorConfig::default()).unwrap();
        prop_assert!(tokens.iter().all(|t| !matches!(t, Token::Type(_))));
    }

    #[test]
    fn assignments_are_well_typed(seed in any::<u64>()) {
        let Generated { program, context } = tree(seed);
        let inner = &program.functions[0];
        let input = context.input().unwrap();
        if let Err(e) = check_types(context.types(), input, &inner.body) {
            return Err(TestCaseError::fail(e));
        }
        if let (Some((_, ty)), Some(ret)) = (inner.returns, &inner.ret) {
            match inner.params.iter().find(|p| &p.name == ret) {
                Some(param) => {
                    prop_assert_eq!(param.ty, ty);
                }
                None => {
                    prop_assert_eq!(context.types().get(ret), Some(&ty));
                }
            }
        }
    }

    #[test]
    fn returned_parameter_keeps_its_signature_type(seed in any::<u64>()) {
        let Generated { program, .. } = tree(seed);
        let inner = &program.functions[0];
        if let (Some((storage, ty)), Some(ret)) = (inner.returns, &inner.ret) {
            if let Some(param) = inner.params.iter().find(|p| &p.name == ret) {
                prop_assert_eq!((param.storage, param.ty), (storage, ty));
            }
        }
    }

    #[test]
    fn reads_follow_assignments(seed in any::<u64>()) {
        let Generated { program, context } = tree(seed);
        let inner = &program.functions[0];
        let input = context.input().unwrap();
        let mut assigned = HashSet::new();
        if let Err(e) = check_assigned(&inner.body, input, &mut assigned) {
            return Err(TestCaseError::fail(e));
        }
        if let Some(ret) = &inner.ret {
            prop_assert!(ret == input || assigned.contains(ret), "{} returned unassigned", ret);
        }
    }

    #[test]
    fn elision_is_idempotent(seed in any::<u64>()) {
        let Generated { program, .. } = tree(seed);
        let mut inner = program.functions[0].clone();
        prop_assert_eq!(elide_dead_declarations(&mut inner), 0);
        prop_assert_eq!(&inner, &program.functions[0]);
    }

    #[test]
    fn dead_declarations_leave_no_trace(seed in any::<u64>()) {
        let Generated { program, context } = tree(seed);
        let inner = &program.functions[0];
        let counts = name_counts(inner);
        let declared: HashSet<&str> = inner.params.iter().chain(&inner.decls).map(|d| d.name.as_str()).collect();
        for d in &declared {
            prop_assert!(counts.get(*d).copied().unwrap_or(0) >= 2, "{} kept but unused", d);
        }
        for name in context.types().keys() {
            if !declared.contains(name.as_str()) {
                prop_assert!(!counts.contains_key(name), "{} elided but still referenced", name);
            }
        }
    }

    #[test]
    fn harness_calls_exactly_once(seed in any::<u64>()) {
        let Generated { program, .. } = tree(seed);
        prop_assert_eq!(program.functions.len(), 2);
        let inner = &program.functions[0];
        let harness = &program.functions[1];
        prop_assert_eq!(harness.name.as_str(), HARNESS_NAME);
        let calls = harness
            .body
            .iter()
            .filter(|i| matches!(i, Instr::Call { function, .. } if *function == inner.name))
            .count();
        prop_assert_eq!(calls, 1);
        prop_assert_eq!(harness.ret.as_deref(), Some("final"));
    }
}
