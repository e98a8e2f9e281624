use super::{choose, unexpected};
use crate::error::Result;
use crate::grammar::{Nonterminal, Production};
use crate::oracle::Oracle;
use crate::semantics::{CallConv, Storage, Type, Width};

pub fn gen_utype(o: &mut dyn Oracle) -> Result<Width> {
    let p = choose(o, Nonterminal::Utype, None, 0)?;
    p.width().ok_or_else(|| unexpected(Nonterminal::Utype, p))
}

pub fn gen_ptype(o: &mut dyn Oracle) -> Result<Type> {
    match choose(o, Nonterminal::Ptype, None, 0)? {
        Production::Bool => Ok(Type::Bool),
        Production::Int => Ok(Type::Int),
        Production::Utype => Ok(Type::Word(gen_utype(o)?)),
        Production::Array => Ok(Type::Array(gen_utype(o)?)),
        p => Err(unexpected(Nonterminal::Ptype, p)),
    }
}

pub fn gen_storage(o: &mut dyn Oracle) -> Result<Storage> {
    match choose(o, Nonterminal::Storage, None, 0)? {
        Production::Reg => Ok(Storage::Reg),
        Production::Stack => Ok(Storage::Stack),
        Production::Inline => Ok(Storage::Inline),
        p => Err(unexpected(Nonterminal::Storage, p)),
    }
}

/// Storage then type. Compile-time integers can only live `inline`.
pub fn gen_stor_type(o: &mut dyn Oracle) -> Result<(Storage, Type)> {
    let storage = gen_storage(o)?;
    let ty = gen_ptype(o)?;
    if ty == Type::Int {
        return Ok((Storage::Inline, ty));
    }
    Ok((storage, ty))
}

/// Operand type of a comparison or logic operator. Never an array.
pub fn gen_eval_type(o: &mut dyn Oracle) -> Result<Type> {
    match choose(o, Nonterminal::EvalType, None, 0)? {
        Production::Bool => Ok(Type::Bool),
        Production::Int => Ok(Type::Int),
        p => p
            .width()
            .map(Type::Word)
            .ok_or_else(|| unexpected(Nonterminal::EvalType, p)),
    }
}

pub fn gen_call_conv(o: &mut dyn Oracle) -> Result<CallConv> {
    match choose(o, Nonterminal::CallConv, None, 0)? {
        Production::Export => Ok(CallConv::Export),
        Production::Inline => Ok(CallConv::Inline),
        p => Err(unexpected(Nonterminal::CallConv, p)),
    }
}
