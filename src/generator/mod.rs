//! The grammar walker. Every function here takes the generation `Context`
//! and the oracle, and returns a piece of the program tree.

mod expressions;
mod functions;
mod instructions;
mod types;

pub use expressions::gen_expr;
pub use functions::gen_function;
pub use instructions::{gen_block, gen_instr};
pub use types::{gen_ptype, gen_stor_type};

use tracing::trace;

use crate::error::{GenerationError, Result};
use crate::grammar::{Nonterminal, Production};
use crate::oracle::Oracle;
use crate::semantics::Type;

/// Exclusive bound of integer literals inside expressions.
pub const EXPR_LITERAL_CAP: u64 = 10000;

/// Exclusive bound of literals written by repairs, loop bounds and the harness.
pub const SMALL_LITERAL_CAP: u64 = 1000;

/// Name of the local that is synthesized to return a `u64` input.
pub const OUT: &str = "out";

/// Asks the oracle to expand `nt` and rejects productions `nt` does not have.
fn choose(o: &mut dyn Oracle, nt: Nonterminal, scope: Option<Type>, depth: usize) -> Result<Production> {
    let production = o.choose(nt, scope, depth);
    if !nt.accepts(production) {
        return Err(unexpected(nt, production));
    }
    trace!(?nt, ?production, depth, "expand");
    Ok(production)
}

fn unexpected(nonterminal: Nonterminal, production: Production) -> GenerationError {
    GenerationError::UnexpectedProduction { nonterminal, production }
}
