//! Sources of generation decisions.
//!
//! The walker never draws randomness itself: every production choice,
//! repetition count, pick and literal comes from an [`Oracle`]. Replaying the
//! same oracle state replays the same program.

use std::collections::{BTreeMap, VecDeque};

use arbitrary::Unstructured;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::choose::{choose_weighted, choose_weighted_unstructured};
use crate::config::GeneratorConfig;
use crate::grammar::{Nonterminal, Production, ProductionTable};
use crate::semantics::Type;

pub trait Oracle {
    /// Picks the production to expand `nonterminal` with. `scope` is the type
    /// the production has to produce, if any. `depth` is the current nesting
    /// and should bias towards non-recursive productions as it grows.
    fn choose(&mut self, nonterminal: Nonterminal, scope: Option<Type>, depth: usize) -> Production;

    fn instruction_count(&mut self) -> usize;

    fn decl_count(&mut self) -> usize;

    fn block_instruction_count(&mut self) -> usize {
        self.instruction_count()
    }

    /// Uniform in `[0, len)`; `len` is never zero.
    fn index(&mut self, len: usize) -> usize;

    /// Uniform in `[0, bound)`; `bound` is never zero.
    fn literal(&mut self, bound: u64) -> u64;
}

#[derive(Debug, Clone, Copy)]
struct Limits {
    decls: usize,
    instructions: usize,
    block_instructions: usize,
}

impl Limits {
    fn new(config: &GeneratorConfig) -> Self {
        Limits {
            decls: config.max_decls,
            instructions: config.max_instructions,
            block_instructions: config.max_block_instructions,
        }
    }
}

/// Oracle backed by an owned, explicitly seeded PRNG.
pub struct SeededOracle {
    rng: StdRng,
    table: ProductionTable,
    limits: Limits,
}

impl SeededOracle {
    pub fn new(seed: u64, config: &GeneratorConfig) -> Self {
        SeededOracle {
            rng: StdRng::seed_from_u64(seed),
            table: ProductionTable::new(config),
            limits: Limits::new(config),
        }
    }
}

impl Oracle for SeededOracle {
    fn choose(&mut self, nonterminal: Nonterminal, scope: Option<Type>, depth: usize) -> Production {
        let candidates = self.table.candidates(nonterminal, scope, depth);
        // candidates is never empty
        choose_weighted(&mut self.rng, &candidates).unwrap_or(candidates[0].0)
    }

    fn instruction_count(&mut self) -> usize {
        self.rng.gen_range(0..=self.limits.instructions)
    }

    fn decl_count(&mut self) -> usize {
        self.rng.gen_range(0..=self.limits.decls)
    }

    fn block_instruction_count(&mut self) -> usize {
        self.rng.gen_range(0..=self.limits.block_instructions)
    }

    fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    fn literal(&mut self, bound: u64) -> u64 {
        self.rng.gen_range(0..bound)
    }
}

/// Oracle that reads its decisions from fuzzer-supplied bytes. Once the
/// bytes run out every decision takes its lowest alternative, which still
/// terminates because counts drop to zero.
pub struct UnstructuredOracle<'a> {
    u: Unstructured<'a>,
    table: ProductionTable,
    limits: Limits,
}

impl<'a> UnstructuredOracle<'a> {
    pub fn new(u: Unstructured<'a>, config: &GeneratorConfig) -> Self {
        UnstructuredOracle {
            u,
            table: ProductionTable::new(config),
            limits: Limits::new(config),
        }
    }

    fn up_to(&mut self, max: usize) -> usize {
        self.u.int_in_range(0..=max).unwrap_or(0)
    }
}

impl<'a> Oracle for UnstructuredOracle<'a> {
    fn choose(&mut self, nonterminal: Nonterminal, scope: Option<Type>, depth: usize) -> Production {
        let candidates = self.table.candidates(nonterminal, scope, depth);
        choose_weighted_unstructured(&mut self.u, &candidates).unwrap_or(candidates[0].0)
    }

    fn instruction_count(&mut self) -> usize {
        self.up_to(self.limits.instructions)
    }

    fn decl_count(&mut self) -> usize {
        self.up_to(self.limits.decls)
    }

    fn block_instruction_count(&mut self) -> usize {
        self.up_to(self.limits.block_instructions)
    }

    fn index(&mut self, len: usize) -> usize {
        self.up_to(len - 1)
    }

    fn literal(&mut self, bound: u64) -> u64 {
        self.u.int_in_range(0..=bound - 1).unwrap_or(0)
    }
}

/// Oracle that replays fixed answers, for pinning down an exact program.
/// Unscripted choices take the first non-recursive production valid in
/// scope; counts, picks and literals default to zero.
#[derive(Debug, Default, Clone)]
pub struct ScriptedOracle {
    choices: BTreeMap<Nonterminal, VecDeque<Production>>,
    repeats: BTreeMap<Nonterminal, Production>,
    decls: usize,
    instructions: usize,
    block_instructions: usize,
    literals: VecDeque<u64>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues answers for `nt`, consumed in order.
    pub fn script<I: IntoIterator<Item = Production>>(mut self, nt: Nonterminal, answers: I) -> Self {
        self.choices.entry(nt).or_default().extend(answers);
        self
    }

    /// Answer for `nt` once its queue is empty.
    pub fn repeat(mut self, nt: Nonterminal, production: Production) -> Self {
        self.repeats.insert(nt, production);
        self
    }

    pub fn decls(mut self, n: usize) -> Self {
        self.decls = n;
        self
    }

    pub fn instructions(mut self, n: usize) -> Self {
        self.instructions = n;
        self
    }

    pub fn block_instructions(mut self, n: usize) -> Self {
        self.block_instructions = n;
        self
    }

    pub fn literals<I: IntoIterator<Item = u64>>(mut self, values: I) -> Self {
        self.literals.extend(values);
        self
    }
}

impl Oracle for ScriptedOracle {
    fn choose(&mut self, nonterminal: Nonterminal, scope: Option<Type>, _depth: usize) -> Production {
        if let Some(p) = self.choices.get_mut(&nonterminal).and_then(VecDeque::pop_front) {
            return p;
        }
        if let Some(p) = self.repeats.get(&nonterminal) {
            return *p;
        }
        nonterminal
            .productions()
            .find(|p| p.allowed_in(scope) && !p.is_recursive())
            .or_else(|| nonterminal.productions().next())
            .unwrap_or(Production::Var)
    }

    fn instruction_count(&mut self) -> usize {
        self.instructions
    }

    fn decl_count(&mut self) -> usize {
        self.decls
    }

    fn block_instruction_count(&mut self) -> usize {
        self.block_instructions
    }

    fn index(&mut self, _len: usize) -> usize {
        0
    }

    fn literal(&mut self, bound: u64) -> u64 {
        self.literals.pop_front().unwrap_or(0).min(bound - 1)
    }
}
