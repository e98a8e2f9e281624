pub mod ast;
pub mod choose;
pub mod config;
pub mod error;
pub mod grammar;
pub mod oracle;
pub mod semantics;

#[macro_use]
pub mod context;
pub use context::{Category, Context};

pub mod generator;
pub mod harness;
pub mod postprocess;
pub mod tokens;

pub use config::GeneratorConfig;
pub use error::{ConfigError, GenerationError, Result};
pub use oracle::{Oracle, ScriptedOracle, SeededOracle, UnstructuredOracle};
pub use tokens::{render, Token};

use arbitrary::Unstructured;

use ast::Program;

/// A finished program together with the state it was generated in.
#[derive(Debug, Clone)]
pub struct Generated {
    pub program: Program,
    pub context: Context,
}

/// Generates one function, elides its dead declarations and wraps it in the
/// exported harness. Tokens are not produced yet.
pub fn generate_tree(oracle: &mut dyn Oracle, config: &GeneratorConfig) -> Result<Generated> {
    let mut ctx = Context::make_context(config);
    let mut function = generator::gen_function(&mut ctx, oracle)?;
    postprocess::elide_dead_declarations(&mut function);
    let harness = harness::synthesize_harness(&mut function, oracle);
    Ok(Generated {
        program: Program { functions: vec![function, harness] },
        context: ctx,
    })
}

pub fn generate_with(oracle: &mut dyn Oracle, config: &GeneratorConfig) -> Result<Vec<Token>> {
    let Generated { program, .. } = generate_tree(oracle, config)?;
    let mut tokens = tokens::linearize_program(&program);
    tokens::stringify_types(&mut tokens);
    Ok(tokens)
}

/// The token sequence for `seed`. Same seed and config, same tokens.
pub fn generate(seed: u64, config: &GeneratorConfig) -> Result<Vec<Token>> {
    let mut oracle = SeededOracle::new(seed, config);
    generate_with(&mut oracle, config)
}

/// Renders the program that fuzzer bytes `data` describe.
pub fn make_program_str(data: &[u8], config: &GeneratorConfig) -> Result<String> {
    let mut oracle = UnstructuredOracle::new(Unstructured::new(data), config);
    Ok(render(&generate_with(&mut oracle, config)?))
}
