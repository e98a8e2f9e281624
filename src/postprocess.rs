use std::collections::HashMap;

use tracing::debug;

use crate::ast::{Decl, Function};
use crate::tokens::linearize_function;

/// Drops the declaration of every parameter or local whose name appears
/// exactly once in the function, i.e. only in its own declaration.
/// Returns how many were dropped.
pub fn elide_dead_declarations(function: &mut Function) -> usize {
    let tokens = linearize_function(function);
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for t in &tokens {
        if let Some(text) = t.text() {
            *counts.entry(text).or_default() += 1;
        }
    }

    let dead = |d: &Decl| counts.get(d.name.as_str()) == Some(&1);
    let before = function.params.len() + function.decls.len();
    function.params.retain(|d| !dead(d));
    function.decls.retain(|d| !dead(d));
    let removed = before - function.params.len() - function.decls.len();

    debug!(function = %function.name, removed, "elided dead declarations");
    removed
}
