use indexmap::{IndexMap, IndexSet};
use tracing::trace;

use crate::config::GeneratorConfig;
use crate::error::{GenerationError, Result};
use crate::oracle::Oracle;
use crate::semantics::{Storage, Type, Width};

/// Which kind of name a lookup or declaration is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Plain variables, scalars and arrays alike
    Variables,
    Arrays,
    FunctionName,
    /// A name that is being declared right now, never looked up
    Decl,
}

/// Everything the walker knows about the function being generated.
/// One per run, every collection keeps insertion order.
#[derive(Debug, Clone)]
pub struct Context {
    /// Recursive expression productions are cut off past this depth
    pub max_expr_depth: usize,
    /// Compound instructions are cut off at this depth
    pub max_block_depth: usize,
    /// Current block nesting; see `nested!`
    pub block_depth: usize,

    variables: Vec<String>,
    functions: Vec<String>,
    types: IndexMap<String, Type>,
    /// Keyed by element type, so arrays share a pool with their words
    pools: IndexMap<Type, Vec<String>>,
    storage: IndexMap<String, Storage>,
    arrays: IndexSet<String>,
    used_before_assignment: IndexSet<String>,
    assigned: IndexSet<String>,

    input: Option<String>,
    return_type: Option<(Storage, Type)>,
    /// Set once the input had to be retyped to feed `#CMP`
    input_promotion: Option<(Storage, Type)>,
}

impl Context {
    pub fn make_context(config: &GeneratorConfig) -> Self {
        Context {
            max_expr_depth: config.max_expr_depth,
            max_block_depth: config.max_block_depth,
            block_depth: 0,
            variables: vec![],
            functions: vec![],
            types: IndexMap::new(),
            pools: IndexMap::new(),
            storage: IndexMap::new(),
            arrays: IndexSet::new(),
            used_before_assignment: IndexSet::new(),
            assigned: IndexSet::new(),
            input: None,
            return_type: None,
            input_promotion: None,
        }
    }

    /// A fresh `v<N>`. The name is a plain variable from here on, even
    /// before its type is recorded.
    pub fn declare(&mut self, category: Category) -> String {
        if category == Category::FunctionName {
            return self.declare_function_name();
        }
        let name = format!("v{}", self.variables.len());
        self.variables.push(name.clone());
        name
    }

    pub fn declare_function_name(&mut self) -> String {
        let name = format!("f{}", self.functions.len());
        self.functions.push(name.clone());
        name
    }

    /// Declares a variable outside the `v<N>` sequence. It never shows up in
    /// lookups.
    pub fn declare_fixed(&mut self, name: &str, storage: Storage, ty: Type) {
        self.types.entry(name.to_string()).or_insert(ty);
        self.storage.insert(name.to_string(), storage);
    }

    /// First registration wins: a name keeps its type for the whole run.
    pub fn record_type(&mut self, name: &str, ty: Type) {
        if self.types.contains_key(name) {
            return;
        }
        self.types.insert(name.to_string(), ty);
        self.pools.entry(ty.element()).or_default().push(name.to_string());
        if ty.is_array() {
            self.arrays.insert(name.to_string());
        }
    }

    pub fn record_storage(&mut self, name: &str, storage: Storage) {
        self.storage.insert(name.to_string(), storage);
    }

    pub fn type_of(&self, name: &str) -> Result<Type> {
        self.types
            .get(name)
            .copied()
            .ok_or_else(|| GenerationError::UnknownVariable(name.to_string()))
    }

    pub fn storage_of(&self, name: &str) -> Result<Storage> {
        self.storage
            .get(name)
            .copied()
            .ok_or_else(|| GenerationError::UnknownVariable(name.to_string()))
    }

    pub fn types(&self) -> &IndexMap<String, Type> {
        &self.types
    }

    pub fn is_array(&self, name: &str) -> bool {
        self.arrays.contains(name)
    }

    /// Uniformly random among the names of `category` (narrowed to element
    /// type `ty` when given), or `None` if there are none.
    pub fn lookup(&self, oracle: &mut dyn Oracle, category: Category, ty: Option<Type>) -> Option<String> {
        self.lookup_where(oracle, category, ty, |_| true)
    }

    pub fn lookup_where<P>(
        &self,
        oracle: &mut dyn Oracle,
        category: Category,
        ty: Option<Type>,
        pred: P,
    ) -> Option<String>
    where P: Fn(&str) -> bool {
        let candidates: Vec<&String> = self.candidates(category, ty).into_iter().filter(|n| pred(n)).collect();
        if candidates.is_empty() {
            return None;
        }
        let idx = oracle.index(candidates.len());
        Some(candidates[idx].clone())
    }

    /// The names `lookup` picks from, without drawing.
    pub fn candidates(&self, category: Category, ty: Option<Type>) -> Vec<&String> {
        match (category, ty) {
            (Category::Variables, None) => self.variables.iter().collect(),
            (Category::Variables, Some(t)) => self.pools.get(&t.element()).map_or(vec![], |p| p.iter().collect()),
            (Category::Arrays, None) => self.arrays.iter().collect(),
            (Category::Arrays, Some(t)) => self
                .arrays
                .iter()
                .filter(|a| self.types.get(*a).map(|at| at.element()) == Some(t.element()))
                .collect(),
            (Category::FunctionName, _) => self.functions.iter().collect(),
            (Category::Decl, _) => vec![],
        }
    }

    /// A read. Flags `name` unless an assignment was already recorded.
    pub fn mark_used(&mut self, name: &str) {
        if !self.assigned.contains(name) && !self.used_before_assignment.contains(name) {
            self.used_before_assignment.insert(name.to_string());
        }
    }

    /// A write. Does not clear an earlier flag: the read still came first.
    pub fn mark_assigned(&mut self, name: &str) {
        if !self.used_before_assignment.contains(name) {
            self.assigned.insert(name.to_string());
        }
    }

    pub fn is_assigned(&self, name: &str) -> bool {
        self.assigned.contains(name)
    }

    pub fn is_flagged(&self, name: &str) -> bool {
        self.used_before_assignment.contains(name)
    }

    pub fn flagged(&self) -> impl Iterator<Item = &str> {
        self.used_before_assignment.iter().map(String::as_str)
    }

    /// Drops a flag without repairing it; only the input gets this.
    pub fn exempt(&mut self, name: &str) {
        self.used_before_assignment.shift_remove(name);
    }

    /// Removes and returns every flagged name, in flag order, recording each
    /// as assigned.
    pub fn take_flagged(&mut self) -> Vec<String> {
        let flagged: Vec<String> = self.used_before_assignment.drain(..).collect();
        for name in &flagged {
            self.assigned.insert(name.clone());
        }
        flagged
    }

    pub fn set_input(&mut self, name: &str) {
        self.input = Some(name.to_string());
    }

    pub fn input(&self) -> Option<&str> {
        self.input.as_deref()
    }

    /// Storage and type the input is declared with in the signature.
    pub fn input_signature(&self) -> Result<Option<(Storage, Type)>> {
        if let Some(promoted) = self.input_promotion {
            return Ok(Some(promoted));
        }
        match &self.input {
            Some(name) => Ok(Some((self.storage_of(name)?, self.type_of(name)?))),
            None => Ok(None),
        }
    }

    /// Retypes the input's signature to `u64` (keeping array-ness) so it can
    /// be compared against. The type map is left alone.
    pub fn promote_input(&mut self) -> Result<()> {
        let Some((storage, ty)) = self.input_signature()? else {
            return Ok(());
        };
        if ty.is_u64_based() {
            return Ok(());
        }
        let storage = if storage == Storage::Inline { Storage::Reg } else { storage };
        let ty = if ty.is_array() { Type::Array(Width::U64) } else { Type::U64 };
        trace!(from = ?self.input_signature()?, to = ?(storage, ty), "promoted input");
        self.input_promotion = Some((storage, ty));
        Ok(())
    }

    pub fn set_return_type(&mut self, ret: (Storage, Type)) {
        self.return_type = Some(ret);
    }

    pub fn return_type(&self) -> Option<(Storage, Type)> {
        self.return_type
    }
}

#[macro_export]
macro_rules! with_attrs {
    ($obj: ident { }, $e:expr) => ($e);
    ($obj: ident { $attr:ident = $val:expr $(,$attrs:ident = $vals:expr)* }, $e:expr) => {
        {
            let old_val = $obj.$attr;
            $obj.$attr = $val;
            let result = $crate::with_attrs!($obj { $($attrs = $vals),* }, $e);
            $obj.$attr = old_val;
            result
        }
    }
}

/// Evaluates `$e` one block level deeper.
#[macro_export]
macro_rules! nested {
    ($ctx: ident, $e: expr) => ($crate::with_attrs!($ctx { block_depth = $ctx.block_depth + 1 }, $e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::SeededOracle;

    fn ctx() -> Context {
        Context::make_context(&GeneratorConfig::default())
    }

    #[test]
    fn names_follow_declaration_order() {
        let mut ctx = ctx();
        assert_eq!(ctx.declare(Category::Decl), "v0");
        assert_eq!(ctx.declare(Category::Decl), "v1");
        assert_eq!(ctx.declare_function_name(), "f0");
        assert_eq!(ctx.declare(Category::FunctionName), "f1");
    }

    #[test]
    fn types_are_append_only() {
        let mut ctx = ctx();
        let v = ctx.declare(Category::Decl);
        ctx.record_type(&v, Type::Bool);
        ctx.record_type(&v, Type::U64);
        assert_eq!(ctx.type_of(&v).unwrap(), Type::Bool);
    }

    #[test]
    fn arrays_pool_with_their_element_type() {
        let mut ctx = ctx();
        let mut oracle = SeededOracle::new(0, &GeneratorConfig::default());
        let a = ctx.declare(Category::Decl);
        ctx.record_type(&a, Type::Array(Width::U32));
        assert_eq!(ctx.lookup(&mut oracle, Category::Variables, Some(Type::Word(Width::U32))), Some(a.clone()));
        assert_eq!(ctx.lookup(&mut oracle, Category::Arrays, Some(Type::Word(Width::U32))), Some(a.clone()));
        assert_eq!(ctx.lookup(&mut oracle, Category::Arrays, Some(Type::U64)), None);
        assert_eq!(ctx.lookup(&mut oracle, Category::Decl, None), None);
        assert!(ctx.is_array(&a));
    }

    #[test]
    fn use_before_assignment_is_sticky() {
        let mut ctx = ctx();
        ctx.mark_used("v1");
        ctx.mark_assigned("v1");
        assert!(ctx.is_flagged("v1"));
        assert!(!ctx.is_assigned("v1"));

        ctx.mark_assigned("v2");
        ctx.mark_used("v2");
        assert!(!ctx.is_flagged("v2"));
    }

    #[test]
    fn take_flagged_keeps_order() {
        let mut ctx = ctx();
        ctx.mark_used("v3");
        ctx.mark_used("v1");
        ctx.mark_used("v3");
        assert_eq!(ctx.take_flagged(), vec!["v3".to_string(), "v1".to_string()]);
        assert!(ctx.is_assigned("v3"));
        assert_eq!(ctx.flagged().count(), 0);
    }

    #[test]
    fn promotion_changes_only_the_signature() {
        let mut ctx = ctx();
        let v = ctx.declare(Category::Decl);
        ctx.record_type(&v, Type::Int);
        ctx.record_storage(&v, Storage::Inline);
        ctx.set_input(&v);
        ctx.promote_input().unwrap();
        assert_eq!(ctx.input_signature().unwrap(), Some((Storage::Reg, Type::U64)));
        assert_eq!(ctx.type_of(&v).unwrap(), Type::Int);
    }

    #[test]
    fn nested_restores_depth() {
        let mut ctx = ctx();
        let inner = nested!(ctx, nested!(ctx, ctx.block_depth));
        assert_eq!(inner, 2);
        assert_eq!(ctx.block_depth, 0);
    }
}
