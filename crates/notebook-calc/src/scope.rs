//! Layered variable scopes.
//!
//! Every executed statement produces a new scope on top of the one it ran in. Layers are shared
//! with `Rc`, so the scope of an earlier statement stays valid (and unchanged) when a later one
//! rebinds a name.

use rustc_hash::FxHashMap;
use std::rc::Rc;

/// One layer of bindings plus its parent.
#[derive(Debug, Default)]
pub struct Scope {
    bindings: FxHashMap<String, i64>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    /// The empty root scope.
    pub fn root() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// A new layer on top of `parent`, holding `bindings`.
    pub fn layer(parent: Option<Rc<Scope>>, bindings: FxHashMap<String, i64>) -> Rc<Self> {
        Rc::new(Self { bindings, parent })
    }

    /// Look a name up, innermost layer first.
    pub fn get(&self, name: &str) -> Option<i64> {
        let mut scope = self;
        loop {
            if let Some(value) = scope.bindings.get(name) {
                return Some(*value);
            }
            scope = scope.parent.as_deref()?;
        }
    }

    /// Number of layers, this one included.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut scope = self;
        while let Some(parent) = scope.parent.as_deref() {
            depth += 1;
            scope = parent;
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind(name: &str, value: i64) -> FxHashMap<String, i64> {
        let mut bindings = FxHashMap::default();
        bindings.insert(name.to_string(), value);
        bindings
    }

    #[test]
    fn test_inner_layer_shadows_outer() {
        let root = Scope::root();
        let first = Scope::layer(Some(root), bind("a", 1));
        let second = Scope::layer(Some(first.clone()), bind("a", 2));

        assert_eq!(first.get("a"), Some(1));
        assert_eq!(second.get("a"), Some(2));
        assert_eq!(second.get("b"), None);
        assert_eq!(second.depth(), 3);
    }
}
