//! Immutable lexical frames threaded through evaluation.

use serde_json::Value;
use std::collections::HashMap;
use std::rc::Rc;

/// One lexical frame: the root of the instance, the value currently in
/// focus, the enclosing value, and the variables in scope.
///
/// Frames are immutable. Entering a child position derives a new frame and
/// never touches the parent; the variable map is shared until a derivation
/// actually extends it.
#[derive(Debug, Clone)]
pub struct Scope<'v> {
    root: &'v Value,
    current: &'v Value,
    parent: Option<&'v Value>,
    variables: Rc<HashMap<String, Value>>,
}

impl<'v> Scope<'v> {
    /// The frame seeded at the start of a validation run: `current` is the
    /// root itself and there is no parent.
    pub fn new(root: &'v Value) -> Scope<'v> {
        Scope {
            root,
            current: root,
            parent: None,
            variables: Rc::new(HashMap::new()),
        }
    }

    /// Derive the frame for a child position: `current` moves to the given
    /// value and the old `current` becomes the parent.
    pub fn child(&self, current: &'v Value) -> Scope<'v> {
        Scope {
            root: self.root,
            current,
            parent: Some(self.current),
            variables: Rc::clone(&self.variables),
        }
    }

    /// Derive a frame with additional variable bindings. Existing names are
    /// shadowed, not mutated.
    pub fn with_variables<I>(&self, bindings: I) -> Scope<'v>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut variables = (*self.variables).clone();
        variables.extend(bindings);
        Scope {
            root: self.root,
            current: self.current,
            parent: self.parent,
            variables: Rc::new(variables),
        }
    }

    pub fn root(&self) -> &'v Value {
        self.root
    }

    pub fn current(&self) -> &'v Value {
        self.current
    }

    pub fn parent(&self) -> Option<&'v Value> {
        self.parent
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.variables.iter().map(|(name, value)| (name.as_str(), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn child_rebinds_current_and_parent() {
        let root = json!({"a": {"b": 1}});
        let inner = json!({"b": 1});
        let scope = Scope::new(&root);
        assert!(scope.parent().is_none());

        let child = scope.child(&inner);
        assert_eq!(child.current(), &inner);
        assert_eq!(child.parent(), Some(&root));
        assert_eq!(child.root(), &root);

        // The original frame is untouched.
        assert_eq!(scope.current(), &root);
        assert!(scope.parent().is_none());
    }

    #[test]
    fn variables_shadow_without_mutating() {
        let root = json!(null);
        let scope = Scope::new(&root).with_variables(vec![("a".to_owned(), json!(1))]);
        let extended = scope.with_variables(vec![("a".to_owned(), json!(2))]);

        assert_eq!(scope.variable("a"), Some(&json!(1)));
        assert_eq!(extended.variable("a"), Some(&json!(2)));
        assert_eq!(extended.variable("missing"), None);
    }
}
