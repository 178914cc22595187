use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::error::Error;
use crate::value::Value;

pub type EnvRef = Rc<Environment>;

/// One lexical binding level. Frames chain to an optional parent and are
/// created per program run and per function call; closures keep their
/// captured frame alive through the shared handle.
#[derive(Debug)]
pub struct Environment {
    parent: Option<EnvRef>,
    vars: RefCell<HashMap<String, Value>>,
    constants: RefCell<HashSet<String>>,
    /// Reserved names, seeded once at the root frame.
    keywords: RefCell<HashSet<String>>,
}

impl Environment {
    pub fn root() -> EnvRef {
        Rc::new(Self {
            parent: None,
            vars: RefCell::new(HashMap::new()),
            constants: RefCell::new(HashSet::new()),
            keywords: RefCell::new(HashSet::new()),
        })
    }

    pub fn child(parent: &EnvRef) -> EnvRef {
        Rc::new(Self {
            parent: Some(Rc::clone(parent)),
            vars: RefCell::new(HashMap::new()),
            constants: RefCell::new(HashSet::new()),
            keywords: RefCell::new(HashSet::new()),
        })
    }

    /// Binds a new name in this frame. Redeclaring a name already present
    /// in the same frame is an error; shadowing a parent binding is not.
    pub fn declare(&self, name: &str, value: Value, constant: bool) -> Result<(), Error> {
        if self.is_keyword(name) {
            return Err(Error::keyword_assignment(name));
        }
        let mut vars = self.vars.borrow_mut();
        if vars.contains_key(name) {
            return Err(Error::already_declared(name));
        }
        if constant {
            self.constants.borrow_mut().insert(name.to_string());
        }
        vars.insert(name.to_string(), value);
        Ok(())
    }

    /// Seeding path for the reserved literals (`nulo`, `falso`, `verdadero`,
    /// `vacio`). Bypasses the keyword guard that blocks user declarations.
    pub fn declare_keyword(&self, name: &str, value: Value) {
        self.keywords.borrow_mut().insert(name.to_string());
        self.constants.borrow_mut().insert(name.to_string());
        self.vars.borrow_mut().insert(name.to_string(), value);
    }

    /// Rebinds an existing name in its owning frame.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), Error> {
        if self.is_keyword(name) {
            return Err(Error::keyword_assignment(name));
        }
        let owner = self
            .owner(name)
            .ok_or_else(|| Error::undefined_variable(name))?;
        if owner.constants.borrow().contains(name) {
            return Err(Error::constant_assignment(name));
        }
        owner.vars.borrow_mut().insert(name.to_string(), value);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<Value, Error> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Ok(value.clone());
        }
        match &self.parent {
            Some(parent) => parent.lookup(name),
            None => Err(Error::undefined_variable(name)),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        if self.vars.borrow().contains_key(name) {
            return true;
        }
        self.parent.as_deref().is_some_and(|p| p.has(name))
    }

    pub fn is_keyword(&self, name: &str) -> bool {
        if self.keywords.borrow().contains(name) {
            return true;
        }
        self.parent.as_deref().is_some_and(|p| p.is_keyword(name))
    }

    fn owner(&self, name: &str) -> Option<&Environment> {
        if self.vars.borrow().contains_key(name) {
            return Some(self);
        }
        self.parent.as_deref().and_then(|p| p.owner(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn number(real: f64) -> Value {
        Value::Number(Rc::new(crate::value::Number::real(real)))
    }

    #[test]
    fn test_declare_and_lookup() {
        let env = Environment::root();
        env.declare("x", number(42.0), false).unwrap();
        assert_eq!(env.lookup("x").unwrap(), number(42.0));
    }

    #[test]
    fn test_lookup_walks_to_parent() {
        let root = Environment::root();
        root.declare("x", number(1.0), false).unwrap();
        let child = Environment::child(&root);
        assert_eq!(child.lookup("x").unwrap(), number(1.0));
    }

    #[test]
    fn test_child_shadows_parent() {
        let root = Environment::root();
        root.declare("x", number(1.0), false).unwrap();
        let child = Environment::child(&root);
        child.declare("x", number(2.0), false).unwrap();
        assert_eq!(child.lookup("x").unwrap(), number(2.0));
        assert_eq!(root.lookup("x").unwrap(), number(1.0));
    }

    #[test]
    fn test_assign_updates_owning_frame() {
        let root = Environment::root();
        root.declare("x", number(1.0), false).unwrap();
        let child = Environment::child(&root);
        child.assign("x", number(2.0)).unwrap();
        assert_eq!(root.lookup("x").unwrap(), number(2.0));
    }

    #[test]
    fn test_redeclare_in_same_frame_fails() {
        let env = Environment::root();
        env.declare("x", number(1.0), false).unwrap();
        let err = env.declare("x", number(2.0), false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VariableAlreadyDeclared);
    }

    #[test]
    fn test_constant_cannot_be_reassigned() {
        let env = Environment::root();
        env.declare("x", number(1.0), true).unwrap();
        let err = env.assign("x", number(2.0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstantAssignment);
        assert_eq!(env.lookup("x").unwrap(), number(1.0));
    }

    #[test]
    fn test_lookup_of_undeclared_fails() {
        let env = Environment::root();
        let err = env.lookup("fantasma").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UndefinedVariable);
    }

    #[test]
    fn test_keyword_blocks_declaration_everywhere() {
        let root = Environment::root();
        root.declare_keyword("nulo", Value::Null);
        let err = root.declare("nulo", number(1.0), false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeywordAssignment);

        let child = Environment::child(&root);
        let err = child.declare("nulo", number(1.0), true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeywordAssignment);
    }

    #[test]
    fn test_keyword_blocks_assignment() {
        let root = Environment::root();
        root.declare_keyword("verdadero", Value::Boolean(true));
        let child = Environment::child(&root);
        let err = child.assign("verdadero", Value::Boolean(false)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeywordAssignment);
        assert_eq!(child.lookup("verdadero").unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_keyword_still_readable() {
        let root = Environment::root();
        root.declare_keyword("vacio", Value::Void);
        let child = Environment::child(&root);
        assert_eq!(child.lookup("vacio").unwrap(), Value::Void);
    }
}
