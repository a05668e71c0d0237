use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared, mutable handle.  Environments are kept alive by whichever
/// closures and call frames still point at them.
pub type Shared<T> = Rc<RefCell<T>>;

/// One lexical scope: names bound here plus a link to the enclosing scope.
/// The global environment is the only one without a parent.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Shared<Environment>>,
}

fn undefined(name: &Token) -> LoxError {
    LoxError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Shared<Environment>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    pub fn shared(self) -> Shared<Environment> {
        Rc::new(RefCell::new(self))
    }

    /// Bind `name` in this scope, overwriting any previous binding here.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Value bound in this very scope, without walking outward.
    pub fn get_here(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    /// Dynamic lookup, walking outward until found.
    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined(name))
        }
    }

    /// Dynamic assignment; the name must already be bound somewhere in the chain.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }

    /// The environment `distance` links up the chain from `env`.
    pub fn ancestor(env: &Shared<Environment>, distance: usize) -> Option<Shared<Environment>> {
        let mut current: Shared<Environment> = Rc::clone(env);

        for _ in 0..distance {
            let next: Shared<Environment> = current.borrow().enclosing.clone()?;
            current = next;
        }

        Some(current)
    }

    /// Read a binding the resolver placed exactly `distance` scopes out.
    pub fn get_at(env: &Shared<Environment>, distance: usize, name: &Token) -> Result<Value> {
        debug!("get_at '{}' distance={}", name.lexeme, distance);

        let scope: Shared<Environment> =
            Self::ancestor(env, distance).ok_or_else(|| undefined(name))?;

        let value: Option<Value> = scope.borrow().get_here(&name.lexeme);

        value.ok_or_else(|| undefined(name))
    }

    /// Write a binding the resolver placed exactly `distance` scopes out.
    pub fn assign_at(
        env: &Shared<Environment>,
        distance: usize,
        name: &Token,
        value: Value,
    ) -> Result<()> {
        debug!("assign_at '{}' distance={}", name.lexeme, distance);

        let scope: Shared<Environment> =
            Self::ancestor(env, distance).ok_or_else(|| undefined(name))?;

        scope.borrow_mut().define(&name.lexeme, value);

        Ok(())
    }
}
