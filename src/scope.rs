//! Chained lexical scope frames.
//!
//! Both passes walk the same block structure and both need the same name
//! resolution discipline, so the stack is generic over what a name binds to:
//! the type checker binds names to resolved types, the lowering pass binds
//! them to storage locations.

use std::collections::HashMap;

/// A stack of lexical scope frames, innermost last.
///
/// Lookups search from the innermost frame outward; definitions only ever
/// touch the innermost frame, so shadowing an outer binding is allowed but
/// redefining a name within one frame is not.
#[derive(Debug)]
pub struct ScopeStack<T> {
    frames: Vec<HashMap<String, T>>,
}

impl<T> ScopeStack<T> {
    pub fn new() -> Self {
        ScopeStack {
            frames: vec![HashMap::new()],
        }
    }

    /// Enters a child frame.
    pub fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    /// Leaves the innermost frame, discarding its bindings.
    ///
    /// # Panics
    ///
    /// Panics if called on the root frame; push and pop must always pair up.
    pub fn pop(&mut self) {
        if self.frames.len() == 1 {
            panic!("attempted to pop the root scope frame");
        }
        self.frames.pop();
    }

    /// Whether the stack currently holds only the root frame.
    pub fn is_top_level(&self) -> bool {
        self.frames.len() == 1
    }

    /// Binds `name` in the innermost frame.
    ///
    /// Returns false without touching the frame if the name is already bound
    /// there. Outer frames are not consulted.
    pub fn define(&mut self, name: &str, value: T) -> bool {
        let frame = self.frames.last_mut().unwrap();
        if frame.contains_key(name) {
            return false;
        }
        frame.insert(name.to_string(), value);
        true
    }

    /// Resolves `name` against the nearest frame that binds it.
    pub fn lookup(&self, name: &str) -> Option<&T> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }
}

impl<T> Default for ScopeStack<T> {
    fn default() -> Self {
        ScopeStack::new()
    }
}
