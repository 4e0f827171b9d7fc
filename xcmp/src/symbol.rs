use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SymbolKind {
    Val,
    Var,
    Array,
    Proc,
    Func,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SymbolScope {
    Global,
    Local,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub scope: SymbolScope,
    /// The folded value, for vals with constant initializers.
    pub value: Option<i32>,
}

impl Symbol {
    pub fn new(kind: SymbolKind, scope: SymbolScope, value: Option<i32>) -> Symbol {
        Symbol { kind, scope, value }
    }
}

/// Name bindings with local scopes stacked over the global scope. Lookup
/// returns the innermost visible binding; leaving a scope restores whatever
/// the names shadowed.
pub struct SymbolTable {
    bindings: HashMap<String, Vec<Symbol>>,
    frames: Vec<Vec<String>>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable {
            bindings: HashMap::new(),
            frames: vec![Vec::new()],
        }
    }

    pub fn enter_scope(&mut self) {
        self.frames.push(Vec::new());
    }

    pub fn exit_scope(&mut self) {
        let names = self.frames.pop().expect("unbalanced scopes");
        for name in names {
            let stack = self.bindings.get_mut(&name).expect("missing binding");
            stack.pop();
            if stack.is_empty() {
                self.bindings.remove(&name);
            }
        }
    }

    pub fn insert(&mut self, name: &str, symbol: Symbol) {
        self.bindings
            .entry(name.to_owned())
            .or_insert_with(Vec::new)
            .push(symbol);
        self.frames
            .last_mut()
            .expect("no open scope")
            .push(name.to_owned());
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.bindings.get(name).and_then(|stack| stack.last())
    }
}
