use crate::types::Type;

use std::collections::HashMap;

pub type Identifier = String;

/// Index of a scope in [`SymTab::scopes`].
pub type ScopeId = usize;

/// Index of a symbol in [`SymTab::symbols`].
pub type SymbolId = usize;

/// Lookup policy for [`SymTab::find`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// this scope only
    Local,
    /// walk the parent chain up to the root
    Any,
    /// root scope only
    Global,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    /// module-level variable, lives in `.data`
    Global,
    /// subroutine-local variable, lives in the stack frame
    Local,
    /// formal parameter with its 0-based index
    Param(usize),
    Procedure {
        /// parameter name/type pairs in declaration order; array types are
        /// already rewritten to pointers here
        params: Vec<(Identifier, Type)>,
        is_external: bool,
    },
    /// compile-time constant with its folded value
    Constant(i64),
}

/// A declared name. For procedures `ty` is the return type, for everything
/// else the data type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: Identifier,
    pub ty: Type,
    pub kind: SymbolKind,
    /// string initializer for synthesized `_str_<N>` globals
    pub data: Option<String>,
}

impl Symbol {
    pub fn is_procedure(&self) -> bool {
        matches!(self.kind, SymbolKind::Procedure { .. })
    }

    pub fn is_external(&self) -> bool {
        matches!(
            self.kind,
            SymbolKind::Procedure {
                is_external: true,
                ..
            }
        )
    }

    pub fn proc_params(&self) -> &[(Identifier, Type)] {
        match &self.kind {
            SymbolKind::Procedure { params, .. } => params,
            _ => &[],
        }
    }
}

#[derive(Debug)]
struct Scope {
    parent: Option<ScopeId>,
    names: HashMap<Identifier, SymbolId>,
    /// declaration order, drives frame layout and data emission
    order: Vec<SymbolId>,
}

/// All scopes and symbols of one compilation, arena-style. Scopes form a
/// tree through parent links; AST nodes refer to symbols by id.
#[derive(Debug, Default)]
pub struct SymTab {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
}

pub const MODULE_SCOPE: ScopeId = 0;

impl SymTab {
    pub fn new() -> Self {
        let mut st = Self::default();
        let root = st.create_scope(None);
        debug_assert_eq!(root, MODULE_SCOPE);
        st
    }

    pub fn create_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        self.scopes.push(Scope {
            parent,
            names: HashMap::new(),
            order: Vec::new(),
        });
        self.scopes.len() - 1
    }

    /// Declares `symbol` in `scope`. Returns `None` when the name is already
    /// taken in that scope.
    pub fn add(&mut self, scope: ScopeId, symbol: Symbol) -> Option<SymbolId> {
        if self.scopes[scope].names.contains_key(&symbol.name) {
            return None;
        }
        let id = self.symbols.len();
        self.scopes[scope].names.insert(symbol.name.clone(), id);
        self.scopes[scope].order.push(id);
        self.symbols.push(symbol);
        Some(id)
    }

    pub fn find(&self, scope: ScopeId, name: &str, lookup: Lookup) -> Option<SymbolId> {
        match lookup {
            Lookup::Local => self.scopes[scope].names.get(name).copied(),
            Lookup::Global => self.scopes[MODULE_SCOPE].names.get(name).copied(),
            Lookup::Any => {
                let mut current = Some(scope);
                while let Some(s) = current {
                    if let Some(&id) = self.scopes[s].names.get(name) {
                        return Some(id);
                    }
                    current = self.scopes[s].parent;
                }
                None
            }
        }
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id]
    }

    /// Symbols of `scope` in declaration order.
    pub fn declared(&self, scope: ScopeId) -> impl Iterator<Item = SymbolId> + '_ {
        self.scopes[scope].order.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(name: &str, ty: Type) -> Symbol {
        Symbol {
            name: name.to_owned(),
            ty,
            kind: SymbolKind::Local,
            data: None,
        }
    }

    #[test]
    fn test_duplicate_in_same_scope() {
        let mut st = SymTab::new();
        assert!(st.add(MODULE_SCOPE, local("i", Type::Integer)).is_some());
        assert!(st.add(MODULE_SCOPE, local("i", Type::Bool)).is_none());
    }

    #[test]
    fn test_lookup_walks_parents() {
        let mut st = SymTab::new();
        let g = st.add(MODULE_SCOPE, local("g", Type::Integer)).unwrap();
        let inner = st.create_scope(Some(MODULE_SCOPE));
        let shadow = st.add(inner, local("g", Type::Bool)).unwrap();

        assert_eq!(st.find(inner, "g", Lookup::Local), Some(shadow));
        assert_eq!(st.find(inner, "g", Lookup::Any), Some(shadow));
        assert_eq!(st.find(inner, "g", Lookup::Global), Some(g));
        assert_eq!(st.find(inner, "missing", Lookup::Any), None);
    }
}
