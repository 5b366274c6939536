use crate::symbols::{ScopeId, SymbolId};
use crate::types::Type;

use std::collections::{HashMap, HashSet};

/// Index of a temporary in its code block's pool.
pub type TempId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum TacValue {
    Const(i64, Type),
    /// a declared symbol (variable, parameter, global)
    Name(SymbolId),
    Temp(TempId),
    /// memory at the address held in the temp; the temp's pointer type
    /// gives the element size
    Reference(TempId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TacUnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    BiggerThan,
    BiggerEqual,
}

/// One three-address instruction. Destinations come first, then up to two
/// sources.
#[derive(Debug, Clone, PartialEq)]
pub enum TacInstr {
    Arith(ArithOp, TacValue, TacValue, TacValue),
    /// bitwise and/or on 0/1 booleans
    Logic(LogicOp, TacValue, TacValue, TacValue),
    Unary(TacUnaryOp, TacValue, TacValue),
    Assign(TacValue, TacValue),
    /// dst = &src
    Address(TacValue, TacValue),
    /// dst = *src
    Deref(TacValue, TacValue),
    Cast(TacValue, TacValue),
    Widen(TacValue, TacValue),
    Narrow(TacValue, TacValue),
    /// if src1 relop src2 then goto label
    BranchIf(RelOp, Label, TacValue, TacValue),
    Goto(Label),
    Label(Label),
    Nop,
    /// argument `index` of the upcoming call
    Param(usize, TacValue),
    Call(Option<TacValue>, SymbolId),
    Return(Option<TacValue>),
}

/// Linear instruction stream of one scope plus its temporary pool.
#[derive(Debug, Default, PartialEq)]
pub struct CodeBlock {
    pub instrs: Vec<TacInstr>,
    temps: Vec<Type>,
    next_label: usize,
}

impl CodeBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, instr: TacInstr) {
        self.instrs.push(instr);
    }

    pub fn create_temp(&mut self, ty: Type) -> TempId {
        self.temps.push(ty);
        self.temps.len() - 1
    }

    pub fn create_label(&mut self) -> Label {
        let l = Label(self.next_label);
        self.next_label += 1;
        l
    }

    pub fn temp_type(&self, id: TempId) -> &Type {
        &self.temps[id]
    }

    pub fn temps(&self) -> &[Type] {
        &self.temps
    }

    /// Compacts the control flow without any dataflow analysis. Three
    /// passes, in order: drop jumps to the directly following label,
    /// forward chains of adjacent labels, drop labels nothing refers to.
    pub fn cleanup_control_flow(&mut self) {
        self.drop_trivial_jumps();
        self.forward_label_chains();
        self.drop_unreferenced_labels();
    }

    fn drop_trivial_jumps(&mut self) {
        let mut keep = vec![true; self.instrs.len()];
        for (i, instr) in self.instrs.iter().enumerate() {
            if let TacInstr::Goto(target) = instr {
                if matches!(self.instrs.get(i + 1), Some(TacInstr::Label(l)) if l == target) {
                    keep[i] = false;
                }
            }
        }
        let mut it = keep.iter();
        self.instrs.retain(|_| *it.next().unwrap());
    }

    fn forward_label_chains(&mut self) {
        let mut forward: HashMap<Label, Label> = HashMap::new();
        for window in self.instrs.windows(2) {
            if let [TacInstr::Label(a), TacInstr::Label(b)] = window {
                forward.insert(*a, *b);
            }
        }
        if forward.is_empty() {
            return;
        }

        let resolve = |mut l: Label| {
            while let Some(&next) = forward.get(&l) {
                l = next;
            }
            l
        };
        for instr in &mut self.instrs {
            match instr {
                TacInstr::Goto(target) => *target = resolve(*target),
                TacInstr::BranchIf(_, target, _, _) => *target = resolve(*target),
                _ => (),
            }
        }
    }

    fn drop_unreferenced_labels(&mut self) {
        let referenced: HashSet<Label> = self
            .instrs
            .iter()
            .filter_map(|i| match i {
                TacInstr::Goto(l) => Some(*l),
                TacInstr::BranchIf(_, l, _, _) => Some(*l),
                _ => None,
            })
            .collect();
        self.instrs.retain(|i| match i {
            TacInstr::Label(l) => referenced.contains(l),
            _ => true,
        });
    }
}

/// TAC for one emitted subroutine (or the module body itself).
#[derive(Debug, PartialEq)]
pub struct TacScope {
    /// assembly-level name; the module body becomes `main`
    pub name: String,
    pub scope: ScopeId,
    /// procedure symbol; `None` for the module body
    pub symbol: Option<SymbolId>,
    pub cb: CodeBlock,
}

#[derive(Debug, PartialEq)]
pub struct TacModule {
    pub name: String,
    pub scopes: Vec<TacScope>,
}
