use super::asm_ast::FrameLayout;
use crate::symbols::{ScopeId, SymTab, SymbolId, SymbolKind};
use crate::tac::{CodeBlock, TacInstr};

use std::collections::HashMap;

/// Stack frame of one scope: every parameter, local and temporary gets a
/// `%rbp`-relative home.
///
/// Layout below the saved base pointer, downwards: saved callee-saved
/// registers, padding to keep `%rsp` 16-byte aligned at call sites, spilled
/// register parameters, locals in declaration order (aligned per type),
/// temporaries, and at the bottom the argument-build area for outgoing
/// calls with more than six arguments.
#[derive(Debug)]
pub struct StackFrame {
    pub layout: FrameLayout,
    offsets: HashMap<SymbolId, i64>,
    temp_offsets: Vec<i64>,
}

impl StackFrame {
    pub fn compute(scope: ScopeId, cb: &CodeBlock, syms: &SymTab) -> Self {
        let saved_registers = 8 * super::asm_ast::SAVED_REGISTERS.len();
        let mut rel_offsets: HashMap<SymbolId, i64> = HashMap::new();

        // spilled register parameters, one 8-byte slot each; stack
        // parameters already live above the frame and get no slot
        let mut register_params = 0usize;
        for id in syms.declared(scope) {
            if let SymbolKind::Param(index) = syms.symbol(id).kind {
                if index < 6 {
                    rel_offsets.insert(id, -8 * (index as i64 + 1));
                    register_params += 1;
                }
            }
        }
        let saved_parameters = 8 * register_params;

        // locals in declaration order, aligned per type; arrays reserve
        // descriptor plus payload
        let mut cursor = -(saved_parameters as i64);
        for id in syms.declared(scope) {
            let sym = syms.symbol(id);
            if !matches!(sym.kind, SymbolKind::Local) {
                continue;
            }
            cursor -= sym.ty.size() as i64;
            cursor = align_down(cursor, sym.ty.alignment() as i64);
            rel_offsets.insert(id, cursor);
        }

        // temporaries, 8 bytes each
        let mut temp_rel = Vec::with_capacity(cb.temps().len());
        for _ in cb.temps() {
            cursor -= 8;
            temp_rel.push(cursor);
        }
        let local_variables = (-cursor) as usize - saved_parameters;

        let argument_build = argument_build_size(cb);

        let below_regs = saved_parameters + local_variables + argument_build;
        // %rsp must be 16-byte aligned at each call: return address plus
        // saved %rbp plus register saves plus this frame must be a multiple
        // of 16
        let padding = (16 - (saved_registers + below_regs + 16) % 16) % 16;
        let size = padding + below_regs;

        let shift = -((saved_registers + padding) as i64);
        let offsets = rel_offsets
            .into_iter()
            .map(|(id, rel)| (id, rel + shift))
            .collect();
        let temp_offsets = temp_rel.into_iter().map(|rel| rel + shift).collect();

        StackFrame {
            layout: FrameLayout {
                return_address: 8,
                saved_registers,
                padding,
                saved_parameters,
                local_variables,
                argument_build,
                size,
            },
            offsets,
            temp_offsets,
        }
    }

    /// `%rbp`-relative offset of a parameter or local.
    pub fn offset_of(&self, id: SymbolId, syms: &SymTab) -> i64 {
        if let Some(&offset) = self.offsets.get(&id) {
            return offset;
        }
        // stack parameters sit above the return address, pushed by the
        // caller's argument-build area
        match syms.symbol(id).kind {
            SymbolKind::Param(index) if index >= 6 => 16 + 8 * (index as i64 - 6),
            _ => unreachable!("symbol without a frame slot"),
        }
    }

    pub fn temp_offset(&self, temp: usize) -> i64 {
        self.temp_offsets[temp]
    }
}

fn align_down(value: i64, align: i64) -> i64 {
    if align <= 1 {
        return value;
    }
    value.div_euclid(align) * align
}

/// Bytes to reserve for outgoing stack arguments: the widest `Param`
/// index beyond the six register slots decides.
fn argument_build_size(cb: &CodeBlock) -> usize {
    cb.instrs
        .iter()
        .filter_map(|i| match i {
            TacInstr::Param(index, _) if *index >= 6 => Some(8 * (index - 5)),
            _ => None,
        })
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{Symbol, MODULE_SCOPE};
    use crate::types::Type;

    fn sym(name: &str, ty: Type, kind: SymbolKind) -> Symbol {
        Symbol {
            name: name.to_owned(),
            ty,
            kind,
            data: None,
        }
    }

    #[test]
    fn test_frame_alignment() {
        let mut syms = SymTab::new();
        let scope = syms.create_scope(Some(MODULE_SCOPE));
        syms.add(scope, sym("x", Type::Integer, SymbolKind::Param(0)))
            .unwrap();
        syms.add(scope, sym("i", Type::Integer, SymbolKind::Local))
            .unwrap();

        let mut cb = CodeBlock::new();
        cb.create_temp(Type::Integer);
        let frame = StackFrame::compute(scope, &cb, &syms);

        // 40 saved + 8 ret + 8 rbp + frame must be 16-byte aligned
        assert_eq!((frame.layout.saved_registers + frame.layout.size + 16) % 16, 0);
        assert_eq!(frame.layout.saved_parameters, 8);
    }

    #[test]
    fn test_offsets_do_not_overlap() {
        let mut syms = SymTab::new();
        let scope = syms.create_scope(Some(MODULE_SCOPE));
        let a = syms
            .add(scope, sym("a", Type::array(Some(3), Type::Integer), SymbolKind::Local))
            .unwrap();
        let i = syms.add(scope, sym("i", Type::Longint, SymbolKind::Local)).unwrap();

        let cb = CodeBlock::new();
        let frame = StackFrame::compute(scope, &cb, &syms);

        let a_off = frame.offset_of(a, &syms);
        let i_off = frame.offset_of(i, &syms);
        // the 20-byte array sits above the longint, 8-byte aligned each
        assert!(i_off + 8 <= a_off);
        assert_eq!(i_off % 8, 0);
    }

    #[test]
    fn test_stack_parameters_above_frame() {
        let mut syms = SymTab::new();
        let scope = syms.create_scope(Some(MODULE_SCOPE));
        let mut ids = Vec::new();
        for index in 0..8 {
            let id = syms
                .add(scope, sym(&format!("p{index}"), Type::Longint, SymbolKind::Param(index)))
                .unwrap();
            ids.push(id);
        }
        let cb = CodeBlock::new();
        let frame = StackFrame::compute(scope, &cb, &syms);

        assert_eq!(frame.layout.saved_parameters, 48);
        assert_eq!(frame.offset_of(ids[6], &syms), 16);
        assert_eq!(frame.offset_of(ids[7], &syms), 24);
        assert!(frame.offset_of(ids[5], &syms) < 0);
    }
}
