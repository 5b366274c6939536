mod asm_ast;
mod frame;
mod gen;

pub use asm_ast::*;

use crate::symbols::{SymTab, SymbolKind, MODULE_SCOPE};
use crate::tac::{TacInstr, TacModule};

/// Generates the assembly form of a lowered module: one function per scope,
/// the extern list for the runtime, and the global data image.
pub fn codegen(tac: &TacModule, syms: &SymTab) -> AsmModule {
    let functions = tac
        .scopes
        .iter()
        .map(|scope| gen::gen_function(scope, syms, scope.symbol.is_none()))
        .collect();

    AsmModule {
        name: tac.name.clone(),
        externs: collect_externs(tac, syms),
        functions,
        globals: collect_globals(syms),
    }
}

/// Every external subroutine actually called needs an `.extern` directive.
fn collect_externs(tac: &TacModule, syms: &SymTab) -> Vec<String> {
    let mut externs = Vec::new();
    for scope in &tac.scopes {
        for instr in &scope.cb.instrs {
            let TacInstr::Call(_, symbol) = instr else {
                continue;
            };
            let sym = syms.symbol(*symbol);
            if sym.is_external() && !externs.contains(&sym.name) {
                externs.push(sym.name.clone());
            }
        }
    }
    externs
}

/// Lays out the `.data` section: globals in declaration order, arrays with
/// their descriptor words, strings with their `.asciz` payload. Alignment
/// directives are inserted only when the running cursor is misaligned for
/// the next object.
fn collect_globals(syms: &SymTab) -> Vec<AsmGlobal> {
    let mut globals = Vec::new();
    let mut cursor = 0usize;

    for id in syms.declared(MODULE_SCOPE) {
        let sym = syms.symbol(id);
        if !matches!(sym.kind, SymbolKind::Global) {
            continue;
        }

        let alignment = sym.ty.alignment();
        let align = if alignment > 1 && cursor % alignment != 0 {
            cursor = cursor.div_ceil(alignment) * alignment;
            Some(alignment)
        } else {
            None
        };

        let (descriptor, pad) = if sym.ty.is_array() {
            let ndim = sym.ty.ndim();
            let mut words = Vec::with_capacity(1 + ndim);
            words.push(ndim as i64);
            for d in 0..ndim {
                words.push(sym.ty.dim(d).expect("global arrays have known dimensions"));
            }
            let pad = sym.ty.data_offset() - 4 * words.len();
            (words, pad)
        } else {
            (Vec::new(), 0)
        };

        let init = match &sym.data {
            Some(text) => GlobalInit::Asciz(text.clone()),
            None => GlobalInit::Skip(sym.ty.data_size()),
        };

        cursor += sym.ty.size();
        globals.push(AsmGlobal {
            name: sym.name.clone(),
            ty: sym.ty.to_string(),
            align,
            descriptor,
            pad,
            init,
        });
    }
    globals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer;
    use crate::parser;
    use crate::semantic_analysis;
    use crate::tac;

    fn compile(src: &str) -> AsmModule {
        let tokens = lexer::lex(src).unwrap();
        let (module, syms) = parser::parse(&tokens).unwrap();
        semantic_analysis::validate(&module, &syms).unwrap();
        let tac = tac::emit_module(&module, &syms);
        codegen(&tac, &syms)
    }

    #[test]
    fn test_externs_are_used_runtime_symbols() {
        let asm = compile("module T; begin WriteInt(42); WriteLn() end T.");
        assert_eq!(asm.externs, vec!["WriteInt", "WriteLn"]);
    }

    #[test]
    fn test_module_body_becomes_main() {
        let asm = compile("module T; begin end T.");
        assert_eq!(asm.functions.len(), 1);
        assert_eq!(asm.functions[0].name, "main");
        // main clears %rax so the process exits with status 0
        assert!(asm.functions[0].body.contains(&AsmInstruction::Mov(
            OperandSize::Quad,
            Operand::Imm(0),
            Operand::Reg(Register::AX),
        )));
    }

    #[test]
    fn test_global_array_descriptor() {
        let asm = compile("module T; var m: integer[3][5]; begin m[0][0] := 1 end T.");
        let global = &asm.globals[0];
        assert_eq!(global.name, "m");
        assert_eq!(global.descriptor, vec![2, 3, 5]);
        assert_eq!(global.pad, 0);
        assert_eq!(global.init, GlobalInit::Skip(60));
    }

    #[test]
    fn test_longint_array_descriptor_padded() {
        let asm = compile("module T; var a: longint[2]; begin a[0] := 1L end T.");
        let global = &asm.globals[0];
        // 8-byte descriptor padded to the 8-byte element alignment
        assert_eq!(global.descriptor, vec![1, 2]);
        assert_eq!(global.pad, 8);
    }

    #[test]
    fn test_string_global_is_asciz() {
        let asm = compile("module T; begin WriteStr(\"ok\") end T.");
        let global = asm.globals.iter().find(|g| g.name == "_str_1").unwrap();
        assert_eq!(global.init, GlobalInit::Asciz(String::from("ok")));
        assert_eq!(global.descriptor, vec![1, 3]);
    }

    #[test]
    fn test_frame_aligned_for_calls() {
        let asm = compile(
            "module T;
             function f(a: integer; b: integer; c: integer): integer;
             begin return a + b + c end f;
             begin WriteInt(f(1, 2, 3)) end T.",
        );
        for function in &asm.functions {
            let frame = &function.frame;
            // return address + %rbp + register saves + frame ≡ 0 (mod 16)
            assert_eq!((16 + frame.saved_registers + frame.size) % 16, 0);
        }
    }

    #[test]
    fn test_params_spilled_to_frame() {
        let asm = compile(
            "module T;
             function f(x: integer): integer;
             begin return x end f;
             begin WriteInt(f(7)) end T.",
        );
        let f = asm.functions.iter().find(|f| f.name == "f").unwrap();
        assert!(f
            .body
            .iter()
            .any(|i| matches!(i, AsmInstruction::Mov(OperandSize::Long, Operand::Reg(Register::DI), Operand::Stack(_)))));
    }

    #[test]
    fn test_local_array_descriptor_initialised() {
        let asm = compile(
            "module T;
             procedure p();
             var a: integer[4];
             begin a[0] := 1 end p;
             begin p() end T.",
        );
        let p = asm.functions.iter().find(|f| f.name == "p").unwrap();
        let stores: Vec<_> = p
            .body
            .iter()
            .filter_map(|i| match i {
                AsmInstruction::Mov(OperandSize::Long, Operand::Imm(v), Operand::Stack(o)) => {
                    Some((*v, *o))
                }
                _ => None,
            })
            .collect();
        // ndim then the dimension, in adjacent words
        assert!(stores.windows(2).any(|w| {
            w[0].0 == 1 && w[1].0 == 4 && w[1].1 == w[0].1 + 4
        }));
    }
}
