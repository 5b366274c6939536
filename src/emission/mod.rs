use crate::codegen::*;

use std::fmt;

fn reg_name(reg: Register, size: OperandSize) -> &'static str {
    use OperandSize::*;
    use Register::*;
    match (reg, size) {
        (AX, Byte) => "%al",
        (AX, Long) => "%eax",
        (AX, Quad) => "%rax",
        (BX, Byte) => "%bl",
        (BX, Long) => "%ebx",
        (BX, Quad) => "%rbx",
        (CX, Byte) => "%cl",
        (CX, Long) => "%ecx",
        (CX, Quad) => "%rcx",
        (DX, Byte) => "%dl",
        (DX, Long) => "%edx",
        (DX, Quad) => "%rdx",
        (SI, Byte) => "%sil",
        (SI, Long) => "%esi",
        (SI, Quad) => "%rsi",
        (DI, Byte) => "%dil",
        (DI, Long) => "%edi",
        (DI, Quad) => "%rdi",
        (BP, _) => "%rbp",
        (SP, _) => "%rsp",
        (R8, Byte) => "%r8b",
        (R8, Long) => "%r8d",
        (R8, Quad) => "%r8",
        (R9, Byte) => "%r9b",
        (R9, Long) => "%r9d",
        (R9, Quad) => "%r9",
        (R10, Byte) => "%r10b",
        (R10, Long) => "%r10d",
        (R10, Quad) => "%r10",
        (R11, Byte) => "%r11b",
        (R11, Long) => "%r11d",
        (R11, Quad) => "%r11",
        (R12, Byte) => "%r12b",
        (R12, Long) => "%r12d",
        (R12, Quad) => "%r12",
        (R13, Byte) => "%r13b",
        (R13, Long) => "%r13d",
        (R13, Quad) => "%r13",
        (R14, Byte) => "%r14b",
        (R14, Long) => "%r14d",
        (R14, Quad) => "%r14",
        (R15, Byte) => "%r15b",
        (R15, Long) => "%r15d",
        (R15, Quad) => "%r15",
    }
}

fn operand(op: &Operand, size: OperandSize) -> String {
    match op {
        Operand::Imm(v) => format!("${v}"),
        Operand::Reg(r) => reg_name(*r, size).to_owned(),
        Operand::Stack(offset) => format!("{offset}(%rbp)"),
        Operand::Data(name) => format!("{name}(%rip)"),
        Operand::Indirect(r) => format!("({})", reg_name(*r, OperandSize::Quad)),
        Operand::ArgBuild(offset) => format!("{offset}(%rsp)"),
    }
}

fn suffix(size: OperandSize) -> char {
    match size {
        OperandSize::Byte => 'b',
        OperandSize::Long => 'l',
        OperandSize::Quad => 'q',
    }
}

const fn fits_i32(v: i64) -> bool {
    v >= i32::MIN as i64 && v <= i32::MAX as i64
}

impl fmt::Display for AsmUnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Neg => write!(f, "negq"),
            Self::Not => write!(f, "notq"),
        }
    }
}

impl fmt::Display for AsmBinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Add => write!(f, "addq"),
            Self::Sub => write!(f, "subq"),
            Self::Imul => write!(f, "imulq"),
            Self::And => write!(f, "andq"),
            Self::Or => write!(f, "orq"),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::E => write!(f, "e"),
            Self::NE => write!(f, "ne"),
            Self::L => write!(f, "l"),
            Self::LE => write!(f, "le"),
            Self::G => write!(f, "g"),
            Self::GE => write!(f, "ge"),
        }
    }
}

impl fmt::Display for AsmInstruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use OperandSize::*;
        match self {
            Self::Label(name) => write!(f, "{name}:"),
            Self::Mov(size, Operand::Imm(v), dst) if *size == Quad && !fits_i32(*v) => {
                write!(f, "movabsq ${v}, {}", operand(dst, Quad))
            }
            Self::Mov(size, src, dst) => {
                write!(
                    f,
                    "mov{} {}, {}",
                    suffix(*size),
                    operand(src, *size),
                    operand(dst, *size)
                )
            }
            Self::Load(reg, src, size) => {
                let mnemonic = match size {
                    Byte => "movzbq",
                    Long => "movslq",
                    Quad => "movq",
                };
                write!(
                    f,
                    "{mnemonic} {}, {}",
                    operand(src, *size),
                    reg_name(*reg, Quad)
                )
            }
            Self::Store(dst, reg, size) => {
                write!(
                    f,
                    "mov{} {}, {}",
                    suffix(*size),
                    reg_name(*reg, *size),
                    operand(dst, *size)
                )
            }
            Self::Lea(src, reg) => {
                write!(f, "leaq {}, {}", operand(src, Quad), reg_name(*reg, Quad))
            }
            Self::Unary(op, reg) => write!(f, "{op} {}", reg_name(*reg, Quad)),
            Self::Binary(op, src, dst) => {
                write!(f, "{op} {}, {}", operand(src, Quad), operand(dst, Quad))
            }
            Self::Cmp(src, dst) => {
                write!(f, "cmpq {}, {}", operand(src, Quad), operand(dst, Quad))
            }
            Self::Cqto => write!(f, "cqto"),
            Self::Idiv(op) => write!(f, "idivq {}", operand(op, Quad)),
            Self::Jmp(label) => write!(f, "jmp {label}"),
            Self::JmpCC(cc, label) => write!(f, "j{cc} {label}"),
            Self::Push(op) => write!(f, "pushq {}", operand(op, Quad)),
            Self::Pop(reg) => write!(f, "popq {}", reg_name(*reg, Quad)),
            Self::Call(name) => write!(f, "call {name}"),
            Self::Ret => write!(f, "ret"),
            Self::Nop => write!(f, "nop"),
        }
    }
}

impl fmt::Display for AsmFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "\t# scope {}", self.name)?;
        writeln!(f, "{}:", self.name)?;

        let fr = &self.frame;
        writeln!(f, "\t# stack organization:")?;
        writeln!(f, "\t#   return address   : {:4}", fr.return_address)?;
        writeln!(f, "\t#   saved registers  : {:4}", fr.saved_registers)?;
        writeln!(f, "\t#   padding          : {:4}", fr.padding)?;
        writeln!(f, "\t#   saved parameters : {:4}", fr.saved_parameters)?;
        writeln!(f, "\t#   local variables  : {:4}", fr.local_variables)?;
        writeln!(f, "\t#   argument build   : {:4}", fr.argument_build)?;
        writeln!(f, "\t#   frame size       : {:4}", fr.size)?;

        for instruction in &self.body {
            if matches!(instruction, AsmInstruction::Label(_)) {
                writeln!(f, "{instruction}")?;
            } else {
                writeln!(f, "\t{instruction}")?;
            }
        }
        Ok(())
    }
}

/// Escapes a string payload for an `.asciz` directive.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out
}

impl fmt::Display for AsmGlobal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(align) = self.align {
            writeln!(f, "\t.align {align}")?;
        }
        writeln!(f, "{:32}# {}", format!("{}:", self.name), self.ty)?;
        for word in &self.descriptor {
            writeln!(f, "\t.long {word:4}")?;
        }
        if self.pad > 0 {
            writeln!(f, "\t.skip {:4}", self.pad)?;
        }
        match &self.init {
            GlobalInit::Skip(bytes) => writeln!(f, "\t.skip {bytes:4}"),
            GlobalInit::Asciz(text) => writeln!(f, "\t.asciz \"{}\"", escape(text)),
        }
    }
}

impl fmt::Display for AsmModule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "##################################################")?;
        writeln!(f, "# {}", self.name)?;
        writeln!(f, "#")?;
        writeln!(f)?;

        writeln!(f, "\t#-----------------------------------------")?;
        writeln!(f, "\t# text section")?;
        writeln!(f, "\t#")?;
        writeln!(f, "\t.text")?;
        writeln!(f, "\t.align 8")?;
        writeln!(f)?;
        writeln!(f, "\t# entry point")?;
        writeln!(f, "\t.global main")?;
        writeln!(f)?;
        writeln!(f, "\t# external subroutines")?;
        for name in &self.externs {
            writeln!(f, "\t.extern {name}")?;
        }
        writeln!(f)?;

        for function in &self.functions {
            writeln!(f, "{function}")?;
        }

        writeln!(f, "\t# end of text section")?;
        writeln!(f, "\t#-----------------------------------------")?;
        writeln!(f)?;

        writeln!(f, "\t#-----------------------------------------")?;
        writeln!(f, "\t# global data section")?;
        writeln!(f, "\t#")?;
        writeln!(f, "\t.data")?;
        writeln!(f, "\t.align 8")?;
        writeln!(f)?;
        for global in &self.globals {
            write!(f, "{global}")?;
        }
        writeln!(f)?;
        writeln!(f, "\t# end of global data section")?;
        writeln!(f, "\t#-----------------------------------------")?;
        writeln!(f)?;
        writeln!(f, "\t.end")?;
        writeln!(f, "##################################################")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{codegen, lexer, parser, semantic_analysis, tac};

    fn emit(src: &str) -> String {
        let tokens = lexer::lex(src).unwrap();
        let (module, syms) = parser::parse(&tokens).unwrap();
        semantic_analysis::validate(&module, &syms).unwrap();
        let tac = tac::emit_module(&module, &syms);
        codegen::codegen(&tac, &syms).to_string()
    }

    #[test]
    fn test_write_int_program() {
        let text = emit("module T; begin WriteInt(42); WriteLn() end T.");
        assert!(text.contains("\t.global main"));
        assert!(text.contains("\t.extern WriteInt"));
        assert!(text.contains("\t.extern WriteLn"));
        assert!(text.contains("main:"));
        assert!(text.contains("\tmovq $42, %rdi"));
        assert!(text.contains("\tcall WriteInt"));
        assert!(text.contains("\tpushq %rbp"));
        assert!(text.contains("l_main_exit:"));
        assert!(text.trim_end().ends_with("##################################################"));
    }

    #[test]
    fn test_function_program() {
        let text = emit(
            "module T;
             function f(x: integer): integer;
             begin return x * x end f;
             begin WriteInt(f(7)); WriteLn() end T.",
        );
        // the subroutine is emitted as its own labeled scope before main
        assert!(text.contains("f:"));
        assert!(text.contains("\tcall f"));
        assert!(text.contains("\tmovl %edi, "));
        assert!(text.contains("\timulq %rbx, %rax"));
        assert!(text.find("f:").unwrap() < text.find("main:").unwrap());
    }

    #[test]
    fn test_global_data_section() {
        let text = emit("module T; var a: integer[3]; begin a[0] := 1 end T.");
        assert!(text.contains("\t.data"));
        assert!(text.contains("a:"));
        assert!(text.contains("\t.long    1"));
        assert!(text.contains("\t.long    3"));
        assert!(text.contains("\t.skip   12"));
        assert!(text.contains("\t.extern DOFS"));
    }

    #[test]
    fn test_sized_moves() {
        let spill = AsmInstruction::Mov(
            OperandSize::Long,
            Operand::Reg(Register::DI),
            Operand::Stack(-52),
        );
        assert_eq!(spill.to_string(), "movl %edi, -52(%rbp)");

        let byte = AsmInstruction::Store(Operand::Data(String::from("flag")), Register::AX, OperandSize::Byte);
        assert_eq!(byte.to_string(), "movb %al, flag(%rip)");
    }

    #[test]
    fn test_extending_loads() {
        let load = AsmInstruction::Load(
            Register::BX,
            Operand::Stack(-48),
            OperandSize::Long,
        );
        assert_eq!(load.to_string(), "movslq -48(%rbp), %rbx");

        let byte = AsmInstruction::Load(
            Register::AX,
            Operand::Indirect(Register::R11),
            OperandSize::Byte,
        );
        assert_eq!(byte.to_string(), "movzbq (%r11), %rax");
    }

    #[test]
    fn test_big_immediate_uses_movabs() {
        let mov = AsmInstruction::Mov(
            OperandSize::Quad,
            Operand::Imm(1 << 40),
            Operand::Reg(Register::AX),
        );
        assert_eq!(mov.to_string(), "movabsq $1099511627776, %rax");
    }

    #[test]
    fn test_asciz_escaping() {
        let global = AsmGlobal {
            name: String::from("_str_1"),
            ty: String::from("char[4]"),
            align: None,
            descriptor: vec![1, 4],
            pad: 0,
            init: GlobalInit::Asciz(String::from("hi\n")),
        };
        let text = global.to_string();
        assert!(text.contains(".asciz \"hi\\n\""));
        assert!(text.contains(".long    1"));
    }
}
