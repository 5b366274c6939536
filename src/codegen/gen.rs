use super::asm_ast::*;
use super::frame::StackFrame;
use crate::symbols::{SymTab, SymbolKind};
use crate::tac::{
    ArithOp, CodeBlock, Label, LogicOp, RelOp, TacInstr, TacScope, TacUnaryOp, TacValue,
};
use crate::types::Type;

/// Translates one scope's TAC into assembly instructions.
///
/// Every operand has a fixed home (stack slot, global, or immediate), so
/// instruction selection is a fixed-register scheme: sources load into
/// `%rax`/`%rbx`, the operation runs in 64-bit width, the destination store
/// truncates to the operand size. References borrow `%r11` for the address.
struct FunctionGen<'a> {
    syms: &'a SymTab,
    frame: StackFrame,
    cb: &'a CodeBlock,
    scope_name: &'a str,
    body: AsmInstructions,
}

pub(super) fn gen_function(scope: &TacScope, syms: &SymTab, is_main: bool) -> AsmFunction {
    let frame = StackFrame::compute(scope.scope, &scope.cb, syms);
    let mut gen = FunctionGen {
        syms,
        frame,
        cb: &scope.cb,
        scope_name: &scope.name,
        body: AsmInstructions::new(),
    };

    gen.emit_prologue(scope);
    for instr in &scope.cb.instrs {
        gen.emit_instruction(instr);
    }
    gen.emit_epilogue(is_main);

    AsmFunction {
        name: scope.name.clone(),
        frame: gen.frame.layout.clone(),
        body: gen.body,
    }
}

impl<'a> FunctionGen<'a> {
    fn label(&self, label: Label) -> String {
        format!("l_{}_{}", self.scope_name, label.0)
    }

    fn exit_label(&self) -> String {
        format!("l_{}_exit", self.scope_name)
    }

    fn add(&mut self, instr: AsmInstruction) {
        self.body.push(instr);
    }

    fn operand(&self, value: &TacValue) -> Operand {
        match value {
            TacValue::Const(v, _) => Operand::Imm(*v),
            TacValue::Name(id) => {
                let sym = self.syms.symbol(*id);
                match sym.kind {
                    SymbolKind::Global => Operand::Data(sym.name.clone()),
                    SymbolKind::Local | SymbolKind::Param(_) => {
                        Operand::Stack(self.frame.offset_of(*id, self.syms))
                    }
                    _ => unreachable!("constants fold away and procedures are call targets"),
                }
            }
            TacValue::Temp(t) => Operand::Stack(self.frame.temp_offset(*t)),
            TacValue::Reference(_) => unreachable!("references are loaded through a register"),
        }
    }

    fn size_of(&self, value: &TacValue) -> OperandSize {
        let bytes = match value {
            TacValue::Const(_, ty) => ty.data_size(),
            TacValue::Name(id) => self.syms.symbol(*id).ty.data_size(),
            TacValue::Temp(t) => self.cb.temp_type(*t).data_size(),
            TacValue::Reference(t) => self.reference_pointee(*t).data_size(),
        };
        OperandSize::of_bytes(bytes)
    }

    fn reference_pointee(&self, temp: usize) -> &Type {
        self.cb
            .temp_type(temp)
            .pointee()
            .expect("reference temps hold pointers")
    }

    /// Loads `value` into the full 64-bit `reg`, extending as needed.
    fn load(&mut self, reg: Register, value: &TacValue) {
        match value {
            TacValue::Reference(t) => {
                let addr = Operand::Stack(self.frame.temp_offset(*t));
                let size = self.size_of(value);
                self.add(AsmInstruction::Load(Register::R11, addr, OperandSize::Quad));
                self.add(AsmInstruction::Load(reg, Operand::Indirect(Register::R11), size));
            }
            TacValue::Const(v, _) => {
                self.add(AsmInstruction::Mov(
                    OperandSize::Quad,
                    Operand::Imm(*v),
                    Operand::Reg(reg),
                ));
            }
            _ => {
                let size = self.size_of(value);
                let src = self.operand(value);
                self.add(AsmInstruction::Load(reg, src, size));
            }
        }
    }

    /// Stores `reg` into `value`'s home, truncating to its size.
    fn store(&mut self, value: &TacValue, reg: Register) {
        match value {
            TacValue::Reference(t) => {
                let addr = Operand::Stack(self.frame.temp_offset(*t));
                let size = self.size_of(value);
                self.add(AsmInstruction::Load(Register::R11, addr, OperandSize::Quad));
                self.add(AsmInstruction::Store(
                    Operand::Indirect(Register::R11),
                    reg,
                    size,
                ));
            }
            _ => {
                let size = self.size_of(value);
                let dst = self.operand(value);
                self.add(AsmInstruction::Store(dst, reg, size));
            }
        }
    }

    fn emit_prologue(&mut self, scope: &TacScope) {
        self.add(AsmInstruction::Push(Operand::Reg(Register::BP)));
        self.add(AsmInstruction::Mov(
            OperandSize::Quad,
            Operand::Reg(Register::SP),
            Operand::Reg(Register::BP),
        ));
        for reg in SAVED_REGISTERS {
            self.add(AsmInstruction::Push(Operand::Reg(reg)));
        }
        if self.frame.layout.size > 0 {
            self.add(AsmInstruction::Binary(
                AsmBinaryOp::Sub,
                Operand::Imm(self.frame.layout.size as i64),
                Operand::Reg(Register::SP),
            ));
        }

        self.spill_parameters(scope);
        self.init_local_arrays(scope);
    }

    /// The first six arguments arrive in registers and are written to their
    /// frame slots so every parameter has a memory home.
    fn spill_parameters(&mut self, scope: &TacScope) {
        for id in self.syms.declared(scope.scope) {
            let sym = self.syms.symbol(id);
            let SymbolKind::Param(index) = sym.kind else {
                continue;
            };
            if index >= 6 {
                continue;
            }
            let size = OperandSize::of_bytes(sym.ty.data_size());
            let slot = Operand::Stack(self.frame.offset_of(id, self.syms));
            self.add(AsmInstruction::Mov(
                size,
                Operand::Reg(ARG_REGISTERS[index]),
                slot,
            ));
        }
    }

    /// Local arrays carry their descriptor in the frame; the dimension
    /// words are written once at entry.
    fn init_local_arrays(&mut self, scope: &TacScope) {
        for id in self.syms.declared(scope.scope) {
            let sym = self.syms.symbol(id);
            if !matches!(sym.kind, SymbolKind::Local) || !sym.ty.is_array() {
                continue;
            }
            let base = self.frame.offset_of(id, self.syms);
            let ndim = sym.ty.ndim();
            self.add(AsmInstruction::Mov(
                OperandSize::Long,
                Operand::Imm(ndim as i64),
                Operand::Stack(base),
            ));
            for d in 0..ndim {
                let dim = sym.ty.dim(d).expect("local arrays have known dimensions");
                self.add(AsmInstruction::Mov(
                    OperandSize::Long,
                    Operand::Imm(dim),
                    Operand::Stack(base + 4 + 4 * d as i64),
                ));
            }
        }
    }

    fn emit_epilogue(&mut self, is_main: bool) {
        self.add(AsmInstruction::Label(self.exit_label()));
        if is_main {
            // the module body is the process entry; its exit status is 0
            self.add(AsmInstruction::Mov(
                OperandSize::Quad,
                Operand::Imm(0),
                Operand::Reg(Register::AX),
            ));
        }
        if self.frame.layout.size > 0 {
            self.add(AsmInstruction::Binary(
                AsmBinaryOp::Add,
                Operand::Imm(self.frame.layout.size as i64),
                Operand::Reg(Register::SP),
            ));
        }
        for reg in SAVED_REGISTERS.iter().rev() {
            self.add(AsmInstruction::Pop(*reg));
        }
        self.add(AsmInstruction::Pop(Register::BP));
        self.add(AsmInstruction::Ret);
    }

    fn emit_instruction(&mut self, instr: &TacInstr) {
        match instr {
            TacInstr::Arith(op, dst, src1, src2) => {
                self.load(Register::AX, src1);
                self.load(Register::BX, src2);
                match op {
                    ArithOp::Add => self.binary_rbx_rax(AsmBinaryOp::Add),
                    ArithOp::Sub => self.binary_rbx_rax(AsmBinaryOp::Sub),
                    ArithOp::Mul => self.binary_rbx_rax(AsmBinaryOp::Imul),
                    ArithOp::Div => {
                        self.add(AsmInstruction::Cqto);
                        self.add(AsmInstruction::Idiv(Operand::Reg(Register::BX)));
                    }
                }
                self.store(dst, Register::AX);
            }
            TacInstr::Logic(op, dst, src1, src2) => {
                self.load(Register::AX, src1);
                self.load(Register::BX, src2);
                let op = match op {
                    LogicOp::And => AsmBinaryOp::And,
                    LogicOp::Or => AsmBinaryOp::Or,
                };
                self.binary_rbx_rax(op);
                self.store(dst, Register::AX);
            }
            TacInstr::Unary(op, dst, src) => {
                self.load(Register::AX, src);
                match op {
                    TacUnaryOp::Neg => {
                        self.add(AsmInstruction::Unary(AsmUnaryOp::Neg, Register::AX));
                    }
                    TacUnaryOp::Not => {
                        self.add(AsmInstruction::Unary(AsmUnaryOp::Not, Register::AX));
                    }
                    TacUnaryOp::Pos => (),
                }
                self.store(dst, Register::AX);
            }
            TacInstr::Assign(dst, src)
            | TacInstr::Cast(dst, src)
            | TacInstr::Widen(dst, src)
            | TacInstr::Narrow(dst, src) => {
                self.load(Register::AX, src);
                self.store(dst, Register::AX);
            }
            TacInstr::Address(dst, src) => {
                let target = self.operand(src);
                debug_assert!(
                    matches!(target, Operand::Stack(_) | Operand::Data(_)),
                    "address of a non-memory operand"
                );
                self.add(AsmInstruction::Lea(target, Register::AX));
                self.store(dst, Register::AX);
            }
            TacInstr::Deref(dst, src) => {
                self.load(Register::AX, src);
                let size = self.size_of(dst);
                self.add(AsmInstruction::Load(
                    Register::AX,
                    Operand::Indirect(Register::AX),
                    size,
                ));
                self.store(dst, Register::AX);
            }
            TacInstr::BranchIf(op, label, src1, src2) => {
                self.load(Register::AX, src1);
                self.load(Register::BX, src2);
                self.add(AsmInstruction::Cmp(
                    Operand::Reg(Register::BX),
                    Operand::Reg(Register::AX),
                ));
                let cc = match op {
                    RelOp::Equal => Condition::E,
                    RelOp::NotEqual => Condition::NE,
                    RelOp::LessThan => Condition::L,
                    RelOp::LessEqual => Condition::LE,
                    RelOp::BiggerThan => Condition::G,
                    RelOp::BiggerEqual => Condition::GE,
                };
                self.add(AsmInstruction::JmpCC(cc, self.label(*label)));
            }
            TacInstr::Goto(label) => {
                let target = self.label(*label);
                self.add(AsmInstruction::Jmp(target));
            }
            TacInstr::Label(label) => {
                let name = self.label(*label);
                self.add(AsmInstruction::Label(name));
            }
            TacInstr::Nop => self.add(AsmInstruction::Nop),
            TacInstr::Param(index, value) => {
                if *index < 6 {
                    self.load(ARG_REGISTERS[*index], value);
                } else {
                    self.load(Register::AX, value);
                    self.add(AsmInstruction::Mov(
                        OperandSize::Quad,
                        Operand::Reg(Register::AX),
                        Operand::ArgBuild(8 * (*index as i64 - 6)),
                    ));
                }
            }
            TacInstr::Call(dst, symbol) => {
                let name = self.syms.symbol(*symbol).name.clone();
                self.add(AsmInstruction::Call(name));
                if let Some(dst) = dst {
                    self.store(dst, Register::AX);
                }
            }
            TacInstr::Return(value) => {
                if let Some(value) = value {
                    self.load(Register::AX, value);
                }
                self.add(AsmInstruction::Jmp(self.exit_label()));
            }
        }
    }

    fn binary_rbx_rax(&mut self, op: AsmBinaryOp) {
        self.add(AsmInstruction::Binary(
            op,
            Operand::Reg(Register::BX),
            Operand::Reg(Register::AX),
        ));
    }
}
