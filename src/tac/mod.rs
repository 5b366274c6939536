mod ir;

pub use ir::*;

use crate::ast::*;
use crate::symbols::{Lookup, SymTab, SymbolId, SymbolKind, MODULE_SCOPE};
use crate::types::Type;

/// Lowers a type-checked module to per-scope TAC. Subroutines come first,
/// the module body last, as the backend emits them in that order.
pub fn emit_module(module: &Module, syms: &SymTab) -> TacModule {
    let mut scopes = Vec::new();
    for sub in &module.subroutines {
        scopes.push(TacScope {
            name: sub.name.clone(),
            scope: sub.scope,
            symbol: Some(sub.symbol),
            cb: emit_scope(&sub.body, syms),
        });
    }
    scopes.push(TacScope {
        name: String::from("main"),
        scope: module.scope,
        symbol: None,
        cb: emit_scope(&module.body, syms),
    });

    TacModule {
        name: module.name.clone(),
        scopes,
    }
}

fn emit_scope(statements: &[Statement], syms: &SymTab) -> CodeBlock {
    let mut cb = CodeBlock::new();
    emit_statements(&mut cb, statements, syms);
    cb.cleanup_control_flow();
    cb
}

/// Every statement gets a fresh label for its successor and ends with an
/// explicit jump to it; the cleanup pass elides the redundant ones.
fn emit_statements(cb: &mut CodeBlock, statements: &[Statement], syms: &SymTab) {
    for statement in statements {
        let next = cb.create_label();
        emit_statement(cb, statement, next, syms);
        cb.add(TacInstr::Label(next));
    }
}

fn emit_statement(cb: &mut CodeBlock, statement: &Statement, next: Label, syms: &SymTab) {
    match statement {
        Statement::Assign(assign) => {
            let dst = emit_expression(cb, &assign.lhs, syms);
            let src = emit_expression(cb, &assign.rhs, syms);
            cb.add(TacInstr::Assign(dst, src));
            cb.add(TacInstr::Goto(next));
        }
        Statement::Call(call) => {
            // any result is dropped
            let _ = emit_call(cb, &call.call, syms);
            cb.add(TacInstr::Goto(next));
        }
        Statement::Return(ret) => {
            let value = ret.expr.as_ref().map(|e| emit_expression(cb, e, syms));
            cb.add(TacInstr::Return(value));
            cb.add(TacInstr::Goto(next));
        }
        Statement::If(if_stat) => {
            let l_true = cb.create_label();
            let l_false = cb.create_label();
            emit_condition(cb, &if_stat.cond, l_true, l_false, syms);

            cb.add(TacInstr::Label(l_true));
            emit_statements(cb, &if_stat.then_body, syms);
            cb.add(TacInstr::Goto(next));

            cb.add(TacInstr::Label(l_false));
            emit_statements(cb, &if_stat.else_body, syms);
            cb.add(TacInstr::Goto(next));
        }
        Statement::While(while_stat) => {
            let l_cond = cb.create_label();
            let l_body = cb.create_label();

            cb.add(TacInstr::Label(l_cond));
            emit_condition(cb, &while_stat.cond, l_body, next, syms);

            cb.add(TacInstr::Label(l_body));
            emit_statements(cb, &while_stat.body, syms);
            cb.add(TacInstr::Goto(l_cond));
        }
    }
}

/// Lowers an expression in value position into an operand.
fn emit_expression(cb: &mut CodeBlock, expression: &Expression, syms: &SymTab) -> TacValue {
    match expression {
        Expression::Constant(c) => TacValue::Const(c.value, c.ty.clone()),
        Expression::Designator(d) => match &syms.symbol(d.symbol).kind {
            SymbolKind::Constant(value) => {
                TacValue::Const(*value, syms.symbol(d.symbol).ty.clone())
            }
            _ => TacValue::Name(d.symbol),
        },
        Expression::Str(s) => TacValue::Name(s.symbol),
        Expression::ArrayDesignator(d) => emit_array_address(cb, d, syms),
        Expression::Binary(b) if b.op.is_arithmetic() => {
            let src1 = emit_expression(cb, &b.left, syms);
            let src2 = emit_expression(cb, &b.right, syms);
            let dst = TacValue::Temp(cb.create_temp(b.left.ty(syms)));
            let op = match b.op {
                BinaryOp::Add => ArithOp::Add,
                BinaryOp::Sub => ArithOp::Sub,
                BinaryOp::Mul => ArithOp::Mul,
                _ => ArithOp::Div,
            };
            cb.add(TacInstr::Arith(op, dst.clone(), src1, src2));
            dst
        }
        // boolean-valued operators materialize 0/1 across true/false/end
        Expression::Binary(_) | Expression::Unary(Unary { op: UnaryOp::Not, .. }) => {
            let l_true = cb.create_label();
            let l_false = cb.create_label();
            let l_end = cb.create_label();
            emit_condition(cb, expression, l_true, l_false, syms);

            let result = TacValue::Temp(cb.create_temp(Type::Bool));
            cb.add(TacInstr::Label(l_true));
            cb.add(TacInstr::Assign(result.clone(), TacValue::Const(1, Type::Bool)));
            cb.add(TacInstr::Goto(l_end));
            cb.add(TacInstr::Label(l_false));
            cb.add(TacInstr::Assign(result.clone(), TacValue::Const(0, Type::Bool)));
            cb.add(TacInstr::Label(l_end));
            result
        }
        Expression::Unary(u) => {
            // the sign of a literal folds away at lowering time
            if let Some((ty, value)) = expression.fold_literal(syms) {
                return TacValue::Const(value, ty);
            }
            let src = emit_expression(cb, &u.operand, syms);
            match u.op {
                UnaryOp::Pos => src,
                _ => {
                    let dst = TacValue::Temp(cb.create_temp(u.operand.ty(syms)));
                    cb.add(TacInstr::Unary(TacUnaryOp::Neg, dst.clone(), src));
                    dst
                }
            }
        }
        Expression::Special(s) => emit_special(cb, s, syms),
        Expression::Call(call) => {
            emit_call(cb, call, syms).expect("functions in value position return a value")
        }
    }
}

fn emit_special(cb: &mut CodeBlock, special: &Special, syms: &SymTab) -> TacValue {
    match special.op {
        SpecialOp::Address => {
            let src = emit_expression(cb, &special.operand, syms);
            // the address of an element reference is the address it holds
            if let TacValue::Reference(t) = src {
                return TacValue::Temp(t);
            }
            let dst = TacValue::Temp(cb.create_temp(Type::pointer(special.operand.ty(syms))));
            cb.add(TacInstr::Address(dst.clone(), src));
            dst
        }
        SpecialOp::Deref => {
            let src = emit_expression(cb, &special.operand, syms);
            let pointee = special
                .operand
                .ty(syms)
                .pointee()
                .cloned()
                .unwrap_or(Type::Null);
            let dst = TacValue::Temp(cb.create_temp(pointee));
            cb.add(TacInstr::Deref(dst.clone(), src));
            dst
        }
        SpecialOp::Cast => {
            let src = emit_expression(cb, &special.operand, syms);
            let from = special.operand.ty(syms);
            let to = special.target.clone().expect("cast carries a target type");
            let dst = TacValue::Temp(cb.create_temp(to.clone()));
            let instr = match to.data_size().cmp(&from.data_size()) {
                std::cmp::Ordering::Greater => TacInstr::Widen(dst.clone(), src),
                std::cmp::Ordering::Less => TacInstr::Narrow(dst.clone(), src),
                std::cmp::Ordering::Equal => TacInstr::Cast(dst.clone(), src),
            };
            cb.add(instr);
            dst
        }
    }
}

/// Arguments are evaluated left to right, parameters emitted in reverse
/// order, then the call itself.
fn emit_call(cb: &mut CodeBlock, call: &FunctionCall, syms: &SymTab) -> Option<TacValue> {
    let args: Vec<TacValue> = call
        .args
        .iter()
        .map(|a| emit_expression(cb, a, syms))
        .collect();
    for (index, value) in args.into_iter().enumerate().rev() {
        cb.add(TacInstr::Param(index, value));
    }

    let ret = &syms.symbol(call.symbol).ty;
    let dst = if ret.is_null() {
        None
    } else {
        Some(TacValue::Temp(cb.create_temp(ret.clone())))
    };
    cb.add(TacInstr::Call(dst.clone(), call.symbol));
    dst
}

/// Lowers an expression in control position: evaluation transfers to
/// `l_true` or `l_false` instead of producing a value. `&&` and `||`
/// short-circuit left to right here.
fn emit_condition(
    cb: &mut CodeBlock,
    expression: &Expression,
    l_true: Label,
    l_false: Label,
    syms: &SymTab,
) {
    match expression {
        Expression::Binary(b) if b.op == BinaryOp::And => {
            let mid = cb.create_label();
            emit_condition(cb, &b.left, mid, l_false, syms);
            cb.add(TacInstr::Label(mid));
            emit_condition(cb, &b.right, l_true, l_false, syms);
        }
        Expression::Binary(b) if b.op == BinaryOp::Or => {
            let mid = cb.create_label();
            emit_condition(cb, &b.left, l_true, mid, syms);
            cb.add(TacInstr::Label(mid));
            emit_condition(cb, &b.right, l_true, l_false, syms);
        }
        Expression::Binary(b) if b.op.is_relational() => {
            let src1 = emit_expression(cb, &b.left, syms);
            let src2 = emit_expression(cb, &b.right, syms);
            let op = match b.op {
                BinaryOp::Equal => RelOp::Equal,
                BinaryOp::NotEqual => RelOp::NotEqual,
                BinaryOp::LessThan => RelOp::LessThan,
                BinaryOp::LessEqual => RelOp::LessEqual,
                BinaryOp::BiggerThan => RelOp::BiggerThan,
                _ => RelOp::BiggerEqual,
            };
            cb.add(TacInstr::BranchIf(op, l_true, src1, src2));
            cb.add(TacInstr::Goto(l_false));
        }
        Expression::Unary(u) if u.op == UnaryOp::Not => {
            emit_condition(cb, &u.operand, l_false, l_true, syms);
        }
        // any other boolean value: compare against 1
        _ => {
            let value = emit_expression(cb, expression, syms);
            cb.add(TacInstr::BranchIf(
                RelOp::Equal,
                l_true,
                value,
                TacValue::Const(1, Type::Bool),
            ));
            cb.add(TacInstr::Goto(l_false));
        }
    }
}

fn builtin(syms: &SymTab, name: &str) -> SymbolId {
    syms.find(MODULE_SCOPE, name, Lookup::Global)
        .expect("runtime builtins are seeded by the parser")
}

/// Emits a `DIM(base, dim)` runtime call and returns its result operand.
fn emit_dim_call(cb: &mut CodeBlock, base: TacValue, dim: i64, syms: &SymTab) -> TacValue {
    let sym = builtin(syms, "DIM");
    cb.add(TacInstr::Param(1, TacValue::Const(dim, Type::Integer)));
    cb.add(TacInstr::Param(0, base));
    let dst = TacValue::Temp(cb.create_temp(Type::Integer));
    cb.add(TacInstr::Call(Some(dst.clone()), sym));
    dst
}

/// Emits a `DOFS(base)` runtime call and returns its result operand.
fn emit_dofs_call(cb: &mut CodeBlock, base: TacValue, syms: &SymTab) -> TacValue {
    let sym = builtin(syms, "DOFS");
    cb.add(TacInstr::Param(0, base));
    let dst = TacValue::Temp(cb.create_temp(Type::Integer));
    cb.add(TacInstr::Call(Some(dst.clone()), sym));
    dst
}

/// Address computation for `a[i_1]..[i_k]` over an n-dimensional array:
///
/// ```text
/// base <- &a (or a itself when a is already a pointer)
/// idx  <- i_1
/// for j = 2..n: idx <- idx * DIM(a, j) + (i_j, or 0 past k)
/// addr <- base + DOFS(a) + idx * elem_size
/// ```
///
/// The result is a reference operand usable for both loads and stores.
fn emit_array_address(cb: &mut CodeBlock, d: &ArrayDesignator, syms: &SymTab) -> TacValue {
    let sym = syms.symbol(d.symbol);
    let (array_ty, base) = match &sym.ty {
        Type::Pointer(inner) => (inner.as_ref().clone(), TacValue::Name(d.symbol)),
        other => {
            let ptr = cb.create_temp(Type::pointer(other.clone()));
            cb.add(TacInstr::Address(
                TacValue::Temp(ptr),
                TacValue::Name(d.symbol),
            ));
            (other.clone(), TacValue::Temp(ptr))
        }
    };

    let ndim = array_ty.ndim();
    let elem_size = array_ty.base_type().data_size() as i64;

    let mut idx = emit_expression(cb, &d.indices[0], syms);
    for j in 1..ndim {
        let dim = emit_dim_call(cb, base.clone(), j as i64 + 1, syms);
        let scaled = TacValue::Temp(cb.create_temp(Type::Integer));
        cb.add(TacInstr::Arith(ArithOp::Mul, scaled.clone(), idx, dim));

        let index_j = match d.indices.get(j) {
            Some(e) => emit_expression(cb, e, syms),
            None => TacValue::Const(0, Type::Integer),
        };
        let sum = TacValue::Temp(cb.create_temp(Type::Integer));
        cb.add(TacInstr::Arith(ArithOp::Add, sum.clone(), scaled, index_j));
        idx = sum;
    }

    let bytes = TacValue::Temp(cb.create_temp(Type::Integer));
    cb.add(TacInstr::Arith(
        ArithOp::Mul,
        bytes.clone(),
        idx,
        TacValue::Const(elem_size, Type::Integer),
    ));

    let dofs = emit_dofs_call(cb, base.clone(), syms);
    let offset = TacValue::Temp(cb.create_temp(Type::Integer));
    cb.add(TacInstr::Arith(ArithOp::Add, offset.clone(), bytes, dofs));

    let mut elem_ty = &array_ty;
    for _ in 0..d.indices.len() {
        elem_ty = elem_ty.inner().expect("validated by the type checker");
    }
    let addr = cb.create_temp(Type::pointer(elem_ty.clone()));
    cb.add(TacInstr::Arith(
        ArithOp::Add,
        TacValue::Temp(addr),
        base,
        offset,
    ));
    TacValue::Reference(addr)
}
