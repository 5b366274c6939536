use super::{InnerSemError, Result};
use crate::ast::*;
use crate::symbols::{SymTab, SymbolKind};
use crate::types::Type;

/// Syntax-directed bottom-up pass over the whole module. Children are
/// checked before the node's own rule; the first failure carries the
/// offending token to the caller.
pub fn validate(module: &Module, syms: &SymTab) -> Result<()> {
    check_statements(&module.body, &Type::Null, syms)?;
    for sub in &module.subroutines {
        let ret = syms.symbol(sub.symbol).ty.clone();
        check_statements(&sub.body, &ret, syms)?;
    }
    Ok(())
}

fn check_statements(statements: &[Statement], ret: &Type, syms: &SymTab) -> Result<()> {
    statements
        .iter()
        .try_for_each(|s| check_statement(s, ret, syms))
}

fn check_statement(statement: &Statement, ret: &Type, syms: &SymTab) -> Result<()> {
    match statement {
        Statement::Assign(assign) => {
            check_expression(&assign.lhs, syms)?;
            check_expression(&assign.rhs, syms)?;

            if let Expression::Designator(d) = &assign.lhs {
                let sym = syms.symbol(d.symbol);
                if matches!(sym.kind, SymbolKind::Constant(_)) {
                    return Err(InnerSemError::AssignToConstant(sym.name.clone()).at(&d.token));
                }
            }

            let lhs_ty = assign.lhs.ty(syms);
            let rhs_ty = assign.rhs.ty(syms);
            if !lhs_ty.is_scalar() {
                return Err(InnerSemError::AssignLhsNotScalar.at(assign.lhs.token()));
            }
            if !rhs_ty.is_scalar() {
                return Err(InnerSemError::AssignRhsNotScalar.at(assign.rhs.token()));
            }
            if !lhs_ty.match_with(&rhs_ty) {
                return Err(InnerSemError::AssignTypeMismatch.at(assign.rhs.token()));
            }
            Ok(())
        }
        Statement::Call(call) => check_expression_call(&call.call, syms),
        Statement::Return(ret_stat) => {
            if ret.is_null() {
                return match &ret_stat.expr {
                    Some(e) => Err(InnerSemError::SuperfluousReturnValue.at(e.token())),
                    None => Ok(()),
                };
            }
            let Some(expr) = &ret_stat.expr else {
                return Err(InnerSemError::ReturnValueExpected.at(&ret_stat.token));
            };
            check_expression(expr, syms)?;
            if !ret.match_with(&expr.ty(syms)) {
                return Err(InnerSemError::ReturnTypeMismatch.at(expr.token()));
            }
            Ok(())
        }
        Statement::If(if_stat) => {
            check_condition(&if_stat.cond, syms)?;
            check_statements(&if_stat.then_body, ret, syms)?;
            check_statements(&if_stat.else_body, ret, syms)
        }
        Statement::While(while_stat) => {
            check_condition(&while_stat.cond, syms)?;
            check_statements(&while_stat.body, ret, syms)
        }
    }
}

fn check_condition(cond: &Expression, syms: &SymTab) -> Result<()> {
    check_expression(cond, syms)?;
    if !cond.ty(syms).is_boolean() {
        return Err(InnerSemError::ConditionNotBoolean.at(cond.token()));
    }
    Ok(())
}

fn check_expression(expression: &Expression, syms: &SymTab) -> Result<()> {
    match expression {
        Expression::Binary(b) => {
            check_expression(&b.left, syms)?;
            check_expression(&b.right, syms)?;

            let lt = b.left.ty(syms);
            let rt = b.right.ty(syms);
            if b.op.is_logical() {
                if !lt.is_boolean() {
                    return Err(InnerSemError::OperandNotBoolean.at(b.left.token()));
                }
                if !rt.is_boolean() {
                    return Err(InnerSemError::OperandNotBoolean.at(b.right.token()));
                }
                return Ok(());
            }
            if matches!(b.op, BinaryOp::Equal | BinaryOp::NotEqual) {
                if !lt.is_scalar() {
                    return Err(InnerSemError::OperandNotScalar.at(b.left.token()));
                }
                if !rt.is_scalar() {
                    return Err(InnerSemError::OperandNotScalar.at(b.right.token()));
                }
            } else {
                // + - * / < <= > >= work on integers only
                if !lt.is_integral() {
                    return Err(InnerSemError::OperandNotIntegral.at(b.left.token()));
                }
                if !rt.is_integral() {
                    return Err(InnerSemError::OperandNotIntegral.at(b.right.token()));
                }
            }
            if !lt.match_with(&rt) {
                return Err(InnerSemError::OperandsMismatch.at(&b.token));
            }
            Ok(())
        }
        Expression::Unary(u) => {
            check_expression(&u.operand, syms)?;
            let ty = u.operand.ty(syms);
            match u.op {
                UnaryOp::Not if !ty.is_boolean() => {
                    Err(InnerSemError::OperandNotBoolean.at(u.operand.token()))
                }
                UnaryOp::Neg | UnaryOp::Pos if !ty.is_integral() => {
                    Err(InnerSemError::OperandNotIntegral.at(u.operand.token()))
                }
                _ => Ok(()),
            }
        }
        Expression::Special(s) => {
            check_expression(&s.operand, syms)?;
            match s.op {
                SpecialOp::Deref if !s.operand.ty(syms).is_pointer() => {
                    Err(InnerSemError::DerefNonPointer.at(s.operand.token()))
                }
                _ => Ok(()),
            }
        }
        Expression::Call(call) => check_expression_call(call, syms),
        Expression::Designator(d) => {
            if syms.symbol(d.symbol).ty.is_null() {
                let name = syms.symbol(d.symbol).name.clone();
                return Err(InnerSemError::InvalidDesignator(name).at(&d.token));
            }
            Ok(())
        }
        Expression::ArrayDesignator(d) => check_array_designator(d, syms),
        Expression::Constant(c) => {
            if c.ty.is_null() {
                return Err(InnerSemError::InvalidConstant.at(&c.token));
            }
            Ok(())
        }
        Expression::Str(_) => Ok(()),
    }
}

fn check_expression_call(call: &FunctionCall, syms: &SymTab) -> Result<()> {
    let sym = syms.symbol(call.symbol);
    let params = sym.proc_params();
    if call.args.len() != params.len() {
        let err =
            InnerSemError::ArgumentCountMismatch(params.len(), call.args.len(), sym.name.clone());
        return Err(err.at(&call.token));
    }

    for (index, (arg, (_, param_ty))) in call.args.iter().zip(params).enumerate() {
        check_expression(arg, syms)?;
        if !param_ty.match_with(&arg.ty(syms)) {
            let err = InnerSemError::ArgumentTypeMismatch(index, sym.name.clone());
            return Err(err.at(arg.token()));
        }
    }
    Ok(())
}

fn check_array_designator(d: &ArrayDesignator, syms: &SymTab) -> Result<()> {
    debug_assert!(d.indices_complete);
    let sym = syms.symbol(d.symbol);

    for index in &d.indices {
        check_expression(index, syms)?;
        if !index.ty(syms).is_integral() {
            return Err(InnerSemError::IndexNotIntegral.at(index.token()));
        }
    }

    // drill through the declared type, one dimension per index; pointers to
    // arrays are dereferenced transparently
    let mut ty = match &sym.ty {
        Type::Pointer(base) => base.as_ref(),
        other => other,
    };
    if !ty.is_array() {
        return Err(InnerSemError::NotAnArray(sym.name.clone()).at(&d.token));
    }
    for _ in 0..d.indices.len() {
        match ty.inner() {
            Some(inner) => ty = inner,
            None => return Err(InnerSemError::TooManyIndices(sym.name.clone()).at(&d.token)),
        }
    }
    Ok(())
}
