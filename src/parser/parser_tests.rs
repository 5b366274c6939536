use super::*;
use crate::lexer;
use pretty_assertions::assert_eq;

fn parse_src(src: &str) -> Result<(Module, SymTab)> {
    let tokens = lexer::lex(src).unwrap();
    parse(&tokens)
}

/// Renders an expression with explicit parentheses so precedence is easy to
/// assert on.
fn shape(e: &Expression, syms: &SymTab) -> String {
    match e {
        Expression::Binary(b) => {
            let op = match b.op {
                BinaryOp::Add => "+",
                BinaryOp::Sub => "-",
                BinaryOp::Mul => "*",
                BinaryOp::Div => "/",
                BinaryOp::And => "&&",
                BinaryOp::Or => "||",
                BinaryOp::Equal => "=",
                BinaryOp::NotEqual => "#",
                BinaryOp::LessThan => "<",
                BinaryOp::LessEqual => "<=",
                BinaryOp::BiggerThan => ">",
                BinaryOp::BiggerEqual => ">=",
            };
            format!("({}{}{})", shape(&b.left, syms), op, shape(&b.right, syms))
        }
        Expression::Unary(u) => {
            let op = match u.op {
                UnaryOp::Neg => "-",
                UnaryOp::Pos => "+",
                UnaryOp::Not => "!",
            };
            format!("({}{})", op, shape(&u.operand, syms))
        }
        Expression::Special(s) => format!("(&{})", shape(&s.operand, syms)),
        Expression::Call(c) => {
            let args: Vec<_> = c.args.iter().map(|a| shape(a, syms)).collect();
            format!("{}({})", syms.symbol(c.symbol).name, args.join(","))
        }
        Expression::Designator(d) => syms.symbol(d.symbol).name.clone(),
        Expression::ArrayDesignator(d) => {
            let idx: Vec<_> = d
                .indices
                .iter()
                .map(|i| format!("[{}]", shape(i, syms)))
                .collect();
            format!("{}{}", syms.symbol(d.symbol).name, idx.join(""))
        }
        Expression::Constant(c) => format!("{}", c.value),
        Expression::Str(s) => format!("{:?}", s.text),
    }
}

fn first_assign_rhs(module: &Module) -> &Expression {
    match &module.body[0] {
        Statement::Assign(a) => &a.rhs,
        other => panic!("expected assignment, got {other:?}"),
    }
}

#[test]
fn test_expression_precedence() {
    let (module, syms) =
        parse_src("module T; var i: integer; begin i := 1 * 2 - 3 * (4 + 5) end T.").unwrap();
    assert_eq!(
        shape(first_assign_rhs(&module), &syms),
        "((1*2)-(3*(4+5)))"
    );
}

#[test]
fn test_logical_precedence() {
    let (module, syms) = parse_src(
        "module T; var b: boolean; var x: integer; begin b := x < 1 && true || false end T.",
    )
    .unwrap();
    // && binds like *, || like +, relops weakest
    assert_eq!(
        shape(first_assign_rhs(&module), &syms),
        "(x<((1&&true)||false))"
    );
}

#[test]
fn test_unary_sign() {
    let (module, syms) =
        parse_src("module T; var i: integer; begin i := -1 + 2 end T.").unwrap();
    assert_eq!(shape(first_assign_rhs(&module), &syms), "((-1)+2)");
}

#[test]
fn test_array_designator() {
    let (module, _) = parse_src(
        "module T; var a: integer[3][5]; var i: integer; begin a[i][i+1] := 0 end T.",
    )
    .unwrap();
    let Statement::Assign(assign) = &module.body[0] else {
        panic!("expected assignment");
    };
    let Expression::ArrayDesignator(d) = &assign.lhs else {
        panic!("expected array designator");
    };
    assert_eq!(d.indices.len(), 2);
    assert!(d.indices_complete);
}

#[test]
fn test_multidim_type_built_right_to_left() {
    let (_, syms) = parse_src("module T; var a: integer[3][5]; begin end T.").unwrap();
    let id = syms.find(MODULE_SCOPE, "a", Lookup::Global).unwrap();
    assert_eq!(
        syms.symbol(id).ty,
        Type::array(Some(3), Type::array(Some(5), Type::Integer))
    );
}

#[test]
fn test_closing_ident_mismatch() {
    let err = parse_src("module A; begin end B.").unwrap_err();
    assert_eq!(
        err.inner,
        InnerParseError::ClosingIdentMismatch(String::from("A"), String::from("B"))
    );
    let token = err.get_token().unwrap();
    assert_eq!(token.get_inner(), &Token::Ident(String::from("B")));
}

#[test]
fn test_procedure_closing_ident_mismatch() {
    let err =
        parse_src("module T; procedure p(); begin end q; begin end T.").unwrap_err();
    assert!(matches!(
        err.inner,
        InnerParseError::ClosingIdentMismatch(_, _)
    ));
}

#[test]
fn test_undeclared_identifier() {
    let err = parse_src("module T; begin x := 1 end T.").unwrap_err();
    assert_eq!(
        err.inner,
        InnerParseError::UndeclaredIdentifier(String::from("x"))
    );
}

#[test]
fn test_duplicate_declaration() {
    let err = parse_src("module T; var i: integer; var i: boolean; begin end T.").unwrap_err();
    assert_eq!(err.inner, InnerParseError::Redeclaration(String::from("i")));
}

#[test]
fn test_call_statement_resolution() {
    let (module, syms) = parse_src("module T; begin WriteLn() end T.").unwrap();
    let Statement::Call(call) = &module.body[0] else {
        panic!("expected call statement");
    };
    assert_eq!(syms.symbol(call.call.symbol).name, "WriteLn");
}

#[test]
fn test_array_param_rewritten_to_pointer() {
    let (module, syms) =
        parse_src("module T; procedure p(a: integer[]); begin end p; begin end T.").unwrap();
    let sub = &module.subroutines[0];
    let sym = syms.symbol(sub.symbol);
    assert_eq!(
        sym.proc_params(),
        &[(
            String::from("a"),
            Type::pointer(Type::array(None, Type::Integer))
        )]
    );
    // the parameter symbol in the subroutine scope is rewritten too
    let param = syms.find(sub.scope, "a", Lookup::Local).unwrap();
    assert_eq!(
        syms.symbol(param).ty,
        Type::pointer(Type::array(None, Type::Integer))
    );
    assert_eq!(syms.symbol(param).kind, SymbolKind::Param(0));
}

#[test]
fn test_extern_procedure() {
    let (module, syms) =
        parse_src("module T; procedure raw(x: integer); extern; begin raw(1) end T.").unwrap();
    assert!(module.subroutines.is_empty());
    let id = syms.find(MODULE_SCOPE, "raw", Lookup::Global).unwrap();
    assert!(syms.symbol(id).is_external());
}

#[test]
fn test_string_constant_synthesizes_global() {
    let (module, syms) = parse_src("module T; begin WriteStr(\"hi\") end T.").unwrap();
    let id = syms.find(MODULE_SCOPE, "_str_1", Lookup::Global).unwrap();
    let sym = syms.symbol(id);
    assert_eq!(sym.ty, Type::array(Some(3), Type::Char));
    assert_eq!(sym.data.as_deref(), Some("hi"));

    // the argument is wrapped in an address-of so it is passed by reference
    let Statement::Call(call) = &module.body[0] else {
        panic!("expected call statement");
    };
    assert_eq!(shape(&Expression::Call(call.call.clone()), &syms), "WriteStr((&\"hi\"))");
}

#[test]
fn test_open_array_only_in_params() {
    let err = parse_src("module T; var a: integer[]; begin end T.").unwrap_err();
    assert_eq!(err.inner, InnerParseError::OpenArrayNotAllowed);
}

#[test]
fn test_parenthesized_flag_preserved() {
    let (module, _) =
        parse_src("module T; var i: integer; begin i := (1) end T.").unwrap();
    let Expression::Constant(c) = first_assign_rhs(&module) else {
        panic!("expected constant");
    };
    assert!(c.parenthesized);
}

#[test]
fn test_const_declaration_folds_initializer() {
    let (_, syms) =
        parse_src("module T; const n: integer = -8; begin end T.").unwrap();
    let id = syms.find(MODULE_SCOPE, "n", Lookup::Global).unwrap();
    assert_eq!(syms.symbol(id).kind, SymbolKind::Constant(-8));
}

#[test]
fn test_const_requires_literal() {
    let err =
        parse_src("module T; var i: integer; const n: integer = i; begin end T.").unwrap_err();
    assert_eq!(
        err.inner,
        InnerParseError::ConstantInitializerExpected(String::from("n"))
    );
}
