use super::*;
use crate::ast::Module;
use crate::lexer;
use crate::parser;
use crate::symbols::SymTab;

fn parse_src(src: &str) -> (Module, SymTab) {
    let tokens = lexer::lex(src).unwrap();
    parser::parse(&tokens).unwrap()
}

fn validate_src(src: &str) -> Result<()> {
    let (module, syms) = parse_src(src);
    validate(&module, &syms)
}

#[test]
fn test_valid_module() {
    let src = "module T;
        var a: integer[3]; var i: integer;
        function f(x: integer): integer;
        begin return x * x end f;
        begin
            i := 1 + 2 * 3;
            a[i - 6] := f(7);
            if (a[1] < 10) then WriteInt(a[1]) else WriteLn() end;
            while (i > 0) do i := i - 1 end
        end T.";
    assert_eq!(validate_src(src), Ok(()));
}

#[test]
fn test_typecheck_is_repeatable() {
    let (module, syms) = parse_src("module T; var i: integer; begin i := 1 end T.");
    assert_eq!(validate(&module, &syms), validate(&module, &syms));
}

#[test]
fn test_assign_mismatch_reports_rhs_token() {
    let src = "module T; var i: integer; var b: boolean; begin i := b end T.";
    let err = validate_src(src).unwrap_err();
    assert_eq!(err.inner, InnerSemError::AssignTypeMismatch);
    // the token is the `b` on line 1
    assert_eq!(err.get_token().get_col(), 54);
}

#[test]
fn test_integer_longint_do_not_mix() {
    let src = "module T; var i: integer; var l: longint; begin l := i + 1 end T.";
    assert!(validate_src(src).is_err());

    let src = "module T; var l: longint; begin l := 1L + 2L end T.";
    assert_eq!(validate_src(src), Ok(()));
}

#[test]
fn test_condition_must_be_boolean() {
    let err = validate_src("module T; begin if (1) then WriteLn() end end T.").unwrap_err();
    assert_eq!(err.inner, InnerSemError::ConditionNotBoolean);
}

#[test]
fn test_arithmetic_on_boolean_rejected() {
    let err =
        validate_src("module T; var b: boolean; var i: integer; begin i := b + 1 end T.")
            .unwrap_err();
    assert_eq!(err.inner, InnerSemError::OperandNotIntegral);
}

#[test]
fn test_logical_on_integer_rejected() {
    let err =
        validate_src("module T; var b: boolean; begin b := 1 && true end T.").unwrap_err();
    assert_eq!(err.inner, InnerSemError::OperandNotBoolean);
}

#[test]
fn test_return_rules() {
    let err = validate_src("module T; begin return 1 end T.").unwrap_err();
    assert_eq!(err.inner, InnerSemError::SuperfluousReturnValue);

    let err = validate_src(
        "module T; function f(): integer; begin return end f; begin end T.",
    )
    .unwrap_err();
    assert_eq!(err.inner, InnerSemError::ReturnValueExpected);

    let err = validate_src(
        "module T; function f(): integer; begin return true end f; begin end T.",
    )
    .unwrap_err();
    assert_eq!(err.inner, InnerSemError::ReturnTypeMismatch);
}

#[test]
fn test_argument_count_and_types() {
    let err = validate_src("module T; begin WriteInt() end T.").unwrap_err();
    assert_eq!(
        err.inner,
        InnerSemError::ArgumentCountMismatch(1, 0, String::from("WriteInt"))
    );

    let err = validate_src("module T; begin WriteInt(true) end T.").unwrap_err();
    assert_eq!(
        err.inner,
        InnerSemError::ArgumentTypeMismatch(0, String::from("WriteInt"))
    );
}

#[test]
fn test_open_array_parameter_accepts_any_length() {
    let src = "module T;
        var a: integer[7];
        procedure sum(v: integer[]);
        begin WriteInt(v[0]) end sum;
        begin sum(a) end T.";
    assert_eq!(validate_src(src), Ok(()));
}

#[test]
fn test_index_must_be_integral() {
    let err = validate_src(
        "module T; var a: integer[3]; var i: integer; begin i := a[true] end T.",
    )
    .unwrap_err();
    assert_eq!(err.inner, InnerSemError::IndexNotIntegral);
}

#[test]
fn test_too_many_indices() {
    let err = validate_src(
        "module T; var a: integer[3]; var i: integer; begin i := a[1][2] end T.",
    )
    .unwrap_err();
    assert_eq!(err.inner, InnerSemError::TooManyIndices(String::from("a")));
}

#[test]
fn test_assign_to_constant_rejected() {
    let err =
        validate_src("module T; const n: integer = 1; begin n := 2 end T.").unwrap_err();
    assert_eq!(err.inner, InnerSemError::AssignToConstant(String::from("n")));
}

#[test]
fn test_assign_whole_array_rejected() {
    let err = validate_src(
        "module T; var a: integer[3]; var b: integer[3]; begin a := b end T.",
    )
    .unwrap_err();
    assert_eq!(err.inner, InnerSemError::AssignLhsNotScalar);
}
