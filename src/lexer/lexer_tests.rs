use super::*;

fn lex_kinds(input: &str) -> Vec<Token> {
    lex(input)
        .unwrap()
        .into_iter()
        .map(Token::from)
        .collect()
}

#[test]
fn test_basic_module() {
    let kinds = lex_kinds("module T;\nbegin\nend T.");
    let expected = vec![
        Token::Module,
        Token::Ident(String::from("T")),
        Token::Semicolon,
        Token::Begin,
        Token::End,
        Token::Ident(String::from("T")),
        Token::Dot,
    ];
    assert_eq!(expected, kinds);
}

#[test]
fn test_operators_and_assign() {
    let kinds = lex_kinds("i := a[0] <= 7 # b && !c || d >= 'x'");
    let expected = vec![
        Token::Ident(String::from("i")),
        Token::Assign,
        Token::Ident(String::from("a")),
        Token::OpenBracket,
        Token::Number(0),
        Token::CloseBracket,
        Token::IsLessThanOrEqual,
        Token::Number(7),
        Token::IsNotEqual,
        Token::Ident(String::from("b")),
        Token::LogicalAnd,
        Token::LogicalNot,
        Token::Ident(String::from("c")),
        Token::LogicalOr,
        Token::Ident(String::from("d")),
        Token::IsGreaterThanOrEqual,
        Token::CharConst('x'),
    ];
    assert_eq!(expected, kinds);
}

#[test]
fn test_keywords_and_constants() {
    let kinds = lex_kinds("const n: longint = 10L; var ok: boolean; // trailing comment");
    let expected = vec![
        Token::Const,
        Token::Ident(String::from("n")),
        Token::Colon,
        Token::Longint,
        Token::IsEqual,
        Token::LNumber(10),
        Token::Semicolon,
        Token::Var,
        Token::Ident(String::from("ok")),
        Token::Colon,
        Token::Boolean,
        Token::Semicolon,
    ];
    assert_eq!(expected, kinds);
}

#[test]
fn test_string_escapes() {
    let kinds = lex_kinds("WriteStr(\"hi\\n\")");
    let expected = vec![
        Token::Ident(String::from("WriteStr")),
        Token::OpenParanth,
        Token::StringConst(String::from("hi\n")),
        Token::CloseParanth,
    ];
    assert_eq!(expected, kinds);
}

#[test]
fn test_error_position() {
    let err = lex("module T;\nbegin x := 1 ? 2 end T.").unwrap_err();
    assert_eq!(err.get_ln(), 2);
    assert_eq!(err.get_col(), 14);
}

#[test]
fn test_single_ampersand() {
    assert!(lex("a & b").is_err());
}

#[test]
fn test_bad_constant_suffix() {
    assert!(lex("1foo").is_err());
}
