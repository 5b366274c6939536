mod cursor;
mod parse_error;
#[cfg(test)]
mod parser_tests;

use crate::ast::*;
use crate::lexer::{LinedToken, Token};
use crate::symbols::{
    Identifier, Lookup, ScopeId, SymTab, Symbol, SymbolKind, MODULE_SCOPE,
};
use crate::types::Type;
use cursor::Cursor;
pub use parse_error::{InnerParseError, ParseError, Result};

pub struct Parser<'a> {
    cursor: Cursor<'a>,
    syms: SymTab,
    str_count: usize,
}

/// Parses a token stream into a [`Module`] and the symbol table built
/// alongside it. Aborts on the first syntactic error.
pub fn parse(tokens: &[LinedToken]) -> Result<(Module, SymTab)> {
    let mut p = Parser {
        cursor: Cursor::new(tokens),
        syms: SymTab::new(),
        str_count: 0,
    };
    init_symbol_table(&mut p.syms);
    let module = parse_module(&mut p)?;
    Ok((module, p.syms))
}

/// Seeds the module scope with the runtime's external subroutines.
fn init_symbol_table(syms: &mut SymTab) {
    let untyped_ptr = || Type::pointer(Type::Null);
    let string_ptr = || Type::pointer(Type::array(None, Type::Char));
    let builtins: [(&str, Type, Vec<(&str, Type)>); 9] = [
        ("ReadInt", Type::Integer, vec![]),
        ("ReadLong", Type::Longint, vec![]),
        ("WriteInt", Type::Null, vec![("v", Type::Integer)]),
        ("WriteLong", Type::Null, vec![("v", Type::Longint)]),
        ("WriteChar", Type::Null, vec![("c", Type::Char)]),
        ("WriteStr", Type::Null, vec![("string", string_ptr())]),
        ("WriteLn", Type::Null, vec![]),
        ("DIM", Type::Integer, vec![("array", untyped_ptr()), ("dim", Type::Integer)]),
        ("DOFS", Type::Integer, vec![("array", untyped_ptr())]),
    ];

    for (name, ret, params) in builtins {
        let params = params
            .into_iter()
            .map(|(n, t)| (n.to_owned(), t))
            .collect();
        let sym = Symbol {
            name: name.to_owned(),
            ty: ret,
            kind: SymbolKind::Procedure {
                params,
                is_external: true,
            },
            data: None,
        };
        syms.add(MODULE_SCOPE, sym).expect("builtins are distinct");
    }
}

fn parse_module(p: &mut Parser) -> Result<Module> {
    let token = p.cursor.expect(&Token::Module)?;
    let (name, _) = p.cursor.expect_ident()?;
    p.cursor.expect(&Token::Semicolon)?;

    let mut subroutines = Vec::new();
    while p.cursor.peek().is_some_and(Token::is_declaration_start) {
        match p.cursor.peek() {
            Some(Token::Const) => parse_const_declarations(p, MODULE_SCOPE)?,
            Some(Token::Var) => parse_var_declarations(p, MODULE_SCOPE)?,
            _ => {
                if let Some(sub) = parse_subroutine(p)? {
                    subroutines.push(sub);
                }
            }
        }
    }

    let body = if p.cursor.bump_if(&Token::Begin) {
        parse_stat_sequence(p, MODULE_SCOPE)?
    } else {
        Vec::new()
    };

    p.cursor.expect(&Token::End)?;
    let (closing, closing_tok) = p.cursor.expect_ident()?;
    if closing != name {
        return Err(InnerParseError::ClosingIdentMismatch(name, closing).at(&closing_tok));
    }
    p.cursor.expect(&Token::Dot)?;
    if let Some(trailing) = p.cursor.peek_lined() {
        return Err(InnerParseError::TrailingInput(trailing.get_inner().clone()).at(trailing));
    }

    Ok(Module {
        name,
        token,
        scope: MODULE_SCOPE,
        subroutines,
        body,
    })
}

/// varDecl = ident { "," ident } ":" type.
///
/// Shared by var declarations, const declarations and formal parameter
/// lists; duplicate checking happens when the caller inserts the names into
/// its scope.
fn parse_var_decl(p: &mut Parser, open_allowed: bool) -> Result<(Vec<(Identifier, LinedToken)>, Type)> {
    let mut names = Vec::new();
    loop {
        let (name, tok) = p.cursor.expect_ident()?;
        names.push((name, tok));
        if !p.cursor.bump_if(&Token::Comma) {
            break;
        }
    }
    p.cursor.expect(&Token::Colon)?;
    let ty = parse_type(p, open_allowed)?;
    Ok((names, ty))
}

/// type = basetype { "[" [ [ "+" | "-" ] number ] "]" }.
///
/// Brackets accumulate left to right, the type is built right to left, so
/// `integer[3][5]` is a 3-array of 5-arrays of integer.
fn parse_type(p: &mut Parser, open_allowed: bool) -> Result<Type> {
    let base_tok = p.cursor.next_or_error()?;
    let mut ty = match base_tok.get_inner() {
        Token::Boolean => Type::Bool,
        Token::Char => Type::Char,
        Token::Integer => Type::Integer,
        Token::Longint => Type::Longint,
        other => {
            return Err(
                InnerParseError::ExpectedButGot(Token::Integer, other.clone()).at(base_tok)
            )
        }
    };

    let mut dims = Vec::new();
    while p.cursor.bump_if(&Token::OpenBracket) {
        if matches!(p.cursor.peek(), Some(Token::CloseBracket)) {
            let close = p.cursor.next_or_error()?;
            if !open_allowed {
                return Err(InnerParseError::OpenArrayNotAllowed.at(close));
            }
            dims.push(None);
            continue;
        }
        let negative = if p.cursor.bump_if(&Token::Hyphen) {
            true
        } else {
            p.cursor.bump_if(&Token::Plus);
            false
        };
        let num_tok = p.cursor.next_or_error()?;
        let value = match num_tok.get_inner() {
            Token::Number(n) | Token::LNumber(n) => *n,
            other => {
                return Err(InnerParseError::DimensionExpected(other.clone()).at(num_tok));
            }
        };
        let value = if negative { -value } else { value };
        if value <= 0 {
            return Err(InnerParseError::BadArrayDimension(value).at(num_tok));
        }
        dims.push(Some(value));
        p.cursor.expect(&Token::CloseBracket)?;
    }

    for dim in dims.into_iter().rev() {
        ty = Type::array(dim, ty);
    }
    Ok(ty)
}

/// varDeclaration = "var" { identList ":" type ";" }.
fn parse_var_declarations(p: &mut Parser, scope: ScopeId) -> Result<()> {
    p.cursor.expect(&Token::Var)?;
    let kind = if scope == MODULE_SCOPE {
        SymbolKind::Global
    } else {
        SymbolKind::Local
    };

    while matches!(p.cursor.peek(), Some(Token::Ident(_))) {
        let (names, ty) = parse_var_decl(p, false)?;
        for (name, tok) in names {
            let sym = Symbol {
                name: name.clone(),
                ty: ty.clone(),
                kind: kind.clone(),
                data: None,
            };
            if p.syms.add(scope, sym).is_none() {
                return Err(InnerParseError::Redeclaration(name).at(&tok));
            }
        }
        p.cursor.expect(&Token::Semicolon)?;
    }
    Ok(())
}

/// constDeclaration = "const" { identList ":" type "=" expression ";" }.
///
/// Initializers are folded at parse time; anything but a (possibly signed)
/// literal is rejected.
fn parse_const_declarations(p: &mut Parser, scope: ScopeId) -> Result<()> {
    p.cursor.expect(&Token::Const)?;

    while matches!(p.cursor.peek(), Some(Token::Ident(_))) {
        let (names, ty) = parse_var_decl(p, false)?;
        p.cursor.expect(&Token::IsEqual)?;
        let init = parse_expression(p, scope)?;
        let init_tok = init.token().clone();
        for (name, tok) in names {
            let Some((folded_ty, value)) = init.fold_literal(&p.syms) else {
                return Err(InnerParseError::ConstantInitializerExpected(name).at(&init_tok));
            };
            // an integer literal may initialize a longint constant
            let widened = ty == Type::Longint && folded_ty == Type::Integer;
            if !widened && !ty.match_with(&folded_ty) {
                return Err(InnerParseError::ConstantTypeMismatch(name).at(&init_tok));
            }
            let sym = Symbol {
                name: name.clone(),
                ty: ty.clone(),
                kind: SymbolKind::Constant(value),
                data: None,
            };
            if p.syms.add(scope, sym).is_none() {
                return Err(InnerParseError::Redeclaration(name).at(&tok));
            }
        }
        p.cursor.expect(&Token::Semicolon)?;
    }
    Ok(())
}

/// formalParam = "(" [ varDecl { ";" varDecl } ] ")".
fn parse_formal_params(p: &mut Parser) -> Result<Vec<(Identifier, LinedToken, Type)>> {
    let mut params = Vec::new();
    p.cursor.expect(&Token::OpenParanth)?;
    if matches!(p.cursor.peek(), Some(Token::Ident(_))) {
        loop {
            let (names, ty) = parse_var_decl(p, true)?;
            for (name, tok) in names {
                params.push((name, tok, ty.clone()));
            }
            if !p.cursor.bump_if(&Token::Semicolon) {
                break;
            }
        }
    }
    p.cursor.expect(&Token::CloseParanth)?;
    Ok(params)
}

/// procDecl / funcDecl including the body or the `extern;` tail. Returns
/// `None` for externals, which contribute a symbol but no code.
fn parse_subroutine(p: &mut Parser) -> Result<Option<Subroutine>> {
    let is_function = matches!(p.cursor.peek(), Some(Token::Function));
    let token = p.cursor.next_or_error()?.clone();
    let (name, name_tok) = p.cursor.expect_ident()?;

    let params = if matches!(p.cursor.peek(), Some(Token::OpenParanth)) {
        parse_formal_params(p)?
    } else {
        Vec::new()
    };

    let return_type = if is_function {
        p.cursor.expect(&Token::Colon)?;
        parse_type(p, false)?
    } else {
        Type::Null
    };
    p.cursor.expect(&Token::Semicolon)?;

    // arrays are passed by reference
    let rewritten: Vec<(Identifier, Type)> = params
        .iter()
        .map(|(n, _, t)| {
            let t = if t.is_array() {
                Type::pointer(t.clone())
            } else {
                t.clone()
            };
            (n.clone(), t)
        })
        .collect();

    let is_external = matches!(p.cursor.peek(), Some(Token::Extern));

    let proc_sym = Symbol {
        name: name.clone(),
        ty: return_type,
        kind: SymbolKind::Procedure {
            params: rewritten.clone(),
            is_external,
        },
        data: None,
    };
    let Some(symbol) = p.syms.add(MODULE_SCOPE, proc_sym) else {
        return Err(InnerParseError::Redeclaration(name).at(&name_tok));
    };

    if is_external {
        p.cursor.bump();
        p.cursor.expect(&Token::Semicolon)?;
        return Ok(None);
    }

    let scope = p.syms.create_scope(Some(MODULE_SCOPE));
    for (index, (pname, ptok, _)) in params.iter().enumerate() {
        let sym = Symbol {
            name: pname.clone(),
            ty: rewritten[index].1.clone(),
            kind: SymbolKind::Param(index),
            data: None,
        };
        if p.syms.add(scope, sym).is_none() {
            return Err(InnerParseError::Redeclaration(pname.clone()).at(ptok));
        }
    }

    // subroutineBody = { constDecl | varDecl } "begin" statSequence "end"
    loop {
        match p.cursor.peek() {
            Some(Token::Const) => parse_const_declarations(p, scope)?,
            Some(Token::Var) => parse_var_declarations(p, scope)?,
            _ => break,
        }
    }
    p.cursor.expect(&Token::Begin)?;
    let body = parse_stat_sequence(p, scope)?;
    p.cursor.expect(&Token::End)?;

    let (closing, closing_tok) = p.cursor.expect_ident()?;
    if closing != name {
        return Err(InnerParseError::ClosingIdentMismatch(name, closing).at(&closing_tok));
    }
    p.cursor.expect(&Token::Semicolon)?;

    Ok(Some(Subroutine {
        name,
        token,
        symbol,
        scope,
        body,
    }))
}

/// statSequence = [ statement { ";" statement } ].
fn parse_stat_sequence(p: &mut Parser, scope: ScopeId) -> Result<Vec<Statement>> {
    let mut statements = Vec::new();
    let at_follow = |t: Option<&Token>| {
        matches!(t, None | Some(Token::End | Token::Else | Token::Dot))
    };

    if at_follow(p.cursor.peek()) {
        return Ok(statements);
    }
    loop {
        statements.push(parse_statement(p, scope)?);
        if !p.cursor.bump_if(&Token::Semicolon) {
            break;
        }
        if at_follow(p.cursor.peek()) {
            break;
        }
    }
    Ok(statements)
}

fn parse_statement(p: &mut Parser, scope: ScopeId) -> Result<Statement> {
    let peek = p.cursor.peek_or_error()?;
    match peek.get_inner() {
        Token::If => parse_if(p, scope),
        Token::While => parse_while(p, scope),
        Token::Return => parse_return(p, scope),
        Token::Ident(name) => {
            // a bound procedure name starts a call statement, any other
            // designator an assignment
            let symbol = p
                .syms
                .find(scope, name, Lookup::Any)
                .ok_or_else(|| InnerParseError::UndeclaredIdentifier(name.clone()).at(peek))?;
            if p.syms.symbol(symbol).is_procedure() {
                let call = parse_function_call(p, scope)?;
                Ok(Statement::Call(CallStat { call }))
            } else {
                parse_assignment(p, scope)
            }
        }
        other => Err(InnerParseError::StatementExpected(other.clone()).at(peek)),
    }
}

/// assignment = qualident ":=" expression.
fn parse_assignment(p: &mut Parser, scope: ScopeId) -> Result<Statement> {
    let lhs = parse_qualident(p, scope)?;
    let token = p.cursor.expect(&Token::Assign)?;
    let rhs = parse_expression(p, scope)?;
    Ok(Statement::Assign(Assign { token, lhs, rhs }))
}

/// ifStatement = "if" "(" expression ")" "then" statSequence
///               [ "else" statSequence ] "end".
fn parse_if(p: &mut Parser, scope: ScopeId) -> Result<Statement> {
    let token = p.cursor.expect(&Token::If)?;
    p.cursor.expect(&Token::OpenParanth)?;
    let cond = parse_expression(p, scope)?;
    p.cursor.expect(&Token::CloseParanth)?;
    p.cursor.expect(&Token::Then)?;
    let then_body = parse_stat_sequence(p, scope)?;
    let else_body = if p.cursor.bump_if(&Token::Else) {
        parse_stat_sequence(p, scope)?
    } else {
        Vec::new()
    };
    p.cursor.expect(&Token::End)?;
    Ok(Statement::If(If {
        token,
        cond,
        then_body,
        else_body,
    }))
}

/// whileStatement = "while" "(" expression ")" "do" statSequence "end".
fn parse_while(p: &mut Parser, scope: ScopeId) -> Result<Statement> {
    let token = p.cursor.expect(&Token::While)?;
    p.cursor.expect(&Token::OpenParanth)?;
    let cond = parse_expression(p, scope)?;
    p.cursor.expect(&Token::CloseParanth)?;
    p.cursor.expect(&Token::Do)?;
    let body = parse_stat_sequence(p, scope)?;
    p.cursor.expect(&Token::End)?;
    Ok(Statement::While(While { token, cond, body }))
}

/// returnStatement = "return" [ expression ].
fn parse_return(p: &mut Parser, scope: ScopeId) -> Result<Statement> {
    let token = p.cursor.expect(&Token::Return)?;
    let expr = if p.cursor.peek().is_some_and(Token::starts_expression) {
        Some(parse_expression(p, scope)?)
    } else {
        None
    };
    Ok(Statement::Return(Return { token, expr }))
}

/// expression = simpleexpr [ relOp simpleexpr ].
fn parse_expression(p: &mut Parser, scope: ScopeId) -> Result<Expression> {
    let left = parse_simpleexpr(p, scope)?;
    if p.cursor.peek().is_some_and(Token::is_relop) {
        let token = p.cursor.next_or_error()?.clone();
        let op = match token.get_inner() {
            Token::IsEqual => BinaryOp::Equal,
            Token::IsNotEqual => BinaryOp::NotEqual,
            Token::IsLessThan => BinaryOp::LessThan,
            Token::IsLessThanOrEqual => BinaryOp::LessEqual,
            Token::IsGreaterThan => BinaryOp::BiggerThan,
            _ => BinaryOp::BiggerEqual,
        };
        let right = parse_simpleexpr(p, scope)?;
        return Ok(Expression::binary(op, left, right, token));
    }
    Ok(left)
}

/// simpleexpr = [ "+" | "-" ] term { ("+" | "-" | "||") term }.
fn parse_simpleexpr(p: &mut Parser, scope: ScopeId) -> Result<Expression> {
    let sign = match p.cursor.peek() {
        Some(Token::Plus | Token::Hyphen) => Some(p.cursor.next_or_error()?.clone()),
        _ => None,
    };

    let mut left = parse_term(p, scope)?;
    if let Some(token) = sign {
        let op = if token.get_inner() == &Token::Hyphen {
            UnaryOp::Neg
        } else {
            UnaryOp::Pos
        };
        left = Expression::unary(op, left, token);
    }

    while p.cursor.peek().is_some_and(Token::is_termop) {
        let token = p.cursor.next_or_error()?.clone();
        let op = match token.get_inner() {
            Token::Plus => BinaryOp::Add,
            Token::Hyphen => BinaryOp::Sub,
            _ => BinaryOp::Or,
        };
        let right = parse_term(p, scope)?;
        left = Expression::binary(op, left, right, token);
    }
    Ok(left)
}

/// term = factor { ("*" | "/" | "&&") factor }.
fn parse_term(p: &mut Parser, scope: ScopeId) -> Result<Expression> {
    let mut left = parse_factor(p, scope)?;
    while p.cursor.peek().is_some_and(Token::is_factop) {
        let token = p.cursor.next_or_error()?.clone();
        let op = match token.get_inner() {
            Token::Asterisk => BinaryOp::Mul,
            Token::FSlash => BinaryOp::Div,
            _ => BinaryOp::And,
        };
        let right = parse_factor(p, scope)?;
        left = Expression::binary(op, left, right, token);
    }
    Ok(left)
}

/// factor = qualident | number | boolean | char | string
///        | "(" expression ")" | subroutineCall | "!" factor.
fn parse_factor(p: &mut Parser, scope: ScopeId) -> Result<Expression> {
    let peek = p.cursor.peek_or_error()?;
    match peek.get_inner() {
        Token::Number(n) => {
            let constant = Constant {
                ty: Type::Integer,
                value: *n,
                token: peek.clone(),
                parenthesized: false,
            };
            p.cursor.bump();
            Ok(Expression::Constant(constant))
        }
        Token::LNumber(n) => {
            let constant = Constant {
                ty: Type::Longint,
                value: *n,
                token: peek.clone(),
                parenthesized: false,
            };
            p.cursor.bump();
            Ok(Expression::Constant(constant))
        }
        Token::BoolConst(b) => {
            let constant = Constant {
                ty: Type::Bool,
                value: i64::from(*b),
                token: peek.clone(),
                parenthesized: false,
            };
            p.cursor.bump();
            Ok(Expression::Constant(constant))
        }
        Token::CharConst(c) => {
            let constant = Constant {
                ty: Type::Char,
                value: *c as i64,
                token: peek.clone(),
                parenthesized: false,
            };
            p.cursor.bump();
            Ok(Expression::Constant(constant))
        }
        Token::StringConst(_) => parse_string_constant(p),
        Token::OpenParanth => {
            p.cursor.bump();
            let mut exp = parse_expression(p, scope)?;
            p.cursor.expect(&Token::CloseParanth)?;
            exp.set_parenthesized();
            Ok(exp)
        }
        Token::LogicalNot => {
            let token = p.cursor.next_or_error()?.clone();
            let operand = parse_factor(p, scope)?;
            Ok(Expression::unary(UnaryOp::Not, operand, token))
        }
        Token::Ident(name) => {
            let symbol = p
                .syms
                .find(scope, name, Lookup::Any)
                .ok_or_else(|| InnerParseError::UndeclaredIdentifier(name.clone()).at(peek))?;
            if p.syms.symbol(symbol).is_procedure() {
                parse_function_call(p, scope).map(Expression::Call)
            } else {
                parse_qualident(p, scope)
            }
        }
        other => Err(InnerParseError::FactorExpected(other.clone()).at(peek)),
    }
}

/// Synthesizes a unique `_str_<N>` global holding the char-array
/// initializer and returns an operand referring to it.
fn parse_string_constant(p: &mut Parser) -> Result<Expression> {
    let token = p.cursor.next_or_error()?.clone();
    let Token::StringConst(text) = token.get_inner() else {
        unreachable!("caller checked for a string constant");
    };

    let ty = Type::array(Some(text.len() as i64 + 1), Type::Char);
    let symbol = loop {
        p.str_count += 1;
        let name = format!("_str_{}", p.str_count);
        if p.syms.find(MODULE_SCOPE, &name, Lookup::Global).is_some() {
            continue;
        }
        let sym = Symbol {
            name,
            ty: ty.clone(),
            kind: SymbolKind::Global,
            data: Some(text.clone()),
        };
        break p.syms.add(MODULE_SCOPE, sym).expect("name is fresh");
    };

    Ok(Expression::Str(StringConstant {
        symbol,
        text: text.clone(),
        token: token.clone(),
        parenthesized: false,
    }))
}

/// qualident = ident { "[" expression "]" }.
fn parse_qualident(p: &mut Parser, scope: ScopeId) -> Result<Expression> {
    let (name, token) = p.cursor.expect_ident()?;
    let symbol = p
        .syms
        .find(scope, &name, Lookup::Any)
        .ok_or_else(|| InnerParseError::UndeclaredIdentifier(name.clone()).at(&token))?;

    if !matches!(p.cursor.peek(), Some(Token::OpenBracket)) {
        return Ok(Expression::Designator(Designator {
            symbol,
            token,
            parenthesized: false,
        }));
    }

    let mut indices = Vec::new();
    while p.cursor.bump_if(&Token::OpenBracket) {
        indices.push(parse_expression(p, scope)?);
        p.cursor.expect(&Token::CloseBracket)?;
    }
    Ok(Expression::ArrayDesignator(ArrayDesignator {
        symbol,
        indices,
        indices_complete: true,
        token,
        parenthesized: false,
    }))
}

/// subroutineCall = ident "(" [ expression { "," expression } ] ")".
///
/// Array-typed arguments (including string constants) are wrapped in an
/// address-of node here so they are passed by reference.
fn parse_function_call(p: &mut Parser, scope: ScopeId) -> Result<FunctionCall> {
    let (name, token) = p.cursor.expect_ident()?;
    let symbol = p
        .syms
        .find(scope, &name, Lookup::Any)
        .ok_or_else(|| InnerParseError::UndeclaredIdentifier(name.clone()).at(&token))?;
    if !p.syms.symbol(symbol).is_procedure() {
        return Err(InnerParseError::NotAProcedure(name).at(&token));
    }

    p.cursor.expect(&Token::OpenParanth)?;
    let mut args = Vec::new();
    if !matches!(p.cursor.peek(), Some(Token::CloseParanth)) {
        loop {
            let arg = parse_expression(p, scope)?;
            let arg = if arg.ty(&p.syms).is_array() {
                Expression::address_of(arg)
            } else {
                arg
            };
            args.push(arg);
            if !p.cursor.bump_if(&Token::Comma) {
                break;
            }
        }
    }
    p.cursor.expect(&Token::CloseParanth)?;

    Ok(FunctionCall {
        symbol,
        args,
        token,
        parenthesized: false,
    })
}
