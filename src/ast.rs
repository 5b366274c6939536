use crate::lexer::LinedToken;
use crate::symbols::{Identifier, ScopeId, SymTab, SymbolId, SymbolKind};
use crate::types::Type;

/// Root of the AST. The module owns its statement sequence and one child
/// scope per declared subroutine; all symbols live in the [`SymTab`] built
/// alongside the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: Identifier,
    pub token: LinedToken,
    pub scope: ScopeId,
    pub subroutines: Vec<Subroutine>,
    pub body: Vec<Statement>,
}

/// A procedure or function with a body. The procedure symbol itself is
/// declared in the *parent* scope so recursive calls resolve; `scope` is the
/// subroutine's own scope holding parameters and locals.
#[derive(Debug, Clone, PartialEq)]
pub struct Subroutine {
    pub name: Identifier,
    pub token: LinedToken,
    pub symbol: SymbolId,
    pub scope: ScopeId,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Assign(Assign),
    Call(CallStat),
    Return(Return),
    If(If),
    While(While),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
    pub token: LinedToken,
    /// always a (array) designator, guaranteed by the parser
    pub lhs: Expression,
    pub rhs: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallStat {
    pub call: FunctionCall,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Return {
    pub token: LinedToken,
    pub expr: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct If {
    pub token: LinedToken,
    pub cond: Expression,
    pub then_body: Vec<Statement>,
    pub else_body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct While {
    pub token: LinedToken,
    pub cond: Expression,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    BiggerThan,
    BiggerEqual,
}

impl BinaryOp {
    #[inline]
    pub fn is_arithmetic(self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div)
    }

    #[inline]
    pub fn is_relational(self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::NotEqual
                | Self::LessThan
                | Self::LessEqual
                | Self::BiggerThan
                | Self::BiggerEqual
        )
    }

    #[inline]
    pub fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialOp {
    Address,
    Deref,
    Cast,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Binary(Binary),
    Unary(Unary),
    Special(Special),
    Call(FunctionCall),
    Designator(Designator),
    ArrayDesignator(ArrayDesignator),
    Constant(Constant),
    Str(StringConstant),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binary {
    pub op: BinaryOp,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub token: LinedToken,
    pub parenthesized: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unary {
    pub op: UnaryOp,
    pub operand: Box<Expression>,
    pub token: LinedToken,
    pub parenthesized: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Special {
    pub op: SpecialOp,
    pub operand: Box<Expression>,
    /// target type; present exactly for `Cast`
    pub target: Option<Type>,
    pub token: LinedToken,
    pub parenthesized: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub symbol: SymbolId,
    pub args: Vec<Expression>,
    pub token: LinedToken,
    pub parenthesized: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Designator {
    pub symbol: SymbolId,
    pub token: LinedToken,
    pub parenthesized: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayDesignator {
    pub symbol: SymbolId,
    pub indices: Vec<Expression>,
    /// set once the parser has seen the last `]`; no index may be added
    /// afterwards
    pub indices_complete: bool,
    pub token: LinedToken,
    pub parenthesized: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub ty: Type,
    pub value: i64,
    pub token: LinedToken,
    pub parenthesized: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringConstant {
    /// synthesized `_str_<N>` global holding the char-array initializer
    pub symbol: SymbolId,
    pub text: String,
    pub token: LinedToken,
    pub parenthesized: bool,
}

impl Expression {
    pub fn binary(op: BinaryOp, left: Expression, right: Expression, token: LinedToken) -> Self {
        Self::Binary(Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            token,
            parenthesized: false,
        })
    }

    pub fn unary(op: UnaryOp, operand: Expression, token: LinedToken) -> Self {
        Self::Unary(Unary {
            op,
            operand: Box::new(operand),
            token,
            parenthesized: false,
        })
    }

    pub fn address_of(operand: Expression) -> Self {
        let token = operand.token().clone();
        Self::Special(Special {
            op: SpecialOp::Address,
            operand: Box::new(operand),
            target: None,
            token,
            parenthesized: false,
        })
    }

    pub fn token(&self) -> &LinedToken {
        match self {
            Self::Binary(e) => &e.token,
            Self::Unary(e) => &e.token,
            Self::Special(e) => &e.token,
            Self::Call(e) => &e.token,
            Self::Designator(e) => &e.token,
            Self::ArrayDesignator(e) => &e.token,
            Self::Constant(e) => &e.token,
            Self::Str(e) => &e.token,
        }
    }

    pub fn set_parenthesized(&mut self) {
        match self {
            Self::Binary(e) => e.parenthesized = true,
            Self::Unary(e) => e.parenthesized = true,
            Self::Special(e) => e.parenthesized = true,
            Self::Call(e) => e.parenthesized = true,
            Self::Designator(e) => e.parenthesized = true,
            Self::ArrayDesignator(e) => e.parenthesized = true,
            Self::Constant(e) => e.parenthesized = true,
            Self::Str(e) => e.parenthesized = true,
        }
    }

    /// Pure type query. Returns [`Type::Null`] for ill-typed shapes; the
    /// type checker turns those into diagnostics.
    pub fn ty(&self, syms: &SymTab) -> Type {
        match self {
            Self::Binary(e) => {
                if e.op.is_arithmetic() {
                    e.left.ty(syms)
                } else {
                    Type::Bool
                }
            }
            Self::Unary(e) => match e.op {
                UnaryOp::Neg | UnaryOp::Pos => e.operand.ty(syms),
                UnaryOp::Not => Type::Bool,
            },
            Self::Special(e) => match e.op {
                SpecialOp::Address => Type::pointer(e.operand.ty(syms)),
                SpecialOp::Deref => e
                    .operand
                    .ty(syms)
                    .pointee()
                    .cloned()
                    .unwrap_or(Type::Null),
                SpecialOp::Cast => e.target.clone().unwrap_or(Type::Null),
            },
            Self::Call(e) => syms.symbol(e.symbol).ty.clone(),
            Self::Designator(e) => syms.symbol(e.symbol).ty.clone(),
            Self::ArrayDesignator(e) => {
                let sym = syms.symbol(e.symbol);
                // a pointer to an array is dereferenced transparently
                let mut ty = match &sym.ty {
                    Type::Pointer(base) => base.as_ref(),
                    other => other,
                };
                for _ in 0..e.indices.len() {
                    match ty.inner() {
                        Some(inner) => ty = inner,
                        None => return Type::Null,
                    }
                }
                ty.clone()
            }
            Self::Constant(e) => e.ty.clone(),
            Self::Str(e) => syms.symbol(e.symbol).ty.clone(),
        }
    }

    /// Compile-time value of a literal or constant symbol, with the
    /// trivial sign fold.
    pub fn fold_literal(&self, syms: &SymTab) -> Option<(Type, i64)> {
        match self {
            Self::Constant(c) => Some((c.ty.clone(), c.value)),
            Self::Designator(d) => {
                let sym = syms.symbol(d.symbol);
                match sym.kind {
                    SymbolKind::Constant(value) => Some((sym.ty.clone(), value)),
                    _ => None,
                }
            }
            Self::Unary(u) => {
                let (ty, value) = u.operand.fold_literal(syms)?;
                match u.op {
                    UnaryOp::Neg if ty.is_integral() => Some((ty, -value)),
                    UnaryOp::Pos if ty.is_integral() => Some((ty, value)),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

impl Statement {
    pub fn token(&self) -> &LinedToken {
        match self {
            Self::Assign(s) => &s.token,
            Self::Call(s) => &s.call.token,
            Self::Return(s) => &s.token,
            Self::If(s) => &s.token,
            Self::While(s) => &s.token,
        }
    }
}

