/*!
A whole-program compiler for SnuPL/2, a small Pascal-like imperative
language with modules, procedures and functions, typed variables,
constants, multi-dimensional and open arrays, and basic I/O. The compiler
reads one source file and emits AMD64 assembly that, assembled and linked
against a small runtime (`ReadInt`, `WriteInt`, `DIM`, `DOFS`, ..), runs
as a native executable.

## Compilation stages

1. **Lexing** - [lex](lexer::lex) scans the source text into
   [LinedToken](lexer::LinedToken)s carrying line/column positions.
   Unknown input produces a [LexError](lexer::LexError).
2. **Parsing** - [parse](parser::parse) runs a single-lookahead recursive
   descent over the tokens, building the [Module](ast::Module) AST and the
   [SymTab](symbols::SymTab) in one pass; names are resolved as they are
   read, so an unbound identifier is already a
   [ParseError](parser::ParseError).
3. **Validation** - [validate](semantic_analysis::validate) walks the AST
   bottom-up and checks every expression, statement and call against the
   SnuPL/2 type rules. The first violation is reported as a
   [SemAnalysisError](semantic_analysis::SemAnalysisError) with the
   offending token.
4. **Lowering** - [emit_module](tac::emit_module) translates each scope
   into linear three-address code: short-circuit boolean control flow,
   explicit labels and temporaries, and runtime `DIM`/`DOFS` calls for
   array addressing. From this stage on, any error is a compiler bug and
   panics.
5. **Codegen** - [codegen](codegen::codegen) selects AMD64 instructions
   per TAC instruction and lays out a System V stack frame per scope.
6. **Emission** - the [emission] module renders the assembly AST as GNU
   assembler AT&T text through [Display](std::fmt::Display).

The driver binary glues the stages together per input file and optionally
invokes gcc to link against the runtime.
*/

#![deny(unused_must_use)]
#![warn(clippy::pedantic)]
#![allow(clippy::wildcard_imports)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod ast;
pub mod codegen;
pub mod emission;
pub mod lexer;
pub mod parser;
pub mod semantic_analysis;
pub mod symbols;
pub mod tac;
pub mod types;
