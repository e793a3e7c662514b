use super::super::lexer::token_kind::EbsTokenKind;
use super::error::{unexpected_token, ErrorLocation, ParseResult, ParserError, ParserErrorKind};
use super::expr::{
    ArrayLiteral, Binary, CallArg, Cast, ChainComparison, Expr, ExprKind, FunctionCall, Grouping,
    IndexAccess, JsonLiteral, Literal, MemberAccess, Unary, VarRef,
};
use super::program::{
    BitFieldDef, BitWord, FieldDef, FunctionDecl, ImportDecl, Param, Program, TypeDef,
    TypeDefDecl,
};
use super::stmt::{
    Accessor, AssignStmt, BlockStmt, BreakStmt, DoWhileStmt, ExprStmt, ForStmt, ForeachStmt,
    IfStmt, LValue, LoopKind, PrintStmt, RaiseStmt, ReturnStmt, Stmt, StmtKind, TryStmt,
    VarDeclStmt, WhenClause, WhileStmt,
};
use super::type_expr::{ArrayDims, BaseType, TypeExpr};
use super::utils::{get_associativity, get_precedence, is_relational};
use crate::kit::lexer::types::Coordinate;
use crate::kit::lexer::{SourceSpan, Token};
use crate::runtime::error::ErrorKind;
use crate::runtime::value::parse_date;

use tracing::{debug, trace};

const TARGET: &str = "ebs::parser";

pub struct Parser {
    tokens: Vec<Token<EbsTokenKind>>,
    pos: usize,
    /// Enclosing loops, innermost last
    loops: Vec<LoopKind>,
}

impl Parser {
    /// `tokens` should end with an `Eof` token; one is appended otherwise
    pub fn new(mut tokens: Vec<Token<EbsTokenKind>>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(EbsTokenKind::Eof) {
            let at = tokens.last().map(|t| t.end()).unwrap_or_default();
            tokens.push(Token::with_text(EbsTokenKind::Eof, SourceSpan::at(at), ""));
        }
        Self {
            tokens,
            pos: 0,
            loops: Vec::new(),
        }
    }

    /// Parse the whole token stream as one script
    pub fn parse(&mut self) -> ParseResult<Program> {
        let mut program = Program::default();

        while !self.is_at_end() {
            if self.match_token(EbsTokenKind::Semicolon) {
                continue;
            }

            match self.kind() {
                EbsTokenKind::Import => program.imports.push(self.parse_import()?),
                EbsTokenKind::Function => self.push_function(&mut program)?,
                EbsTokenKind::Identifier if self.peek_kind(1) == EbsTokenKind::Typeof => {
                    let def = self.parse_type_def()?;
                    if program.types.iter().any(|t| t.name.eq_ignore_ascii_case(&def.name)) {
                        return Err(ParserError::at(
                            ParserErrorKind::Custom(format!("Type '{}' already defined", def.name)),
                            def.line,
                            1,
                        ));
                    }
                    program.types.push(def);
                }
                EbsTokenKind::Identifier if self.is_function_decl_start() => {
                    self.push_function(&mut program)?
                }
                _ => program.statements.push(self.parse_statement()?),
            }
        }

        debug!(
            target: TARGET,
            imports = program.imports.len(),
            functions = program.functions.len(),
            types = program.types.len(),
            statements = program.statements.len(),
            "Parsed program"
        );
        Ok(program)
    }

    // ----- token helpers -----

    fn current(&self) -> &Token<EbsTokenKind> {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn kind(&self) -> EbsTokenKind {
        self.current().kind
    }

    fn peek_kind(&self, offset: usize) -> EbsTokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.kind)
            .unwrap_or(EbsTokenKind::Eof)
    }

    fn is_at_end(&self) -> bool {
        self.kind() == EbsTokenKind::Eof
    }

    fn line(&self) -> usize {
        self.current().start().line
    }

    /// Consume the current token and return it
    fn consume(&mut self) -> Token<EbsTokenKind> {
        let token = self.current().clone();
        if !self.is_at_end() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: EbsTokenKind) -> bool {
        self.kind() == kind
    }

    fn match_token(&mut self, kind: EbsTokenKind) -> bool {
        if self.check(kind) {
            self.consume();
            true
        } else {
            false
        }
    }

    fn current_location(&self) -> ErrorLocation {
        if self.is_at_end() {
            ErrorLocation::Eof
        } else {
            let start = self.current().start();
            ErrorLocation::At(Coordinate {
                line: start.line,
                column: start.column,
            })
        }
    }

    fn current_token_text(&self) -> String {
        if self.is_at_end() {
            "EOF".to_string()
        } else {
            self.current().lexeme().to_string()
        }
    }

    fn error_here(&self, kind: ParserErrorKind) -> ParserError {
        ParserError {
            kind,
            location: self.current_location(),
        }
    }

    fn expect(&mut self, kind: EbsTokenKind) -> ParseResult<Token<EbsTokenKind>> {
        if self.check(kind) {
            Ok(self.consume())
        } else if self.is_at_end() {
            Err(self.error_here(ParserErrorKind::UnexpectedEndOfInput))
        } else {
            Err(self.error_here(unexpected_token(
                self.current_token_text(),
                vec![kind.describe()],
            )))
        }
    }

    /// Like `expect`, for closing brackets
    fn expect_closing(&mut self, kind: EbsTokenKind) -> ParseResult<()> {
        if self.match_token(kind) {
            return Ok(());
        }
        let missing = match kind {
            EbsTokenKind::RightParenthesis => ParserErrorKind::MissingRightParen,
            EbsTokenKind::RightSquareBracket => ParserErrorKind::MissingRightBracket,
            EbsTokenKind::RightCurlyBrace => ParserErrorKind::MissingRightCurly,
            other => unexpected_token(self.current_token_text(), vec![other.describe()]),
        };
        Err(self.error_here(missing))
    }

    fn expect_semicolon(&mut self) -> ParseResult<()> {
        self.expect(EbsTokenKind::Semicolon).map(|_| ())
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        if self.check(EbsTokenKind::Identifier) {
            Ok(self.consume().lexeme().to_string())
        } else {
            Err(self.error_here(ParserErrorKind::ExpectedIdentifier {
                found: self.current_token_text(),
            }))
        }
    }

    /// Any word, keywords included (member names, exception kinds)
    fn expect_word(&mut self) -> ParseResult<String> {
        if self.kind().is_word() {
            Ok(self.consume().lexeme().to_string())
        } else {
            Err(self.error_here(ParserErrorKind::ExpectedIdentifier {
                found: self.current_token_text(),
            }))
        }
    }

    // ----- top-level declarations -----

    fn parse_import(&mut self) -> ParseResult<ImportDecl> {
        let line = self.line();
        self.expect(EbsTokenKind::Import)?;
        let path = match self.kind() {
            EbsTokenKind::LiteralString | EbsTokenKind::LiteralDate => {
                self.consume().lexeme().to_string()
            }
            _ => {
                return Err(self.error_here(unexpected_token(
                    self.current_token_text(),
                    vec!["string"],
                )))
            }
        };
        self.expect_semicolon()?;
        trace!(target: TARGET, path = %path, "Import");
        Ok(ImportDecl { path, line })
    }

    /// `name {`, `name return`, or `name(...)` followed by `{` / `return`
    fn is_function_decl_start(&self) -> bool {
        match self.peek_kind(1) {
            EbsTokenKind::LeftCurlyBrace | EbsTokenKind::Return => true,
            EbsTokenKind::LeftParenthesis => {
                let mut depth = 0usize;
                let mut i = self.pos + 1;
                while let Some(token) = self.tokens.get(i) {
                    match token.kind {
                        EbsTokenKind::LeftParenthesis => depth += 1,
                        EbsTokenKind::RightParenthesis => {
                            depth -= 1;
                            if depth == 0 {
                                return matches!(
                                    self.tokens.get(i + 1).map(|t| t.kind),
                                    Some(EbsTokenKind::LeftCurlyBrace | EbsTokenKind::Return)
                                );
                            }
                        }
                        EbsTokenKind::Semicolon | EbsTokenKind::Eof => return false,
                        _ => {}
                    }
                    i += 1;
                }
                false
            }
            _ => false,
        }
    }

    fn push_function(&mut self, program: &mut Program) -> ParseResult<()> {
        let decl = self.parse_function_decl()?;
        if program.function(&decl.name).is_some() {
            return Err(ParserError::at(
                ParserErrorKind::Custom(format!("Function '{}' already defined", decl.name)),
                decl.line,
                1,
            ));
        }
        program.functions.push(decl);
        Ok(())
    }

    fn parse_function_decl(&mut self) -> ParseResult<FunctionDecl> {
        let line = self.line();
        self.match_token(EbsTokenKind::Function);
        let name = self.expect_identifier()?;

        let params = if self.match_token(EbsTokenKind::LeftParenthesis) {
            self.parse_params()?
        } else {
            Vec::new()
        };

        let return_type = if self.match_token(EbsTokenKind::Return) {
            Some(self.parse_type_expr()?)
        } else {
            None
        };

        // a function body is never inside the caller's loops
        let outer_loops = std::mem::take(&mut self.loops);
        let body = self.parse_block_body();
        self.loops = outer_loops;

        trace!(target: TARGET, name = %name, params = params.len(), "Function declaration");
        Ok(FunctionDecl {
            name,
            params,
            return_type,
            body: body?,
            line,
        })
    }

    /// After `(`: `name [: type] [= default], ... )`
    fn parse_params(&mut self) -> ParseResult<Vec<Param>> {
        let mut params: Vec<Param> = Vec::new();
        if self.match_token(EbsTokenKind::RightParenthesis) {
            return Ok(params);
        }

        loop {
            let name = self.expect_identifier()?;
            if params.iter().any(|p| p.name.eq_ignore_ascii_case(&name)) {
                return Err(self.error_here(ParserErrorKind::Custom(format!(
                    "Duplicate parameter '{name}'"
                ))));
            }
            let ty = if self.match_token(EbsTokenKind::Colon) {
                Some(self.parse_type_expr()?)
            } else {
                None
            };
            let default = if self.match_token(EbsTokenKind::Equal) {
                Some(self.parse_expression(0)?)
            } else {
                None
            };
            params.push(Param { name, ty, default });

            if !self.match_token(EbsTokenKind::Comma) {
                break;
            }
        }

        self.expect_closing(EbsTokenKind::RightParenthesis)?;
        Ok(params)
    }

    fn parse_type_expr(&mut self) -> ParseResult<TypeExpr> {
        let base = self.parse_base_type()?;

        let dims = if self.match_token(EbsTokenKind::LeftSquareBracket) {
            if self.match_token(EbsTokenKind::Asterisk)
                || self.check(EbsTokenKind::RightSquareBracket)
            {
                self.expect_closing(EbsTokenKind::RightSquareBracket)?;
                Some(ArrayDims::Dynamic)
            } else {
                let mut sizes = vec![self.parse_expression(0)?];
                while self.match_token(EbsTokenKind::Comma) {
                    sizes.push(self.parse_expression(0)?);
                }
                self.expect_closing(EbsTokenKind::RightSquareBracket)?;
                Some(ArrayDims::Fixed(sizes))
            }
        } else if base == BaseType::Any {
            Some(ArrayDims::Dynamic)
        } else {
            None
        };

        Ok(TypeExpr { base, dims })
    }

    /// A type name without extents; `queue.int` names a queue of ints and
    /// a bare `queue` holds anything
    fn parse_base_type(&mut self) -> ParseResult<BaseType> {
        let base = match self.kind() {
            EbsTokenKind::TypeByte => BaseType::Byte,
            EbsTokenKind::TypeInt => BaseType::Int,
            EbsTokenKind::TypeLong => BaseType::Long,
            EbsTokenKind::TypeFloat => BaseType::Float,
            EbsTokenKind::TypeDouble => BaseType::Double,
            EbsTokenKind::TypeString => BaseType::String,
            EbsTokenKind::TypeDate => BaseType::Date,
            EbsTokenKind::TypeBool => BaseType::Bool,
            EbsTokenKind::TypeJson => BaseType::Json,
            EbsTokenKind::TypeMap => BaseType::Map,
            EbsTokenKind::TypeArray => BaseType::Any,
            EbsTokenKind::Identifier if self.current().lexeme().eq_ignore_ascii_case("queue") => {
                self.consume();
                if !self.match_token(EbsTokenKind::Dot) {
                    return Ok(BaseType::Queue(Box::new(BaseType::Any)));
                }
                let elem = self.parse_base_type()?;
                return Ok(BaseType::Queue(Box::new(elem)));
            }
            EbsTokenKind::Identifier => BaseType::Named(self.current().lexeme().to_string()),
            _ => {
                return Err(self.error_here(unexpected_token(
                    self.current_token_text(),
                    vec!["type name"],
                )))
            }
        };
        self.consume();
        Ok(base)
    }

    /// `Name typeof record {...}` / `bitmap {...}` / `intmap {...}` / `<type>`
    fn parse_type_def(&mut self) -> ParseResult<TypeDefDecl> {
        let line = self.line();
        let name = self.expect_identifier()?;
        self.expect(EbsTokenKind::Typeof)?;

        let def = match self.kind() {
            EbsTokenKind::Record => {
                self.consume();
                TypeDef::Record(self.parse_record_fields()?)
            }
            EbsTokenKind::Bitmap => {
                self.consume();
                self.parse_bit_fields(BitWord::Byte)?
            }
            EbsTokenKind::Intmap => {
                self.consume();
                self.parse_bit_fields(BitWord::Int)?
            }
            _ => TypeDef::Alias(self.parse_type_expr()?),
        };
        self.match_token(EbsTokenKind::Semicolon);

        trace!(target: TARGET, name = %name, "Type definition");
        Ok(TypeDefDecl { name, def, line })
    }

    fn parse_record_fields(&mut self) -> ParseResult<Vec<FieldDef>> {
        self.expect(EbsTokenKind::LeftCurlyBrace)?;
        let mut fields: Vec<FieldDef> = Vec::new();

        while !self.check(EbsTokenKind::RightCurlyBrace) && !self.is_at_end() {
            let name = self.expect_word()?;
            if fields.iter().any(|f| f.name.eq_ignore_ascii_case(&name)) {
                return Err(self.error_here(ParserErrorKind::Custom(format!(
                    "Duplicate field '{name}'"
                ))));
            }
            self.expect(EbsTokenKind::Colon)?;
            let ty = self.parse_type_expr()?;
            fields.push(FieldDef { name, ty });

            if !self.match_token(EbsTokenKind::Comma) && !self.match_token(EbsTokenKind::Semicolon)
            {
                break;
            }
        }

        self.expect_closing(EbsTokenKind::RightCurlyBrace)?;
        Ok(fields)
    }

    /// `{ flag: 0, level: 1-3 }`; ranges must fit the word and not overlap
    fn parse_bit_fields(&mut self, word: BitWord) -> ParseResult<TypeDef> {
        self.expect(EbsTokenKind::LeftCurlyBrace)?;
        let mut fields: Vec<BitFieldDef> = Vec::new();
        let max_bit = word.width() - 1;

        while !self.check(EbsTokenKind::RightCurlyBrace) && !self.is_at_end() {
            let name = self.expect_word()?;
            self.expect(EbsTokenKind::Colon)?;
            let lo = self.parse_bit_index(max_bit)?;
            let hi = if self.match_token(EbsTokenKind::Minus) {
                self.parse_bit_index(max_bit)?
            } else {
                lo
            };
            if hi < lo {
                return Err(self.error_here(ParserErrorKind::InvalidBitRange(format!(
                    "Bit range {lo}-{hi} of field '{name}' is reversed"
                ))));
            }
            if let Some(other) = fields
                .iter()
                .find(|f| f.name.eq_ignore_ascii_case(&name) || (lo <= f.hi && f.lo <= hi))
            {
                return Err(self.error_here(ParserErrorKind::InvalidBitRange(format!(
                    "Field '{}' overlaps field '{}'",
                    name, other.name
                ))));
            }
            fields.push(BitFieldDef { name, lo, hi });

            if !self.match_token(EbsTokenKind::Comma) && !self.match_token(EbsTokenKind::Semicolon)
            {
                break;
            }
        }

        self.expect_closing(EbsTokenKind::RightCurlyBrace)?;
        Ok(TypeDef::Bitmap { word, fields })
    }

    fn parse_bit_index(&mut self, max_bit: u8) -> ParseResult<u8> {
        let token = self.expect(EbsTokenKind::LiteralInt)?;
        match token.lexeme().parse::<u8>() {
            Ok(bit) if bit <= max_bit => Ok(bit),
            _ => Err(ParserError::at(
                ParserErrorKind::InvalidBitRange(format!(
                    "Bit position {} is outside 0-{}",
                    token.lexeme(),
                    max_bit
                )),
                token.start().line,
                token.start().column,
            )),
        }
    }

    // ----- statements -----

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.line();
        let kind = match self.kind() {
            EbsTokenKind::LeftCurlyBrace => StmtKind::Block(BlockStmt {
                statements: self.parse_block_body()?,
            }),
            EbsTokenKind::Var | EbsTokenKind::Const => {
                let decl = self.parse_var_declaration()?;
                self.expect_semicolon()?;
                decl
            }
            EbsTokenKind::Print => {
                self.consume();
                let expression = self.parse_expression(0)?;
                self.expect_semicolon()?;
                StmtKind::Print(PrintStmt { expression })
            }
            EbsTokenKind::Call => {
                self.consume();
                let expression = self.parse_expression(0)?;
                if !matches!(*expression, ExprKind::FunctionCall(_)) {
                    return Err(ParserError::at(
                        ParserErrorKind::Custom("Expected a function call after 'call'".into()),
                        line,
                        1,
                    ));
                }
                self.expect_semicolon()?;
                StmtKind::Expr(ExprStmt { expression })
            }
            EbsTokenKind::Return => {
                self.consume();
                let value = if self.check(EbsTokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression(0)?)
                };
                self.expect_semicolon()?;
                StmtKind::Return(ReturnStmt { value })
            }
            EbsTokenKind::If => self.parse_if_statement()?,
            EbsTokenKind::While => self.parse_while_loop()?,
            EbsTokenKind::Do => self.parse_do_while_loop()?,
            EbsTokenKind::For => self.parse_for_loop()?,
            EbsTokenKind::Foreach => self.parse_foreach_loop()?,
            EbsTokenKind::Break => {
                self.ensure_in_loop("break", None)?;
                self.consume();
                self.expect_semicolon()?;
                StmtKind::Break(BreakStmt { target: None })
            }
            EbsTokenKind::Exit => {
                self.consume();
                let target = match self.kind() {
                    EbsTokenKind::While => Some(LoopKind::While),
                    EbsTokenKind::Do => Some(LoopKind::Do),
                    EbsTokenKind::For => Some(LoopKind::For),
                    EbsTokenKind::Foreach => Some(LoopKind::Foreach),
                    _ => None,
                };
                if target.is_some() {
                    self.consume();
                }
                self.ensure_in_loop("exit", target)?;
                self.expect_semicolon()?;
                StmtKind::Break(BreakStmt { target })
            }
            EbsTokenKind::Continue => {
                self.ensure_in_loop("continue", None)?;
                self.consume();
                self.expect_semicolon()?;
                StmtKind::Continue
            }
            EbsTokenKind::Try => self.parse_try_statement()?,
            EbsTokenKind::Raise => {
                let raise = self.parse_raise()?;
                self.expect_semicolon()?;
                raise
            }
            EbsTokenKind::Import => {
                return Err(self.error_here(ParserErrorKind::NotAtTopLevel("import".into())))
            }
            EbsTokenKind::Function => {
                return Err(self.error_here(ParserErrorKind::NotAtTopLevel(
                    "Function declaration".into(),
                )))
            }
            EbsTokenKind::Identifier if self.peek_kind(1) == EbsTokenKind::Typeof => {
                return Err(
                    self.error_here(ParserErrorKind::NotAtTopLevel("Type definition".into()))
                )
            }
            EbsTokenKind::Identifier if self.is_function_decl_start() => {
                return Err(self.error_here(ParserErrorKind::NotAtTopLevel(
                    "Function declaration".into(),
                )))
            }
            _ => {
                let stmt = self.parse_simple_statement()?;
                self.expect_semicolon()?;
                stmt
            }
        };
        Ok(Stmt::new(line, kind))
    }

    fn ensure_in_loop(&self, word: &str, target: Option<LoopKind>) -> ParseResult<()> {
        let found = match target {
            None => !self.loops.is_empty(),
            Some(kind) => self.loops.contains(&kind),
        };
        if found {
            Ok(())
        } else {
            Err(self.error_here(ParserErrorKind::OutsideLoop(word.to_string())))
        }
    }

    /// `{ statement* }`
    fn parse_block_body(&mut self) -> ParseResult<Vec<Stmt>> {
        self.expect(EbsTokenKind::LeftCurlyBrace)?;

        let mut statements = Vec::new();
        while !self.is_at_end() && !self.check(EbsTokenKind::RightCurlyBrace) {
            if self.match_token(EbsTokenKind::Semicolon) {
                continue;
            }
            statements.push(self.parse_statement()?);
        }

        self.expect_closing(EbsTokenKind::RightCurlyBrace)?;
        Ok(statements)
    }

    fn parse_var_declaration(&mut self) -> ParseResult<StmtKind> {
        let constant = self.consume().kind == EbsTokenKind::Const;
        let name = self.expect_identifier()?;

        let declared_type = if self.match_token(EbsTokenKind::Colon) {
            Some(self.parse_type_expr()?)
        } else {
            None
        };

        let initializer = if self.match_token(EbsTokenKind::Equal) {
            Some(self.parse_expression(0)?)
        } else {
            None
        };

        if constant && initializer.is_none() {
            return Err(self.error_here(ParserErrorKind::Custom(format!(
                "Constant '{name}' requires an initializer"
            ))));
        }

        Ok(StmtKind::VarDecl(VarDeclStmt {
            name,
            declared_type,
            initializer,
            constant,
        }))
    }

    /// Declaration, assignment, `++`/`--` or expression, without the
    /// trailing `;` (shared with `for` headers)
    fn parse_simple_statement(&mut self) -> ParseResult<StmtKind> {
        if matches!(self.kind(), EbsTokenKind::Var | EbsTokenKind::Const) {
            return self.parse_var_declaration();
        }

        if matches!(self.kind(), EbsTokenKind::PlusPlus | EbsTokenKind::MinusMinus) {
            let op = self.consume().kind;
            let target = self.parse_expression(0)?;
            return Ok(StmtKind::Assign(Self::increment(self.to_lvalue(target)?, op)));
        }

        let expression = self.parse_expression(0)?;
        let op = self.kind();

        if op == EbsTokenKind::Equal {
            let target = self.to_lvalue(expression)?;
            self.consume();
            let value = self.parse_expression(0)?;
            Ok(StmtKind::Assign(AssignStmt {
                target,
                op: None,
                value,
            }))
        } else if let Some(base) = op.compound_base() {
            let target = self.to_lvalue(expression)?;
            self.consume();
            let value = self.parse_expression(0)?;
            Ok(StmtKind::Assign(AssignStmt {
                target,
                op: Some(base),
                value,
            }))
        } else if matches!(op, EbsTokenKind::PlusPlus | EbsTokenKind::MinusMinus) {
            let target = self.to_lvalue(expression)?;
            self.consume();
            Ok(StmtKind::Assign(Self::increment(target, op)))
        } else {
            Ok(StmtKind::Expr(ExprStmt { expression }))
        }
    }

    fn increment(target: LValue, op: EbsTokenKind) -> AssignStmt {
        let base = if op == EbsTokenKind::PlusPlus {
            EbsTokenKind::Plus
        } else {
            EbsTokenKind::Minus
        };
        AssignStmt {
            target,
            op: Some(base),
            value: Box::new(ExprKind::Literal(Literal::Int(1))),
        }
    }

    fn to_lvalue(&self, expr: Expr) -> ParseResult<LValue> {
        match *expr {
            ExprKind::VarRef(v) => Ok(LValue {
                name: v.name,
                path: Vec::new(),
            }),
            ExprKind::MemberAccess(m) => {
                let mut target = self.to_lvalue(m.object)?;
                target.path.push(Accessor::Field(m.member));
                Ok(target)
            }
            ExprKind::IndexAccess(i) => {
                let mut target = self.to_lvalue(i.object)?;
                target.path.push(Accessor::Index(i.indices));
                Ok(target)
            }
            ExprKind::Grouping(g) => self.to_lvalue(g.expression),
            _ => Err(self.error_here(ParserErrorKind::InvalidAssignmentTarget)),
        }
    }

    fn parse_loop_body(&mut self, kind: LoopKind) -> ParseResult<Box<Stmt>> {
        self.loops.push(kind);
        let body = self.parse_statement();
        self.loops.pop();
        Ok(Box::new(body?))
    }

    fn parse_if_statement(&mut self) -> ParseResult<StmtKind> {
        self.expect(EbsTokenKind::If)?;
        let condition = self.parse_expression(0)?;
        self.match_token(EbsTokenKind::Then);
        let then_branch = Box::new(self.parse_statement()?);

        let else_branch = if self.match_token(EbsTokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(StmtKind::If(IfStmt {
            condition,
            then_branch,
            else_branch,
        }))
    }

    fn parse_while_loop(&mut self) -> ParseResult<StmtKind> {
        self.expect(EbsTokenKind::While)?;
        let condition = self.parse_expression(0)?;
        let body = self.parse_loop_body(LoopKind::While)?;
        Ok(StmtKind::While(WhileStmt { condition, body }))
    }

    fn parse_do_while_loop(&mut self) -> ParseResult<StmtKind> {
        self.expect(EbsTokenKind::Do)?;
        let body = self.parse_loop_body(LoopKind::Do)?;
        self.expect(EbsTokenKind::While)?;
        let condition = self.parse_expression(0)?;
        self.match_token(EbsTokenKind::Semicolon);
        Ok(StmtKind::DoWhile(DoWhileStmt { body, condition }))
    }

    /// `for (init; condition; step) body`, every header part optional
    fn parse_for_loop(&mut self) -> ParseResult<StmtKind> {
        self.expect(EbsTokenKind::For)?;
        self.expect(EbsTokenKind::LeftParenthesis)?;

        let init = if self.check(EbsTokenKind::Semicolon) {
            None
        } else {
            let line = self.line();
            Some(Box::new(Stmt::new(line, self.parse_simple_statement()?)))
        };
        self.expect_semicolon()?;

        let condition = if self.check(EbsTokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression(0)?)
        };
        self.expect_semicolon()?;

        let step = if self.check(EbsTokenKind::RightParenthesis) {
            None
        } else {
            let line = self.line();
            Some(Box::new(Stmt::new(line, self.parse_simple_statement()?)))
        };
        self.expect_closing(EbsTokenKind::RightParenthesis)?;

        let body = self.parse_loop_body(LoopKind::For)?;
        Ok(StmtKind::For(ForStmt {
            init,
            condition,
            step,
            body,
        }))
    }

    /// `foreach [var] x in expr body`, optionally with the header in parens
    fn parse_foreach_loop(&mut self) -> ParseResult<StmtKind> {
        self.expect(EbsTokenKind::Foreach)?;

        let parenthesized = self.check(EbsTokenKind::LeftParenthesis)
            && (self.peek_kind(2) == EbsTokenKind::In
                || (self.peek_kind(1) == EbsTokenKind::Var
                    && self.peek_kind(3) == EbsTokenKind::In));
        if parenthesized {
            self.consume();
        }

        self.match_token(EbsTokenKind::Var);
        let variable = self.expect_identifier()?;
        self.expect(EbsTokenKind::In)?;
        let iterable = self.parse_expression(0)?;

        if parenthesized {
            self.expect_closing(EbsTokenKind::RightParenthesis)?;
        }

        let body = self.parse_loop_body(LoopKind::Foreach)?;
        Ok(StmtKind::Foreach(ForeachStmt {
            variable,
            iterable,
            body,
        }))
    }

    /// `try {..} exceptions { when KIND [(var)] {..} ... }`; the braces
    /// around the handler list are optional
    fn parse_try_statement(&mut self) -> ParseResult<StmtKind> {
        self.expect(EbsTokenKind::Try)?;
        let body = self.parse_block_body()?;
        self.expect(EbsTokenKind::Exceptions)?;

        let braced = self.match_token(EbsTokenKind::LeftCurlyBrace);
        let mut handlers = Vec::new();
        while self.check(EbsTokenKind::When) {
            handlers.push(self.parse_when_clause()?);
        }
        if braced {
            self.expect_closing(EbsTokenKind::RightCurlyBrace)?;
        }

        if handlers.is_empty() {
            return Err(self.error_here(unexpected_token(
                self.current_token_text(),
                vec!["when"],
            )));
        }

        Ok(StmtKind::Try(TryStmt { body, handlers }))
    }

    fn parse_when_clause(&mut self) -> ParseResult<WhenClause> {
        self.expect(EbsTokenKind::When)?;
        let kind = self.parse_error_kind()?;

        let variable = if self.match_token(EbsTokenKind::LeftParenthesis) {
            let name = self.expect_identifier()?;
            self.expect_closing(EbsTokenKind::RightParenthesis)?;
            Some(name)
        } else {
            None
        };

        let body = self.parse_block_body()?;
        Ok(WhenClause {
            kind,
            variable,
            body,
        })
    }

    fn parse_error_kind(&mut self) -> ParseResult<ErrorKind> {
        let location = self.current_location();
        let name = self.expect_word()?;
        ErrorKind::from_name(&name).ok_or(ParserError {
            kind: ParserErrorKind::UnknownErrorKind(name),
            location,
        })
    }

    /// `raise exception KIND [(message)]`
    fn parse_raise(&mut self) -> ParseResult<StmtKind> {
        self.expect(EbsTokenKind::Raise)?;
        self.expect(EbsTokenKind::Exception)?;
        let kind = self.parse_error_kind()?;

        let message = if self.match_token(EbsTokenKind::LeftParenthesis) {
            let message = if self.check(EbsTokenKind::RightParenthesis) {
                None
            } else {
                Some(self.parse_expression(0)?)
            };
            self.expect_closing(EbsTokenKind::RightParenthesis)?;
            message
        } else {
            None
        };

        Ok(StmtKind::Raise(RaiseStmt { kind, message }))
    }

    // ----- expressions -----

    /// Precedence climbing over the binary tiers
    pub fn parse_expression(&mut self, min_precedence: i32) -> ParseResult<Expr> {
        // deeply nested source grows the stack instead of overflowing it
        stacker::maybe_grow(128 * 1024, 2 * 1024 * 1024, || {
            self.parse_binary(min_precedence)
        })
    }

    fn parse_binary(&mut self, min_precedence: i32) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let op = self.kind();
            let op_precedence = get_precedence(op);
            if op_precedence <= min_precedence {
                break;
            }
            self.consume();

            let next_precedence = if get_associativity(op) {
                op_precedence
            } else {
                op_precedence - 1
            };
            let right = self.parse_expression(next_precedence)?;

            if is_relational(op) && is_relational(self.kind()) {
                let mut operands = vec![left, right];
                let mut ops = vec![op];
                while is_relational(self.kind()) {
                    ops.push(self.consume().kind);
                    operands.push(self.parse_expression(op_precedence)?);
                }
                left = Box::new(ExprKind::ChainComparison(ChainComparison { operands, ops }));
            } else {
                left = Box::new(ExprKind::Binary(Binary { left, op, right }));
            }
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        match self.kind() {
            EbsTokenKind::Minus
            | EbsTokenKind::Plus
            | EbsTokenKind::Exclamation
            | EbsTokenKind::Not
            | EbsTokenKind::Typeof => {
                let op = match self.consume().kind {
                    EbsTokenKind::Not => EbsTokenKind::Exclamation,
                    other => other,
                };
                let operand = self.parse_unary()?;
                Ok(Box::new(ExprKind::Unary(Unary { op, operand })))
            }
            _ => self.parse_power(),
        }
    }

    /// `^` binds tighter than unary operators and groups to the right
    fn parse_power(&mut self) -> ParseResult<Expr> {
        let base = self.parse_primary()?;
        if self.match_token(EbsTokenKind::Caret) {
            let exponent = self.parse_unary()?;
            Ok(Box::new(ExprKind::Binary(Binary {
                left: base,
                op: EbsTokenKind::Caret,
                right: exponent,
            })))
        } else {
            Ok(base)
        }
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let base = self.parse_primary_base()?;
        self.parse_postfix(base)
    }

    fn parse_primary_base(&mut self) -> ParseResult<Expr> {
        let kind = self.kind();
        let literal = match kind {
            EbsTokenKind::LiteralInt => Literal::Int(self.parse_number_text()?),
            EbsTokenKind::LiteralLong => Literal::Long(self.parse_number_text()?),
            EbsTokenKind::LiteralFloat => Literal::Float(self.parse_number_text()?),
            EbsTokenKind::LiteralDouble => Literal::Double(self.parse_number_text()?),
            EbsTokenKind::LiteralString => Literal::String(self.consume().lexeme().to_string()),
            EbsTokenKind::LiteralDate => {
                let text = self.consume().lexeme().to_string();
                match parse_date(&text) {
                    Some(date) => Literal::Date(date),
                    None => Literal::String(text),
                }
            }
            EbsTokenKind::True => {
                self.consume();
                Literal::Bool(true)
            }
            EbsTokenKind::False => {
                self.consume();
                Literal::Bool(false)
            }
            EbsTokenKind::Null => {
                self.consume();
                Literal::Null
            }
            EbsTokenKind::LeftParenthesis => {
                self.consume();
                let expression = self.parse_expression(0)?;
                self.expect_closing(EbsTokenKind::RightParenthesis)?;
                return Ok(Box::new(ExprKind::Grouping(Grouping { expression })));
            }
            EbsTokenKind::LeftSquareBracket => return self.parse_array_literal(),
            EbsTokenKind::LeftCurlyBrace => return self.parse_brace_literal(),
            EbsTokenKind::Identifier => {
                let name = self.consume().lexeme().to_string();
                return Ok(Box::new(ExprKind::VarRef(VarRef { name })));
            }
            k if k.is_type_name() && self.peek_kind(1) == EbsTokenKind::LeftParenthesis => {
                return self.parse_cast();
            }
            // namespace of a qualified builtin such as `string.toupper(...)`
            k if k.is_type_name() && self.peek_kind(1) == EbsTokenKind::Dot => {
                let name = self.consume().lexeme().to_string();
                return Ok(Box::new(ExprKind::VarRef(VarRef { name })));
            }
            EbsTokenKind::Eof => {
                return Err(self.error_here(ParserErrorKind::UnexpectedEndOfInput));
            }
            _ => {
                return Err(self.error_here(unexpected_token(
                    self.current_token_text(),
                    vec!["expression"],
                )))
            }
        };
        Ok(Box::new(ExprKind::Literal(literal)))
    }

    /// `int(x)`: a type keyword applied to one expression
    fn parse_cast(&mut self) -> ParseResult<Expr> {
        let target = self.parse_type_expr()?;
        self.expect(EbsTokenKind::LeftParenthesis)?;
        let value = self.parse_expression(0)?;
        self.expect_closing(EbsTokenKind::RightParenthesis)?;
        trace!(target: TARGET, to = %target, "Cast");
        Ok(Box::new(ExprKind::Cast(Cast { target, value })))
    }

    fn parse_number_text<T: std::str::FromStr>(&mut self) -> ParseResult<T> {
        let location = self.current_location();
        let text = self.consume().lexeme().to_string();
        text.parse::<T>().map_err(|_| ParserError {
            kind: ParserErrorKind::InvalidNumberFormat(text),
            location,
        })
    }

    /// `.member`, `[i, j]` and calls on a (possibly dotted) name
    fn parse_postfix(&mut self, mut expr: Expr) -> ParseResult<Expr> {
        loop {
            match self.kind() {
                EbsTokenKind::Dot => {
                    self.consume();
                    let member = self.expect_word()?;
                    expr = Box::new(ExprKind::MemberAccess(MemberAccess {
                        object: expr,
                        member,
                    }));
                }
                EbsTokenKind::LeftSquareBracket => {
                    self.consume();
                    let mut indices = vec![self.parse_expression(0)?];
                    while self.match_token(EbsTokenKind::Comma) {
                        indices.push(self.parse_expression(0)?);
                    }
                    self.expect_closing(EbsTokenKind::RightSquareBracket)?;
                    expr = Box::new(ExprKind::IndexAccess(IndexAccess {
                        object: expr,
                        indices,
                    }));
                }
                EbsTokenKind::LeftParenthesis => {
                    let Some(name) = expr.qualified_name() else {
                        break;
                    };
                    self.consume();
                    let arguments = self.parse_arguments()?;
                    expr = Box::new(ExprKind::FunctionCall(FunctionCall { name, arguments }));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// After `(`: positional and `name = value` arguments
    fn parse_arguments(&mut self) -> ParseResult<Vec<CallArg>> {
        let mut arguments = Vec::new();
        if self.match_token(EbsTokenKind::RightParenthesis) {
            return Ok(arguments);
        }

        loop {
            let name = if self.kind().is_word() && self.peek_kind(1) == EbsTokenKind::Equal {
                let name = self.consume().lexeme().to_string();
                self.consume();
                Some(name)
            } else {
                None
            };
            let value = self.parse_expression(0)?;
            arguments.push(CallArg { name, value });

            if !self.match_token(EbsTokenKind::Comma) {
                break;
            }
        }

        self.expect_closing(EbsTokenKind::RightParenthesis)?;
        Ok(arguments)
    }

    fn parse_array_literal(&mut self) -> ParseResult<Expr> {
        self.expect(EbsTokenKind::LeftSquareBracket)?;
        let elements = self.parse_element_list(EbsTokenKind::RightSquareBracket)?;
        Ok(Box::new(ExprKind::ArrayLiteral(ArrayLiteral { elements })))
    }

    /// Comma separated expressions up to `close`; a trailing comma is allowed
    fn parse_element_list(&mut self, close: EbsTokenKind) -> ParseResult<Vec<Expr>> {
        let mut elements = Vec::new();
        while !self.check(close) && !self.is_at_end() {
            elements.push(self.parse_expression(0)?);
            if !self.match_token(EbsTokenKind::Comma) {
                break;
            }
        }
        self.expect_closing(close)?;
        Ok(elements)
    }

    /// `{}` and `{"k": v, ...}` are JSON objects, `{a, b}` is an array
    fn parse_brace_literal(&mut self) -> ParseResult<Expr> {
        self.expect(EbsTokenKind::LeftCurlyBrace)?;

        if self.match_token(EbsTokenKind::RightCurlyBrace) {
            return Ok(Box::new(ExprKind::JsonLiteral(JsonLiteral {
                entries: Vec::new(),
            })));
        }

        let keyed = (self.kind().is_word()
            || matches!(
                self.kind(),
                EbsTokenKind::LiteralString | EbsTokenKind::LiteralDate
            ))
            && self.peek_kind(1) == EbsTokenKind::Colon;

        if !keyed {
            let elements = self.parse_element_list(EbsTokenKind::RightCurlyBrace)?;
            return Ok(Box::new(ExprKind::ArrayLiteral(ArrayLiteral { elements })));
        }

        let mut entries: Vec<(String, Expr)> = Vec::new();
        while !self.check(EbsTokenKind::RightCurlyBrace) && !self.is_at_end() {
            let key = match self.kind() {
                EbsTokenKind::LiteralString | EbsTokenKind::LiteralDate => {
                    self.consume().lexeme().to_string()
                }
                k if k.is_word() => self.consume().lexeme().to_string(),
                _ => {
                    return Err(self.error_here(unexpected_token(
                        self.current_token_text(),
                        vec!["string", "identifier"],
                    )))
                }
            };
            self.expect(EbsTokenKind::Colon)?;
            let value = self.parse_expression(0)?;
            entries.push((key, value));

            if !self.match_token(EbsTokenKind::Comma) {
                break;
            }
        }
        self.expect_closing(EbsTokenKind::RightCurlyBrace)?;

        Ok(Box::new(ExprKind::JsonLiteral(JsonLiteral { entries })))
    }
}
