//! # Query Parser
//!
//! Recursive descent over clauses, Pratt parsing for expressions. Clause
//! keywords are ordinary words; whether a word is an alias or the start of
//! the next clause is decided with fixed stop-word sets:
//!
//! | Set | Words |
//! |-----|-------|
//! | [`JOURNAL_ALIAS_STOP`] | where latest join inner outer asof cross sample order on timestamp limit `)` `;` |
//! | [`COLUMN_ALIAS_STOP`] | from `,` over |
//!
//! ## Grammar
//!
//! ```text
//! query  := [select column {, column} from] source {join} [where e]
//!           [sample by e] [order by name [asc|desc] {, ...}] [limit e [, e]]
//! column := e [alias] [over ( [partition by e {, e}] [order by e [asc|desc] {, ...}] )]
//! source := ( '(' query ')' | journal ) [alias] [timestamp ( e )] [latest by e]
//! join   := (join | inner join | outer join | cross join | asof join) source-without-latest [on e]
//!
//! create journal name ( col TYPE [index [buckets N]] {, ...} )
//!        [timestamp ( col )] [partition by NONE|DAY|MONTH|YEAR]
//! ```
//!
//! Expressions and sub-queries nest at most `MAX_NESTING_DEPTH` levels.
//!
//! ## Expression Precedence
//!
//! | Binding | Operators |
//! |---------|-----------|
//! | 1 (lowest) | `or` |
//! | 2 | `and` |
//! | 3 | `not` (prefix) |
//! | 4 | `= != <> < <= > >= ~ in` |
//! | 5 | `+ -` |
//! | 6 | `* / %` |
//! | 7 | unary `-` |
//! | 8 (highest) | names, constants, `f(..)`, `( e )` |
//!
//! ## Errors
//!
//! Every failure is a [`ParseError`] carrying the byte offset of the token
//! that could not be accepted, or the input length when the query ended
//! early.

use std::fmt;

use bumpalo::Bump;
use eyre::Result;
use phf::{phf_map, phf_set};

use super::ast::*;
use super::lexer::Lexer;
use super::token::{Span, Token};
use crate::config::{MAX_NESTING_DEPTH, MAX_ORDER_BY_COLUMNS};
use crate::storage::PartitionBy;
use crate::types::ColumnType;

/// Words and punctuation that end a journal reference instead of aliasing it.
pub static JOURNAL_ALIAS_STOP: phf::Set<&'static str> = phf_set! {
    "where", "latest", "join", "inner", "outer", "asof", "cross", "sample",
    "order", "on", "timestamp", "limit", ")", ";",
};

/// Words and punctuation that end a select column instead of aliasing it.
pub static COLUMN_ALIAS_STOP: phf::Set<&'static str> = phf_set! {
    "from", ",", "over",
};

static JOIN_START: phf::Map<&'static str, JoinType> = phf_map! {
    "join" => JoinType::Inner,
    "inner" => JoinType::Inner,
    "outer" => JoinType::Outer,
    "cross" => JoinType::Cross,
    "asof" => JoinType::Asof,
};

/// Words that never start an expression.
static RESERVED: phf::Set<&'static str> = phf_set! {
    "select", "from", "where", "order", "limit", "join", "inner", "outer",
    "cross", "asof", "on", "over", "sample", "latest", "by", "partition",
    "and", "or", "in", "asc", "desc",
};

const NOT_BP: u8 = 6;
const UNARY_MINUS_BP: u8 = 14;

/// Parse failure at a byte offset of the query text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub position: usize,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at position {}", self.message, self.position)
    }
}

impl std::error::Error for ParseError {}

fn in_set(set: &phf::Set<&'static str>, token: &Token<'_>) -> bool {
    match token {
        Token::Ident(word) => set.contains(word.to_ascii_lowercase().as_str()),
        Token::RParen | Token::Comma | Token::Semicolon => set.contains(token.text()),
        _ => false,
    }
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    arena: &'a Bump,
    current: Token<'a>,
    span: Span,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str, arena: &'a Bump) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        let span = lexer.span();
        Self {
            lexer,
            arena,
            current,
            span,
            depth: 0,
        }
    }

    /// Parses one statement, optionally followed by `;`.
    pub fn parse_statement(&mut self) -> Result<Statement<'a>> {
        self.check_current()?;
        let statement = if self.current.is_word("create") {
            self.advance()?;
            Statement::CreateJournal(self.parse_create()?)
        } else {
            Statement::Query(self.parse_query()?)
        };

        if matches!(self.current, Token::Semicolon) {
            self.advance()?;
        }
        if !self.current.is_eof() {
            return Err(self.unexpected());
        }
        Ok(statement)
    }

    // ------------------------------------------------------------------
    // token helpers
    // ------------------------------------------------------------------

    fn position(&self) -> usize {
        if self.current.is_eof() {
            self.lexer.input().len()
        } else {
            self.span.start
        }
    }

    fn error_at(&self, position: usize, message: impl Into<String>) -> eyre::Report {
        ParseError {
            position,
            message: message.into(),
        }
        .into()
    }

    fn error(&self, message: impl Into<String>) -> eyre::Report {
        self.error_at(self.position(), message)
    }

    fn unexpected(&self) -> eyre::Report {
        match self.current {
            Token::Eof => self.error("Unexpected end of input"),
            token => self.error(format!("Unexpected token: {}", token)),
        }
    }

    fn check_current(&self) -> Result<()> {
        match self.current {
            Token::Error(message) => Err(self.error(message)),
            _ => Ok(()),
        }
    }

    fn advance(&mut self) -> Result<Token<'a>> {
        let next = self.lexer.next_token();
        self.span = self.lexer.span();
        let previous = std::mem::replace(&mut self.current, next);
        self.check_current()?;
        Ok(previous)
    }

    /// Fails with "Unexpected end of input" when the query has ended.
    fn require_more(&self) -> Result<()> {
        if self.current.is_eof() {
            return Err(self.error("Unexpected end of input"));
        }
        Ok(())
    }

    fn expect_word(&mut self, word: &str) -> Result<()> {
        self.require_more()?;
        if !self.current.is_word(word) {
            return Err(self.error(format!("'{}' expected", word)));
        }
        self.advance()?;
        Ok(())
    }

    fn expect_token(&mut self, token: Token<'static>) -> Result<()> {
        self.require_more()?;
        if self.current != token {
            return Err(self.error(format!("'{}' expected", token.text())));
        }
        self.advance()?;
        Ok(())
    }

    /// Strips the delimiters of a quoted token and collapses doubled quotes.
    fn unquote(&self, raw: &'a str) -> &'a str {
        let Some(quote) = raw.chars().next() else {
            return raw;
        };
        let inner = &raw[1..raw.len() - 1];
        let doubled: &str = if quote == '\'' { "''" } else { "\"\"" };
        if inner.contains(doubled) {
            self.arena.alloc_str(&inner.replace(doubled, &doubled[..1]))
        } else {
            inner
        }
    }

    /// A bare or quoted name.
    fn name(&mut self) -> Result<Option<&'a str>> {
        match self.current {
            Token::Ident(word) => {
                self.advance()?;
                Ok(Some(word))
            }
            Token::Str(raw) => {
                self.advance()?;
                Ok(Some(self.unquote(raw)))
            }
            _ => Ok(None),
        }
    }

    fn alias(&mut self, stop: &phf::Set<&'static str>) -> Result<Option<&'a str>> {
        if in_set(stop, &self.current) {
            return Ok(None);
        }
        self.name()
    }

    fn node(
        &self,
        node_type: ExprNodeType,
        token: &'a str,
        args: &[&'a ExprNode<'a>],
        position: usize,
    ) -> &'a ExprNode<'a> {
        self.arena.alloc(ExprNode {
            node_type,
            token,
            args: self.arena.alloc_slice_copy(args),
            position,
        })
    }

    // ------------------------------------------------------------------
    // queries
    // ------------------------------------------------------------------

    fn parse_query(&mut self) -> Result<QueryModel<'a>> {
        let mut model = QueryModel::default();

        if self.current.is_word("select") {
            self.advance()?;
            self.parse_select_columns(&mut model)?;
        }

        self.parse_source(&mut model)?;
        if self.current.is_word("latest") {
            self.advance()?;
            self.expect_word("by")?;
            model.latest_by = Some(self.expect_expr()?);
        }

        while let Some(join_type) = self.join_start() {
            let join = self.parse_join(join_type)?;
            model.joins.push(join);
        }

        if self.current.is_word("where") {
            self.advance()?;
            model.where_clause = Some(self.expect_expr()?);
        }

        if self.current.is_word("sample") {
            self.advance()?;
            self.expect_word("by")?;
            model.sample_by = Some(self.expect_expr()?);
        }

        if self.current.is_word("order") {
            self.advance()?;
            self.expect_word("by")?;
            self.parse_order_by(&mut model)?;
        }

        if self.current.is_word("limit") {
            self.advance()?;
            let lo = self.expect_expr()?;
            let hi = if matches!(self.current, Token::Comma) {
                self.advance()?;
                Some(self.expect_expr()?)
            } else {
                None
            };
            model.limit = Some((lo, hi));
        }

        Ok(model)
    }

    fn parse_select_columns(&mut self, model: &mut QueryModel<'a>) -> Result<()> {
        loop {
            let expr = self.expect_expr()?;
            let alias = self.alias(&COLUMN_ALIAS_STOP)?;
            let analytic = if self.current.is_word("over") {
                self.advance()?;
                Some(self.parse_over()?)
            } else {
                None
            };
            model.columns.push(QueryColumn {
                expr,
                alias,
                analytic,
            });

            self.require_more()?;
            if self.current.is_word("from") {
                self.advance()?;
                return Ok(());
            }
            if !matches!(self.current, Token::Comma) {
                return Err(self.error("',' or 'from' expected"));
            }
            self.advance()?;
        }
    }

    fn parse_over(&mut self) -> Result<AnalyticSpec<'a>> {
        self.expect_token(Token::LParen)?;
        let mut over = AnalyticSpec::default();

        if self.current.is_word("partition") {
            self.advance()?;
            self.expect_word("by")?;
            loop {
                over.partition_by.push(self.expect_expr()?);
                if !matches!(self.current, Token::Comma) {
                    break;
                }
                self.advance()?;
            }
        }

        if self.current.is_word("order") {
            self.advance()?;
            self.expect_word("by")?;
            loop {
                let expr = self.expect_expr()?;
                let direction = self.direction()?;
                over.order_by.push((expr, direction));
                if !matches!(self.current, Token::Comma) {
                    break;
                }
                self.advance()?;
            }
        }

        self.expect_token(Token::RParen)?;
        Ok(over)
    }

    fn direction(&mut self) -> Result<Direction> {
        if self.current.is_word("desc") {
            self.advance()?;
            Ok(Direction::Desc)
        } else {
            if self.current.is_word("asc") {
                self.advance()?;
            }
            Ok(Direction::Asc)
        }
    }

    /// `( query ) | journal`, then alias and `timestamp(col)`.
    fn parse_source(&mut self, model: &mut QueryModel<'a>) -> Result<()> {
        self.require_more()?;
        if matches!(self.current, Token::LParen) {
            self.advance()?;
            self.enter()?;
            let nested = self.parse_query();
            self.depth -= 1;
            model.nested = Some(Box::new(nested?));
            self.expect_token(Token::RParen)?;
        } else {
            let position = self.position();
            let Some(name) = self.name()? else {
                return Err(self.unexpected());
            };
            model.journal_name = Some(self.node(ExprNodeType::Literal, name, &[], position));
        }

        model.alias = self.alias(&JOURNAL_ALIAS_STOP)?;

        if self.current.is_word("timestamp") {
            self.advance()?;
            self.expect_token(Token::LParen)?;
            model.timestamp = Some(self.expect_expr()?);
            self.expect_token(Token::RParen)?;
        }
        Ok(())
    }

    fn join_start(&self) -> Option<JoinType> {
        match self.current {
            Token::Ident(word) => JOIN_START.get(word.to_ascii_lowercase().as_str()).copied(),
            _ => None,
        }
    }

    fn parse_join(&mut self, join_type: JoinType) -> Result<JoinModel<'a>> {
        let first = self.advance()?;
        if !first.is_word("join") {
            self.expect_word("join")?;
        }

        let mut model = QueryModel::default();
        self.parse_source(&mut model)?;

        let criteria = match join_type {
            JoinType::Cross => {
                if self.current.is_word("on") {
                    return Err(self.error("Cross joins cannot have join clauses"));
                }
                None
            }
            JoinType::Asof => {
                if self.current.is_word("on") {
                    self.advance()?;
                    Some(self.expect_expr()?)
                } else {
                    None
                }
            }
            JoinType::Inner | JoinType::Outer => {
                self.expect_word("on")?;
                Some(self.expect_expr()?)
            }
        };

        Ok(JoinModel {
            join_type,
            model,
            criteria,
        })
    }

    fn parse_order_by(&mut self, model: &mut QueryModel<'a>) -> Result<()> {
        loop {
            let expr = self.expect_expr()?;
            if !expr.is_literal() {
                return Err(self.error_at(expr.position, "Column name expected"));
            }
            let direction = self.direction()?;
            if model.order_by.len() >= MAX_ORDER_BY_COLUMNS {
                return Err(self.error_at(expr.position, "Too many columns"));
            }
            model.order_by.push((expr, direction));

            if !matches!(self.current, Token::Comma) {
                return Ok(());
            }
            self.advance()?;
        }
    }

    // ------------------------------------------------------------------
    // create journal
    // ------------------------------------------------------------------

    fn parse_create(&mut self) -> Result<JournalStructure<'a>> {
        self.require_more()?;
        if !self.current.is_word("journal") {
            return Err(self.error("journal expected"));
        }
        self.advance()?;

        self.require_more()?;
        let Some(name) = self.name()? else {
            return Err(self.unexpected());
        };
        let mut structure = JournalStructure {
            name,
            columns: Vec::new(),
            timestamp: None,
            partition_by: PartitionBy::None,
        };

        self.expect_token(Token::LParen)?;
        loop {
            let column_name = self.column_definition_word()?;
            let type_position = self.position();
            let type_name = self.column_definition_word()?;
            let Some(column_type) = ColumnType::from_name(type_name) else {
                return Err(self.error_at(type_position, "Unsupported type"));
            };

            let mut column = ColumnStructure {
                name: column_name,
                column_type,
                indexed: false,
                buckets: None,
            };
            if self.current.is_word("index") {
                self.advance()?;
                column.indexed = true;
                if self.current.is_word("buckets") {
                    self.advance()?;
                    column.buckets = Some(self.bucket_count()?);
                }
            }
            structure.columns.push(column);

            self.require_more()?;
            match self.current {
                Token::RParen => {
                    self.advance()?;
                    break;
                }
                Token::Comma => {
                    self.advance()?;
                }
                _ => return Err(self.error("',' or ')' expected")),
            }
        }

        if self.current.is_word("timestamp") {
            self.advance()?;
            self.expect_token(Token::LParen)?;
            self.require_more()?;
            let Some(column) = self.name()? else {
                return Err(self.error("Column name expected"));
            };
            structure.timestamp = Some(column);
            self.expect_token(Token::RParen)?;
        }

        if self.current.is_word("partition") {
            self.advance()?;
            self.expect_word("by")?;
            self.require_more()?;
            let position = self.position();
            let text = self.current.text();
            let Some(partition_by) = PartitionBy::from_name(text) else {
                return Err(self.error_at(position, format!("Unsupported partition type: {}", text)));
            };
            self.advance()?;
            structure.partition_by = partition_by;
        }

        Ok(structure)
    }

    /// A name or type word inside a column list; `,` or `)` here means the
    /// definition is incomplete.
    fn column_definition_word(&mut self) -> Result<&'a str> {
        self.require_more()?;
        if matches!(self.current, Token::Comma | Token::RParen) {
            return Err(self.error("Invalid column definition"));
        }
        match self.name()? {
            Some(word) => Ok(word),
            None => Err(self.error("Invalid column definition")),
        }
    }

    fn bucket_count(&mut self) -> Result<usize> {
        self.require_more()?;
        let parsed = match self.current {
            Token::Integer(digits) => digits.parse::<usize>().ok(),
            _ => None,
        };
        match parsed {
            Some(buckets) => {
                self.advance()?;
                Ok(buckets)
            }
            None => Err(self.error("Number of buckets expected")),
        }
    }

    // ------------------------------------------------------------------
    // expressions
    // ------------------------------------------------------------------

    fn expect_expr(&mut self) -> Result<&'a ExprNode<'a>> {
        match self.parse_expr(0)? {
            Some(expr) => Ok(expr),
            None => Err(self.error("Expression expected")),
        }
    }

    /// Returns `None`, consuming nothing, when the current token cannot
    /// start an expression.
    fn parse_expr(&mut self, min_bp: u8) -> Result<Option<&'a ExprNode<'a>>> {
        self.enter()?;
        let expr = self.parse_expr_bp(min_bp);
        self.depth -= 1;
        expr
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(self.error("Too deeply nested"));
        }
        Ok(())
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Option<&'a ExprNode<'a>>> {
        let Some(mut lhs) = self.parse_prefix()? else {
            return Ok(None);
        };

        loop {
            let (op, l_bp, r_bp): (&'a str, u8, u8) = match self.current {
                Token::Op(op) => match op {
                    "=" | "!=" | "<>" | "<" | "<=" | ">" | ">=" | "~" => (op, 8, 9),
                    "+" | "-" => (op, 10, 11),
                    "*" | "/" | "%" => (op, 12, 13),
                    _ => break,
                },
                Token::Ident(word) if word.eq_ignore_ascii_case("or") => ("or", 2, 3),
                Token::Ident(word) if word.eq_ignore_ascii_case("and") => ("and", 4, 5),
                Token::Ident(word) if word.eq_ignore_ascii_case("in") => ("in", 8, 9),
                _ => break,
            };
            if l_bp < min_bp {
                break;
            }

            let position = lhs.position;
            self.advance()?;

            if op == "in" {
                self.expect_token(Token::LParen)?;
                let mut args = vec![lhs];
                loop {
                    args.push(self.expect_expr()?);
                    if !matches!(self.current, Token::Comma) {
                        break;
                    }
                    self.advance()?;
                }
                self.expect_token(Token::RParen)?;
                lhs = self.node(ExprNodeType::Operation, op, &args, position);
                continue;
            }

            let Some(rhs) = self.parse_expr(r_bp)? else {
                return Err(self.error("Expression expected"));
            };
            lhs = self.node(ExprNodeType::Operation, op, &[lhs, rhs], position);
        }

        Ok(Some(lhs))
    }

    fn parse_prefix(&mut self) -> Result<Option<&'a ExprNode<'a>>> {
        let position = self.span.start;
        let node = match self.current {
            Token::Ident(word) if word.eq_ignore_ascii_case("not") => {
                self.advance()?;
                let Some(operand) = self.parse_expr(NOT_BP)? else {
                    return Err(self.error("Expression expected"));
                };
                self.node(ExprNodeType::Operation, "not", &[operand], position)
            }
            Token::Ident(word) => {
                let lower = word.to_ascii_lowercase();
                if RESERVED.contains(lower.as_str()) {
                    return Ok(None);
                }
                if matches!(lower.as_str(), "null" | "true" | "false") {
                    self.advance()?;
                    self.node(ExprNodeType::Constant, word, &[], position)
                } else {
                    let name = self.dotted_name()?;
                    if matches!(self.current, Token::LParen) {
                        self.advance()?;
                        let args = self.call_arguments()?;
                        self.node(ExprNodeType::Function, name, &args, position)
                    } else {
                        self.node(ExprNodeType::Literal, name, &[], position)
                    }
                }
            }
            Token::Str(raw) | Token::Integer(raw) | Token::Float(raw) => {
                self.advance()?;
                self.node(ExprNodeType::Constant, raw, &[], position)
            }
            Token::Op("-") => {
                self.advance()?;
                let Some(operand) = self.parse_expr(UNARY_MINUS_BP)? else {
                    return Err(self.error("Expression expected"));
                };
                self.node(ExprNodeType::Operation, "-", &[operand], position)
            }
            Token::Op("*") => {
                self.advance()?;
                self.node(ExprNodeType::Literal, "*", &[], position)
            }
            Token::LParen => {
                self.advance()?;
                let inner = self.expect_expr()?;
                self.expect_token(Token::RParen)?;
                inner
            }
            _ => return Ok(None),
        };
        Ok(Some(node))
    }

    /// `a.b.c` with no whitespace around the dots, as one slice of input.
    fn dotted_name(&mut self) -> Result<&'a str> {
        let input = self.lexer.input();
        let start = self.span.start;
        let mut end = self.span.end();
        self.advance()?;

        while matches!(self.current, Token::Dot) && self.span.start == end {
            let next = input.as_bytes().get(self.span.end()).copied();
            if !next.is_some_and(|b| b.is_ascii_alphabetic() || b == b'_') {
                break;
            }
            self.advance()?;
            end = self.span.end();
            self.advance()?;
        }
        Ok(&input[start..end])
    }

    fn call_arguments(&mut self) -> Result<Vec<&'a ExprNode<'a>>> {
        let mut args = Vec::new();
        if matches!(self.current, Token::RParen) {
            self.advance()?;
            return Ok(args);
        }
        loop {
            args.push(self.expect_expr()?);
            self.require_more()?;
            match self.current {
                Token::Comma => {
                    self.advance()?;
                }
                Token::RParen => {
                    self.advance()?;
                    return Ok(args);
                }
                _ => return Err(self.error("')' expected")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse<'a>(text: &'a str, arena: &'a Bump) -> Result<Statement<'a>> {
        Parser::new(text, arena).parse_statement()
    }

    fn query<'a>(text: &'a str, arena: &'a Bump) -> QueryModel<'a> {
        match parse(text, arena).unwrap() {
            Statement::Query(model) => model,
            other => panic!("expected query, got {:?}", other),
        }
    }

    fn error(text: &str) -> ParseError {
        let arena = Bump::new();
        let report = parse(text, &arena).unwrap_err();
        report.downcast_ref::<ParseError>().unwrap().clone()
    }

    #[test]
    fn select_is_optional() {
        let arena = Bump::new();
        let model = query("trades where price > 10", &arena);
        assert!(model.columns.is_empty());
        assert_eq!(model.journal(), Some("trades"));
        assert_eq!(model.where_clause.unwrap().to_string(), "(price > 10)");
    }

    #[test]
    fn precedence_of_arithmetic_and_logic() {
        let arena = Bump::new();
        let model = query("t where a + b * 2 > 3 and not c = 1 or d ~ 'x.*'", &arena);
        assert_eq!(
            model.where_clause.unwrap().to_string(),
            "((((a + (b * 2)) > 3) and not (c = 1)) or (d ~ 'x.*'))"
        );
    }

    #[test]
    fn unary_minus_and_parentheses() {
        let arena = Bump::new();
        let model = query("t where -(a - 1) * 2 < -3", &arena);
        assert_eq!(
            model.where_clause.unwrap().to_string(),
            "((-(a - 1) * 2) < -3)"
        );
    }

    #[test]
    fn in_list() {
        let arena = Bump::new();
        let model = query("t where sym in ('A', 'B') and x = 1", &arena);
        let clause = model.where_clause.unwrap();
        assert_eq!(clause.to_string(), "((sym in ('A', 'B')) and (x = 1))");
        assert_eq!(clause.lhs().unwrap().args.len(), 3);
    }

    #[test]
    fn function_calls_and_star() {
        let arena = Bump::new();
        let model = query("select count(*), sum(a.price) total, now() from t a", &arena);
        assert_eq!(model.columns.len(), 3);
        assert_eq!(model.columns[0].expr.node_type, ExprNodeType::Function);
        assert_eq!(model.columns[0].expr.to_string(), "count(*)");
        assert_eq!(model.columns[1].expr.to_string(), "sum(a.price)");
        assert_eq!(model.columns[1].alias, Some("total"));
        assert!(model.columns[2].expr.args.is_empty());
        assert_eq!(model.alias, Some("a"));
    }

    #[test]
    fn column_aliases_and_analytic_clause() {
        let arena = Bump::new();
        let model = query(
            "select sym, prev(price) p over (partition by sym order by ts desc, id) from quotes",
            &arena,
        );
        assert_eq!(model.columns[0].alias, None);
        assert!(model.columns[0].analytic.is_none());

        let column = &model.columns[1];
        assert_eq!(column.alias, Some("p"));
        let analytic = column.analytic.as_ref().unwrap();
        assert_eq!(analytic.partition_by.len(), 1);
        assert_eq!(analytic.partition_by[0].token, "sym");
        assert_eq!(analytic.order_by.len(), 2);
        assert_eq!(analytic.order_by[0].1, Direction::Desc);
        assert_eq!(analytic.order_by[1].1, Direction::Asc);
    }

    #[test]
    fn nested_query_with_alias_and_timestamp() {
        let arena = Bump::new();
        let model = query(
            "select x from (select x, ts from t where x > 0) n timestamp(ts) order by x",
            &arena,
        );
        assert_eq!(model.journal(), None);
        assert_eq!(model.alias, Some("n"));
        assert_eq!(model.timestamp.unwrap().token, "ts");
        let nested = model.nested.as_ref().unwrap();
        assert_eq!(nested.journal(), Some("t"));
        assert_eq!(nested.columns.len(), 2);
        assert!(nested.where_clause.is_some());
        assert_eq!(model.order_by.len(), 1);
    }

    #[test]
    fn latest_by_and_sample_by() {
        let arena = Bump::new();
        let model = query("quotes timestamp(ts) latest by sym sample by 1h", &arena);
        assert_eq!(model.timestamp.unwrap().token, "ts");
        assert_eq!(model.latest_by.unwrap().token, "sym");
        let sample = model.sample_by.unwrap();
        assert_eq!(sample.node_type, ExprNodeType::Constant);
        assert_eq!(sample.token, "1h");
    }

    #[test]
    fn limit_with_and_without_upper_bound() {
        let arena = Bump::new();
        let model = query("t limit 5", &arena);
        let (lo, hi) = model.limit.unwrap();
        assert_eq!(lo.token, "5");
        assert!(hi.is_none());

        let model = query("t limit 5, 10;", &arena);
        let (_, hi) = model.limit.unwrap();
        assert_eq!(hi.unwrap().token, "10");
    }

    #[test]
    fn joins_of_every_type() {
        let arena = Bump::new();
        let model = query(
            "select * from a join b on a.x = b.x outer join c on a.y = c.y cross join d asof join e",
            &arena,
        );
        let types: Vec<_> = model.joins.iter().map(|j| j.join_type).collect();
        assert_eq!(
            types,
            vec![JoinType::Inner, JoinType::Outer, JoinType::Cross, JoinType::Asof]
        );
        assert_eq!(model.joins[0].model.journal(), Some("b"));
        assert_eq!(
            model.joins[0].criteria.unwrap().to_string(),
            "(a.x = b.x)"
        );
        assert!(model.joins[2].criteria.is_none());
        assert!(model.joins[3].criteria.is_none());
    }

    #[test]
    fn join_targets_take_aliases_and_nested_queries() {
        let arena = Bump::new();
        let model = query(
            "bands b inner join (albums where genre = 'rock') a on a.band = b.name asof join q on q.s = b.s",
            &arena,
        );
        assert_eq!(model.alias, Some("b"));
        let inner = &model.joins[0];
        assert_eq!(inner.join_type, JoinType::Inner);
        assert_eq!(inner.model.alias, Some("a"));
        assert!(inner.model.nested.is_some());
        assert!(model.joins[1].criteria.is_some());
    }

    #[test]
    fn cross_join_rejects_criteria() {
        let err = error("a cross join b on a.x = b.x");
        assert_eq!(err.message, "Cross joins cannot have join clauses");
        assert_eq!(err.position, 15);
    }

    #[test]
    fn inner_join_requires_criteria() {
        let err = error("a join b where x > 1");
        assert_eq!(err.message, "'on' expected");
        assert_eq!(err.position, 9);

        let err = error("a outer b on x = y");
        assert_eq!(err.message, "'join' expected");
    }

    #[test]
    fn order_by_requires_column_names() {
        let err = error("t order by a + 1");
        assert_eq!(err.message, "Column name expected");
        assert_eq!(err.position, 11);
    }

    #[test]
    fn order_by_column_limit() {
        let columns: Vec<String> = (0..=MAX_ORDER_BY_COLUMNS).map(|i| format!("c{}", i)).collect();
        let at_limit = format!("t order by {}", columns[..MAX_ORDER_BY_COLUMNS].join(","));
        let arena = Bump::new();
        assert_eq!(query(&at_limit, &arena).order_by.len(), MAX_ORDER_BY_COLUMNS);

        let over_limit = format!("t order by {}", columns.join(","));
        assert_eq!(error(&over_limit).message, "Too many columns");
    }

    #[test]
    fn select_columns_need_separator_or_from() {
        let err = error("select a b c from t");
        assert_eq!(err.message, "',' or 'from' expected");
        assert_eq!(err.position, 11);
    }

    #[test]
    fn leftover_tokens_are_rejected() {
        let err = error("t where x = 1 garbage");
        assert_eq!(err.message, "Unexpected token: garbage");
        assert_eq!(err.position, 14);
    }

    #[test]
    fn unclosed_call_and_lexer_errors() {
        let err = error("t where f(a, b");
        assert_eq!(err.message, "Unexpected end of input");
        assert_eq!(err.position, 14);

        let err = error("t where s = 'open");
        assert_eq!(err.message, "Unterminated string");
        assert_eq!(err.position, 12);
    }

    #[test]
    fn nesting_depth_is_capped() {
        let arena = Bump::new();
        let shallow = format!("t where {}a{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(query(&shallow, &arena).where_clause.unwrap().token, "a");

        let deep = format!("t where {}a{}", "(".repeat(200), ")".repeat(200));
        assert_eq!(error(&deep).message, "Too deeply nested");
        let nested = format!("{}t{}", "(".repeat(200), ")".repeat(200));
        assert_eq!(error(&nested).message, "Too deeply nested");
        assert_eq!(error(&format!("t where {}1", "-".repeat(300))).message, "Too deeply nested");
    }

    #[test]
    fn empty_input() {
        let err = error("");
        assert_eq!(err.message, "Unexpected end of input");
        assert_eq!(err.position, 0);
    }

    #[test]
    fn quoted_names_are_unquoted() {
        let arena = Bump::new();
        let model = query("select x 'it''s' from 'my journal'", &arena);
        assert_eq!(model.journal(), Some("my journal"));
        assert_eq!(model.columns[0].alias, Some("it's"));
    }

    #[test]
    fn create_journal_statement() {
        let arena = Bump::new();
        let statement = parse(
            "create journal quotes (sym SYMBOL index buckets 100, price DOUBLE, \
             id INT index, note STRING, ts DATE) timestamp(ts) partition by MONTH",
            &arena,
        )
        .unwrap();
        let Statement::CreateJournal(structure) = statement else {
            panic!("expected create journal");
        };
        assert_eq!(structure.name, "quotes");
        assert_eq!(structure.columns.len(), 5);
        assert!(structure.columns[0].indexed);
        assert_eq!(structure.columns[0].buckets, Some(100));
        assert!(structure.columns[2].indexed);
        assert_eq!(structure.columns[2].buckets, None);
        assert_eq!(structure.timestamp, Some("ts"));
        assert_eq!(structure.partition_by, PartitionBy::Month);

        let metadata = structure.to_metadata().unwrap();
        assert_eq!(metadata.timestamp_index(), Some(4));
        assert_eq!(metadata.column(0).distinct_count_hint(), 100);
        assert!(metadata.column(2).is_indexed());
    }

    #[test]
    fn create_journal_errors() {
        assert_eq!(error("create table t (a INT)").message, "journal expected");
        let err = error("create journal t (a WIDGET)");
        assert_eq!(err.message, "Unsupported type");
        assert_eq!(err.position, 20);
        assert_eq!(error("create journal t (a INT,)").message, "Invalid column definition");
        assert_eq!(error("create journal t (a)").message, "Invalid column definition");
        assert_eq!(error("create journal t (a INT").message, "Unexpected end of input");
        assert_eq!(
            error("create journal t (a INT index buckets x)").message,
            "Number of buckets expected"
        );
        assert_eq!(
            error("create journal t (a INT) partition by WEEK").message,
            "Unsupported partition type: WEEK"
        );
    }
}
