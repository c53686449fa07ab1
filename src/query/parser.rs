//! Recursive-descent parser for single statements.

use crate::storage::{Node, Triple};

use super::ast::{Projection, SelectStatement, Statement, Term, TriplePattern, Var};
use super::errors::{Span, SyntaxError};
use super::lexer::{tokenize, Token, TokenKind};

/// Parses one statement. Trailing input is an error.
pub fn parse_statement(input: &str) -> Result<Statement, SyntaxError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(&tokens, input.len());
    let statement = parser.statement()?;
    parser.expect_end()?;
    Ok(statement)
}

/// Parses a single `(s, p, o)` made only of constants.
///
/// Used for seed files, where a readable message is all the caller needs.
pub fn parse_ground_triple(input: &str) -> Result<Triple, String> {
    let tokens = tokenize(input).map_err(|err| err.to_string())?;
    let mut parser = Parser::new(&tokens, input.len());
    let pattern = parser.triple().map_err(|err| err.to_string())?;
    parser.expect_end().map_err(|err| err.to_string())?;
    let ground = |term: Term| match term {
        Term::Node(node) => Ok(node),
        Term::Var(Var(name)) => Err(format!("variable ?{name} not allowed in seed data")),
        Term::Anonymous => Err("wildcard ? not allowed in seed data".to_string()),
    };
    Ok(Triple {
        subject: ground(pattern.subject)?,
        predicate: ground(pattern.predicate)?,
        object: ground(pattern.object)?,
    })
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    input_len: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token], input_len: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            input_len,
        }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eof_span(&self) -> Span {
        Span::new(self.input_len, self.input_len)
    }

    fn error_here(&self, expected: &str) -> SyntaxError {
        match self.peek() {
            Some(token) => SyntaxError::new(
                format!("expected {expected}, found {}", describe(token)),
                token.span,
            ),
            None => SyntaxError::new(
                format!("expected {expected}, found end of statement"),
                self.eof_span(),
            ),
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().is_some_and(|t| &t.kind == kind) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<&'t Token, SyntaxError> {
        match self.peek() {
            Some(token) if &token.kind == kind => {
                self.pos += 1;
                Ok(token)
            }
            _ => Err(self.error_here(expected)),
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_keyword(keyword)) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), SyntaxError> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error_here(keyword))
        }
    }

    fn expect_end(&self) -> Result<(), SyntaxError> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.error_here("end of statement")),
        }
    }

    fn statement(&mut self) -> Result<Statement, SyntaxError> {
        if self.eat_keyword("INSERT") {
            return Ok(Statement::Insert(self.triple_list()?));
        }
        if self.eat_keyword("DELETE") {
            return Ok(Statement::Delete(self.triple_list()?));
        }
        if self.eat_keyword("SELECT") {
            return self.select().map(Statement::Select);
        }
        Err(self.error_here("INSERT, DELETE or SELECT"))
    }

    fn select(&mut self) -> Result<SelectStatement, SyntaxError> {
        let distinct = self.eat_keyword("DISTINCT");
        let projection = if self.eat(&TokenKind::Star) {
            Projection::All
        } else {
            let mut vars = vec![self.var()?];
            while self.eat(&TokenKind::Comma) {
                vars.push(self.var()?);
            }
            Projection::Vars(vars)
        };
        self.expect_keyword("WHERE")?;
        let patterns = self.triple_list()?;
        let limit = if self.eat_keyword("LIMIT") {
            Some(self.limit()?)
        } else {
            None
        };
        Ok(SelectStatement {
            distinct,
            projection,
            patterns,
            limit,
        })
    }

    fn var(&mut self) -> Result<Var, SyntaxError> {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Var(name)) => {
                self.pos += 1;
                Ok(Var(name.clone()))
            }
            _ => Err(self.error_here("a variable such as ?x or *")),
        }
    }

    fn limit(&mut self) -> Result<usize, SyntaxError> {
        let Some(token) = self.bump() else {
            return Err(SyntaxError::new(
                "expected a row count after LIMIT",
                self.eof_span(),
            ));
        };
        token
            .ident()
            .and_then(|text| text.parse::<usize>().ok())
            .ok_or_else(|| {
                SyntaxError::new(
                    format!("LIMIT expects a non-negative integer, found {}", describe(token)),
                    token.span,
                )
            })
    }

    fn triple_list(&mut self) -> Result<Vec<TriplePattern>, SyntaxError> {
        let mut triples = vec![self.triple()?];
        while self.eat(&TokenKind::Comma) {
            triples.push(self.triple()?);
        }
        Ok(triples)
    }

    fn triple(&mut self) -> Result<TriplePattern, SyntaxError> {
        let open = self.expect(&TokenKind::LParen, "'('")?;
        let subject = self.term()?;
        self.expect(&TokenKind::Comma, "','")?;
        let predicate = self.term()?;
        self.expect(&TokenKind::Comma, "','")?;
        let object = self.term()?;
        let close = self.expect(&TokenKind::RParen, "')'")?;
        Ok(TriplePattern {
            subject,
            predicate,
            object,
            span: Span::new(open.span.start, close.span.end),
        })
    }

    fn term(&mut self) -> Result<Term, SyntaxError> {
        let term = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Ident(text)) | Some(TokenKind::Str(text)) => {
                Term::Node(Node::new(text.clone()))
            }
            Some(TokenKind::Var(name)) => Term::Var(Var(name.clone())),
            Some(TokenKind::Anonymous) => Term::Anonymous,
            _ => return Err(self.error_here("a node, variable or ?")),
        };
        self.pos += 1;
        Ok(term)
    }
}

fn describe(token: &Token) -> String {
    match &token.kind {
        TokenKind::Ident(text) => format!("'{text}'"),
        TokenKind::Str(text) => format!("string \"{text}\""),
        TokenKind::Var(name) => format!("variable ?{name}"),
        TokenKind::Anonymous => "'?'".to_string(),
        TokenKind::LParen => "'('".to_string(),
        TokenKind::RParen => "')'".to_string(),
        TokenKind::Comma => "','".to_string(),
        TokenKind::Star => "'*'".to_string(),
    }
}
