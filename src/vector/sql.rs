use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::errors::*;
use crate::vector::expr::{tokenize, Spanned, Token};

/// Represents valid SQL dialects to use in SQL queries. See
/// <https://gdal.org/user/ogr_sql_sqlite_dialect.html>
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Use the default dialect. This is OGR SQL unless the underlying driver has a native dialect,
    /// such as MySQL, Postgres, Oracle, etc.
    #[default]
    DEFAULT,

    /// Explicitly choose OGR SQL regardless of if the underlying driver has a native dialect.
    OGR,

    /// SQLite dialect. If the data set is not actually a SQLite database, then a virtual SQLite
    /// table is created to execute the query.
    SQLITE,
}

impl Dialect {
    /// Name handed to drivers, `None` for the default dialect.
    pub fn name(&self) -> Option<&'static str> {
        match self {
            Dialect::DEFAULT => None,
            Dialect::OGR => Some("OGRSQL"),
            Dialect::SQLITE => Some("SQLITE"),
        }
    }
}

impl FromStr for Dialect {
    type Err = InfoError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            Ok(Dialect::DEFAULT)
        } else if s.eq_ignore_ascii_case("OGRSQL") || s.eq_ignore_ascii_case("OGR") {
            Ok(Dialect::OGR)
        } else if s.eq_ignore_ascii_case("SQLITE") {
            Ok(Dialect::SQLITE)
        } else {
            Err(InfoError::BadArgument(format!("Unknown SQL dialect '{s}'")))
        }
    }
}

impl Display for Dialect {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name().unwrap_or("DEFAULT"))
    }
}

/// The `SELECT` subset understood by the memory driver:
/// `SELECT * | col[, col…] FROM layer [WHERE expr] [ORDER BY col [ASC|DESC]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectStatement {
    /// Selected columns, `None` for `*`.
    pub columns: Option<Vec<String>>,
    pub table: String,
    /// Text of the `WHERE` clause, parsed later against the table schema.
    pub where_clause: Option<String>,
    pub order_by: Option<OrderBy>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

impl SelectStatement {
    pub fn parse(statement: &str) -> Result<SelectStatement> {
        let invalid = |reason: &str| InfoError::InvalidSql {
            statement: statement.to_string(),
            reason: reason.to_string(),
        };
        let tokens = tokenize(statement).map_err(|reason| invalid(&reason))?;
        let mut pos = 0;

        if !tokens.first().is_some_and(|t| t.token.is_keyword("SELECT")) {
            return Err(invalid("only SELECT statements are supported"));
        }
        pos += 1;

        let columns = if matches!(tokens.get(pos).map(|t| &t.token), Some(Token::Star)) {
            pos += 1;
            None
        } else {
            let mut columns = Vec::new();
            loop {
                match tokens.get(pos).map(|t| &t.token) {
                    Some(Token::Ident(name)) if !name.eq_ignore_ascii_case("FROM") => {
                        columns.push(name.clone())
                    }
                    Some(Token::QuotedIdent(name)) => columns.push(name.clone()),
                    _ => return Err(invalid("expected a column name")),
                }
                pos += 1;
                if matches!(tokens.get(pos).map(|t| &t.token), Some(Token::Comma)) {
                    pos += 1;
                } else {
                    break;
                }
            }
            Some(columns)
        };

        if !tokens.get(pos).is_some_and(|t| t.token.is_keyword("FROM")) {
            return Err(invalid("expected FROM"));
        }
        pos += 1;
        let table = match tokens.get(pos).map(|t| &t.token) {
            Some(Token::Ident(name)) | Some(Token::QuotedIdent(name)) => name.clone(),
            _ => return Err(invalid("expected a layer name after FROM")),
        };
        pos += 1;

        let order_start = find_order_by(&tokens, pos);
        let where_clause = if tokens.get(pos).is_some_and(|t| t.token.is_keyword("WHERE")) {
            let first = tokens
                .get(pos + 1)
                .filter(|_| order_start.map_or(true, |o| o > pos + 1))
                .ok_or_else(|| invalid("empty WHERE clause"))?;
            let last_index = order_start.unwrap_or(tokens.len()) - 1;
            let last = &tokens[last_index];
            pos = last_index + 1;
            Some(statement[first.start..last.end].to_string())
        } else {
            None
        };

        let order_by = match order_start {
            Some(start) if start == pos => {
                pos += 2;
                let column = match tokens.get(pos).map(|t| &t.token) {
                    Some(Token::Ident(name)) | Some(Token::QuotedIdent(name)) => name.clone(),
                    _ => return Err(invalid("expected a column after ORDER BY")),
                };
                pos += 1;
                let mut ascending = true;
                if let Some(t) = tokens.get(pos) {
                    if t.token.is_keyword("DESC") {
                        ascending = false;
                        pos += 1;
                    } else if t.token.is_keyword("ASC") {
                        pos += 1;
                    }
                }
                Some(OrderBy { column, ascending })
            }
            _ => None,
        };

        if let Some(extra) = tokens.get(pos) {
            return Err(invalid(&format!(
                "unexpected '{}'",
                &statement[extra.start..extra.end]
            )));
        }

        Ok(SelectStatement {
            columns,
            table,
            where_clause,
            order_by,
        })
    }
}

fn find_order_by(tokens: &[Spanned], from: usize) -> Option<usize> {
    let mut depth = 0usize;
    for i in from..tokens.len() {
        match tokens[i].token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            _ if depth == 0
                && tokens[i].token.is_keyword("ORDER")
                && tokens.get(i + 1).is_some_and(|t| t.token.is_keyword("BY")) =>
            {
                return Some(i)
            }
            _ => {}
        }
    }
    None
}
