//! Reader for `KEY=VALUE` environment files.
//!
//! Supported syntax:
//! - blank lines and `#` comments;
//! - an optional `export ` prefix;
//! - `KEY=VALUE` or `KEY: VALUE`;
//! - single-quoted values, taken literally (may span lines);
//! - double-quoted values with `\n \t \r \" \\ \$` escapes and variable
//!   expansion (may span lines);
//! - unquoted values, where ` #` starts a trailing comment;
//! - `$VAR`, `${VAR}`, `${VAR:-default}`, `${VAR-default}`,
//!   `${VAR:?message}`, `${VAR?message}`, `${VAR:+alt}`, `${VAR+alt}`;
//! - a bare `KEY`, which takes its value from the lookup function and is
//!   omitted when the lookup has none.
//!
//! Expansion consults the keys already read from the same input before the
//! lookup function. Unknown variables expand to the empty string.

use std::collections::BTreeMap;

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{is_not, tag, take_till, take_while1},
    character::complete::{anychar, char, multispace1, one_of, space0, space1},
    combinator::{cut, map, opt, recognize, value},
    multi::many0,
    sequence::{pair, preceded, terminated},
};
use thiserror::Error;

/// A syntax error in an environment file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    /// 1-based line where the offending entry starts.
    pub line: usize,
    /// Description of the problem.
    pub message: String,
}

enum Value {
    Literal(String),
    Expand { text: String, escapes: bool },
}

enum Entry {
    Assign { key: String, value: Value },
    Inherit(String),
}

/// Skips whitespace, blank lines, and `#` comment lines.
fn skip_trivia(input: &str) -> IResult<&str, ()> {
    let comment = value((), preceded(char('#'), rest_of_line));
    let ws = value((), multispace1);
    let (input, _) = many0(alt((ws, comment))).parse(input)?;
    Ok((input, ()))
}

fn rest_of_line(input: &str) -> IResult<&str, &str> {
    take_till(|c: char| c == '\n').parse(input)
}

/// Parses a variable name, with an optional `export ` prefix.
fn variable_name(input: &str) -> IResult<&str, &str> {
    preceded(
        opt(terminated(tag("export"), space1)),
        take_while1(is_key_char),
    )
    .parse(input)
}

fn assignment_separator(input: &str) -> IResult<&str, Option<char>> {
    preceded(space0, opt(one_of("=:"))).parse(input)
}

/// Parses a single-quoted value; its content is taken literally.
fn single_quoted(input: &str) -> IResult<&str, &str> {
    let body = take_till(|c: char| c == '\'');
    preceded(char('\''), cut(terminated(body, char('\'')))).parse(input)
}

/// Parses a double-quoted value. Escapes are kept verbatim for expansion.
fn double_quoted(input: &str) -> IResult<&str, &str> {
    let escaped = recognize(pair(char('\\'), anychar));
    let body = recognize(many0(alt((is_not("\"\\"), escaped))));
    preceded(char('"'), cut(terminated(body, char('"')))).parse(input)
}

/// Parses everything after the separator up to the end of the line.
///
/// Text following a closing quote is ignored. In unquoted values a `#`
/// preceded by a blank starts a comment.
fn assignment_value(input: &str) -> IResult<&str, Value> {
    let literal = map(single_quoted, |text: &str| Value::Literal(text.to_owned()));
    let quoted = map(double_quoted, |text: &str| Value::Expand {
        text: text.to_owned(),
        escapes: true,
    });
    let unquoted = map(rest_of_line, |raw: &str| Value::Expand {
        text: strip_inline_comment(raw).trim().to_owned(),
        escapes: false,
    });
    alt((
        terminated(preceded(space0, literal), rest_of_line),
        terminated(preceded(space0, quoted), rest_of_line),
        unquoted,
    ))
    .parse(input)
}

/// Parses the entry at the start of `input`, which begins on `line`.
fn next_entry(input: &str, line: usize) -> Result<(&str, Entry), ParseError> {
    let (rest, key) = variable_name(input).map_err(|e| syntax_error(line, &e))?;
    let key = key.to_owned();
    let (rest, separator) = assignment_separator(rest).map_err(|e| syntax_error(line, &e))?;

    if separator.is_none() {
        return match rest.chars().next() {
            None | Some('\n' | '\r' | '#') => {
                let (rest, _) = rest_of_line(rest).map_err(|e| syntax_error(line, &e))?;
                Ok((rest, Entry::Inherit(key)))
            }
            Some(found) => Err(parse_error(
                line,
                format!("unexpected character {found:?} in variable name {key:?}"),
            )),
        };
    }

    let (rest, value) =
        assignment_value(rest).map_err(|_| parse_error(line, "unterminated quoted value"))?;
    Ok((rest, Entry::Assign { key, value }))
}

fn syntax_error(line: usize, err: &nom::Err<nom::error::Error<&str>>) -> ParseError {
    let found = match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => e.input.chars().next(),
        nom::Err::Incomplete(_) => None,
    };
    match found {
        Some(c) => parse_error(line, format!("unexpected character {c:?} in variable name")),
        None => parse_error(line, "unexpected end of input in variable name"),
    }
}

fn parse_error(line: usize, message: impl Into<String>) -> ParseError {
    ParseError {
        line,
        message: message.into(),
    }
}

const fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '[' | ']')
}

fn strip_inline_comment(raw: &str) -> &str {
    raw.char_indices()
        .find(|&(i, c)| c == '#' && raw[..i].ends_with([' ', '\t']))
        .map_or(raw, |(i, _)| &raw[..i])
}

/// Parses environment file content.
///
/// Variables are expanded against the keys read so far, then `lookup`.
///
/// # Errors
///
/// Returns a [`ParseError`] carrying the line of the first malformed entry.
pub fn parse_with_lookup<F>(
    input: &str,
    lookup: F,
) -> Result<BTreeMap<String, String>, ParseError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut vars: BTreeMap<String, String> = BTreeMap::new();
    let mut remaining = input;
    let mut line = 1;

    loop {
        let (rest, ()) = skip_trivia(remaining).map_err(|e| syntax_error(line, &e))?;
        line += newlines_between(remaining, rest);
        remaining = rest;
        if remaining.is_empty() {
            break;
        }

        let (rest, entry) = next_entry(remaining, line)?;
        let entry_line = line;
        line += newlines_between(remaining, rest);
        remaining = rest;

        match entry {
            Entry::Assign { key, value } => {
                let value = match value {
                    Value::Literal(text) => text,
                    Value::Expand { text, escapes } => {
                        let resolve = |name: &str| vars.get(name).cloned().or_else(|| lookup(name));
                        expand(&text, escapes, &resolve, entry_line)?
                    }
                };
                let _ = vars.insert(key, value);
            }
            Entry::Inherit(key) => {
                if let Some(value) = lookup(&key) {
                    let _ = vars.insert(key, value);
                }
            }
        }
    }
    Ok(vars)
}

/// Counts the line breaks consumed between `before` and its suffix `after`.
fn newlines_between(before: &str, after: &str) -> usize {
    before[..before.len() - after.len()].matches('\n').count()
}

/// Parses environment file content without any outside variables.
///
/// # Errors
///
/// Same as [`parse_with_lookup`].
pub fn parse(input: &str) -> Result<BTreeMap<String, String>, ParseError> {
    parse_with_lookup(input, |_| None)
}

fn expand<F>(text: &str, escapes: bool, resolve: &F, line: usize) -> Result<String, ParseError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' if escapes => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, escaped @ ('"' | '\\' | '$'))) => out.push(escaped),
                Some((_, other)) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            },
            '$' => {
                let rest = &text[i + 1..];
                let consumed = if let Some(body) = rest.strip_prefix('{') {
                    let end = matching_brace(body).ok_or_else(|| {
                        parse_error(line, format!("unterminated variable substitution in {text:?}"))
                    })?;
                    out.push_str(&substitute(&body[..end], escapes, resolve, line)?);
                    end + 2
                } else {
                    let name_len = rest
                        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                        .unwrap_or(rest.len());
                    if name_len == 0 || rest.starts_with(|c: char| c.is_ascii_digit()) {
                        out.push('$');
                        0
                    } else {
                        out.push_str(&resolve(&rest[..name_len]).unwrap_or_default());
                        name_len
                    }
                };
                let resume = i + 1 + consumed;
                while chars.peek().is_some_and(|&(j, _)| j < resume) {
                    let _ = chars.next();
                }
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

fn matching_brace(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' if depth == 0 => return Some(i),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn substitute<F>(expr: &str, escapes: bool, resolve: &F, line: usize) -> Result<String, ParseError>
where
    F: Fn(&str) -> Option<String>,
{
    let name_len = expr
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(expr.len());
    let (name, modifier) = expr.split_at(name_len);
    if name.is_empty() {
        return Err(parse_error(line, format!("invalid variable name in ${{{expr}}}")));
    }

    let value = resolve(name);
    let set_non_empty = value.as_deref().is_some_and(|v| !v.is_empty());
    let missing = |message: &str| {
        parse_error(line, format!("required variable {name} is missing a value: {message}"))
    };

    let result = if modifier.is_empty() {
        value.unwrap_or_default()
    } else if let Some(default) = modifier.strip_prefix(":-") {
        match value {
            Some(v) if !v.is_empty() => v,
            _ => expand(default, escapes, resolve, line)?,
        }
    } else if let Some(default) = modifier.strip_prefix('-') {
        match value {
            Some(v) => v,
            None => expand(default, escapes, resolve, line)?,
        }
    } else if let Some(message) = modifier.strip_prefix(":?") {
        match value {
            Some(v) if !v.is_empty() => v,
            _ => return Err(missing(message)),
        }
    } else if let Some(message) = modifier.strip_prefix('?') {
        value.ok_or_else(|| missing(message))?
    } else if let Some(alternate) = modifier.strip_prefix(":+") {
        if set_non_empty {
            expand(alternate, escapes, resolve, line)?
        } else {
            String::new()
        }
    } else if let Some(alternate) = modifier.strip_prefix('+') {
        if value.is_some() {
            expand(alternate, escapes, resolve, line)?
        } else {
            String::new()
        }
    } else {
        return Err(parse_error(line, format!("invalid variable substitution ${{{expr}}}")));
    };
    Ok(result)
}
