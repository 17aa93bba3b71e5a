use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace1},
    combinator::{cut, recognize, value},
    error::ErrorKind,
    multi::many0,
    sequence::pair,
};

use crate::ast::{NumberType, Value};
use crate::{Error, MAX_PARSE_DEPTH, ParseError, ParseErrorKind};

/// Characters that delimit tokens in addition to whitespace
const DELIMITERS: &str = "()'`;";

fn is_symbol_char(c: char) -> bool {
    !c.is_whitespace() && !c.is_control() && !DELIMITERS.contains(c)
}

fn fail<T>(input: &str, kind: ErrorKind) -> IResult<&str, T> {
    Err(nom::Err::Failure(nom::error::Error::new(input, kind)))
}

/// Convert nom parsing errors to structured parse errors
fn nom_error_to_parse_error(input: &str, error: nom::Err<nom::error::Error<&str>>) -> Error {
    let (kind, message, position) = match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let position = input.len().saturating_sub(e.input.len());
            let (kind, message) = match e.code {
                ErrorKind::TooLarge => (
                    ParseErrorKind::TooDeeplyNested,
                    format!("Expression too deeply nested (max depth: {MAX_PARSE_DEPTH})"),
                ),
                ErrorKind::Eof => (
                    ParseErrorKind::Incomplete,
                    "Unexpected end of input".to_owned(),
                ),
                ErrorKind::Digit => (
                    ParseErrorKind::ImplementationLimit,
                    format!("Integer literal out of range at position {position}"),
                ),
                ErrorKind::AlphaNumeric => (
                    ParseErrorKind::InvalidSyntax,
                    format!("Invalid number literal at position {position}"),
                ),
                ErrorKind::Verify => (
                    ParseErrorKind::InvalidSyntax,
                    format!("Misplaced '.' at position {position}"),
                ),
                ErrorKind::Char => (
                    ParseErrorKind::InvalidSyntax,
                    format!("Expected ')' at position {position}"),
                ),
                _ => (
                    ParseErrorKind::InvalidSyntax,
                    format!("Unexpected character at position {position}"),
                ),
            };
            (kind, message, position)
        }
        nom::Err::Incomplete(_) => (
            ParseErrorKind::Incomplete,
            "Incomplete input".to_owned(),
            input.len(),
        ),
    };
    ParseError::with_context(kind, message, input, position).into()
}

/// A `;` comment running to the end of the line
fn comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(char(';'), take_while(|c: char| c != '\n'))).parse(input)
}

/// Whitespace and comments
fn ws(input: &str) -> IResult<&str, ()> {
    value((), many0(alt((multispace1, comment)))).parse(input)
}

fn skip_ws(input: &str) -> &str {
    ws(input).map_or(input, |(rest, ())| rest)
}

/// Classify an atom token as a number or a symbol
///
/// A token made of an optional `-` and digits is a number. Any other token
/// starting with a digit (or `-` and a digit) is rejected rather than read as
/// a symbol.
fn parse_atom(input: &str) -> IResult<&str, Value> {
    let (rest, token) = take_while1(is_symbol_char).parse(input)?;

    if token == "." {
        return fail(input, ErrorKind::Verify);
    }

    let digits = token.strip_prefix('-').unwrap_or(token);
    if !digits.starts_with(|c: char| c.is_ascii_digit()) {
        return Ok((rest, Value::Symbol(token.to_owned())));
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return fail(input, ErrorKind::AlphaNumeric);
    }
    match token.parse::<NumberType>() {
        Ok(n) => Ok((rest, Value::Number(n))),
        Err(_) => fail(input, ErrorKind::Digit),
    }
}

/// `'x` and `` `x ``
fn parse_prefixed(input: &str, depth: usize) -> IResult<&str, Value> {
    let (input, prefix) = alt((char('\''), char('`'))).parse(input)?;
    let (input, expr) = parse_sexpr(input, depth + 1)?;
    let wrapped = match prefix {
        '\'' => Value::quoted(expr),
        _ => Value::unquoted(expr),
    };
    Ok((input, wrapped))
}

/// A lone `.` followed by a delimiter, separating the tail of a dotted list
fn dot_separator(input: &str) -> Option<&str> {
    input
        .strip_prefix('.')
        .filter(|after| !after.starts_with(is_symbol_char))
}

fn parse_list(input: &str, depth: usize) -> IResult<&str, Value> {
    let (mut input, _) = char('(').parse(input)?;
    let mut items = Vec::new();

    loop {
        let rest = skip_ws(input);

        if let Some(after) = rest.strip_prefix(')') {
            return Ok((after, Value::list_with_tail(items, Value::Nil)));
        }
        if rest.is_empty() {
            return fail(rest, ErrorKind::Eof);
        }

        if let Some(after_dot) = dot_separator(rest) {
            if items.is_empty() {
                return fail(rest, ErrorKind::Verify);
            }
            let (after_tail, tail) = parse_sexpr(after_dot, depth + 1)?;
            let after_tail = skip_ws(after_tail);
            if after_tail.is_empty() {
                return fail(after_tail, ErrorKind::Eof);
            }
            let (after_close, _) = cut(char(')')).parse(after_tail)?;
            return Ok((after_close, Value::list_with_tail(items, tail)));
        }

        let (after_item, item) = parse_sexpr(rest, depth + 1)?;
        items.push(item);
        input = after_item;
    }
}

/// Parse one expression with a nesting limit
fn parse_sexpr(input: &str, depth: usize) -> IResult<&str, Value> {
    if depth >= MAX_PARSE_DEPTH {
        return fail(input, ErrorKind::TooLarge);
    }

    let input = skip_ws(input);
    if input.is_empty() {
        return fail(input, ErrorKind::Eof);
    }

    alt((
        |i| parse_prefixed(i, depth),
        |i| parse_list(i, depth),
        parse_atom,
    ))
    .parse(input)
}

/// Parse exactly one expression, allowing surrounding whitespace and comments
pub fn parse(input: &str) -> Result<Value, Error> {
    let (rest, expr) =
        parse_sexpr(input, 0).map_err(|e| nom_error_to_parse_error(input, e))?;

    let rest = skip_ws(rest);
    if !rest.is_empty() {
        let position = input.len() - rest.len();
        return Err(ParseError::with_context(
            ParseErrorKind::TrailingContent,
            format!("Unexpected input after expression at position {position}"),
            input,
            position,
        )
        .into());
    }

    Ok(expr)
}

/// Parse every top-level expression in `input`
pub fn parse_all(input: &str) -> Result<Vec<Value>, Error> {
    let mut forms = Vec::new();
    let mut rest = skip_ws(input);

    while !rest.is_empty() {
        let (after, expr) =
            parse_sexpr(rest, 0).map_err(|e| nom_error_to_parse_error(input, e))?;
        forms.push(expr);
        rest = skip_ws(after);
    }

    Ok(forms)
}
