//! Textual filter syntax.
//!
//! Parses lambda-style filters into an [`Expr`]:
//!
//! ```text
//! x => x.Name.StartsWith("Jo") && x.Age >= 18
//! x => ["a", "b"].All(v => x.Tags.Contains(v))
//! x => (x.Nick ?? "n/a") == "n/a"
//! Name == "Jo" || !Active
//! ```
//!
//! Precedence, lowest first: `||`, `&&`, `!`, comparisons, `??`, member
//! access and calls. Without a leading `x =>` bare identifiers name
//! properties.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{escaped_transform, tag, take_while, take_while1},
    character::complete::{char, digit1, multispace0, none_of},
    combinator::{map, opt, recognize, value},
    error::ErrorKind,
    multi::separated_list0,
    sequence::{delimited, pair, preceded, terminated},
};

use super::{CompareOp, Expr, Method};
use crate::error::{MapError, MapResult};
use crate::value::Value;

/// Parsed syntax before identifiers are resolved.
#[derive(Debug, Clone, PartialEq)]
enum Syntax {
    Literal(Value),
    List(Vec<Value>),
    Ident(String),
    Access(Box<Syntax>, String),
    Call(Box<Syntax>, String, Vec<Syntax>),
    Lambda(String, Box<Syntax>),
    Compare(CompareOp, Box<Syntax>, Box<Syntax>),
    And(Box<Syntax>, Box<Syntax>),
    Or(Box<Syntax>, Box<Syntax>),
    Not(Box<Syntax>),
    Coalesce(Box<Syntax>, Box<Syntax>),
}

/// Deepest nesting of groups, lists, calls and negations a filter may use.
pub const MAX_NESTING: usize = 128;

/// Parse a textual filter.
pub fn parse_filter(text: &str) -> MapResult<Expr> {
    check_nesting(text)?;
    let (rest, (root, body)) = match parse_root(text) {
        Ok(parsed) => parsed,
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            return Err(syntax_error(text, e.input));
        }
        Err(nom::Err::Incomplete(_)) => {
            return Err(MapError::argument("Incomplete filter expression"));
        }
    };
    if !rest.is_empty() {
        return Err(syntax_error(text, rest));
    }

    let mut scope = Vec::new();
    lower(body, root, &mut scope)
}

/// The grammar recurses once per bracket and per `!`, so deep input is
/// rejected before parsing starts.
fn check_nesting(text: &str) -> MapResult<()> {
    let mut depth = 0usize;
    let mut negations = 0usize;
    let mut in_string = false;
    let mut chars = text.char_indices().peekable();
    while let Some((position, c)) = chars.next() {
        if in_string {
            match c {
                '\\' => {
                    chars.next();
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            '!' if chars.peek().map(|&(_, next)| next) != Some('=') => negations += 1,
            _ => {}
        }
        if depth + negations > MAX_NESTING {
            return Err(MapError::argument(format!(
                "Filter nests deeper than {} levels at position {}",
                MAX_NESTING, position
            )));
        }
        if c != '!' && !c.is_whitespace() {
            negations = 0;
        }
    }
    Ok(())
}

fn syntax_error(text: &str, rest: &str) -> MapError {
    let position = text.len() - rest.len();
    let near: String = rest.chars().take(20).collect();
    if near.is_empty() {
        MapError::argument(format!(
            "Invalid filter at position {}: unexpected end of input",
            position
        ))
    } else {
        MapError::argument(format!("Invalid filter at position {}: '{}'", position, near))
    }
}

fn parse_root(input: &str) -> IResult<&str, (Option<&str>, Syntax)> {
    let (input, _) = multispace0(input)?;
    let (input, root) = opt(terminated(
        parse_identifier,
        (multispace0, tag("=>")),
    ))
    .parse(input)?;
    let (input, body) = parse_or(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, (root, body)))
}

fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

/// Parse `a || b || ...`
fn parse_or(input: &str) -> IResult<&str, Syntax> {
    let (input, left) = parse_and(input)?;
    parse_logical_chain(input, left, parse_and, "||", |l, r| {
        Syntax::Or(Box::new(l), Box::new(r))
    })
}

/// Parse `a && b && ...`
fn parse_and(input: &str) -> IResult<&str, Syntax> {
    let (input, left) = parse_unary(input)?;
    parse_logical_chain(input, left, parse_unary, "&&", |l, r| {
        Syntax::And(Box::new(l), Box::new(r))
    })
}

/// Left-associative chain of one logical operator.
fn parse_logical_chain<'a>(
    mut input: &'a str,
    mut left: Syntax,
    parse_operand: fn(&'a str) -> IResult<&'a str, Syntax>,
    operator: &str,
    combine: fn(Syntax, Syntax) -> Syntax,
) -> IResult<&'a str, Syntax> {
    loop {
        let (remaining, _) = multispace0(input)?;
        let Ok((after_op, _)) =
            tag::<_, _, nom::error::Error<&str>>(operator).parse(remaining)
        else {
            break;
        };
        let (after_right, right) = parse_operand(after_op)?;
        left = combine(left, right);
        input = after_right;
    }
    Ok((input, left))
}

fn parse_unary(input: &str) -> IResult<&str, Syntax> {
    let (input, _) = multispace0(input)?;
    if let Ok((rest, _)) = char::<_, nom::error::Error<&str>>('!').parse(input) {
        let (rest, inner) = parse_unary(rest)?;
        return Ok((rest, Syntax::Not(Box::new(inner))));
    }
    parse_comparison(input)
}

const COMPARISONS: [(&str, CompareOp); 6] = [
    ("==", CompareOp::Eq),
    ("!=", CompareOp::Ne),
    (">=", CompareOp::Ge),
    ("<=", CompareOp::Le),
    (">", CompareOp::Gt),
    ("<", CompareOp::Lt),
];

fn parse_comparison(input: &str) -> IResult<&str, Syntax> {
    let (input, left) = parse_operand(input)?;
    let (remaining, _) = multispace0(input)?;

    for (symbol, op) in COMPARISONS {
        if let Ok((after_op, _)) = tag::<_, _, nom::error::Error<&str>>(symbol).parse(remaining) {
            let (after_ws, _) = multispace0(after_op)?;
            let (rest, right) = parse_operand(after_ws)?;
            return Ok((rest, Syntax::Compare(op, Box::new(left), Box::new(right))));
        }
    }
    Ok((input, left))
}

/// Operand of a comparison, optionally coalesced: `x.Nick ?? "n/a"`.
fn parse_operand(input: &str) -> IResult<&str, Syntax> {
    let (input, _) = multispace0(input)?;
    let (input, value) = parse_postfix(input)?;
    let coalesce = preceded(
        (multispace0, tag("??"), multispace0),
        parse_postfix,
    )
    .parse(input);
    match coalesce {
        Ok((rest, fallback)) => {
            Ok((rest, Syntax::Coalesce(Box::new(value), Box::new(fallback))))
        }
        Err(nom::Err::Error(_)) => Ok((input, value)),
        Err(e) => Err(e),
    }
}

/// Atom followed by `.Member` and `.Method(args)` suffixes.
fn parse_postfix(input: &str) -> IResult<&str, Syntax> {
    let (mut input, mut node) = parse_atom(input)?;
    loop {
        let Ok((rest, _)) =
            preceded(multispace0, char::<_, nom::error::Error<&str>>('.')).parse(input)
        else {
            break;
        };
        let (rest, name) = parse_identifier(rest)?;
        match preceded(multispace0, parse_args).parse(rest) {
            Ok((rest, args)) => {
                node = Syntax::Call(Box::new(node), name.to_string(), args);
                input = rest;
            }
            Err(nom::Err::Error(_)) => {
                node = Syntax::Access(Box::new(node), name.to_string());
                input = rest;
            }
            Err(e) => return Err(e),
        }
    }
    Ok((input, node))
}

fn parse_args(input: &str) -> IResult<&str, Vec<Syntax>> {
    delimited(
        pair(char('('), multispace0),
        separated_list0(
            delimited(multispace0, char(','), multispace0),
            alt((parse_lambda, parse_or)),
        ),
        pair(multispace0, char(')')),
    )
    .parse(input)
}

/// `v => body`
fn parse_lambda(input: &str) -> IResult<&str, Syntax> {
    let (input, _) = multispace0(input)?;
    let (input, param) = parse_identifier(input)?;
    let (input, _) = (multispace0, tag("=>")).parse(input)?;
    let (input, body) = parse_or(input)?;
    Ok((input, Syntax::Lambda(param.to_string(), Box::new(body))))
}

fn parse_atom(input: &str) -> IResult<&str, Syntax> {
    alt((
        parse_parenthesized,
        map(parse_literal, Syntax::Literal),
        parse_list,
        map(parse_identifier, |name: &str| Syntax::Ident(name.to_string())),
    ))
    .parse(input)
}

fn parse_parenthesized(input: &str) -> IResult<&str, Syntax> {
    delimited(
        pair(char('('), multispace0),
        parse_or,
        pair(multispace0, char(')')),
    )
    .parse(input)
}

fn parse_list(input: &str) -> IResult<&str, Syntax> {
    let (input, items) = delimited(
        pair(char('['), multispace0),
        separated_list0(
            delimited(multispace0, char(','), multispace0),
            parse_literal,
        ),
        pair(multispace0, char(']')),
    )
    .parse(input)?;
    Ok((input, Syntax::List(items)))
}

fn parse_literal(input: &str) -> IResult<&str, Value> {
    alt((map(parse_string, Value::Text), parse_number, parse_keyword)).parse(input)
}

/// Double-quoted string with `\"`, `\\`, `\n` and `\t` escapes.
fn parse_string(input: &str) -> IResult<&str, String> {
    let (input, _) = char('"').parse(input)?;
    let (input, text) = opt(escaped_transform(
        none_of("\\\""),
        '\\',
        alt((
            value("\\", tag("\\")),
            value("\"", tag("\"")),
            value("\n", tag("n")),
            value("\t", tag("t")),
        )),
    ))
    .parse(input)?;
    let (input, _) = char('"').parse(input)?;
    Ok((input, text.unwrap_or_default()))
}

fn parse_number(input: &str) -> IResult<&str, Value> {
    let (rest, text) = recognize((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
    ))
    .parse(input)?;

    let parsed = if text.contains('.') {
        text.parse::<f64>().ok().map(Value::Float)
    } else {
        text.parse::<i64>().ok().map(Value::Int)
    };
    match parsed {
        Some(v) => Ok((rest, v)),
        None => Err(nom::Err::Error(nom::error::Error::new(input, ErrorKind::Digit))),
    }
}

fn parse_keyword(input: &str) -> IResult<&str, Value> {
    let (rest, word) = parse_identifier(input)?;
    match word {
        "true" => Ok((rest, Value::Bool(true))),
        "false" => Ok((rest, Value::Bool(false))),
        "null" => Ok((rest, Value::Null)),
        _ => Err(nom::Err::Error(nom::error::Error::new(input, ErrorKind::Tag))),
    }
}

/// Resolve identifiers: `root.Prop` becomes a member, lambda parameters in
/// scope become parameters.
fn lower(syntax: Syntax, root: Option<&str>, scope: &mut Vec<String>) -> MapResult<Expr> {
    let boxed = |s: Syntax, scope: &mut Vec<String>| lower(s, root, scope).map(Box::new);

    Ok(match syntax {
        Syntax::Literal(v) => Expr::Constant(v),
        Syntax::List(items) => Expr::Constant(Value::List(items)),
        Syntax::Ident(name) => {
            if scope.contains(&name) {
                Expr::Parameter(name)
            } else if root.is_none() {
                Expr::Member(name)
            } else if root == Some(name.as_str()) {
                return Err(MapError::argument(format!(
                    "'{}' must be followed by a property",
                    name
                )));
            } else {
                return Err(MapError::argument(format!("Unknown identifier '{}'", name)));
            }
        }
        Syntax::Access(target, property) => match *target {
            Syntax::Ident(ref name) if root == Some(name.as_str()) && !scope.contains(name) => {
                Expr::Member(property)
            }
            Syntax::Ident(name) => {
                return Err(MapError::UnsupportedExpression(format!(
                    "{}.{}",
                    name, property
                )));
            }
            _ => {
                return Err(MapError::UnsupportedExpression(format!(
                    "nested member access '.{}'",
                    property
                )));
            }
        },
        Syntax::Call(target, name, args) => {
            let method = Method::from_name(&name)
                .ok_or_else(|| MapError::argument(format!("Unknown method '{}'", name)))?;
            let target = boxed(*target, scope)?;
            let args = args
                .into_iter()
                .map(|arg| lower(arg, root, scope))
                .collect::<MapResult<Vec<_>>>()?;
            Expr::Call {
                method,
                target,
                args,
            }
        }
        Syntax::Lambda(param, body) => {
            scope.push(param.clone());
            let body = lower(*body, root, scope);
            scope.pop();
            Expr::Lambda {
                param,
                body: Box::new(body?),
            }
        }
        Syntax::Compare(op, left, right) => Expr::Compare {
            op,
            left: boxed(*left, scope)?,
            right: boxed(*right, scope)?,
        },
        Syntax::And(l, r) => Expr::And(boxed(*l, scope)?, boxed(*r, scope)?),
        Syntax::Or(l, r) => Expr::Or(boxed(*l, scope)?, boxed(*r, scope)?),
        Syntax::Not(inner) => Expr::Not(boxed(*inner, scope)?),
        Syntax::Coalesce(value, fallback) => Expr::Coalesce {
            value: boxed(*value, scope)?,
            fallback: boxed(*fallback, scope)?,
        },
    })
}
