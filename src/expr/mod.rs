//! Typed filter expressions.
//!
//! An [`Expr`] is a boolean expression over one entity's properties. It is
//! produced by the typed builders ([`TypedColumn`]) or by [`parse_filter`]
//! and turned into a [`PredicateGroup`](crate::predicate::PredicateGroup) by
//! the [`ExpressionCompiler`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::predicate::Operator;
use crate::value::Value;

pub mod builders;
pub mod compiler;
pub mod parser;

pub use builders::{ColumnValue, Filter, TextColumn, TypedColumn};
pub use compiler::ExpressionCompiler;
pub use parser::parse_filter;

/// Comparison operator of a binary expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
        }
    }

    pub fn to_operator(self) -> Operator {
        match self {
            CompareOp::Eq => Operator::Equal,
            CompareOp::Ne => Operator::NotEqual,
            CompareOp::Gt => Operator::GreaterThan,
            CompareOp::Lt => Operator::LessThan,
            CompareOp::Ge => Operator::GreaterOrEqual,
            CompareOp::Le => Operator::LessOrEqual,
        }
    }
}

/// Method called on a property or a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Contains,
    StartsWith,
    EndsWith,
    Equals,
    EqualsIgnoreCase,
    All,
    Any,
}

impl Method {
    pub fn name(&self) -> &'static str {
        match self {
            Method::Contains => "Contains",
            Method::StartsWith => "StartsWith",
            Method::EndsWith => "EndsWith",
            Method::Equals => "Equals",
            Method::EqualsIgnoreCase => "EqualsIgnoreCase",
            Method::All => "All",
            Method::Any => "Any",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Contains" => Some(Method::Contains),
            "StartsWith" => Some(Method::StartsWith),
            "EndsWith" => Some(Method::EndsWith),
            "Equals" => Some(Method::Equals),
            "EqualsIgnoreCase" => Some(Method::EqualsIgnoreCase),
            "All" => Some(Method::All),
            "Any" => Some(Method::Any),
            _ => None,
        }
    }
}

/// Filter expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Property of the filtered entity.
    Member(String),
    Constant(Value),
    /// Parameter of an enclosing lambda.
    Parameter(String),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// `value ?? fallback`
    Coalesce {
        value: Box<Expr>,
        fallback: Box<Expr>,
    },
    Call {
        method: Method,
        target: Box<Expr>,
        args: Vec<Expr>,
    },
    Lambda {
        param: String,
        body: Box<Expr>,
    },
}

impl Expr {
    pub fn member(name: impl Into<String>) -> Self {
        Expr::Member(name.into())
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        Expr::Constant(value.into())
    }

    pub fn compare(op: CompareOp, left: Expr, right: Expr) -> Self {
        Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn and(self, other: Expr) -> Self {
        Expr::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Expr) -> Self {
        Expr::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        Expr::Not(Box::new(self))
    }

    pub fn call(method: Method, target: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            method,
            target: Box::new(target),
            args,
        }
    }

    pub fn lambda(param: impl Into<String>, body: Expr) -> Self {
        Expr::Lambda {
            param: param.into(),
            body: Box::new(body),
        }
    }

    /// Replace every reference to lambda parameter `param` with `value`.
    pub fn substitute(&self, param: &str, value: &Value) -> Expr {
        let sub = |e: &Expr| Box::new(e.substitute(param, value));
        match self {
            Expr::Parameter(p) if p == param => Expr::Constant(value.clone()),
            Expr::Member(_) | Expr::Constant(_) | Expr::Parameter(_) => self.clone(),
            Expr::Compare { op, left, right } => Expr::Compare {
                op: *op,
                left: sub(left),
                right: sub(right),
            },
            Expr::And(l, r) => Expr::And(sub(l), sub(r)),
            Expr::Or(l, r) => Expr::Or(sub(l), sub(r)),
            Expr::Not(inner) => Expr::Not(sub(inner)),
            Expr::Coalesce { value: v, fallback } => Expr::Coalesce {
                value: sub(v),
                fallback: sub(fallback),
            },
            Expr::Call {
                method,
                target,
                args,
            } => Expr::Call {
                method: *method,
                target: sub(target),
                args: args.iter().map(|a| a.substitute(param, value)).collect(),
            },
            // An inner lambda rebinding the same name shadows it.
            Expr::Lambda { param: p, .. } if p == param => self.clone(),
            Expr::Lambda { param: p, body } => Expr::Lambda {
                param: p.clone(),
                body: sub(body),
            },
        }
    }

    /// First entity member referenced anywhere in the expression.
    pub fn first_member(&self) -> Option<&str> {
        match self {
            Expr::Member(name) => Some(name),
            Expr::Constant(_) | Expr::Parameter(_) => None,
            Expr::Compare { left, right, .. } => {
                left.first_member().or_else(|| right.first_member())
            }
            Expr::And(l, r) | Expr::Or(l, r) => l.first_member().or_else(|| r.first_member()),
            Expr::Not(inner) => inner.first_member(),
            Expr::Coalesce { value, fallback } => {
                value.first_member().or_else(|| fallback.first_member())
            }
            Expr::Call { target, args, .. } => target
                .first_member()
                .or_else(|| args.iter().find_map(|a| a.first_member())),
            Expr::Lambda { body, .. } => body.first_member(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Member(name) => write!(f, "x.{}", name),
            Expr::Constant(value) => write!(f, "{}", value),
            Expr::Parameter(name) => write!(f, "{}", name),
            Expr::Compare { op, left, right } => {
                write!(f, "{} {} {}", left, op.symbol(), right)
            }
            Expr::And(l, r) => write!(f, "({} && {})", l, r),
            Expr::Or(l, r) => write!(f, "({} || {})", l, r),
            Expr::Not(inner) => write!(f, "!({})", inner),
            Expr::Coalesce { value, fallback } => write!(f, "({} ?? {})", value, fallback),
            Expr::Call {
                method,
                target,
                args,
            } => {
                write!(f, "{}.{}(", target, method.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Lambda { param, body } => write!(f, "{} => {}", param, body),
        }
    }
}
