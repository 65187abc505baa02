use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::vars::{Var, Vars};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExprError {
    #[error("empty subject name")]
    EmptySubjectName,

    #[error("invalid subject scope '{0}': expected one of [query, header, cookie, path, variable]")]
    InvalidScope(String),

    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("empty set value")]
    EmptySetValue,

    #[error("empty value")]
    EmptyValue,
}

/// The piece of request data a predicate inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SubjectScope {
    Query,
    Header,
    Cookie,
    Path,
    Variable,
}

impl SubjectScope {
    pub const fn as_str(self) -> &'static str {
        match self {
            SubjectScope::Query => "query",
            SubjectScope::Header => "header",
            SubjectScope::Cookie => "cookie",
            SubjectScope::Path => "path",
            SubjectScope::Variable => "variable",
        }
    }
}

impl fmt::Display for SubjectScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubjectScope {
    type Err = ExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" => Ok(SubjectScope::Query),
            "header" => Ok(SubjectScope::Header),
            "cookie" => Ok(SubjectScope::Cookie),
            "path" => Ok(SubjectScope::Path),
            "variable" => Ok(SubjectScope::Variable),
            other => Err(ExprError::InvalidScope(other.to_string())),
        }
    }
}

impl TryFrom<String> for SubjectScope {
    type Error = ExprError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SubjectScope> for String {
    fn from(scope: SubjectScope) -> Self {
        scope.as_str().to_string()
    }
}

/// Comparison operator of a match predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MatchOp {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    In,
    NotIn,
    RegexMatch,
    RegexMatchCi,
    RegexNotMatch,
    RegexNotMatchCi,
}

impl MatchOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            MatchOp::Equal => "equal",
            MatchOp::NotEqual => "not_equal",
            MatchOp::GreaterThan => "greater_than",
            MatchOp::GreaterThanEqual => "greater_than_equal",
            MatchOp::LessThan => "less_than",
            MatchOp::LessThanEqual => "less_than_equal",
            MatchOp::In => "in",
            MatchOp::NotIn => "not_in",
            MatchOp::RegexMatch => "regex_match",
            MatchOp::RegexMatchCi => "regex_match_ci",
            MatchOp::RegexNotMatch => "regex_not_match",
            MatchOp::RegexNotMatchCi => "regex_not_match_ci",
        }
    }

    /// Operator token in the proxy grammar. The negated forms reuse the
    /// positive symbol; negation travels as a separate `!` token.
    pub const fn symbol(self) -> &'static str {
        match self {
            MatchOp::Equal => "==",
            MatchOp::NotEqual => "~=",
            MatchOp::GreaterThan => ">",
            MatchOp::GreaterThanEqual => ">=",
            MatchOp::LessThan => "<",
            MatchOp::LessThanEqual => "<=",
            MatchOp::In | MatchOp::NotIn => "in",
            MatchOp::RegexMatch | MatchOp::RegexNotMatch => "~~",
            MatchOp::RegexMatchCi | MatchOp::RegexNotMatchCi => "~*",
        }
    }

    /// Whether the compiled clause carries the standalone negation marker.
    pub const fn negated(self) -> bool {
        matches!(
            self,
            MatchOp::NotIn | MatchOp::RegexNotMatch | MatchOp::RegexNotMatchCi
        )
    }

    /// `in`/`not_in` compare against a set, everything else against a scalar.
    pub const fn takes_set(self) -> bool {
        matches!(self, MatchOp::In | MatchOp::NotIn)
    }

    pub const fn is_regex(self) -> bool {
        matches!(
            self,
            MatchOp::RegexMatch
                | MatchOp::RegexMatchCi
                | MatchOp::RegexNotMatch
                | MatchOp::RegexNotMatchCi
        )
    }
}

impl fmt::Display for MatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchOp {
    type Err = ExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equal" => Ok(MatchOp::Equal),
            "not_equal" => Ok(MatchOp::NotEqual),
            "greater_than" => Ok(MatchOp::GreaterThan),
            "greater_than_equal" => Ok(MatchOp::GreaterThanEqual),
            "less_than" => Ok(MatchOp::LessThan),
            "less_than_equal" => Ok(MatchOp::LessThanEqual),
            "in" => Ok(MatchOp::In),
            "not_in" => Ok(MatchOp::NotIn),
            "regex_match" => Ok(MatchOp::RegexMatch),
            "regex_match_ci" => Ok(MatchOp::RegexMatchCi),
            "regex_not_match" => Ok(MatchOp::RegexNotMatch),
            "regex_not_match_ci" => Ok(MatchOp::RegexNotMatchCi),
            other => Err(ExprError::UnknownOperator(other.to_string())),
        }
    }
}

impl TryFrom<String> for MatchOp {
    type Error = ExprError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MatchOp> for String {
    fn from(op: MatchOp) -> Self {
        op.as_str().to_string()
    }
}

/// Subject of a single match predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchExprSubject {
    pub scope: SubjectScope,

    /// Required unless scope is `path`, where it is ignored.
    #[serde(default)]
    pub name: String,
}

impl MatchExprSubject {
    /// Encode the subject as the proxy variable it reads at match time.
    pub fn to_var_name(&self) -> Result<String, ExprError> {
        if self.name.is_empty() && self.scope != SubjectScope::Path {
            return Err(ExprError::EmptySubjectName);
        }

        Ok(match self.scope {
            SubjectScope::Query => format!("arg_{}", self.name),
            SubjectScope::Header => {
                format!("http_{}", self.name.to_lowercase().replace('-', "_"))
            }
            SubjectScope::Cookie => format!("cookie_{}", self.name),
            SubjectScope::Path => "uri".to_string(),
            SubjectScope::Variable => self.name.clone(),
        })
    }
}

/// One user-authored match predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchExpr {
    pub subject: MatchExprSubject,

    pub op: MatchOp,

    /// Operand for `in`/`not_in`. Exclusive with `value`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<Vec<String>>,

    /// Operand for every scalar operator. Exclusive with `set`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl MatchExpr {
    /// Compile this predicate into one clause of the proxy's filter
    /// grammar: subject, optional `!`, operator symbol, operand.
    pub fn to_var(&self) -> Result<Vec<Var>, ExprError> {
        let mut clause = Vec::with_capacity(4);
        clause.push(Var::Value(self.subject.to_var_name()?));

        if self.op.negated() {
            clause.push(Var::Value("!".to_string()));
        }
        clause.push(Var::Value(self.op.symbol().to_string()));

        if self.op.takes_set() {
            let set = self.set.as_ref().ok_or(ExprError::EmptySetValue)?;
            clause.push(Var::Set(set.clone()));
        } else {
            let value = self.value.as_ref().ok_or(ExprError::EmptyValue)?;
            clause.push(Var::Value(value.clone()));
        }

        Ok(clause)
    }
}

/// Compile an ordered predicate list into the proxy's filter-expression
/// form. Clauses come out in input order, one per predicate; the first
/// invalid predicate aborts the whole list with no partial output.
pub fn to_vars(exprs: &[MatchExpr]) -> Result<Vars, ExprError> {
    exprs.iter().map(MatchExpr::to_var).collect()
}
