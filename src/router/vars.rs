use serde::{Deserialize, Serialize};

/// One token of a compiled filter clause.
///
/// The proxy's matching engine consumes each clause as a flat JSON array;
/// set-valued comparisons nest their operand as an inner array of strings:
/// `["arg_id", "!", "in", ["1", "2"]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Var {
    Value(String),
    Set(Vec<String>),
}

/// Ordered list of compiled clauses, one per source predicate. Embedded
/// verbatim into the generated route's filter-expression field.
pub type Vars = Vec<Vec<Var>>;
