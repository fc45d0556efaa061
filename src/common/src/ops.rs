use std::fmt;
use std::str::FromStr;

use crate::CrustyError;

/// Operators for simple predicates
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum SimplePredicateOp {
    Equals,
    GreaterThan,
    LessThan,
    LessThanOrEq,
    GreaterThanOrEq,
    NotEq,
    All,
}

impl SimplePredicateOp {
    /// Do predicate comparison.
    ///
    /// # Arguments
    ///
    /// * `left_field` - Left field of the predicate.
    /// * `right_field` - Right field of the predicate.
    pub fn compare<T: Ord>(&self, left_field: &T, right_field: &T) -> bool {
        match self {
            SimplePredicateOp::Equals => left_field == right_field,
            SimplePredicateOp::GreaterThan => left_field > right_field,
            SimplePredicateOp::LessThan => left_field < right_field,
            SimplePredicateOp::LessThanOrEq => left_field <= right_field,
            SimplePredicateOp::GreaterThanOrEq => left_field >= right_field,
            SimplePredicateOp::NotEq => left_field != right_field,
            SimplePredicateOp::All => true,
        }
    }
}

impl fmt::Display for SimplePredicateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op_str = match self {
            SimplePredicateOp::Equals => "=",
            SimplePredicateOp::GreaterThan => ">",
            SimplePredicateOp::LessThan => "<",
            SimplePredicateOp::LessThanOrEq => "<=",
            SimplePredicateOp::GreaterThanOrEq => ">=",
            SimplePredicateOp::NotEq => "!=",
            SimplePredicateOp::All => "all",
        };
        write!(f, "{}", op_str)
    }
}

impl FromStr for SimplePredicateOp {
    type Err = CrustyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "eq" | "=" | "==" => Ok(SimplePredicateOp::Equals),
            "gt" | ">" => Ok(SimplePredicateOp::GreaterThan),
            "lt" | "<" => Ok(SimplePredicateOp::LessThan),
            "le" | "<=" => Ok(SimplePredicateOp::LessThanOrEq),
            "ge" | ">=" => Ok(SimplePredicateOp::GreaterThanOrEq),
            "ne" | "!=" | "<>" => Ok(SimplePredicateOp::NotEq),
            "all" => Ok(SimplePredicateOp::All),
            _ => Err(CrustyError::ValidationError(format!(
                "Unknown predicate operator {}",
                s
            ))),
        }
    }
}

/// Aggregation operators.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggOp {
    Avg,
    Count,
    Max,
    Min,
    Sum,
}

impl AggOp {
    /// Label used for display and for naming aggregate output columns.
    pub fn name_of(op: AggOp) -> String {
        op.to_string()
    }
}

impl fmt::Display for AggOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op_str = match self {
            AggOp::Avg => "avg",
            AggOp::Count => "count",
            AggOp::Max => "max",
            AggOp::Min => "min",
            AggOp::Sum => "sum",
        };
        write!(f, "{}", op_str)
    }
}

impl FromStr for AggOp {
    type Err = CrustyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "avg" => Ok(AggOp::Avg),
            "count" => Ok(AggOp::Count),
            "max" => Ok(AggOp::Max),
            "min" => Ok(AggOp::Min),
            "sum" => Ok(AggOp::Sum),
            _ => Err(CrustyError::ValidationError(format!(
                "Unknown aggregate operator {}",
                s
            ))),
        }
    }
}
