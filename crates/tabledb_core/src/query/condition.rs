//! Query conditions.

use crate::error::{TableError, TableResult};
use crate::index::{parse_decimal, BTreeIndex, ColumnIndex, DecimalKey};
use crate::types::is_pk_column;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tabledb_codec::Record;

/// Condition operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// String equality.
    Equals,
    /// The value, split on `,`, has the operand as one of its tokens.
    Includes,
    /// The value contains the operand.
    Contains,
    /// The value starts with the operand.
    StartsWith,
    /// The value ends with the operand.
    EndsWith,
    /// Every `,`-token of the operand is a token of the value.
    IncludesAll,
    /// Some `,`-token of the operand is a token of the value.
    IncludesAny,
    /// The value equals one of the operand's `,`-tokens.
    EqualsAny,
    /// The value matches the operand as a regular expression.
    Matches,
    /// Numeric equality.
    NumEquals,
    /// Greater than; numeric when the operand is a number.
    GreaterThan,
    /// Greater than or equal; numeric when the operand is a number.
    GreaterOrEqual,
    /// Less than; numeric when the operand is a number.
    LessThan,
    /// Less than or equal; numeric when the operand is a number.
    LessOrEqual,
    /// Inclusive numeric range, operand `"lo,hi"`.
    Between,
}

impl FromStr for Operator {
    type Err = TableError;

    fn from_str(s: &str) -> TableResult<Self> {
        let op = match s.trim_start_matches(':') {
            "eq" | "==" | "=" | "equals" => Self::Equals,
            "includes" | "inc" => Self::Includes,
            "contains" | "substring" => Self::Contains,
            "starts_with" | "bw" => Self::StartsWith,
            "ends_with" | "ew" => Self::EndsWith,
            "includes_all" => Self::IncludesAll,
            "includes_any" => Self::IncludesAny,
            "eq_any" | "in" => Self::EqualsAny,
            "matches" | "=~" => Self::Matches,
            "numeq" => Self::NumEquals,
            "gt" | ">" => Self::GreaterThan,
            "gte" | ">=" => Self::GreaterOrEqual,
            "lt" | "<" => Self::LessThan,
            "lte" | "<=" => Self::LessOrEqual,
            "between" => Self::Between,
            other => {
                return Err(TableError::invalid_argument(format!(
                    "unknown query operator {other:?}"
                )))
            }
        };
        Ok(op)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Equals => "eq",
            Self::Includes => "includes",
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::IncludesAll => "includes_all",
            Self::IncludesAny => "includes_any",
            Self::EqualsAny => "eq_any",
            Self::Matches => "matches",
            Self::NumEquals => "numeq",
            Self::GreaterThan => "gt",
            Self::GreaterOrEqual => "gte",
            Self::LessThan => "lt",
            Self::LessOrEqual => "lte",
            Self::Between => "between",
        })
    }
}

/// Operand prepared once when the condition is built.
#[derive(Debug, Clone)]
enum Compiled {
    Text,
    Tokens(Vec<String>),
    Pattern(Regex),
    Number(f64),
    Range(f64, f64),
}

/// Comma-separated tokens, taken literally: surrounding spaces belong to
/// the token.
fn tokens(s: &str) -> impl Iterator<Item = &str> {
    s.split(',')
}

/// One `(column, operator, operand, negate)` condition.
#[derive(Debug, Clone)]
pub struct Condition {
    column: String,
    op: Operator,
    operand: String,
    negate: bool,
    compiled: Compiled,
}

impl Condition {
    /// Builds a condition, validating the operand.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an invalid regular expression, a
    /// non-numeric `NumEquals` operand, or a `Between` operand that is not
    /// two numbers.
    pub fn new(
        column: impl Into<String>,
        op: Operator,
        operand: impl Into<String>,
        negate: bool,
    ) -> TableResult<Self> {
        let operand = operand.into();
        let compiled = match op {
            Operator::Matches => Compiled::Pattern(Regex::new(&operand).map_err(|e| {
                TableError::invalid_argument(format!("invalid regular expression: {e}"))
            })?),
            Operator::IncludesAll | Operator::IncludesAny | Operator::EqualsAny => {
                Compiled::Tokens(tokens(&operand).map(str::to_string).collect())
            }
            Operator::NumEquals => Compiled::Number(parse_decimal(&operand).ok_or_else(|| {
                TableError::invalid_argument(format!("numeq needs a number, got {operand:?}"))
            })?),
            Operator::GreaterThan
            | Operator::GreaterOrEqual
            | Operator::LessThan
            | Operator::LessOrEqual => match parse_decimal(&operand) {
                Some(n) => Compiled::Number(n),
                None => Compiled::Text,
            },
            Operator::Between => parse_range(&operand)?,
            Operator::Equals
            | Operator::Includes
            | Operator::Contains
            | Operator::StartsWith
            | Operator::EndsWith => Compiled::Text,
        };
        Ok(Self {
            column: column.into(),
            op,
            operand,
            negate,
            compiled,
        })
    }

    /// Column the condition reads.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// The operator.
    #[must_use]
    pub fn operator(&self) -> Operator {
        self.op
    }

    /// The raw operand.
    #[must_use]
    pub fn operand(&self) -> &str {
        &self.operand
    }

    /// Whether the result is inverted.
    #[must_use]
    pub fn is_negated(&self) -> bool {
        self.negate
    }

    /// Evaluates the condition against one record.
    ///
    /// A missing column is a non-match before negation is applied.
    #[must_use]
    pub fn matches(&self, pk: &str, record: &Record) -> bool {
        let value = if is_pk_column(&self.column) {
            Some(pk)
        } else {
            record.get(&self.column)
        };
        let hit = value.is_some_and(|v| self.test(v));
        hit != self.negate
    }

    fn test(&self, value: &str) -> bool {
        let operand = self.operand.as_str();
        match (&self.compiled, self.op) {
            (Compiled::Pattern(re), _) => re.is_match(value),
            (Compiled::Tokens(wanted), Operator::IncludesAll) => {
                wanted.iter().all(|w| tokens(value).any(|t| t == w))
            }
            (Compiled::Tokens(wanted), Operator::IncludesAny) => {
                wanted.iter().any(|w| tokens(value).any(|t| t == w))
            }
            (Compiled::Tokens(wanted), _) => wanted.iter().any(|w| w == value),
            (Compiled::Number(n), Operator::NumEquals) => {
                parse_decimal(value).is_some_and(|v| v == *n)
            }
            (Compiled::Number(n), op) => parse_decimal(value)
                .and_then(|v| v.partial_cmp(n))
                .is_some_and(|ordering| compare_matches(op, ordering)),
            (Compiled::Range(lo, hi), _) => {
                parse_decimal(value).is_some_and(|v| *lo <= v && v <= *hi)
            }
            (Compiled::Text, Operator::Equals) => value == operand,
            (Compiled::Text, Operator::Includes) => tokens(value).any(|t| t == operand),
            (Compiled::Text, Operator::Contains) => value.contains(operand),
            (Compiled::Text, Operator::StartsWith) => value.starts_with(operand),
            (Compiled::Text, Operator::EndsWith) => value.ends_with(operand),
            (Compiled::Text, op) => compare_matches(op, value.cmp(operand)),
        }
    }

    /// Candidate primary keys from `index`, or `None` when the index
    /// cannot serve this condition.
    ///
    /// The candidates are a superset of the matching keys; callers still
    /// evaluate every condition on them.
    #[must_use]
    pub fn index_candidates(&self, index: &ColumnIndex) -> Option<BTreeSet<String>> {
        if self.negate {
            return None;
        }
        match index {
            ColumnIndex::Lexical(entries) => match self.op {
                Operator::Equals => Some(entries.lookup(&self.operand)),
                Operator::StartsWith => Some(entries.prefix(&self.operand)),
                _ => None,
            },
            ColumnIndex::Decimal { numbers, .. } => match (&self.compiled, self.op) {
                (_, Operator::Equals) => Some(index.equal(&self.operand)),
                (Compiled::Number(n), op) => numeric_candidates(numbers, op, *n),
                (Compiled::Range(lo, hi), _) => {
                    Some(numbers.between(&DecimalKey::new(*lo), &DecimalKey::new(*hi)))
                }
                _ => None,
            },
        }
    }
}

fn numeric_candidates(
    numbers: &BTreeIndex<DecimalKey>,
    op: Operator,
    n: f64,
) -> Option<BTreeSet<String>> {
    let key = DecimalKey::new(n);
    match op {
        Operator::NumEquals => Some(numbers.lookup(&key)),
        Operator::GreaterThan => Some(numbers.greater_than(&key)),
        Operator::GreaterOrEqual => Some(numbers.greater_than_or_equal(&key)),
        Operator::LessThan => Some(numbers.less_than(&key)),
        Operator::LessOrEqual => Some(numbers.less_than_or_equal(&key)),
        _ => None,
    }
}

fn compare_matches(op: Operator, ordering: Ordering) -> bool {
    match op {
        Operator::GreaterThan => ordering == Ordering::Greater,
        Operator::GreaterOrEqual => ordering != Ordering::Less,
        Operator::LessThan => ordering == Ordering::Less,
        Operator::LessOrEqual => ordering != Ordering::Greater,
        _ => false,
    }
}

fn parse_range(operand: &str) -> TableResult<Compiled> {
    let bounds: Vec<f64> = operand
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(parse_decimal)
        .collect::<Option<_>>()
        .ok_or_else(|| bad_range(operand))?;
    match bounds.as_slice() {
        [lo, hi] => Ok(Compiled::Range(*lo, *hi)),
        _ => Err(bad_range(operand)),
    }
}

fn bad_range(operand: &str) -> TableError {
    TableError::invalid_argument(format!(
        "between needs two numbers as \"lo,hi\", got {operand:?}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexKind;

    fn jim() -> Record {
        Record::from([("name", "jim"), ("age", "25"), ("lang", "ja,en")])
    }

    fn check(op: Operator, column: &str, operand: &str) -> bool {
        Condition::new(column, op, operand, false)
            .unwrap()
            .matches("pk0", &jim())
    }

    #[test]
    fn operator_aliases() {
        assert_eq!("eq".parse::<Operator>().unwrap(), Operator::Equals);
        assert_eq!(":includes".parse::<Operator>().unwrap(), Operator::Includes);
        assert_eq!("bw".parse::<Operator>().unwrap(), Operator::StartsWith);
        assert_eq!("=~".parse::<Operator>().unwrap(), Operator::Matches);
        assert_eq!(">=".parse::<Operator>().unwrap(), Operator::GreaterOrEqual);
        assert_eq!("in".parse::<Operator>().unwrap(), Operator::EqualsAny);
        assert!("like".parse::<Operator>().is_err());
    }

    #[test]
    fn string_operators() {
        assert!(check(Operator::Equals, "name", "jim"));
        assert!(!check(Operator::Equals, "name", "ji"));
        assert!(check(Operator::Contains, "name", "i"));
        assert!(check(Operator::StartsWith, "name", "ji"));
        assert!(check(Operator::EndsWith, "name", "im"));
    }

    #[test]
    fn token_operators() {
        assert!(check(Operator::Includes, "lang", "en"));
        assert!(!check(Operator::Includes, "lang", "e"));
        assert!(check(Operator::IncludesAll, "lang", "en,ja"));
        assert!(!check(Operator::IncludesAll, "lang", "en,es"));
        assert!(check(Operator::IncludesAny, "lang", "es,ja"));
        assert!(check(Operator::EqualsAny, "name", "jeff,jim"));
        assert!(!check(Operator::EqualsAny, "name", "jeff,jack"));
    }

    #[test]
    fn tokens_are_literal() {
        let record = Record::from([("lang", "ja, en")]);
        let includes = |operand: &str| {
            Condition::new("lang", Operator::Includes, operand, false)
                .unwrap()
                .matches("pk0", &record)
        };
        assert!(!includes("en"));
        assert!(includes(" en"));
        assert!(includes("ja"));
    }

    #[test]
    fn regex_search() {
        assert!(check(Operator::Matches, "name", "^j.m$"));
        assert!(check(Operator::Matches, "name", "i"));
        assert!(!check(Operator::Matches, "name", "^j.+k"));
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let err = Condition::new("name", Operator::Matches, "(", false).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
    }

    #[test]
    fn numeric_comparisons() {
        assert!(check(Operator::GreaterThan, "age", "9"));
        assert!(check(Operator::LessThan, "age", "100"));
        assert!(check(Operator::GreaterOrEqual, "age", "25"));
        assert!(check(Operator::LessOrEqual, "age", "25.0"));
        assert!(check(Operator::NumEquals, "age", "25.0"));
        assert!(check(Operator::Between, "age", "20,30"));
        assert!(!check(Operator::Between, "age", "26,30"));
    }

    #[test]
    fn negative_zero_equals_zero() {
        let record = Record::from([("n", "-0")]);
        for op in [
            Operator::GreaterOrEqual,
            Operator::LessOrEqual,
            Operator::NumEquals,
        ] {
            let cond = Condition::new("n", op, "0", false).unwrap();
            assert!(cond.matches("pk0", &record), "{op:?}");
        }
        let cond = Condition::new("n", Operator::LessThan, "0", false).unwrap();
        assert!(!cond.matches("pk0", &record));
    }

    #[test]
    fn numeric_operand_skips_non_numeric_values() {
        assert!(!check(Operator::GreaterThan, "name", "1"));
    }

    #[test]
    fn lexical_comparison_for_text_operand() {
        assert!(check(Operator::GreaterThan, "name", "jeff"));
        assert!(!check(Operator::GreaterThan, "name", "joe"));
    }

    #[test]
    fn bad_numeric_operands() {
        assert!(Condition::new("age", Operator::NumEquals, "x", false).is_err());
        assert!(Condition::new("age", Operator::Between, "1", false).is_err());
        assert!(Condition::new("age", Operator::Between, "1,x", false).is_err());
        assert!(Condition::new("age", Operator::Between, "1 5", false).is_ok());
    }

    #[test]
    fn negation_and_missing_columns() {
        let record = jim();
        let negated = Condition::new("age", Operator::GreaterThan, "40", true).unwrap();
        assert!(negated.matches("pk0", &record));

        let missing = Condition::new("colour", Operator::Equals, "red", false).unwrap();
        assert!(!missing.matches("pk0", &record));
        let missing_negated = Condition::new("colour", Operator::Equals, "red", true).unwrap();
        assert!(missing_negated.matches("pk0", &record));
    }

    #[test]
    fn primary_key_column() {
        let cond = Condition::new(":pk", Operator::StartsWith, "pk", false).unwrap();
        assert!(cond.matches("pk0", &jim()));
        let cond = Condition::new("", Operator::Equals, "pk1", false).unwrap();
        assert!(!cond.matches("pk0", &jim()));
    }

    #[test]
    fn index_candidates_by_kind() {
        let mut lexical = ColumnIndex::new(IndexKind::Lexical).unwrap();
        let mut decimal = ColumnIndex::new(IndexKind::Decimal).unwrap();
        for (pk, age) in [("pk0", "25"), ("pk1", "32"), ("pk2", "44")] {
            lexical.insert(age, pk);
            decimal.insert(age, pk);
        }

        let gt = Condition::new("age", Operator::GreaterThan, "30", false).unwrap();
        assert!(gt.index_candidates(&lexical).is_none());
        assert_eq!(gt.index_candidates(&decimal).unwrap().len(), 2);

        let bw = Condition::new("age", Operator::StartsWith, "4", false).unwrap();
        assert_eq!(bw.index_candidates(&lexical).unwrap().len(), 1);
        assert!(bw.index_candidates(&decimal).is_none());

        let between = Condition::new("age", Operator::Between, "25,32", false).unwrap();
        assert_eq!(between.index_candidates(&decimal).unwrap().len(), 2);

        let negated = Condition::new("age", Operator::Equals, "25", true).unwrap();
        assert!(negated.index_candidates(&lexical).is_none());
    }
}
