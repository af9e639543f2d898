//! Per-column index storage.

use super::btree::BTreeIndex;
use super::IndexKind;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Parses a column value as a decimal number.
///
/// Surrounding whitespace is ignored; NaN is rejected so every parsed
/// value has a place in the total order.
pub(crate) fn parse_decimal(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Totally ordered numeric key used by decimal indexes.
#[derive(Debug, Clone, Copy)]
pub struct DecimalKey(f64);

impl DecimalKey {
    /// Wraps a number. Negative zero is stored as zero.
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(if value == 0.0 { 0.0 } else { value })
    }

    /// The wrapped number.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for DecimalKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DecimalKey {}

impl PartialOrd for DecimalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DecimalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// The entries of one declared index.
#[derive(Debug, Clone)]
pub enum ColumnIndex {
    /// Values ordered as strings.
    Lexical(BTreeIndex<String>),
    /// Values ordered as numbers; unparseable values kept aside.
    Decimal {
        /// Entries whose value parses as a number.
        numbers: BTreeIndex<DecimalKey>,
        /// Entries whose value does not.
        others: BTreeIndex<String>,
    },
}

impl ColumnIndex {
    /// Creates an empty index of the given kind, or `None` for
    /// [`IndexKind::Remove`].
    #[must_use]
    pub fn new(kind: IndexKind) -> Option<Self> {
        match kind {
            IndexKind::Lexical => Some(Self::Lexical(BTreeIndex::new())),
            IndexKind::Decimal => Some(Self::Decimal {
                numbers: BTreeIndex::new(),
                others: BTreeIndex::new(),
            }),
            IndexKind::Remove => None,
        }
    }

    /// The kind this index was declared with.
    #[must_use]
    pub fn kind(&self) -> IndexKind {
        match self {
            Self::Lexical(_) => IndexKind::Lexical,
            Self::Decimal { .. } => IndexKind::Decimal,
        }
    }

    /// Records that `pk` holds `value`.
    pub fn insert(&mut self, value: &str, pk: &str) {
        match self {
            Self::Lexical(index) => {
                index.insert(value.to_string(), pk);
            }
            Self::Decimal { numbers, others } => match parse_decimal(value) {
                Some(n) => {
                    numbers.insert(DecimalKey::new(n), pk);
                }
                None => {
                    others.insert(value.to_string(), pk);
                }
            },
        }
    }

    /// Forgets that `pk` holds `value`.
    pub fn remove(&mut self, value: &str, pk: &str) {
        match self {
            Self::Lexical(index) => {
                index.remove(&value.to_string(), pk);
            }
            Self::Decimal { numbers, others } => match parse_decimal(value) {
                Some(n) => {
                    numbers.remove(&DecimalKey::new(n), pk);
                }
                None => {
                    others.remove(&value.to_string(), pk);
                }
            },
        }
    }

    /// Primary keys whose value equals `operand`.
    ///
    /// For decimal indexes a numeric operand matches numerically, so `"5"`
    /// finds `"5.0"`.
    #[must_use]
    pub fn equal(&self, operand: &str) -> BTreeSet<String> {
        match self {
            Self::Lexical(index) => index.lookup(&operand.to_string()),
            Self::Decimal { numbers, others } => match parse_decimal(operand) {
                Some(n) => numbers.lookup(&DecimalKey::new(n)),
                None => others.lookup(&operand.to_string()),
            },
        }
    }

    /// Number of indexed (value, primary key) pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Lexical(index) => index.len(),
            Self::Decimal { numbers, others } => numbers.len() + others.len(),
        }
    }

    /// Whether nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry, keeping the declaration.
    pub fn clear(&mut self) {
        match self {
            Self::Lexical(index) => index.clear(),
            Self::Decimal { numbers, others } => {
                numbers.clear();
                others.clear();
            }
        }
    }
}
