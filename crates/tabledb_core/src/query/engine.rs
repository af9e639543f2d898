//! Query execution against the store and its indexes.

use super::builder::{Direction, Query};
use super::row::Row;
use crate::error::TableResult;
use crate::index::{canonical_column, parse_decimal, DecimalKey, IndexManager};
use crate::store::Store;
use crate::types::is_pk_column;
use std::cmp::Reverse;
use std::collections::BTreeSet;
use tabledb_codec::{decode_record, Record};
use tracing::trace;

/// How the matching keys were found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Every record was examined in key order.
    FullScan,
    /// Candidates came from the index on `column`.
    Index {
        /// Indexed column.
        column: String,
    },
}

/// Picks candidate keys from an index when exactly one condition can use
/// one.
fn choose(query: &Query, indexes: &IndexManager) -> (Plan, Option<BTreeSet<String>>) {
    let mut usable = query.conditions.iter().filter_map(|condition| {
        indexes
            .get(condition.column())
            .and_then(|index| condition.index_candidates(index))
            .map(|candidates| (condition.column(), candidates))
    });
    match (usable.next(), usable.next()) {
        (Some((column, candidates)), None) => (
            Plan::Index {
                column: canonical_column(column).to_string(),
            },
            Some(candidates),
        ),
        _ => (Plan::FullScan, None),
    }
}

/// The plan `select` would use for `query`.
pub(crate) fn plan(query: &Query, indexes: &IndexManager) -> Plan {
    choose(query, indexes).0
}

/// Records matching every condition, sorted, offset and limited.
pub(crate) fn select(
    query: &Query,
    store: &Store,
    indexes: &IndexManager,
) -> TableResult<(Plan, Vec<(String, Record)>)> {
    let (plan, candidates) = choose(query, indexes);
    let mut matched = Vec::new();

    let mut consider = |pk: &str, bytes: &[u8]| -> TableResult<()> {
        let record = decode_record(bytes)?;
        if query.conditions.iter().all(|c| c.matches(pk, &record)) {
            matched.push((pk.to_string(), record));
        }
        Ok(())
    };
    match &candidates {
        Some(keys) => {
            for pk in keys {
                if let Some(bytes) = store.get(pk) {
                    consider(pk, bytes)?;
                }
            }
        }
        None => {
            for (pk, bytes) in store.iter() {
                consider(pk, bytes)?;
            }
        }
    }
    trace!(?plan, matched = matched.len(), "query filtered");

    if let Some((column, direction)) = &query.order {
        sort(&mut matched, column, *direction);
    }

    let rows = matched
        .into_iter()
        .skip(query.offset)
        .take(query.limit.unwrap_or(usize::MAX))
        .collect();
    Ok((plan, rows))
}

/// Runs `query` and shapes the rows.
pub(crate) fn execute(query: &Query, store: &Store, indexes: &IndexManager) -> TableResult<Vec<Row>> {
    let (_, selected) = select(query, store, indexes)?;
    Ok(selected
        .into_iter()
        .map(|(pk, record)| Row::shape(query.shape, pk, record))
        .collect())
}

fn sort_value<'a>(pk: &'a str, record: &'a Record, column: &str) -> Option<&'a str> {
    if is_pk_column(column) {
        Some(pk)
    } else {
        record.get(column)
    }
}

fn sort(rows: &mut [(String, Record)], column: &str, direction: Direction) {
    let text = |row: &(String, Record)| sort_value(&row.0, &row.1, column).unwrap_or("").to_string();
    let number = |row: &(String, Record)| {
        sort_value(&row.0, &row.1, column)
            .and_then(parse_decimal)
            .map_or(DecimalKey::new(0.0), DecimalKey::new)
    };
    match direction {
        Direction::Asc => rows.sort_by_cached_key(text),
        Direction::Desc => rows.sort_by_cached_key(|row| Reverse(text(row))),
        Direction::NumAsc => rows.sort_by_cached_key(number),
        Direction::NumDesc => rows.sort_by_cached_key(|row| Reverse(number(row))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexKind;
    use crate::query::{Operator, QueryBuilder};
    use tabledb_codec::encode_record;

    fn people() -> Store {
        let mut store = Store::new();
        for (pk, name, age, lang) in [
            ("pk0", "jim", "25", "ja,en"),
            ("pk1", "jeff", "32", "en,es"),
            ("pk2", "jack", "44", "en"),
            ("pk3", "jake", "45", "en,li"),
        ] {
            let record = Record::from([("name", name), ("age", age), ("lang", lang)]);
            store.put(pk.into(), encode_record(&record));
        }
        store
    }

    fn run(store: &Store, indexes: &IndexManager, build: impl FnOnce(&mut QueryBuilder)) -> Vec<Row> {
        let mut q = QueryBuilder::new();
        build(&mut q);
        execute(&q.build().unwrap(), store, indexes).unwrap()
    }

    fn keys(rows: &[Row]) -> Vec<&str> {
        rows.iter().filter_map(Row::key).collect()
    }

    fn names(rows: &[Row]) -> Vec<&str> {
        rows.iter().filter_map(|r| r.get("name")).collect()
    }

    #[test]
    fn full_scan_filters_in_key_order() {
        let store = people();
        let rows = run(&store, &IndexManager::new(), |q| {
            q.add("age", Operator::GreaterThan, "40").pk_only();
        });
        assert_eq!(keys(&rows), vec!["pk2", "pk3"]);
    }

    #[test]
    fn order_offset_limit() {
        let store = people();
        let none = IndexManager::new();
        let rows = run(&store, &none, |q| {
            q.add("lang", Operator::Includes, "en")
                .order_by("name", Direction::Desc)
                .limit(2);
        });
        assert_eq!(names(&rows), vec!["jim", "jeff"]);

        let rows = run(&store, &none, |q| {
            q.add("lang", Operator::Includes, "en")
                .order_by("name", Direction::Desc)
                .limit(2)
                .offset(2);
        });
        assert_eq!(names(&rows), vec!["jake", "jack"]);
    }

    #[test]
    fn numeric_ordering_with_missing_values() {
        let mut store = people();
        store.put("pk4".into(), encode_record(&Record::from([("name", "joe")])));
        let rows = run(&store, &IndexManager::new(), |q| {
            q.order_by("age", Direction::NumDesc).pk_only();
        });
        assert_eq!(keys(&rows), vec!["pk3", "pk2", "pk1", "pk0", "pk4"]);
    }

    #[test]
    fn sort_is_stable() {
        let store = people();
        let rows = run(&store, &IndexManager::new(), |q| {
            q.order_by("missing", Direction::Desc).pk_only();
        });
        assert_eq!(keys(&rows), vec!["pk0", "pk1", "pk2", "pk3"]);
    }

    #[test]
    fn index_plan_is_chosen_for_one_usable_condition() {
        let store = people();
        let mut indexes = IndexManager::new();
        indexes.set("age", IndexKind::Decimal, &store).unwrap();

        let mut q = QueryBuilder::new();
        q.add("age", Operator::GreaterThan, "40")
            .add("lang", Operator::Includes, "li");
        let (plan, rows) = select(&q.build().unwrap(), &store, &indexes).unwrap();
        assert_eq!(
            plan,
            Plan::Index {
                column: "age".into()
            }
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, "pk3");
    }

    #[test]
    fn two_usable_conditions_fall_back_to_scan() {
        let store = people();
        let mut indexes = IndexManager::new();
        indexes.set("age", IndexKind::Decimal, &store).unwrap();
        indexes.set("name", IndexKind::Lexical, &store).unwrap();

        let mut q = QueryBuilder::new();
        q.add("age", Operator::GreaterThan, "40")
            .add("name", Operator::StartsWith, "ja");
        let (plan, rows) = select(&q.build().unwrap(), &store, &indexes).unwrap();
        assert_eq!(plan, Plan::FullScan);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn shapes() {
        let store = people();
        let rows = run(&store, &IndexManager::new(), |q| {
            q.add("name", Operator::Matches, "^j.+k").no_pk();
        });
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key(), None);
        let full = run(&store, &IndexManager::new(), |q| {
            q.add("name", Operator::Equals, "jack");
        });
        assert_eq!(full[0].record().unwrap().iter().next(), Some((":pk", "pk2")));
    }
}
