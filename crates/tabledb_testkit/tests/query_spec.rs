//! Query behaviour against the people data set.

use tabledb_core::{Direction, ErrorKind, IndexKind, Operator, Plan, Row, TableError};
use tabledb_testkit::prelude::*;

#[test]
fn includes_token() {
    let table = prepare_table_with_data();
    let rows = table
        .query(|q| {
            q.add("lang", Operator::Includes, "en");
        })
        .unwrap();
    assert_eq!(rows.len(), 4);

    let rows = table
        .query(|q| {
            q.add("lang", Operator::Includes, "ja").pk_only();
        })
        .unwrap();
    assert_eq!(rows, vec![Row::Key("pk0".into())]);
}

#[test]
fn numeric_greater_than_and_negation() {
    let table = prepare_table_with_data();
    let rows = table
        .query(|q| {
            q.add("age", Operator::GreaterThan, "40").pk_only();
        })
        .unwrap();
    assert_eq!(keys_of(&rows), vec!["pk2", "pk3"]);

    let rows = table
        .query(|q| {
            q.add_negated("age", Operator::GreaterThan, "40").pk_only();
        })
        .unwrap();
    assert_eq!(keys_of(&rows), vec!["pk0", "pk1"]);
}

#[test]
fn regex_match() {
    let table = prepare_table_with_data();
    let rows = table
        .query(|q| {
            q.add("name", Operator::Matches, "^j.+k").pk_only();
        })
        .unwrap();
    assert_eq!(keys_of(&rows), vec!["pk2", "pk3"]);
}

#[test]
fn invalid_regex_is_rejected() {
    let table = prepare_table_with_data();
    let err = table
        .query(|q| {
            q.add("name", Operator::Matches, "(unclosed");
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn order_limit_offset() {
    let table = prepare_table_with_data();
    let rows = table
        .query(|q| {
            q.add("lang", Operator::Includes, "en")
                .order_by("name", Direction::Desc)
                .limit(2);
        })
        .unwrap();
    assert_eq!(column_of(&rows, "name"), vec!["jim", "jeff"]);

    let rows = table
        .query(|q| {
            q.add("lang", Operator::Includes, "en")
                .order_by("name", Direction::Desc)
                .limit(2)
                .offset(2);
        })
        .unwrap();
    assert_eq!(column_of(&rows, "name"), vec!["jake", "jack"]);

    let rows = table
        .query(|q| {
            q.order_by("name", Direction::Asc);
        })
        .unwrap();
    assert_eq!(column_of(&rows, "name"), vec!["jack", "jake", "jeff", "jim"]);

    let rows = table
        .query(|q| {
            q.order_by("age", Direction::NumAsc).pk_only();
        })
        .unwrap();
    assert_eq!(keys_of(&rows), vec!["pk0", "pk1", "pk2", "pk3"]);
}

#[test]
fn numeric_order_is_not_lexical() {
    let table = prepare_table_with_data();
    table.put("pk4", &person("joe", "100", "en")).unwrap();
    table.put("pk5", &person("jon", "9", "en")).unwrap();

    let rows = table
        .query(|q| {
            q.order_by("age", Direction::NumDesc).pk_only().limit(2);
        })
        .unwrap();
    assert_eq!(keys_of(&rows), vec!["pk4", "pk3"]);

    let rows = table
        .query(|q| {
            q.order_by("age", Direction::Asc).pk_only().limit(2);
        })
        .unwrap();
    assert_eq!(keys_of(&rows), vec!["pk4", "pk0"]);
}

#[test]
fn output_shapes() {
    let table = prepare_table_with_data();

    let full = table
        .query(|q| {
            q.add("name", Operator::Equals, "jeff");
        })
        .unwrap();
    let record = full[0].record().unwrap();
    assert_eq!(
        record.iter().collect::<Vec<_>>(),
        vec![
            (":pk", "pk1"),
            ("name", "jeff"),
            ("age", "32"),
            ("lang", "en,es")
        ]
    );

    let no_pk = table
        .query(|q| {
            q.add("name", Operator::Equals, "jeff").no_pk();
        })
        .unwrap();
    assert_eq!(no_pk[0].key(), None);
    assert_eq!(no_pk[0].get("age"), Some("32"));
}

#[test]
fn token_and_text_operators() {
    let table = prepare_table_with_data();
    let keys = |op: Operator, column: &str, operand: &str| {
        keys_of(
            &table
                .query(|q| {
                    q.add(column, op, operand).pk_only();
                })
                .unwrap(),
        )
    };

    assert_eq!(keys(Operator::Contains, "name", "ak"), vec!["pk3"]);
    assert_eq!(keys(Operator::StartsWith, "name", "ja"), vec!["pk2", "pk3"]);
    assert_eq!(keys(Operator::EndsWith, "name", "ff"), vec!["pk1"]);
    assert_eq!(keys(Operator::IncludesAll, "lang", "en,es"), vec!["pk1"]);
    assert_eq!(
        keys(Operator::IncludesAny, "lang", "ja,li"),
        vec!["pk0", "pk3"]
    );
    assert_eq!(keys(Operator::EqualsAny, "name", "jim,jack"), vec!["pk0", "pk2"]);
    assert_eq!(keys(Operator::NumEquals, "age", "44.0"), vec!["pk2"]);
    assert_eq!(keys(Operator::Between, "age", "30,44"), vec!["pk1", "pk2"]);
    assert_eq!(keys(Operator::GreaterOrEqual, "age", "44"), vec!["pk2", "pk3"]);
    assert_eq!(keys(Operator::LessOrEqual, "age", "32"), vec!["pk0", "pk1"]);
    assert_eq!(keys(Operator::LessThan, "name", "jak"), vec!["pk2"]);
    assert_eq!(keys(Operator::Equals, ":pk", "pk3"), vec!["pk3"]);
}

#[test]
fn missing_column_never_matches_unless_negated() {
    let table = prepare_table_with_data();
    let rows = table
        .query(|q| {
            q.add("height", Operator::Equals, "").pk_only();
        })
        .unwrap();
    assert!(rows.is_empty());

    let rows = table
        .query(|q| {
            q.add_negated("height", Operator::Equals, "").pk_only();
        })
        .unwrap();
    assert_eq!(rows.len(), 4);
}

#[test]
fn conditions_by_name() {
    let table = prepare_table_with_data();
    let rows = table
        .query(|q| {
            q.add_str("age", ":gt", "40", true)
                .add_str("lang", "includes", "li", false)
                .order_by_str("name", "strdesc")
                .pk_only();
        })
        .unwrap();
    assert_eq!(keys_of(&rows), vec!["pk2"]);

    let err = table
        .query(|q| {
            q.add_str("age", "bogus", "40", true);
        })
        .unwrap_err();
    assert!(matches!(err, TableError::InvalidArgument { .. }));
}

#[test]
fn indexes_answer_the_same_as_scans() {
    let table = prepare_table_with_data();
    let scan = table
        .query(|q| {
            q.add("age", Operator::GreaterThan, "40").pk_only();
        })
        .unwrap();

    table.set_index("age", IndexKind::Decimal).unwrap();
    let plan = table
        .explain(|q| {
            q.add("age", Operator::GreaterThan, "40");
        })
        .unwrap();
    assert_eq!(
        plan,
        Plan::Index {
            column: "age".into()
        }
    );
    let indexed = table
        .query(|q| {
            q.add("age", Operator::GreaterThan, "40").pk_only();
        })
        .unwrap();
    assert_eq!(indexed, scan);

    table.put("pk4", &person("jo", "41", "en")).unwrap();
    table.delete("pk3").unwrap();
    let indexed = table
        .query(|q| {
            q.add("age", Operator::GreaterThan, "40").pk_only();
        })
        .unwrap();
    assert_eq!(keys_of(&indexed), vec!["pk2", "pk4"]);

    let plan = table
        .explain(|q| {
            q.add_negated("age", Operator::GreaterThan, "40");
        })
        .unwrap();
    assert_eq!(plan, Plan::FullScan);
}

#[test]
fn lexical_index_on_primary_key() {
    let table = prepare_table_with_data();
    table.set_index("", IndexKind::Lexical).unwrap();
    let plan = table
        .explain(|q| {
            q.add(":pk", Operator::StartsWith, "pk");
        })
        .unwrap();
    assert_eq!(plan, Plan::Index { column: "".into() });

    let rows = table
        .query(|q| {
            q.add(":pk", Operator::StartsWith, "pk")
                .add("name", Operator::Equals, "jack")
                .pk_only();
        })
        .unwrap();
    assert_eq!(keys_of(&rows), vec!["pk2"]);
}

#[test]
fn prepared_query_counts_once_and_sees_changes() {
    let table = prepare_table_with_data();
    let prepared = table
        .prepare_query(|q| {
            q.add("lang", Operator::Includes, "en").pk_only();
        })
        .unwrap();
    assert_eq!(prepared.count().unwrap(), 4);

    table.delete("pk0").unwrap();
    assert_eq!(prepared.run().unwrap().len(), 3);
    // count was cached by the first execution
    assert_eq!(prepared.count().unwrap(), 4);
    assert_eq!(prepared.to_vec().unwrap().len(), 3);
}

#[test]
fn delete_matching_respects_limit() {
    let table = prepare_table_with_data();
    table.set_index("name", IndexKind::Lexical).unwrap();
    let deleted = table
        .delete_matching(|q| {
            q.add("name", Operator::StartsWith, "ja")
                .order_by("age", Direction::NumDesc)
                .limit(1);
        })
        .unwrap();
    assert_eq!(deleted, 1);
    assert!(table.get("pk3").unwrap().is_none());

    let rows = table
        .query(|q| {
            q.add("name", Operator::StartsWith, "ja").pk_only();
        })
        .unwrap();
    assert_eq!(keys_of(&rows), vec!["pk2"]);
}

#[test]
fn delete_matching_inside_a_transaction_rolls_back() {
    let table = prepare_table_with_data();
    table.begin().unwrap();
    let deleted = table
        .delete_matching(|q| {
            q.add("lang", Operator::Includes, "en");
        })
        .unwrap();
    assert_eq!(deleted, 4);
    assert_eq!(table.size().unwrap(), 0);
    table.abort().unwrap();
    assert_eq!(table.size().unwrap(), 4);
}
