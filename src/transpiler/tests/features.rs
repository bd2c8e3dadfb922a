//! Guards, batch shapes, key return and edge cases.

use pretty_assertions::assert_eq;

use super::{build, person, request, sql};
use crate::config::KeyReturnPolicy;
use crate::error::MapError;
use crate::predicate::{Field, Operator, PredicateGroup, PredicateNode};
use crate::schema::DbField;
use crate::transpiler::{Dialect, Operation, OrderField, StatementRequest};
use crate::value::{Value, ValueType};

/// Item { Code, Name } without a primary key.
fn item() -> Vec<DbField> {
    vec![
        DbField::new("Code", ValueType::Text).unwrap(),
        DbField::new("Name", ValueType::Text).unwrap(),
    ]
}

#[test]
fn test_negative_page_is_out_of_range() {
    let req = request().order_by(vec![OrderField::asc("Id")]);
    let err = build(
        Dialect::SqlServer,
        Operation::PagedQuery {
            page: -1,
            rows_per_batch: 10,
        },
        &req,
    )
    .unwrap_err();
    assert!(matches!(err, MapError::RangeInvalid { name: "page", value: -1 }));
}

#[test]
fn test_range_guards() {
    let req = request().order_by(vec![OrderField::asc("Id")]);
    let skip = Operation::SkipQuery { skip: 0, take: 0 };
    let err = build(Dialect::Postgres, skip, &req).unwrap_err();
    assert!(matches!(err, MapError::RangeInvalid { name: "take", .. }));
    let err = build(Dialect::MySql, Operation::SkipQuery { skip: -3, take: 1 }, &req).unwrap_err();
    assert!(matches!(err, MapError::RangeInvalid { name: "skip", value: -3 }));
    let err = build(Dialect::SqlServer, Operation::Query { top: Some(0) }, &req).unwrap_err();
    assert!(matches!(err, MapError::RangeInvalid { name: "top", .. }));
    let err = build(Dialect::SqlServer, Operation::InsertAll { batch_size: 0 }, &req).unwrap_err();
    assert!(matches!(err, MapError::RangeInvalid { name: "batch_size", .. }));
}

#[test]
fn test_paging_requires_order() {
    for dialect in [Dialect::SqlServer, Dialect::Postgres] {
        let err = build(
            dialect,
            Operation::PagedQuery {
                page: 0,
                rows_per_batch: 10,
            },
            &request(),
        )
        .unwrap_err();
        assert!(matches!(err, MapError::ArgumentInvalid(ref m) if m.contains("ORDER BY")));
    }
}

#[test]
fn test_missing_table_and_fields() {
    let req = StatementRequest::new("", person());
    let err = build(Dialect::SqlServer, Operation::Count, &req).unwrap_err();
    assert!(matches!(err, MapError::ArgumentInvalid(_)));

    let req = StatementRequest::new("Person", Vec::new());
    let err = build(Dialect::SqlServer, Operation::Query { top: None }, &req).unwrap_err();
    assert!(matches!(err, MapError::ArgumentInvalid(_)));
}

#[test]
fn test_merge_without_qualifiers_or_primary_key() {
    let req = StatementRequest::new("Item", item());
    for dialect in [Dialect::SqlServer, Dialect::Postgres, Dialect::MySql, Dialect::Sqlite] {
        let err = build(dialect, Operation::Merge, &req).unwrap_err();
        assert!(matches!(err, MapError::QualifierInvalid { .. }), "{:?}", dialect);
    }
    let err = build(Dialect::SqlServer, Operation::UpdateAll { batch_size: 2 }, &req).unwrap_err();
    assert!(matches!(err, MapError::QualifierInvalid { .. }));
}

#[test]
fn test_insert_requires_supplied_primary_key() {
    let schema = vec![
        DbField::new("Code", ValueType::Text).unwrap().primary(),
        DbField::new("Name", ValueType::Text).unwrap(),
    ];
    let req = StatementRequest::new("Item", vec![schema[1].clone()]).schema(schema);
    let err = build(Dialect::SqlServer, Operation::Insert, &req).unwrap_err();
    assert!(matches!(
        err,
        MapError::PrimaryFieldMissing { ref field, .. } if field == "Code"
    ));
}

#[test]
fn test_insert_skips_read_only_fields() {
    let mut fields = person();
    fields.push(DbField::new("RowVersion", ValueType::Bytes).unwrap().generated());
    let req = StatementRequest::new("Person", fields);
    let sql = sql(Dialect::Postgres, Operation::Insert, &req);
    assert_eq!(sql.matches('@').count(), 2);
    assert!(!sql.contains("@Id"));
    assert!(!sql.contains("@RowVersion"));
}

#[test]
fn test_batch_without_key_is_multi_row_insert() {
    let req = StatementRequest::new("Item", item()).key_return(KeyReturnPolicy::Identity);
    assert_eq!(
        sql(Dialect::Postgres, Operation::InsertAll { batch_size: 3 }, &req),
        "INSERT INTO \"Item\" (\"Code\", \"Name\") VALUES (@Code_0, @Name_0), (@Code_1, \
         @Name_1), (@Code_2, @Name_2);"
    );
    assert_eq!(
        sql(Dialect::SqlServer, Operation::InsertAll { batch_size: 2 }, &req),
        "INSERT INTO [Item] ([Code], [Name]) VALUES (@Code_0, @Name_0), (@Code_1, @Name_1);"
    );
}

#[test]
fn test_batch_exceeding_parameter_limit() {
    let req = StatementRequest::new("Item", item());
    // two parameters per row against SQLite's 999
    assert!(build(Dialect::Sqlite, Operation::InsertAll { batch_size: 499 }, &req).is_ok());
    let err = build(Dialect::Sqlite, Operation::InsertAll { batch_size: 500 }, &req).unwrap_err();
    assert!(matches!(err, MapError::RangeInvalid { name: "batch_size", value: 500 }));
}

#[test]
fn test_batch_rejects_filter() {
    let req = request().filter(PredicateGroup::single(PredicateNode::is_null(Field::new("Age"))));
    let err = build(Dialect::SqlServer, Operation::UpdateAll { batch_size: 2 }, &req).unwrap_err();
    assert!(matches!(err, MapError::ArgumentInvalid(_)));
    let err = build(Dialect::SqlServer, Operation::DeleteAll, &req).unwrap_err();
    assert!(matches!(err, MapError::ArgumentInvalid(_)));
}

#[test]
fn test_generated_default_key_not_selected_on_mysql() {
    let schema = vec![
        DbField::new("Code", ValueType::Uuid).unwrap().primary().default_value(),
        DbField::new("Name", ValueType::Text).unwrap(),
    ];
    let req = StatementRequest::new("Item", vec![schema[1].clone()]).schema(schema);
    assert_eq!(
        sql(Dialect::MySql, Operation::Insert, &req),
        "INSERT INTO `Item` (`Name`) VALUES (@Name);"
    );
    assert_eq!(
        sql(Dialect::SqlServer, Operation::Insert, &req),
        "INSERT INTO [Item] ([Name]) OUTPUT INSERTED.[Code] AS [Result] VALUES (@Name);"
    );
}

#[test]
fn test_empty_in_list_matches_nothing() {
    let req = request().filter(PredicateGroup::single(PredicateNode::new(
        Field::new("Id"),
        Operator::In,
        Value::List(Vec::new()),
    )));
    assert_eq!(
        sql(Dialect::SqlServer, Operation::Count, &req),
        "SELECT COUNT_BIG(1) AS [CountValue] FROM [Person] WHERE (1 = 0);"
    );
}

#[test]
fn test_negated_group_keeps_parentheses_at_top() {
    let group = PredicateGroup::or([
        PredicateNode::new(Field::new("Age"), Operator::LessThan, 18i64),
        PredicateNode::is_null(Field::new("Age")),
    ])
    .negate();
    let req = request().filter(group);
    assert_eq!(
        sql(Dialect::Postgres, Operation::Exists, &req),
        "SELECT 1 AS \"ExistsValue\" FROM \"Person\" WHERE NOT (\"Age\" < @Age OR \"Age\" IS \
         NULL) LIMIT 1;"
    );
}

#[test]
fn test_aggregate_unknown_field() {
    let err = build(
        Dialect::SqlServer,
        Operation::Aggregate {
            function: crate::transpiler::Aggregate::Sum,
            field: "Salary".to_string(),
        },
        &request(),
    )
    .unwrap_err();
    assert!(matches!(err, MapError::ArgumentInvalid(ref m) if m.contains("Salary")));
}

#[test]
fn test_same_request_same_text() {
    let req = request()
        .filter(PredicateGroup::single(PredicateNode::new(
            Field::new("Name"),
            Operator::Equal,
            "Jo",
        )))
        .order_by(vec![OrderField::asc("Id")]);
    let op = Operation::SkipQuery { skip: 10, take: 5 };
    for dialect in [Dialect::SqlServer, Dialect::Postgres, Dialect::MySql, Dialect::Sqlite] {
        assert_eq!(sql(dialect, op.clone(), &req), sql(dialect, op.clone(), &req));
    }
}
