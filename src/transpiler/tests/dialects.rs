//! PostgreSQL, MySQL and SQLite variations.

use pretty_assertions::assert_eq;

use super::{build, country, person, request, sql};
use crate::error::MapError;
use crate::predicate::{Field, Operator, PredicateGroup, PredicateNode};
use crate::transpiler::{Aggregate, Dialect, Operation, OrderField, StatementRequest};

#[test]
fn test_postgres_query_limit() {
    assert_eq!(
        sql(Dialect::Postgres, Operation::Query { top: Some(5) }, &request()),
        "SELECT \"Id\", \"Name\", \"Age\" FROM \"Person\" LIMIT 5;"
    );
}

#[test]
fn test_postgres_paged_query() {
    let req = request().order_by(vec![OrderField::desc("Name")]);
    assert_eq!(
        sql(
            Dialect::Postgres,
            Operation::PagedQuery {
                page: 2,
                rows_per_batch: 10
            },
            &req
        ),
        "SELECT \"Id\", \"Name\", \"Age\" FROM \"Person\" ORDER BY \"Name\" DESC LIMIT 10 OFFSET \
         20;"
    );
}

#[test]
fn test_postgres_insert_returning() {
    assert_eq!(
        sql(Dialect::Postgres, Operation::Insert, &request()),
        "INSERT INTO \"Person\" (\"Name\", \"Age\") VALUES (@Name, @Age) RETURNING \"Id\" AS \
         \"Result\";"
    );
}

#[test]
fn test_postgres_insert_all_one_statement_per_row() {
    assert_eq!(
        sql(Dialect::Postgres, Operation::InsertAll { batch_size: 2 }, &request()),
        "INSERT INTO \"Person\" (\"Name\", \"Age\") VALUES (@Name_0, @Age_0) RETURNING \"Id\" AS \
         \"Result\", 0 AS \"OrderColumn\"; \
         INSERT INTO \"Person\" (\"Name\", \"Age\") VALUES (@Name_1, @Age_1) RETURNING \"Id\" AS \
         \"Result\", 1 AS \"OrderColumn\";"
    );
}

#[test]
fn test_postgres_merge_on_conflict() {
    assert_eq!(
        sql(Dialect::Postgres, Operation::Merge, &country()),
        "INSERT INTO \"Country\" (\"Code\", \"Name\") VALUES (@Code, @Name) \
         ON CONFLICT (\"Code\") DO UPDATE SET \"Name\" = EXCLUDED.\"Name\" \
         RETURNING \"Code\" AS \"Result\";"
    );
}

#[test]
fn test_postgres_merge_leaves_identity_to_database() {
    assert_eq!(
        sql(Dialect::Postgres, Operation::Merge, &request()),
        "WITH matched AS (UPDATE \"Person\" SET \"Name\" = @Name, \"Age\" = @Age \
         WHERE \"Id\" = @Id RETURNING \"Id\"), \
         inserted AS (INSERT INTO \"Person\" (\"Name\", \"Age\") SELECT @Name, @Age \
         WHERE NOT EXISTS (SELECT 1 FROM matched) RETURNING \"Id\") \
         SELECT \"Id\" AS \"Result\" FROM matched UNION ALL SELECT \"Id\" AS \"Result\" FROM \
         inserted;"
    );
}

#[test]
fn test_postgres_merge_all_tags_rows() {
    let text = sql(Dialect::Postgres, Operation::MergeAll { batch_size: 2 }, &request());
    assert!(text.contains("WHERE \"Id\" = @Id_1 RETURNING \"Id\""));
    assert!(text.contains("SELECT @Name_1, @Age_1 WHERE NOT EXISTS"));
    assert!(text.ends_with(
        "SELECT \"Id\" AS \"Result\", 1 AS \"OrderColumn\" FROM matched \
         UNION ALL SELECT \"Id\" AS \"Result\", 1 AS \"OrderColumn\" FROM inserted;"
    ));
    assert_eq!(text.matches("WITH matched").count(), 2);
}

#[test]
fn test_postgres_merge_without_updates_selects_match() {
    let req = StatementRequest::new("Person", person()[..1].to_vec()).schema(person());
    assert_eq!(
        sql(Dialect::Postgres, Operation::Merge, &req),
        "WITH matched AS (SELECT \"Id\" FROM \"Person\" WHERE \"Id\" = @Id), \
         inserted AS (INSERT INTO \"Person\" SELECT WHERE NOT EXISTS (SELECT 1 FROM matched) \
         RETURNING \"Id\") \
         SELECT \"Id\" AS \"Result\" FROM matched UNION ALL SELECT \"Id\" AS \"Result\" FROM \
         inserted;"
    );
}

#[test]
fn test_postgres_misc() {
    assert_eq!(
        sql(Dialect::Postgres, Operation::Truncate, &request()),
        "TRUNCATE TABLE \"Person\" RESTART IDENTITY;"
    );
    assert_eq!(
        sql(Dialect::Postgres, Operation::Count, &request()),
        "SELECT COUNT(1) AS \"CountValue\" FROM \"Person\";"
    );
    assert_eq!(
        sql(Dialect::Postgres, Operation::Exists, &request()),
        "SELECT 1 AS \"ExistsValue\" FROM \"Person\" LIMIT 1;"
    );
}

#[test]
fn test_mysql_insert_selects_last_id() {
    assert_eq!(
        sql(Dialect::MySql, Operation::Insert, &request()),
        "INSERT INTO `Person` (`Name`, `Age`) VALUES (@Name, @Age); SELECT LAST_INSERT_ID() AS \
         `Result`;"
    );
}

#[test]
fn test_mysql_insert_all() {
    assert_eq!(
        sql(Dialect::MySql, Operation::InsertAll { batch_size: 2 }, &request()),
        "INSERT INTO `Person` (`Name`, `Age`) VALUES (@Name_0, @Age_0); SELECT LAST_INSERT_ID() \
         AS `Result`, 0 AS `OrderColumn`; \
         INSERT INTO `Person` (`Name`, `Age`) VALUES (@Name_1, @Age_1); SELECT LAST_INSERT_ID() \
         AS `Result`, 1 AS `OrderColumn`;"
    );
}

#[test]
fn test_mysql_merge_on_duplicate_key() {
    assert_eq!(
        sql(Dialect::MySql, Operation::Merge, &request()),
        "INSERT INTO `Person` (`Id`, `Name`, `Age`) VALUES (NULLIF(@Id, 0), @Name, @Age) \
         ON DUPLICATE KEY UPDATE `Id` = LAST_INSERT_ID(`Id`), `Name` = VALUES(`Name`), `Age` = \
         VALUES(`Age`); \
         SELECT LAST_INSERT_ID() AS `Result`;"
    );
}

#[test]
fn test_mysql_merge_supplied_key_selects_parameter() {
    assert_eq!(
        sql(Dialect::MySql, Operation::Merge, &country()),
        "INSERT INTO `Country` (`Code`, `Name`) VALUES (@Code, @Name) \
         ON DUPLICATE KEY UPDATE `Name` = VALUES(`Name`); SELECT @Code AS `Result`;"
    );
}

#[test]
fn test_mysql_skip_and_truncate() {
    let req = request().order_by(vec![OrderField::asc("Id")]);
    assert_eq!(
        sql(Dialect::MySql, Operation::SkipQuery { skip: 0, take: 3 }, &req),
        "SELECT `Id`, `Name`, `Age` FROM `Person` ORDER BY `Id` ASC LIMIT 3 OFFSET 0;"
    );
    assert_eq!(
        sql(Dialect::MySql, Operation::Truncate, &request()),
        "TRUNCATE TABLE `Person`;"
    );
}

#[test]
fn test_sqlite_insert_selects_rowid() {
    assert_eq!(
        sql(Dialect::Sqlite, Operation::Insert, &request()),
        "INSERT INTO \"Person\" (\"Name\", \"Age\") VALUES (@Name, @Age); SELECT \
         last_insert_rowid() AS \"Result\";"
    );
}

#[test]
fn test_sqlite_merge_replaces_on_primary_key() {
    assert_eq!(
        sql(Dialect::Sqlite, Operation::Merge, &request()),
        "INSERT OR REPLACE INTO \"Person\" (\"Id\", \"Name\", \"Age\") VALUES (NULLIF(@Id, 0), \
         @Name, @Age); \
         SELECT last_insert_rowid() AS \"Result\";"
    );
    assert_eq!(
        sql(Dialect::Sqlite, Operation::Merge, &country()),
        "INSERT OR REPLACE INTO \"Country\" (\"Code\", \"Name\") VALUES (@Code, @Name); \
         SELECT @Code AS \"Result\";"
    );
}

#[test]
fn test_sqlite_merge_rejects_other_qualifiers() {
    let req = request().qualifiers(["Name"]);
    let err = build(Dialect::Sqlite, Operation::Merge, &req).unwrap_err();
    assert!(matches!(err, MapError::UnsupportedFeature(ref m) if m.contains("insert/replace")));
    let err = build(Dialect::Sqlite, Operation::MergeAll { batch_size: 2 }, &req).unwrap_err();
    assert!(matches!(err, MapError::UnsupportedFeature(_)));
}

#[test]
fn test_sqlite_truncate_and_aggregate() {
    assert_eq!(
        sql(Dialect::Sqlite, Operation::Truncate, &request()),
        "DELETE FROM \"Person\";"
    );
    let req = request().filter(PredicateGroup::single(PredicateNode::new(
        Field::new("Name"),
        Operator::Like,
        "Jo%",
    )));
    assert_eq!(
        sql(
            Dialect::Sqlite,
            Operation::Aggregate {
                function: Aggregate::Avg,
                field: "Age".to_string()
            },
            &req
        ),
        "SELECT AVG(\"Age\") AS \"AverageValue\" FROM \"Person\" WHERE \"Name\" LIKE @Name;"
    );
}

#[test]
fn test_hints_rejected_outside_sql_server() {
    let req = request().hints("NOLOCK");
    for dialect in [Dialect::Postgres, Dialect::MySql, Dialect::Sqlite] {
        let err = build(dialect, Operation::Query { top: None }, &req).unwrap_err();
        assert!(matches!(err, MapError::UnsupportedFeature(_)), "{:?}", dialect);
    }
    assert!(build(Dialect::SqlServer, Operation::Query { top: None }, &req).is_ok());
}
