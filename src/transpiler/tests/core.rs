//! Every operation kind on SQL Server.

use pretty_assertions::assert_eq;

use super::{request, sql};
use crate::predicate::{Field, Operator, PredicateGroup, PredicateNode};
use crate::transpiler::{Aggregate, Dialect, Operation, OrderField};

const MSSQL: Dialect = Dialect::SqlServer;

fn adults() -> PredicateGroup {
    PredicateGroup::single(PredicateNode::new(
        Field::new("Age"),
        Operator::GreaterOrEqual,
        18i64,
    ))
}

#[test]
fn test_query() {
    assert_eq!(
        sql(MSSQL, Operation::Query { top: None }, &request()),
        "SELECT [Id], [Name], [Age] FROM [Person];"
    );
}

#[test]
fn test_query_top_filter_order() {
    let req = request()
        .filter(adults())
        .order_by(vec![OrderField::asc("Name")]);
    assert_eq!(
        sql(MSSQL, Operation::Query { top: Some(10) }, &req),
        "SELECT TOP (10) [Id], [Name], [Age] FROM [Person] WHERE [Age] >= @Age ORDER BY [Name] ASC;"
    );
}

#[test]
fn test_query_with_hints() {
    let req = request().hints("NOLOCK");
    assert_eq!(
        sql(MSSQL, Operation::Query { top: None }, &req),
        "SELECT [Id], [Name], [Age] FROM [Person] WITH (NOLOCK);"
    );
}

#[test]
fn test_paged_query() {
    let req = request().order_by(vec![OrderField::asc("Id")]);
    assert_eq!(
        sql(
            MSSQL,
            Operation::PagedQuery {
                page: 1,
                rows_per_batch: 10
            },
            &req
        ),
        "WITH CTE AS (SELECT ROW_NUMBER() OVER (ORDER BY [Id] ASC) AS [RowNumber], [Id], [Name], \
         [Age] FROM [Person]) \
         SELECT [Id], [Name], [Age] FROM CTE WHERE ([RowNumber] BETWEEN 11 AND 20) ORDER BY \
         [RowNumber] ASC;"
    );
}

#[test]
fn test_skip_query() {
    let req = request().order_by(vec![OrderField::asc("Id")]);
    assert_eq!(
        sql(MSSQL, Operation::SkipQuery { skip: 5, take: 10 }, &req),
        "SELECT [Id], [Name], [Age] FROM [Person] ORDER BY [Id] ASC OFFSET 5 ROWS FETCH NEXT 10 \
         ROWS ONLY;"
    );
}

#[test]
fn test_insert_returns_identity_through_output() {
    assert_eq!(
        sql(MSSQL, Operation::Insert, &request()),
        "INSERT INTO [Person] ([Name], [Age]) OUTPUT INSERTED.[Id] AS [Result] VALUES (@Name, \
         @Age);"
    );
}

#[test]
fn test_insert_all_merges_with_order_column() {
    assert_eq!(
        sql(MSSQL, Operation::InsertAll { batch_size: 2 }, &request()),
        "MERGE [Person] AS T USING (VALUES (@Name_0, @Age_0, 0), (@Name_1, @Age_1, 1)) \
         AS S ([Name], [Age], [__OrderColumn]) ON 1 = 0 \
         WHEN NOT MATCHED THEN INSERT ([Name], [Age]) VALUES (S.[Name], S.[Age]) \
         OUTPUT INSERTED.[Id] AS [Result], S.[__OrderColumn] AS [OrderColumn];"
    );
}

#[test]
fn test_update_by_primary_key() {
    assert_eq!(
        sql(MSSQL, Operation::Update, &request()),
        "UPDATE [Person] SET [Name] = @Name, [Age] = @Age WHERE [Id] = @Id;"
    );
}

#[test]
fn test_update_by_filter_avoids_set_names() {
    let req = request().filter(PredicateGroup::single(PredicateNode::new(
        Field::new("Name"),
        Operator::Equal,
        "Jo",
    )));
    assert_eq!(
        sql(MSSQL, Operation::Update, &req),
        "UPDATE [Person] SET [Name] = @Name, [Age] = @Age WHERE [Name] = @Name_1;"
    );
}

#[test]
fn test_update_all() {
    assert_eq!(
        sql(MSSQL, Operation::UpdateAll { batch_size: 2 }, &request()),
        "UPDATE [Person] SET [Name] = @Name_0, [Age] = @Age_0 WHERE [Id] = @Id_0; \
         UPDATE [Person] SET [Name] = @Name_1, [Age] = @Age_1 WHERE [Id] = @Id_1;"
    );
}

#[test]
fn test_merge() {
    assert_eq!(
        sql(MSSQL, Operation::Merge, &request()),
        "MERGE [Person] AS T USING (SELECT @Id AS [Id], @Name AS [Name], @Age AS [Age]) AS S \
         ON (S.[Id] = T.[Id]) WHEN NOT MATCHED THEN INSERT ([Name], [Age]) VALUES (S.[Name], \
         S.[Age]) \
         WHEN MATCHED THEN UPDATE SET T.[Name] = S.[Name], T.[Age] = S.[Age] \
         OUTPUT INSERTED.[Id] AS [Result];"
    );
}

#[test]
fn test_merge_on_explicit_qualifier() {
    let req = request().qualifiers(["Name"]);
    assert_eq!(
        sql(MSSQL, Operation::Merge, &req),
        "MERGE [Person] AS T USING (SELECT @Name AS [Name], @Age AS [Age]) AS S \
         ON (S.[Name] = T.[Name]) WHEN NOT MATCHED THEN INSERT ([Name], [Age]) VALUES (S.[Name], \
         S.[Age]) \
         WHEN MATCHED THEN UPDATE SET T.[Age] = S.[Age] \
         OUTPUT INSERTED.[Id] AS [Result];"
    );
}

#[test]
fn test_merge_all() {
    assert_eq!(
        sql(MSSQL, Operation::MergeAll { batch_size: 2 }, &request()),
        "MERGE [Person] AS T USING (VALUES (@Id_0, @Name_0, @Age_0, 0), (@Id_1, @Name_1, @Age_1, \
         1)) \
         AS S ([Id], [Name], [Age], [__OrderColumn]) \
         ON (S.[Id] = T.[Id]) WHEN NOT MATCHED THEN INSERT ([Name], [Age]) VALUES (S.[Name], \
         S.[Age]) \
         WHEN MATCHED THEN UPDATE SET T.[Name] = S.[Name], T.[Age] = S.[Age] \
         OUTPUT INSERTED.[Id] AS [Result], S.[__OrderColumn] AS [OrderColumn];"
    );
}

#[test]
fn test_delete() {
    assert_eq!(
        sql(MSSQL, Operation::Delete, &request()),
        "DELETE FROM [Person] WHERE [Id] = @Id;"
    );
    assert_eq!(
        sql(MSSQL, Operation::Delete, &request().filter(adults())),
        "DELETE FROM [Person] WHERE [Age] >= @Age;"
    );
    assert_eq!(
        sql(MSSQL, Operation::DeleteAll, &request()),
        "DELETE FROM [Person];"
    );
}

#[test]
fn test_exists_count_aggregate() {
    let req = request().filter(adults());
    assert_eq!(
        sql(MSSQL, Operation::Exists, &req),
        "SELECT TOP (1) 1 AS [ExistsValue] FROM [Person] WHERE [Age] >= @Age;"
    );
    assert_eq!(
        sql(MSSQL, Operation::Count, &request()),
        "SELECT COUNT_BIG(1) AS [CountValue] FROM [Person];"
    );
    assert_eq!(
        sql(
            MSSQL,
            Operation::Aggregate {
                function: Aggregate::Max,
                field: "Age".to_string()
            },
            &request()
        ),
        "SELECT MAX([Age]) AS [MaxValue] FROM [Person];"
    );
}

#[test]
fn test_truncate() {
    assert_eq!(
        sql(MSSQL, Operation::Truncate, &request()),
        "TRUNCATE TABLE [Person];"
    );
}

#[test]
fn test_schema_qualified_table() {
    let mut req = request();
    req.table = "dbo.Person".to_string();
    assert_eq!(
        sql(MSSQL, Operation::Count, &req),
        "SELECT COUNT_BIG(1) AS [CountValue] FROM [dbo].[Person];"
    );
}
