use super::super::dml::{self, KeyRetrieval, select::RowLimit};
use super::super::traits::{SqlDialect, wrap_identifier};
use super::super::{Aggregate, StatementBuilder, StatementRequest};
use crate::error::MapResult;

/// PostgreSQL.
pub struct PostgresGenerator;

impl SqlDialect for PostgresGenerator {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn quote_identifier(&self, name: &str) -> String {
        wrap_identifier(name, '"', '"')
    }

    fn max_parameters(&self) -> usize {
        32767
    }
}

impl StatementBuilder for PostgresGenerator {
    fn query(&self, req: &StatementRequest, top: Option<i64>) -> MapResult<String> {
        dml::select::build_query(self, req, top, RowLimit::Limit)
    }

    fn paged_query(
        &self,
        req: &StatementRequest,
        page: i64,
        rows_per_batch: i64,
    ) -> MapResult<String> {
        dml::select::build_limit_page(self, req, page, rows_per_batch)
    }

    fn skip_query(&self, req: &StatementRequest, skip: i64, take: i64) -> MapResult<String> {
        dml::select::build_limit_skip(self, req, skip, take)
    }

    fn insert(&self, req: &StatementRequest) -> MapResult<String> {
        dml::insert::build_insert(self, req, KeyRetrieval::Returning)
    }

    fn insert_all(&self, req: &StatementRequest, batch_size: i64) -> MapResult<String> {
        dml::insert::build_insert_all(self, req, batch_size, KeyRetrieval::Returning)
    }

    fn update(&self, req: &StatementRequest) -> MapResult<String> {
        dml::update::build_update(self, req)
    }

    fn update_all(&self, req: &StatementRequest, batch_size: i64) -> MapResult<String> {
        dml::update::build_update_all(self, req, batch_size)
    }

    fn merge(&self, req: &StatementRequest) -> MapResult<String> {
        dml::upsert::build_on_conflict(self, req)
    }

    fn merge_all(&self, req: &StatementRequest, batch_size: i64) -> MapResult<String> {
        dml::upsert::build_on_conflict_all(self, req, batch_size)
    }

    fn delete(&self, req: &StatementRequest) -> MapResult<String> {
        dml::delete::build_delete(self, req)
    }

    fn delete_all(&self, req: &StatementRequest) -> MapResult<String> {
        dml::delete::build_delete_all(self, req)
    }

    fn exists(&self, req: &StatementRequest) -> MapResult<String> {
        dml::select::build_exists(self, req, RowLimit::Limit)
    }

    fn count(&self, req: &StatementRequest) -> MapResult<String> {
        dml::select::build_count(self, req, "COUNT")
    }

    fn aggregate(
        &self,
        req: &StatementRequest,
        function: Aggregate,
        field: &str,
    ) -> MapResult<String> {
        dml::select::build_aggregate(self, req, function, field)
    }

    fn truncate(&self, req: &StatementRequest) -> MapResult<String> {
        dml::delete::build_truncate(self, req, " RESTART IDENTITY")
    }
}
