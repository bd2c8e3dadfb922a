//! Operation compiler: request → cached execution plan.

use std::sync::Arc;

use super::binder::{Binder, KeySetter};
use super::cache::{CacheStats, PlanCache};
use super::key::{KeyInterner, PlanKey};
use super::{ExecutionPlan, PlanRequest};
use crate::command::DbCommand;
use crate::config::EngineOptions;
use crate::entity::{Entity, EntityMap, HandlerRegistry, entity_map};
use crate::error::{MapError, MapResult};
use crate::expr::{ExpressionCompiler, Filter};
use crate::predicate::PredicateGroup;
use crate::schema::{DbField, SchemaCache, SchemaProvider, find_field};
use crate::transpiler::{OrderField, StatementBuilder, StatementRequest, build_statement, fields};

/// Request names resolved to column names.
struct Shape {
    table: String,
    fields: Vec<String>,
    qualifiers: Option<Vec<String>>,
    order_by: Vec<OrderField>,
}

/// Builds and caches execution plans.
///
/// Identical request shapes return the same `Arc<ExecutionPlan>`. Failures
/// are never cached.
pub struct OperationCompiler<P> {
    options: EngineOptions,
    schema: SchemaCache<P>,
    builder: Box<dyn StatementBuilder>,
    handlers: HandlerRegistry,
    plans: PlanCache,
    interner: KeyInterner,
    expressions: ExpressionCompiler,
}

impl<P> std::fmt::Debug for OperationCompiler<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationCompiler")
            .field("options", &self.options)
            .field("dialect", &self.builder.name())
            .field("plans", &self.plans)
            .finish()
    }
}

impl<P: SchemaProvider> OperationCompiler<P> {
    pub fn new(provider: P, options: EngineOptions) -> Self {
        let schema = if options.schema_cache {
            SchemaCache::new(provider)
        } else {
            SchemaCache::disabled(provider)
        };
        Self {
            builder: options.dialect.builder(),
            plans: PlanCache::with_capacity(options.plan_cache_capacity),
            expressions: ExpressionCompiler::new(&options),
            handlers: HandlerRegistry::new(),
            interner: KeyInterner::new(),
            schema,
            options,
        }
    }

    /// Use `handlers` for property value conversion.
    pub fn with_handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = handlers;
        self.plans.clear();
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn schema(&self) -> &SchemaCache<P> {
        &self.schema
    }

    pub fn plans(&self) -> &PlanCache {
        &self.plans
    }

    pub fn stats(&self) -> CacheStats {
        self.plans.stats()
    }

    /// Drop cached plans and schemas.
    pub fn clear(&self) {
        self.plans.clear();
        self.schema.clear();
    }

    pub fn compile_filter<E: Entity>(&self, filter: &Filter<E>) -> MapResult<PredicateGroup> {
        self.expressions.compile_filter(filter)
    }

    /// Compile a textual filter such as `x => x.Age >= 18`.
    pub fn compile_text<E: Entity>(&self, text: &str) -> MapResult<PredicateGroup> {
        self.expressions.compile_text::<E>(text)
    }

    /// Cached plan of `req`, built on first use.
    pub fn get_or_create_plan<E: Entity>(
        &self,
        req: &PlanRequest,
    ) -> MapResult<Arc<ExecutionPlan<E>>> {
        let map = entity_map::<E>();
        let shape = resolve_shape(&map, req);
        let key = self.key::<E>(&shape, req);
        if let Some(plan) = self.cached(&key, req) {
            return Ok(plan);
        }

        let db_fields = self.schema.get_fields(&shape.table)?;
        self.build(&map, key, shape, req, &db_fields)
    }

    /// Async variant of [`get_or_create_plan`](Self::get_or_create_plan).
    ///
    /// The schema fetch is the only suspension point; compiling and
    /// publishing happen after it without awaiting.
    pub async fn get_or_create_plan_async<E: Entity>(
        &self,
        req: &PlanRequest,
    ) -> MapResult<Arc<ExecutionPlan<E>>> {
        let map = entity_map::<E>();
        let shape = resolve_shape(&map, req);
        let key = self.key::<E>(&shape, req);
        if let Some(plan) = self.cached(&key, req) {
            return Ok(plan);
        }

        let db_fields = self.schema.get_fields_async(&shape.table).await?;
        self.build(&map, key, shape, req, &db_fields)
    }

    /// Plan of `req` bound to `entities` and the request's filter values.
    pub fn command<E: Entity>(&self, req: &PlanRequest, entities: &[E]) -> MapResult<DbCommand> {
        let plan = self.get_or_create_plan::<E>(req)?;
        plan.create_command(entities, req.predicate.as_ref())
    }

    fn key<E: Entity>(&self, shape: &Shape, req: &PlanRequest) -> PlanKey {
        PlanKey {
            entity: std::any::TypeId::of::<E>(),
            dialect: self.options.dialect,
            operation: req.operation.clone(),
            table: self.interner.intern(&shape.table),
            fields: self.interner.intern_all(&shape.fields),
            qualifiers: shape.qualifiers.as_ref().map(|q| self.interner.intern_all(q)),
            hints: req.hints.as_deref().map(|h| self.interner.intern(h)),
            order_by: shape.order_by.clone(),
            predicate_shape: req.predicate_shape(),
        }
    }

    fn cached<E: Entity>(&self, key: &PlanKey, req: &PlanRequest) -> Option<Arc<ExecutionPlan<E>>> {
        let plan = self.plans.get::<E>(key);
        match &plan {
            Some(_) => {
                tracing::debug!("Plan cache hit: {} on '{}'", req.operation.name(), key.table)
            }
            None => {
                tracing::debug!("Plan cache miss: {} on '{}'", req.operation.name(), key.table)
            }
        }
        plan
    }

    fn build<E: Entity>(
        &self,
        map: &EntityMap<E>,
        key: PlanKey,
        shape: Shape,
        req: &PlanRequest,
        db_fields: &[DbField],
    ) -> MapResult<Arc<ExecutionPlan<E>>> {
        let requested = shape
            .fields
            .iter()
            .map(|name| {
                find_field(db_fields, name).cloned().ok_or_else(|| {
                    MapError::argument(format!(
                        "field '{}' not found on table '{}'",
                        name, shape.table
                    ))
                })
            })
            .collect::<MapResult<Vec<_>>>()?;

        let statement = StatementRequest {
            table: shape.table,
            fields: requested,
            db_fields: db_fields.to_vec(),
            qualifiers: shape.qualifiers,
            predicate: req.predicate.clone(),
            order_by: shape.order_by,
            hints: req.hints.clone(),
            key_return: self.options.key_return,
        };

        let text: Arc<str> =
            build_statement(self.builder.as_ref(), &req.operation, &statement)?.into();
        let input_fields = fields::bound_fields(&req.operation, &statement)?;
        let reserved = fields::reserved_names(&req.operation, &statement)?;
        let binder = Binder::compile(map, &input_fields, &self.handlers, self.options.enum_repr)?;
        let key_setter = match fields::key_column(&statement) {
            Some(column) if req.operation.returns_key() => {
                Some(KeySetter::compile(map, column, &self.handlers)?)
            }
            _ => None,
        };

        tracing::debug!(
            "Compiled {} plan for '{}' on '{}': {}",
            req.operation.name(),
            map.entity(),
            key.table,
            text
        );

        let plan = Arc::new(ExecutionPlan::new(
            req.operation.clone(),
            key.table.clone(),
            text,
            input_fields,
            reserved,
            req.predicate_shape(),
            binder,
            key_setter,
        ));
        Ok(self.plans.publish(key, plan))
    }
}

/// Map property names to column names, leaving unknown names as given.
fn column_name<E>(map: &EntityMap<E>, name: &str) -> String {
    map.property(name)
        .or_else(|| map.property_for_column(name))
        .map(|p| p.column().to_string())
        .unwrap_or_else(|| name.to_string())
}

fn resolve_shape<E>(map: &EntityMap<E>, req: &PlanRequest) -> Shape {
    let fields = match &req.fields {
        Some(names) => names.iter().map(|n| column_name(map, n)).collect(),
        None => map.columns().into_iter().map(str::to_string).collect(),
    };
    Shape {
        table: req
            .table
            .clone()
            .unwrap_or_else(|| map.table().to_string()),
        fields,
        qualifiers: req
            .qualifiers
            .as_ref()
            .map(|q| q.iter().map(|n| column_name(map, n)).collect()),
        order_by: req
            .order_by
            .iter()
            .map(|o| OrderField {
                name: column_name(map, &o.name),
                order: o.order,
            })
            .collect(),
    }
}
