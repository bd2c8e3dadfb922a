//! Column sets derived from a request.
//!
//! The statement builders and the plan binder both derive their input
//! columns from these functions, so every parameter in the SQL text has a
//! bound value and vice versa.

use super::{Operation, StatementRequest};
use crate::error::{MapError, MapResult};
use crate::schema::DbField;

/// Full column set of the table.
pub fn schema(req: &StatementRequest) -> &[DbField] {
    if req.db_fields.is_empty() {
        &req.fields
    } else {
        &req.db_fields
    }
}

pub fn primary(req: &StatementRequest) -> Option<&DbField> {
    schema(req).iter().find(|f| f.is_primary())
}

/// Column whose value is read back after an insert or merge.
pub fn key_column(req: &StatementRequest) -> Option<&DbField> {
    req.key_return.resolve(schema(req))
}

fn requested<'a>(req: &'a StatementRequest, name: &str) -> Option<&'a DbField> {
    req.fields.iter().find(|f| f.is_named(name))
}

fn contains(set: &[&DbField], field: &DbField) -> bool {
    set.iter().any(|f| f.is_named(field.name()))
}

/// Parameter name of a column, suffixed with the row index in batches.
pub fn parameter_name(column: &DbField, row: Option<usize>) -> String {
    match row {
        Some(i) => format!("{}_{}", column.parameter_name(), i),
        None => column.parameter_name(),
    }
}

/// Requested columns that accept input.
pub fn insertable(req: &StatementRequest) -> Vec<&DbField> {
    req.fields.iter().filter(|f| !f.is_read_only()).collect()
}

/// Explicit qualifiers resolved against the field list; empty when omitted.
pub fn explicit_qualifiers(req: &StatementRequest) -> MapResult<Vec<&DbField>> {
    let Some(names) = req.qualifiers.as_ref() else {
        return Ok(Vec::new());
    };
    names
        .iter()
        .map(|name| requested(req, name).ok_or_else(|| MapError::qualifier(&req.table, name)))
        .collect()
}

/// Qualifiers matching existing rows: the explicit ones, else the primary
/// key when it is among the requested fields.
pub fn qualifiers(req: &StatementRequest) -> MapResult<Vec<&DbField>> {
    let explicit = explicit_qualifiers(req)?;
    if !explicit.is_empty() {
        return Ok(explicit);
    }
    match primary(req) {
        Some(pk) => match requested(req, pk.name()) {
            Some(field) => Ok(vec![field]),
            None => Err(MapError::qualifier(&req.table, pk.name())),
        },
        None => Err(MapError::qualifier(&req.table, "<primary key>")),
    }
}

/// Columns of an UPDATE.
#[derive(Debug)]
pub struct UpdateFields<'a> {
    pub set: Vec<&'a DbField>,
    /// Columns of the key WHERE clause; empty when a filter is given.
    pub keys: Vec<&'a DbField>,
}

pub fn update_fields(req: &StatementRequest) -> MapResult<UpdateFields<'_>> {
    let (excluded, keys) = if req.active_predicate().is_some() {
        (explicit_qualifiers(req)?, Vec::new())
    } else {
        let keys = qualifiers(req)?;
        (keys.clone(), keys)
    };
    let set = req
        .fields
        .iter()
        .filter(|f| !f.is_read_only() && !f.is_primary() && !contains(&excluded, f))
        .collect::<Vec<_>>();
    if set.is_empty() {
        return Err(MapError::argument(format!(
            "no updatable fields for table '{}'",
            req.table
        )));
    }
    Ok(UpdateFields { set, keys })
}

/// Columns of an upsert.
#[derive(Debug)]
pub struct MergeFields<'a> {
    pub keys: Vec<&'a DbField>,
    /// Every bound column: writable ones plus the qualifiers.
    pub inputs: Vec<&'a DbField>,
    /// Writable columns only.
    pub writable: Vec<&'a DbField>,
    /// Columns updated on a match.
    pub set: Vec<&'a DbField>,
}

pub fn merge_fields(req: &StatementRequest) -> MapResult<MergeFields<'_>> {
    let keys = qualifiers(req)?;
    let inputs = req
        .fields
        .iter()
        .filter(|f| !f.is_read_only() || contains(&keys, f))
        .collect::<Vec<_>>();
    let writable = inputs
        .iter()
        .copied()
        .filter(|f| !f.is_read_only())
        .collect();
    let set = inputs
        .iter()
        .copied()
        .filter(|f| !f.is_primary() && !contains(&keys, f))
        .collect();
    Ok(MergeFields {
        keys,
        inputs,
        writable,
        set,
    })
}

/// Key columns of a DELETE; empty when a filter is given.
pub fn delete_keys(req: &StatementRequest) -> MapResult<Vec<&DbField>> {
    if req.active_predicate().is_some() {
        Ok(Vec::new())
    } else {
        qualifiers(req)
    }
}

/// Columns bound from the entity for one row of `op`, in parameter order.
pub fn bound_fields(op: &Operation, req: &StatementRequest) -> MapResult<Vec<DbField>> {
    let fields = match op {
        Operation::Insert | Operation::InsertAll { .. } => insertable(req),
        Operation::Update | Operation::UpdateAll { .. } => {
            let update = update_fields(req)?;
            update.set.into_iter().chain(update.keys).collect()
        }
        Operation::Merge | Operation::MergeAll { .. } => merge_fields(req)?.inputs,
        Operation::Delete => delete_keys(req)?,
        _ => Vec::new(),
    };
    Ok(fields.into_iter().cloned().collect())
}

/// Names a filter must not reuse because row values already hold them.
pub fn reserved_names(op: &Operation, req: &StatementRequest) -> MapResult<Vec<String>> {
    Ok(bound_fields(op, req)?
        .iter()
        .map(|f| parameter_name(f, None))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{Field, PredicateGroup, PredicateNode};
    use crate::value::{Value, ValueType};

    fn person() -> Vec<DbField> {
        vec![
            DbField::new("Id", ValueType::Int64).unwrap().primary().identity(),
            DbField::new("Name", ValueType::Text).unwrap(),
            DbField::new("Age", ValueType::Int32).unwrap().nullable(),
            DbField::new("RowVersion", ValueType::Bytes).unwrap().generated(),
        ]
    }

    #[test]
    fn test_insertable_skips_read_only() {
        let req = StatementRequest::new("Person", person());
        let names: Vec<_> = insertable(&req).iter().map(|f| f.name()).collect();
        assert_eq!(names, ["Name", "Age"]);
    }

    #[test]
    fn test_qualifiers_default_to_primary() {
        let req = StatementRequest::new("Person", person());
        let keys = qualifiers(&req).unwrap();
        assert_eq!(keys[0].name(), "Id");
    }

    #[test]
    fn test_unknown_qualifier() {
        let req = StatementRequest::new("Person", person()).qualifiers(["Email"]);
        let err = qualifiers(&req).unwrap_err();
        assert!(matches!(err, MapError::QualifierInvalid { ref field, .. } if field == "Email"));
    }

    #[test]
    fn test_update_excludes_keys_from_set() {
        let req = StatementRequest::new("Person", person()).qualifiers(["Name"]);
        let update = update_fields(&req).unwrap();
        let set: Vec<_> = update.set.iter().map(|f| f.name()).collect();
        assert_eq!(set, ["Age"]);
        assert_eq!(update.keys[0].name(), "Name");
    }

    #[test]
    fn test_update_with_filter_has_no_keys() {
        let filter = PredicateGroup::single(PredicateNode::new(
            Field::new("Age"),
            crate::predicate::Operator::GreaterThan,
            Value::Int(30),
        ));
        let req = StatementRequest::new("Person", person()).filter(filter);
        let update = update_fields(&req).unwrap();
        assert!(update.keys.is_empty());
        let reserved = reserved_names(&Operation::Update, &req).unwrap();
        assert_eq!(reserved, ["Name", "Age"]);
    }

    #[test]
    fn test_merge_inputs_keep_identity_qualifier() {
        let req = StatementRequest::new("Person", person());
        let merge = merge_fields(&req).unwrap();
        let inputs: Vec<_> = merge.inputs.iter().map(|f| f.name()).collect();
        let writable: Vec<_> = merge.writable.iter().map(|f| f.name()).collect();
        let set: Vec<_> = merge.set.iter().map(|f| f.name()).collect();
        assert_eq!(inputs, ["Id", "Name", "Age"]);
        assert_eq!(writable, ["Name", "Age"]);
        assert_eq!(set, ["Name", "Age"]);
    }

    #[test]
    fn test_parameter_name_suffix() {
        let req = StatementRequest::new(
            "Person",
            vec![
                DbField::new("First Name", ValueType::Text).unwrap(),
                DbField::new("First_Name", ValueType::Text).unwrap(),
            ],
        );
        assert_eq!(parameter_name(&req.fields[0], None), "First_Name");
        assert_eq!(parameter_name(&req.fields[1], None), "First_Name_1");
        assert_eq!(parameter_name(&req.fields[1], Some(0)), "First_Name_1_0");
    }
}
