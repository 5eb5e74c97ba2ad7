//! Metadata provider trait and an in-memory implementation

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

use crate::column::ColumnMetadata;
use crate::expr::FieldRef;
use crate::query::{Query, QuerySource};
use crate::types::{BaseType, SemanticType};
use crate::{DatabaseId, TableId};

/// Canonical join-path separator in display names
pub const JOIN_SEPARATOR: &str = " → ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: i64,
    pub name: String,
}

/// Trait for resolving columns, metrics and segments of a query stage
pub trait MetadataProvider {
    /// Query can be modified by the current user
    fn is_editable(&self, query: &Query) -> bool;

    /// Columns a stage can read: its input plus implicitly joinable columns
    fn visible_columns(&self, query: &Query, stage: usize) -> Vec<ColumnMetadata>;

    /// Columns a stage produces
    fn returned_columns(&self, query: &Query, stage: usize) -> Vec<ColumnMetadata>;

    fn available_metrics(&self, query: &Query, stage: usize) -> Vec<Metric>;

    fn available_segments(&self, query: &Query, stage: usize) -> Vec<Segment>;

    fn filterable_columns(&self, query: &Query, stage: usize) -> Vec<ColumnMetadata> {
        self.visible_columns(query, stage)
    }

    fn breakoutable_columns(&self, query: &Query, stage: usize) -> Vec<ColumnMetadata> {
        self.visible_columns(query, stage)
    }

    fn expressionable_columns(&self, query: &Query, stage: usize) -> Vec<ColumnMetadata> {
        self.visible_columns(query, stage)
    }

    fn column_for_ref(
        &self,
        query: &Query,
        stage: usize,
        field_ref: &FieldRef,
    ) -> Option<ColumnMetadata> {
        self.visible_columns(query, stage)
            .into_iter()
            .chain(self.returned_columns(query, stage))
            .find(|column| column.field_ref.same_column(field_ref))
    }

    /// Primary keys of the stage's own input
    fn primary_keys(&self, query: &Query, stage: usize) -> Vec<ColumnMetadata> {
        self.visible_columns(query, stage)
            .into_iter()
            .filter(|column| column.is_primary_key() && !column.is_implicitly_joined())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub base_type: BaseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_type: Option<BaseType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_type: Option<SemanticType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fk_target_field_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub id: DatabaseId,
    pub name: String,
    #[serde(default)]
    pub tables: Vec<Table>,
}

/// In-memory metadata, usually loaded from JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub databases: Vec<Database>,
}

impl Metadata {
    pub fn new(databases: Vec<Database>) -> Self {
        Self { databases }
    }

    pub fn database(&self, id: DatabaseId) -> Option<&Database> {
        self.databases.iter().find(|db| db.id == id)
    }

    pub fn table(&self, id: TableId) -> Option<&Table> {
        self.databases
            .iter()
            .flat_map(|db| db.tables.iter())
            .find(|table| table.id == id)
    }

    pub fn field(&self, id: i64) -> Option<(&Table, &Field)> {
        self.databases
            .iter()
            .flat_map(|db| db.tables.iter())
            .find_map(|table| table.fields.iter().find(|f| f.id == id).map(|f| (table, f)))
    }

    fn source_table(&self, query: &Query) -> Option<&Table> {
        match query.source {
            QuerySource::Table { table_id } => self.table(table_id),
            QuerySource::Native { .. } => None,
        }
    }

    fn table_columns(&self, table: &Table) -> Vec<ColumnMetadata> {
        let mut columns: Vec<ColumnMetadata> = table
            .fields
            .iter()
            .map(|field| field_column(table, field))
            .collect();

        // implicit joins through foreign keys
        for fk in table.fields.iter() {
            let Some((target_table, _)) = fk.fk_target_field_id.and_then(|id| self.field(id)) else {
                continue;
            };
            let prefix = fk
                .display_name
                .strip_suffix(" ID")
                .unwrap_or(&fk.display_name);
            columns.extend(target_table.fields.iter().map(|field| {
                let display_name = format!("{}{}{}", prefix, JOIN_SEPARATOR, field.display_name);
                ColumnMetadata {
                    long_display_name: display_name.clone(),
                    display_name,
                    fk_field_id: Some(fk.id),
                    field_ref: FieldRef::field(field.id).with_option("source-field", json!(fk.id)),
                    ..field_column(target_table, field)
                }
            }));
        }
        columns
    }

    fn aggregated_columns(&self, query: &Query, stage: usize) -> Vec<ColumnMetadata> {
        let Ok(current) = query.stage(stage) else {
            return Vec::new();
        };
        let visible = self.visible_columns(query, stage);
        let find = |field_ref: &FieldRef| {
            visible
                .iter()
                .find(|column| column.field_ref.same_column(field_ref))
                .cloned()
        };

        let mut columns = Vec::new();
        for breakout in current.breakouts.iter() {
            let Some(mut column) = find(breakout.column()) else {
                continue;
            };
            if let Some(unit) = breakout.column().temporal_unit() {
                column.display_name = format!("{}: {}", column.display_name, humanize_unit(unit));
                column.long_display_name = column.display_name.clone();
            }
            column.field_ref = breakout.column().clone();
            columns.push(column);
        }

        let mut seen: HashMap<String, usize> = HashMap::new();
        for (index, aggregation) in current.aggregations.iter().enumerate() {
            let operator = aggregation.operator().unwrap_or("aggregation");
            let label = mbql_registry::registry()
                .get(operator)
                .map(|sig| sig.display_name.clone())
                .unwrap_or_else(|| operator.to_string());
            let input = aggregation.column().and_then(|field_ref| find(field_ref));

            let count = seen.entry(operator.to_string()).or_insert(0);
            *count += 1;
            let name = if *count == 1 {
                operator.to_string()
            } else {
                format!("{}_{}", operator, count)
            };
            let display_name = match &input {
                Some(column) => format!("{} of {}", label, column.display_name),
                None => label,
            };
            let base_type = match (operator, &input) {
                ("count" | "cum-count" | "distinct" | "count-where", _) => BaseType::BigInteger,
                (_, Some(column)) if column.is_numeric() => column.effective_type(),
                _ => BaseType::Float,
            };

            columns.push(ColumnMetadata {
                name,
                long_display_name: display_name.clone(),
                display_name,
                base_type,
                effective_type: None,
                semantic_type: None,
                id: None,
                table_id: None,
                fk_target_field_id: None,
                fk_field_id: None,
                field_ref: FieldRef::aggregation(index),
            });
        }
        columns
    }
}

fn field_column(table: &Table, field: &Field) -> ColumnMetadata {
    ColumnMetadata {
        name: field.name.clone(),
        display_name: field.display_name.clone(),
        long_display_name: field.display_name.clone(),
        base_type: field.base_type,
        effective_type: field.effective_type,
        semantic_type: field.semantic_type,
        id: Some(field.id),
        table_id: Some(table.id),
        fk_target_field_id: field.fk_target_field_id,
        fk_field_id: None,
        field_ref: FieldRef::field(field.id),
    }
}

/// `month-of-year` -> `Month of year`
fn humanize_unit(unit: &str) -> String {
    let words = unit.replace('-', " ");
    let mut chars = words.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => words,
    }
}

impl MetadataProvider for Metadata {
    fn is_editable(&self, query: &Query) -> bool {
        self.database(query.database).is_some()
            && (query.is_native() || self.source_table(query).is_some())
    }

    fn visible_columns(&self, query: &Query, stage: usize) -> Vec<ColumnMetadata> {
        if stage >= query.stage_count() {
            return Vec::new();
        }
        if stage == 0 {
            return self
                .source_table(query)
                .map(|table| self.table_columns(table))
                .unwrap_or_default();
        }
        // later stages read the previous stage's output by column name
        self.returned_columns(query, stage - 1)
            .into_iter()
            .map(|column| ColumnMetadata {
                field_ref: FieldRef::named(column.name.clone(), column.base_type.as_str()),
                long_display_name: column.display_name.clone(),
                fk_field_id: None,
                ..column
            })
            .collect()
    }

    fn returned_columns(&self, query: &Query, stage: usize) -> Vec<ColumnMetadata> {
        match query.stage(stage) {
            Ok(current) if current.is_aggregated() => self.aggregated_columns(query, stage),
            Ok(_) => self
                .visible_columns(query, stage)
                .into_iter()
                .filter(|column| !column.is_implicitly_joined())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn available_metrics(&self, query: &Query, stage: usize) -> Vec<Metric> {
        match self.source_table(query) {
            Some(table) if stage == 0 => table.metrics.clone(),
            _ => Vec::new(),
        }
    }

    fn available_segments(&self, query: &Query, stage: usize) -> Vec<Segment> {
        match self.source_table(query) {
            Some(table) if stage == 0 => table.segments.clone(),
            _ => Vec::new(),
        }
    }
}
