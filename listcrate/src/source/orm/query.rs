use indexmap::IndexMap;
use sea_orm::sea_query::{Alias, Expr, Query, SelectStatement, SimpleExpr};
use sea_orm::{
    Condition, DbBackend, EntityTrait, IdenStatic, Iterable, Order, PrimaryKeyToColumn,
    QueryFilter, QueryOrder, QuerySelect, QueryTrait, Select, Statement,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;

use super::ListEntity;
use crate::config::ListHandlerConfig;
use crate::errors::ListError;
use crate::filtering::normalize::{is_blank, value_text};
use crate::filtering::search::{search_terms, split_path};
use crate::filtering::{ListQueryExtractor, OperatorDialect, PageRequest};
use crate::mapping::{FieldMapping, FieldTarget, JoinType, ListMetadata};
use crate::models::{Filter, FilterOperator, OrderBy, SortDirection};
use crate::request::RequestParameters;

const COUNT_ALIAS: &str = "count";
const IDENTITY_ALIAS: &str = "identity";

/// A `Select` under construction together with the aliases already joined.
#[derive(Debug, Clone)]
pub struct RelationalQuery<E: EntityTrait> {
    select: Select<E>,
    joins: Vec<String>,
    grouped: bool,
}

impl<E: EntityTrait> RelationalQuery<E> {
    #[must_use]
    pub fn new(select: Select<E>) -> Self {
        Self {
            select,
            joins: Vec::new(),
            grouped: false,
        }
    }

    #[must_use]
    pub fn select(&self) -> &Select<E> {
        &self.select
    }

    #[must_use]
    pub fn into_select(self) -> Select<E> {
        self.select
    }

    /// Join aliases in the order they were added.
    #[must_use]
    pub fn joins(&self) -> &[String] {
        &self.joins
    }

    #[must_use]
    pub fn is_joined(&self, alias: &str) -> bool {
        self.joins.iter().any(|joined| joined == alias)
    }

    /// Whether the query carries a GROUP BY clause.
    #[must_use]
    pub fn is_grouped(&self) -> bool {
        self.grouped
    }

    #[must_use]
    pub fn build(&self, backend: DbBackend) -> Statement {
        self.select.build(backend)
    }

    fn map_select(&mut self, step: impl FnOnce(Select<E>) -> Select<E>) {
        let select = std::mem::replace(&mut self.select, E::find());
        self.select = step(select);
    }
}

/// Joins and grouping a custom base query brings along.
///
/// sea-query keeps both private to `SelectStatement`, so they are read off
/// the rendered statement, where a join aliased to its join field renders
/// as `AS "<join field>" ON`.
#[derive(Debug, Clone, Default)]
struct BaseShape {
    joins: Vec<String>,
    grouped: bool,
}

impl BaseShape {
    fn inspect<E: EntityTrait>(select: &Select<E>, join_fields: &IndexMap<String, JoinType>) -> Self {
        let sql = select.build(DbBackend::Postgres).to_string();
        Self {
            joins: join_fields
                .keys()
                .filter(|alias| sql.contains(&format!(r#"AS "{alias}" ON"#)))
                .cloned()
                .collect(),
            grouped: sql.contains(" GROUP BY "),
        }
    }
}

/// Column reference: qualified by an alias, or bare for derived expressions.
struct ColumnPath {
    alias: Option<String>,
    column: String,
}

impl ColumnPath {
    fn expr(&self) -> Expr {
        match &self.alias {
            Some(alias) => Expr::col((Alias::new(alias), Alias::new(&self.column))),
            None => Expr::col(Alias::new(&self.column)),
        }
    }
}

/// Translates list requests into sea-orm queries for entity `E`.
///
/// Each step of the pipeline is exposed separately and mutates an explicit
/// [`RelationalQuery`], so join bookkeeping can be inspected between steps:
///
/// ```rust,ignore
/// let mut query = builder.base_query();
/// builder.apply_filters(&mut query, &filters)?;
/// builder.apply_search(&mut query, "rust__AND__async")?;
/// builder.apply_order_by(&mut query, &order_by)?;
/// builder.apply_pagination(&mut query, page);
/// let sql = query.build(DbBackend::Postgres).to_string();
/// ```
#[derive(Debug, Clone)]
pub struct RelationalQueryBuilder<E: ListEntity> {
    extractor: ListQueryExtractor,
    joins: IndexMap<String, JoinType>,
    custom_query: Option<Select<E>>,
    base_shape: BaseShape,
    root_alias: String,
    identity: String,
}

impl<E: ListEntity> RelationalQueryBuilder<E> {
    /// Resolve every relation mapping to an association of `E`.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::UnknownAssociation`] when a relation mapping names
    /// a join field `E` does not know.
    pub fn new(metadata: Arc<ListMetadata>, config: ListHandlerConfig) -> Result<Self, ListError> {
        let root_alias = E::default().table_name().to_string();
        let identity = E::PrimaryKey::iter()
            .next()
            .map_or_else(|| "id".to_string(), |key| key.into_column().as_str().to_string());

        let mut joins = IndexMap::new();
        for mapping in metadata.relation_mappings() {
            let FieldTarget::Relation {
                join_field,
                join_type,
            } = &mapping.target
            else {
                continue;
            };
            if joins.contains_key(join_field) {
                continue;
            }
            if E::association(join_field).is_none() {
                return Err(ListError::UnknownAssociation {
                    field: join_field.clone(),
                    entity: root_alias.clone(),
                });
            }
            joins.insert(join_field.clone(), *join_type);
        }

        Ok(Self {
            extractor: ListQueryExtractor::new(metadata, config, OperatorDialect::Relational),
            joins,
            custom_query: None,
            base_shape: BaseShape::default(),
            root_alias,
            identity,
        })
    }

    /// Start every query from `select` instead of `E::find()`.
    ///
    /// Associations `select` already joins under their join field alias are
    /// not joined again, and a GROUP BY in `select` switches the count to one
    /// row per root entity.
    #[must_use]
    pub fn with_query(mut self, select: Select<E>) -> Self {
        self.base_shape = BaseShape::inspect(&select, &self.joins);
        self.custom_query = Some(select);
        self
    }

    #[must_use]
    pub fn extractor(&self) -> &ListQueryExtractor {
        &self.extractor
    }

    /// Alias of the root entity, its table name.
    #[must_use]
    pub fn root_alias(&self) -> &str {
        &self.root_alias
    }

    /// Join fields that relation mappings may request, in discovery order.
    pub fn join_fields(&self) -> impl Iterator<Item = &str> {
        self.joins.keys().map(String::as_str)
    }

    #[must_use]
    pub fn base_query(&self) -> RelationalQuery<E> {
        RelationalQuery {
            select: self.custom_query.clone().unwrap_or_else(E::find),
            joins: self.base_shape.joins.clone(),
            grouped: self.base_shape.grouped,
        }
    }

    /// Base query with the request's filters and search applied.
    ///
    /// # Errors
    ///
    /// Returns extraction, validation and join errors.
    pub fn filtered_query(&self, request: &dyn RequestParameters) -> Result<RelationalQuery<E>, ListError> {
        let filters = self.extractor.extract_filters(request)?;
        let search = self.extractor.search_value(request)?;

        let mut query = self.base_query();
        self.apply_filters(&mut query, &filters)?;
        if let Some(search) = &search {
            self.apply_search(&mut query, search)?;
        }

        tracing::debug!(
            entity = %self.root_alias,
            filters = filters.len(),
            search = search.is_some(),
            joins = ?query.joins(),
            "Relational list query assembled"
        );
        Ok(query)
    }

    /// Add pagination, ordering and grouping to a filtered query.
    ///
    /// # Errors
    ///
    /// Returns pagination and ordering errors.
    pub fn page_query(
        &self,
        mut query: RelationalQuery<E>,
        request: &dyn RequestParameters,
    ) -> Result<RelationalQuery<E>, ListError> {
        let page = self.extractor.extract_pagination(request)?;
        let order_by = self
            .extractor
            .validate_order_by(&self.extractor.extract_order_by(request))?;

        self.apply_pagination(&mut query, page);
        self.apply_order_by(&mut query, &order_by)?;
        self.apply_group_by(&mut query);
        Ok(query)
    }

    /// Join `join_field` unless the query already has it.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::UnknownAssociation`] when no relation mapping
    /// declared the association.
    pub fn add_join(&self, query: &mut RelationalQuery<E>, join_field: &str) -> Result<(), ListError> {
        let unknown = || ListError::UnknownAssociation {
            field: join_field.to_string(),
            entity: self.root_alias.clone(),
        };
        let join_type = self.joins.get(join_field).ok_or_else(unknown)?.as_sea_orm();
        if query.is_joined(join_field) {
            return Ok(());
        }

        let relation = E::association(join_field).ok_or_else(unknown)?;
        query.map_select(|select| select.join_as(join_type, relation, Alias::new(join_field)));
        query.joins.push(join_field.to_string());
        Ok(())
    }

    /// Validate every filter and AND their conditions into the query.
    ///
    /// # Errors
    ///
    /// Returns the first validation or join error.
    pub fn apply_filters(&self, query: &mut RelationalQuery<E>, filters: &[Filter]) -> Result<(), ListError> {
        if filters.is_empty() {
            return Ok(());
        }

        let mut condition = Condition::all();
        for filter in filters {
            self.extractor.validate_filter(filter)?;
            condition = condition.add(self.filter_condition(query, filter)?);
        }
        query.map_select(|select| select.filter(condition));
        Ok(())
    }

    /// Condition for one filter, joining its association when needed.
    ///
    /// This step does not validate. A `btw` filter with only one usable bound
    /// degrades to `gte` or `lte` instead of failing.
    ///
    /// # Errors
    ///
    /// Returns lookup, normalization and join errors.
    pub fn filter_condition(&self, query: &mut RelationalQuery<E>, filter: &Filter) -> Result<Condition, ListError> {
        let resolved = self.extractor.resolve_filter(filter)?;
        let column = self.resolve_column(query, resolved.mapping)?;
        let value = filter.value();
        let field = filter.field();

        if resolved.operator != FilterOperator::Btw {
            return self.comparison(
                &column,
                (resolved.operator, resolved.requested),
                &value.from,
                resolved.mapping,
                field,
            );
        }

        let from_given = !is_blank(&value.from);
        let to = value.to.clone().unwrap_or(JsonValue::Null);
        let to_given = !is_blank(&to);

        if from_given && !to_given {
            let gte = (FilterOperator::Gte, FilterOperator::Gte);
            return self.comparison(&column, gte, &value.from, resolved.mapping, field);
        }
        if !from_given && to_given {
            let lte = (FilterOperator::Lte, FilterOperator::Lte);
            return self.comparison(&column, lte, &to, resolved.mapping, field);
        }

        let from = self.bound(field, &value.from, resolved.mapping)?;
        let to = self.bound(field, &to, resolved.mapping)?;
        Ok(Condition::all().add(column.expr().between(from, to)))
    }

    /// AND over terms, OR over search fields, AND over words.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::SearchNotSupported`] without search fields, or a
    /// join error.
    pub fn apply_search(&self, query: &mut RelationalQuery<E>, search: &str) -> Result<(), ListError> {
        let fields = self.extractor.metadata().search_fields();
        if fields.is_empty() {
            return Err(ListError::SearchNotSupported);
        }

        let terms = search_terms(search);
        if terms.is_empty() {
            return Ok(());
        }

        let mut columns = Vec::with_capacity(fields.len());
        for mapping in fields.values() {
            columns.push(self.resolve_column(query, mapping)?);
        }

        let condition = terms.iter().fold(Condition::all(), |all_terms, words| {
            let any_field = columns.iter().fold(Condition::any(), |any_field, column| {
                let all_words = words.iter().fold(Condition::all(), |all_words, word| {
                    all_words.add(column.expr().like(format!("%{word}%")))
                });
                any_field.add(all_words)
            });
            all_terms.add(any_field)
        });
        query.map_select(|select| select.filter(condition));
        Ok(())
    }

    /// Offset beyond the first page, limit whenever one is set.
    pub fn apply_pagination(&self, query: &mut RelationalQuery<E>, page: PageRequest) {
        if page.page_nr > 1 {
            let offset = page.offset();
            query.map_select(|select| select.offset(offset));
        }
        if let Some(limit) = page.limit() {
            query.map_select(|select| select.limit(limit));
        }
    }

    /// Replace any existing ordering with `order_by`. An empty list leaves the
    /// query untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::NotSortable`] or a join error.
    pub fn apply_order_by(&self, query: &mut RelationalQuery<E>, order_by: &[OrderBy]) -> Result<(), ListError> {
        if order_by.is_empty() {
            return Ok(());
        }

        let mut columns = Vec::with_capacity(order_by.len());
        for order in order_by {
            let mapping = self
                .extractor
                .sort_mapping(&order.field)
                .ok_or_else(|| ListError::NotSortable {
                    field: order.field.clone(),
                })?;
            let direction = match order.direction {
                SortDirection::Asc => Order::Asc,
                SortDirection::Desc => Order::Desc,
            };
            columns.push((self.resolve_column(query, mapping)?, direction));
        }

        query.map_select(|mut select| {
            QueryTrait::query(&mut select).clear_order_by();
            columns.into_iter().fold(select, |select, (column, direction)| {
                select.order_by(SimpleExpr::from(column.expr()), direction)
            })
        });
        Ok(())
    }

    /// Group by the declared column of the root entity, if any.
    pub fn apply_group_by(&self, query: &mut RelationalQuery<E>) {
        if let Some(group_by) = self.extractor.metadata().group_by() {
            let column = ColumnPath {
                alias: Some(self.root_alias.clone()),
                column: group_by.to_string(),
            };
            query.map_select(|select| select.group_by(SimpleExpr::from(column.expr())));
            query.grouped = true;
        }
    }

    /// Distinct count of the root identity over the filtered query, without
    /// selected columns and ordering.
    ///
    /// A grouped query is also grouped by the identity and counted from a
    /// derived table, so every root entity counts once whatever the groups.
    #[must_use]
    pub fn count_query(&self, query: &RelationalQuery<E>) -> SelectStatement {
        let identity = ColumnPath {
            alias: Some(self.root_alias.clone()),
            column: self.identity.clone(),
        };
        let mut select = query.select.clone();
        QueryTrait::query(&mut select).clear_order_by();

        if !query.grouped {
            return select
                .select_only()
                .column_as(identity.expr().count_distinct(), COUNT_ALIAS)
                .into_query();
        }

        let rows = select
            .select_only()
            .column_as(SimpleExpr::from(identity.expr()), IDENTITY_ALIAS)
            .group_by(SimpleExpr::from(identity.expr()))
            .into_query();
        Query::select()
            .expr_as(Expr::col(Alias::new(IDENTITY_ALIAS)).count(), Alias::new(COUNT_ALIAS))
            .from_subquery(rows, Alias::new("grouped_rows"))
            .to_owned()
    }

    fn resolve_column(&self, query: &mut RelationalQuery<E>, mapping: &FieldMapping) -> Result<ColumnPath, ListError> {
        if mapping.derived {
            return Ok(ColumnPath {
                alias: None,
                column: mapping.name.clone(),
            });
        }

        match (&mapping.target, split_path(&mapping.name)) {
            (FieldTarget::Relation { join_field, .. }, path) => {
                self.add_join(query, join_field)?;
                let column = path.map_or(mapping.name.as_str(), |(_, column)| column);
                Ok(ColumnPath {
                    alias: Some(join_field.clone()),
                    column: column.to_string(),
                })
            }
            (FieldTarget::Direct, Some((association, column))) => {
                self.add_join(query, association)?;
                Ok(ColumnPath {
                    alias: Some(association.to_string()),
                    column: column.to_string(),
                })
            }
            (FieldTarget::Direct, None) => Ok(ColumnPath {
                alias: Some(self.root_alias.clone()),
                column: mapping.name.clone(),
            }),
        }
    }

    fn bound(&self, field: &str, value: &JsonValue, mapping: &FieldMapping) -> Result<sea_orm::Value, ListError> {
        let normalized = self
            .extractor
            .normalize_value(field, FilterOperator::Btw, value, Some(mapping))?;
        Ok(sql_value(&normalized))
    }

    fn comparison(
        &self,
        column: &ColumnPath,
        (operator, requested): (FilterOperator, FilterOperator),
        value: &JsonValue,
        mapping: &FieldMapping,
        field: &str,
    ) -> Result<Condition, ListError> {
        let normalized = self
            .extractor
            .normalize_value(field, requested, value, Some(mapping))?;
        let expr = column.expr();

        let predicate = match operator {
            FilterOperator::Eq => expr.eq(sql_value(&normalized)),
            FilterOperator::Neq => expr.ne(sql_value(&normalized)),
            FilterOperator::Lt => expr.lt(sql_value(&normalized)),
            FilterOperator::Lte => expr.lte(sql_value(&normalized)),
            FilterOperator::Gt => expr.gt(sql_value(&normalized)),
            FilterOperator::Gte => expr.gte(sql_value(&normalized)),
            FilterOperator::In => expr.is_in(sql_values(&normalized)),
            FilterOperator::NotIn => expr.is_not_in(sql_values(&normalized)),
            FilterOperator::IsNull => expr.is_null(),
            FilterOperator::IsNotNull => expr.is_not_null(),
            FilterOperator::Btw
            | FilterOperator::Like
            | FilterOperator::NLike
            | FilterOperator::RLike
            | FilterOperator::LLike => expr.like(value_text(&normalized)),
        };

        let condition = Condition::all().add(predicate);
        Ok(if requested == FilterOperator::NLike {
            condition.not()
        } else {
            condition
        })
    }
}

/// Bind value for a normalized JSON scalar.
fn sql_value(value: &JsonValue) -> sea_orm::Value {
    match value {
        JsonValue::Null => sea_orm::Value::String(None),
        JsonValue::Bool(flag) => sea_orm::Value::from(*flag),
        JsonValue::Number(number) => number
            .as_i64()
            .map(sea_orm::Value::from)
            .or_else(|| number.as_u64().map(sea_orm::Value::from))
            .or_else(|| number.as_f64().map(sea_orm::Value::from))
            .unwrap_or(sea_orm::Value::Double(None)),
        JsonValue::String(text) => sea_orm::Value::from(text.clone()),
        other => sea_orm::Value::from(other.to_string()),
    }
}

fn sql_values(value: &JsonValue) -> Vec<sea_orm::Value> {
    match value {
        JsonValue::Array(items) => items.iter().map(sql_value).collect(),
        scalar => vec![sql_value(scalar)],
    }
}
