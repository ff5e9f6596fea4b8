//! Relational backend built on sea-orm.
//!
//! Filters, search, ordering and paging become a `Select<E>`; relation
//! mappings become aliased joins named after their join field. The count
//! reuses the filtered query of the same request.

mod query;

#[cfg(test)]
pub(crate) mod fixtures;

pub use query::{RelationalQuery, RelationalQueryBuilder};

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, FromQueryResult, RelationDef, Select};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

use super::ListSource;
use crate::config::ListHandlerConfig;
use crate::errors::ListError;
use crate::mapping::ListMetadata;
use crate::models::FilterableField;
use crate::request::RequestParameters;

/// Entity that can be listed, with the associations relation mappings may
/// join.
///
/// ```rust,ignore
/// impl ListEntity for post::Entity {
///     fn association(join_field: &str) -> Option<RelationDef> {
///         match join_field {
///             "category" => Some(post::Relation::Category.def()),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait ListEntity: EntityTrait {
    fn association(join_field: &str) -> Option<RelationDef> {
        let _ = join_field;
        None
    }
}

/// List source over a sea-orm entity, hydrating rows as `M`.
///
/// `M` defaults to the entity model; any [`FromQueryResult`] type works,
/// `serde_json::Value` included.
pub struct OrmListSource<E: ListEntity, M = <E as EntityTrait>::Model> {
    builder: RelationalQueryBuilder<E>,
    db: DatabaseConnection,
    filtered: Option<(Value, RelationalQuery<E>)>,
    model: PhantomData<fn() -> M>,
}

impl<E: ListEntity, M> OrmListSource<E, M> {
    /// # Errors
    ///
    /// Returns [`ListError::UnknownAssociation`] when a relation mapping names
    /// an association `E` does not declare.
    pub fn new(
        metadata: Arc<ListMetadata>,
        config: ListHandlerConfig,
        db: DatabaseConnection,
    ) -> Result<Self, ListError> {
        Ok(Self {
            builder: RelationalQueryBuilder::new(metadata, config)?,
            db,
            filtered: None,
            model: PhantomData,
        })
    }

    /// List from a custom base query, e.g. one with extra conditions or
    /// derived columns.
    #[must_use]
    pub fn with_query(mut self, select: Select<E>) -> Self {
        self.builder = self.builder.with_query(select);
        self.filtered = None;
        self
    }

    /// Hydrate rows as another type.
    #[must_use]
    pub fn into_model<N>(self) -> OrmListSource<E, N> {
        OrmListSource {
            builder: self.builder,
            db: self.db,
            filtered: self.filtered,
            model: PhantomData,
        }
    }

    #[must_use]
    pub fn builder(&self) -> &RelationalQueryBuilder<E> {
        &self.builder
    }

    /// Filtered query for `request`, built once per distinct filters value.
    fn filtered_query(&mut self, request: &dyn RequestParameters) -> Result<RelationalQuery<E>, ListError> {
        let key = self
            .builder
            .extractor()
            .filters_data(request)
            .cloned()
            .unwrap_or(Value::Null);

        if let Some((cached_key, query)) = &self.filtered
            && *cached_key == key
        {
            return Ok(query.clone());
        }

        let query = self.builder.filtered_query(request)?;
        self.filtered = Some((key, query.clone()));
        Ok(query)
    }
}

#[async_trait]
impl<E, M> ListSource for OrmListSource<E, M>
where
    E: ListEntity,
    M: FromQueryResult + Send + 'static,
{
    type Item = M;

    async fn process_source(&mut self, request: &dyn RequestParameters) -> Result<Vec<M>, ListError> {
        let filtered = self.filtered_query(request)?;
        let query = self.builder.page_query(filtered, request)?;

        let backend = self.db.get_database_backend();
        tracing::trace!(sql = %query.build(backend), "Fetching list page");

        let items = query.into_select().into_model::<M>().all(&self.db).await?;
        tracing::debug!(
            entity = %self.builder.root_alias(),
            items = items.len(),
            "List page fetched"
        );
        Ok(items)
    }

    async fn items_count(&mut self, request: &dyn RequestParameters) -> Result<u64, ListError> {
        let filtered = self.filtered_query(request)?;
        let backend = self.db.get_database_backend();
        let statement = backend.build(&self.builder.count_query(&filtered));
        tracing::trace!(sql = %statement, "Counting list items");

        let total = match self.db.query_one(statement).await? {
            Some(row) => row.try_get::<i64>("", "count")?,
            None => 0,
        };
        Ok(u64::try_from(total).unwrap_or(0))
    }

    fn sortable_fields(&self) -> Vec<String> {
        self.builder.extractor().sortable_fields()
    }

    fn filterable_fields(&self) -> Vec<FilterableField> {
        self.builder.extractor().filterable_fields()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{post, seeded_db};
    use super::*;
    use crate::mapping::{FieldOptions, JoinType, MappingInformation};
    use crate::models::{Filter, FilterOperator, FilterValue, OrderBy, SortDirection};
    use crate::request::ListRequest;
    use sea_orm::sea_query::Alias;
    use sea_orm::{DbBackend, QueryFilter, QueryOrder, QuerySelect, QueryTrait, RelationTrait};
    use serde_json::json;

    fn metadata() -> Arc<ListMetadata> {
        let information = MappingInformation::new()
            .sortable("title", FieldOptions::direct())
            .sortable("views", FieldOptions::direct())
            .sortable(
                "category",
                FieldOptions::relation("category", JoinType::LeftJoin).name("category.title"),
            )
            .filter(
                "status",
                FieldOptions::direct().operators(&[FilterOperator::Eq, FilterOperator::In]),
            )
            .filter(
                "views",
                FieldOptions::direct().operators(&[
                    FilterOperator::Btw,
                    FilterOperator::Gte,
                    FilterOperator::Lte,
                ]),
            )
            .filter(
                "title",
                FieldOptions::direct().operators(&[FilterOperator::Like, FilterOperator::IsNull]),
            )
            .filter(
                "category",
                FieldOptions::relation("category", JoinType::LeftJoin)
                    .name("category.title")
                    .operators(&[FilterOperator::Eq, FilterOperator::Like]),
            )
            .search("title", FieldOptions::direct())
            .search("body", FieldOptions::direct())
            .default_order("views", FieldOptions::direct().direction(SortDirection::Desc));
        Arc::new(ListMetadata::from_information(&information).unwrap())
    }

    fn builder() -> RelationalQueryBuilder<post::Entity> {
        RelationalQueryBuilder::new(metadata(), ListHandlerConfig::default()).unwrap()
    }

    fn sql(query: &RelationalQuery<post::Entity>) -> String {
        query.build(DbBackend::Sqlite).to_string()
    }

    fn filters(value: serde_json::Value) -> ListRequest {
        ListRequest::new().with("filters", value)
    }

    #[test]
    fn test_eq_filter_on_root_column() {
        let builder = builder();
        let request = filters(json!([{"field": "status", "operator": "eq", "value": {"from": "published"}}]));
        let query = builder.filtered_query(&request).unwrap();
        assert!(sql(&query).contains(r#""posts"."status" = 'published'"#));
        assert!(query.joins().is_empty());
    }

    #[test]
    fn test_relation_filter_joins_once() {
        let builder = builder();
        let request = filters(json!([
            {"field": "category", "operator": "eq", "value": {"from": "News"}},
            {"field": "category", "operator": "like", "value": {"from": "ew"}},
        ]));
        let query = builder.filtered_query(&request).unwrap();
        let sql = sql(&query);

        assert_eq!(query.joins(), ["category"]);
        assert_eq!(sql.matches("LEFT JOIN").count(), 1);
        assert!(sql.contains(r#""category"."title" = 'news'"#));
        assert!(sql.contains(r#""category"."title" LIKE '%ew%'"#));
    }

    #[test]
    fn test_between_and_its_one_sided_forms() {
        let builder = builder();
        let mut query = builder.base_query();

        let both = Filter::new("views", "btw", FilterValue::range(10, 20));
        let condition = builder.filter_condition(&mut query, &both).unwrap();
        let sql = post::Entity::find().filter(condition).build(DbBackend::Sqlite).to_string();
        assert!(sql.contains(r#""posts"."views" BETWEEN 10 AND 20"#));

        let from_only = Filter::new("views", "btw", FilterValue::range(10, ""));
        let condition = builder.filter_condition(&mut query, &from_only).unwrap();
        let sql = post::Entity::find().filter(condition).build(DbBackend::Sqlite).to_string();
        assert!(sql.contains(r#""posts"."views" >= 10"#));

        let to_only = Filter::new("views", "btw", FilterValue::range("", 20));
        let condition = builder.filter_condition(&mut query, &to_only).unwrap();
        let sql = post::Entity::find().filter(condition).build(DbBackend::Sqlite).to_string();
        assert!(sql.contains(r#""posts"."views" <= 20"#));
    }

    #[test]
    fn test_between_without_upper_bound_fails_validation() {
        let builder = builder();
        let request = filters(json!([{"field": "views", "operator": "btw", "value": {"from": 10}}]));
        assert!(matches!(
            builder.filtered_query(&request),
            Err(ListError::BetweenBoundsRequired { .. })
        ));
    }

    #[test]
    fn test_in_and_null_filters() {
        let builder = builder();
        let request = filters(json!([
            {"field": "status", "operator": "in", "value": {"from": "draft,published"}},
            {"field": "title", "operator": "isNull", "value": {"from": true}},
        ]));
        let sql = sql(&builder.filtered_query(&request).unwrap());
        assert!(sql.contains(r#""posts"."status" IN ('draft', 'published')"#));
        assert!(sql.contains(r#""posts"."title" IS NULL"#));
    }

    #[test]
    fn test_search_terms_and_words() {
        let builder = builder();
        let request = ListRequest::new().with("filters", json!({"search": "rust async__AND__tokio"}));
        let sql = sql(&builder.filtered_query(&request).unwrap());

        assert!(sql.contains(r#""posts"."title" LIKE '%rust%' AND "posts"."title" LIKE '%async%'"#));
        assert!(sql.contains(r#""posts"."body" LIKE '%tokio%'"#));
        assert!(sql.contains(" OR "));
    }

    #[test]
    fn test_order_replaces_existing_ordering() {
        let builder = builder().with_query(
            post::Entity::find().order_by_asc(post::Column::Id),
        );
        let request = ListRequest::new().with("order_by", json!({"field": "category", "direction": "DESC"}));
        let query = builder.page_query(builder.base_query(), &request).unwrap();
        let sql = sql(&query);

        assert!(sql.contains(r#"ORDER BY "category"."title" DESC"#));
        assert!(!sql.contains(r#""posts"."id" ASC"#));
        assert_eq!(query.joins(), ["category"]);
    }

    #[test]
    fn test_default_order_and_pagination() {
        let builder = builder();
        let request = ListRequest::new().with("page", 3).with("page_limit", 10);
        let sql = sql(&builder.page_query(builder.base_query(), &request).unwrap());

        assert!(sql.contains(r#"ORDER BY "posts"."views" DESC"#));
        assert!(sql.contains("LIMIT 10"));
        assert!(sql.contains("OFFSET 20"));
    }

    #[test]
    fn test_count_query_is_distinct_and_unordered() {
        let builder = builder();
        let mut query = builder.base_query();
        builder
            .apply_order_by(&mut query, &[OrderBy {
                field: "title".to_string(),
                direction: SortDirection::Asc,
            }])
            .unwrap();
        let sql = DbBackend::Sqlite.build(&builder.count_query(&query)).to_string();

        assert!(sql.contains(r#"COUNT(DISTINCT "posts"."id") AS "count""#));
        assert!(!sql.contains("ORDER BY"));
        assert!(!sql.contains("GROUP BY"));
    }

    #[test]
    fn test_custom_query_joins_are_reused() {
        let builder = builder().with_query(post::Entity::find().join_as(
            sea_orm::JoinType::LeftJoin,
            post::Relation::Category.def(),
            Alias::new("category"),
        ));
        let request = filters(json!([{"field": "category", "operator": "eq", "value": {"from": "News"}}]));
        let query = builder.filtered_query(&request).unwrap();
        let sql = sql(&query);

        assert_eq!(query.joins(), ["category"]);
        assert_eq!(sql.matches("JOIN").count(), 1);
        assert!(sql.contains(r#""category"."title" = 'news'"#));
    }

    #[test]
    fn test_grouped_query_counts_root_entities() {
        let builder = builder().with_query(post::Entity::find().group_by(post::Column::Status));
        let query = builder.base_query();
        assert!(query.is_grouped());

        let sql = DbBackend::Sqlite.build(&builder.count_query(&query)).to_string();
        assert!(sql.starts_with(r#"SELECT COUNT("identity") AS "count" FROM (SELECT "posts"."id" AS "identity""#));
        assert!(sql.contains(r#"GROUP BY "posts"."status", "posts"."id""#));
        assert!(sql.ends_with(r#"AS "grouped_rows""#));
    }

    #[test]
    fn test_unknown_association_at_construction() {
        let information = MappingInformation::new().filter(
            "author",
            FieldOptions::relation("author", JoinType::InnerJoin).operators(&[FilterOperator::Eq]),
        );
        let metadata = Arc::new(ListMetadata::from_information(&information).unwrap());
        let error = RelationalQueryBuilder::<post::Entity>::new(metadata, ListHandlerConfig::default())
            .unwrap_err();
        assert!(matches!(
            error,
            ListError::UnknownAssociation { ref field, ref entity } if field == "author" && entity == "posts"
        ));
    }

    #[test]
    fn test_unknown_association_for_dotted_direct_field() {
        let information = MappingInformation::new().sortable("author.name", FieldOptions::direct());
        let metadata = Arc::new(ListMetadata::from_information(&information).unwrap());
        let builder = RelationalQueryBuilder::<post::Entity>::new(metadata, ListHandlerConfig::default()).unwrap();
        let request = ListRequest::new().with("order_by", json!({"field": "author.name"}));

        assert!(matches!(
            builder.page_query(builder.base_query(), &request),
            Err(ListError::UnknownAssociation { .. })
        ));
    }

    #[tokio::test]
    async fn test_source_against_sqlite() {
        let db = seeded_db().await;
        let mut source: OrmListSource<post::Entity> =
            OrmListSource::new(metadata(), ListHandlerConfig::default(), db).unwrap();

        let request = ListRequest::new()
            .with("filters", json!([{"field": "category", "operator": "eq", "value": {"from": "News"}}]))
            .with("page_limit", 1);

        let items = source.process_source(&request).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Release notes");
        assert_eq!(source.items_count(&request).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_custom_query_against_sqlite() {
        let db = seeded_db().await;
        let joined = post::Entity::find().join_as(
            sea_orm::JoinType::LeftJoin,
            post::Relation::Category.def(),
            Alias::new("category"),
        );
        let mut source: OrmListSource<post::Entity> =
            OrmListSource::new(metadata(), ListHandlerConfig::default(), db.clone())
                .unwrap()
                .with_query(joined);
        let request = filters(json!([{"field": "category", "operator": "eq", "value": {"from": "News"}}]));
        assert_eq!(source.process_source(&request).await.unwrap().len(), 2);
        assert_eq!(source.items_count(&request).await.unwrap(), 2);

        let mut grouped: OrmListSource<post::Entity> =
            OrmListSource::new(metadata(), ListHandlerConfig::default(), db)
                .unwrap()
                .with_query(post::Entity::find().group_by(post::Column::Status));
        assert_eq!(grouped.items_count(&ListRequest::new()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_source_hydrates_json() {
        let db = seeded_db().await;
        let mut source = OrmListSource::<post::Entity>::new(metadata(), ListHandlerConfig::default(), db)
            .unwrap()
            .into_model::<serde_json::Value>();

        let request = ListRequest::new().with("filters", json!({"search": "tokio"}));
        let items = source.process_source(&request).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["title"], "Async in practice");
    }
}
