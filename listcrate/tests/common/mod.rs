use listcrate::{
    EntityListHandlerFactory, ListHandlerConfig, ListMetadataManager, YamlDriver,
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectionTrait, Database, DatabaseConnection, DbErr,
    Schema,
};
use std::sync::Arc;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

pub mod blog;

pub const POSTS_MAPPING: &str = r"
sortableFields:
  title: ~
  views: ~
  publishedAt:
    name: published_at
  category:
    target: relation
    name: category.title
    joinField: category
    joinType: leftJoin
filterFields:
  status:
    operators: [eq, neq, in, notIn]
    title: Status
  views:
    operators: [btw, gt, gte, lt, lte]
  title:
    operators: [like, nlike, rlike, llike, isNull, isNotNull]
  publishedAt:
    name: published_at
    type: date
    format: '%Y-%m-%d'
    operators: [eq, btw, gte, lte]
  category:
    target: relation
    name: category.title
    joinField: category
    joinType: leftJoin
    operators: [eq, like]
    globalSearch: true
searchFields:
  - title
  - body
defaultOrderFields:
  views:
    direction: DESC
";

/// Route library events to the test output; `RUST_LOG=listcrate=trace`
/// shows the generated SQL. Later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    init_tracing();
    let db = Database::connect("sqlite::memory:").await?;
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    db.execute(backend.build(&schema.create_table_from_entity(blog::category::Entity)))
        .await?;
    db.execute(backend.build(&schema.create_table_from_entity(blog::post::Entity)))
        .await?;

    Ok(db)
}

/// Two categories and six posts with distinct view counts.
pub async fn setup_blog_db() -> Result<DatabaseConnection, DbErr> {
    let db = setup_test_db().await?;

    for (id, title) in [(1, "news"), (2, "guides")] {
        blog::category::ActiveModel {
            id: Set(id),
            title: Set(title.to_string()),
        }
        .insert(&db)
        .await?;
    }

    let posts = [
        (1, "Release notes", "What changed in this release", "published", 50, "2024-01-15", 1),
        (2, "Async in practice", "Using tokio for network io", "published", 120, "2024-02-03", 2),
        (3, "Weekly digest", "Links worth reading", "draft", 10, "2024-02-10", 1),
        (4, "Rust error handling", "thiserror and anyhow compared", "published", 80, "2024-03-01", 2),
        (5, "Roadmap", "What comes next", "archived", 5, "2023-12-20", 1),
        (6, "Async traits", "Dynamic dispatch with async-trait", "draft", 30, "2024-03-12", 2),
    ];
    for (id, title, body, status, views, published_at, category_id) in posts {
        blog::post::ActiveModel {
            id: Set(id),
            title: Set(title.to_string()),
            body: Set(body.to_string()),
            status: Set(status.to_string()),
            views: Set(views),
            published_at: Set(published_at.to_string()),
            category_id: Set(category_id),
        }
        .insert(&db)
        .await?;
    }

    Ok(db)
}

/// Factory reading `posts.yml` from a temporary mapping directory. The
/// directory lives as long as the returned guard.
pub fn blog_factory() -> (EntityListHandlerFactory, TempDir) {
    let directory = tempfile::tempdir().unwrap();
    std::fs::write(directory.path().join("posts.yml"), POSTS_MAPPING).unwrap();

    let config = ListHandlerConfig::default().with_metadata_directory(directory.path());
    let manager = ListMetadataManager::new(YamlDriver::new(directory.path()));
    (EntityListHandlerFactory::new(Arc::new(manager), config), directory)
}
