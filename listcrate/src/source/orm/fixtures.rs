//! Posts with categories on an in-memory SQLite database.

use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectionTrait, Database, DatabaseConnection, Schema};

pub mod category {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "categories")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub title: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::post::Entity")]
        Posts,
    }

    impl Related<super::post::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Posts.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod post {
    use sea_orm::entity::prelude::*;

    use crate::source::ListEntity;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "posts")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub title: String,
        pub body: String,
        pub status: String,
        pub views: i32,
        pub category_id: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::category::Entity",
            from = "Column::CategoryId",
            to = "super::category::Column::Id"
        )]
        Category,
    }

    impl Related<super::category::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Category.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}

    impl ListEntity for Entity {
        fn association(join_field: &str) -> Option<RelationDef> {
            match join_field {
                "category" => Some(Relation::Category.def()),
                _ => None,
            }
        }
    }
}

pub async fn seeded_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    db.execute(backend.build(&schema.create_table_from_entity(category::Entity)))
        .await
        .unwrap();
    db.execute(backend.build(&schema.create_table_from_entity(post::Entity)))
        .await
        .unwrap();

    for (id, title) in [(1, "news"), (2, "guides")] {
        category::ActiveModel {
            id: Set(id),
            title: Set(title.to_string()),
        }
        .insert(&db)
        .await
        .unwrap();
    }

    let posts = [
        (1, "Release notes", "What changed this month", "published", 50, 1),
        (2, "Async in practice", "Using tokio for network io", "published", 120, 2),
        (3, "Weekly digest", "Links worth reading", "draft", 10, 1),
    ];
    for (id, title, body, status, views, category_id) in posts {
        post::ActiveModel {
            id: Set(id),
            title: Set(title.to_string()),
            body: Set(body.to_string()),
            status: Set(status.to_string()),
            views: Set(views),
            category_id: Set(category_id),
        }
        .insert(&db)
        .await
        .unwrap();
    }

    db
}
