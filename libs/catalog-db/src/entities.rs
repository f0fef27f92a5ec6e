//! `sea-orm` entities for the catalog store (§3). One submodule per
//! entity, grounded on `modules/oagw/oagw-gw/src/infra/storage/entity.rs`'s
//! per-entity module style. No tenant-scoping macro is applied — this
//! store is single-tenant.

pub use agency::Entity as AgencyEntity;
pub use dataset::Entity as DatasetEntity;
pub use domain::Entity as DomainEntity;
pub use host::Entity as HostEntity;
pub use resume_state::Entity as ResumeStateEntity;

/// Host entity for the `host` table (§3 Host).
pub mod host {
    use chrono::{DateTime, Utc};
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "host")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub host: String,
        pub region: String,
        pub last_seen: DateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::agency::Entity")]
        Agencies,
    }

    impl Related<super::agency::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Agencies.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// Domain entity for the `domain` table (§3 Domain).
pub mod domain {
    use chrono::{DateTime, Utc};
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "domain")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub domain: String,
        pub country: Option<String>,
        pub region: String,
        pub last_seen: DateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Agency entity for the `agency` table (§3 Agency). Composite key
/// `(host, name)`; `host` cascades on delete from `host`.
pub mod agency {
    use chrono::{DateTime, Utc};
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "agency")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub host: String,
        #[sea_orm(primary_key, auto_increment = false)]
        pub name: String,
        pub agency_type: Option<String>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::host::Entity",
            from = "Column::Host",
            to = "super::host::Column::Host",
            on_delete = "Cascade"
        )]
        Host,
    }

    impl Related<super::host::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Host.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// Dataset entity for the `dataset` table (§3 Dataset). Composite key
/// `(host, dataset_id)`. `tags` persists as a JSON column, preserving
/// insertion order.
pub mod dataset {
    use chrono::{DateTime, Utc};
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "dataset")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub host: String,
        #[sea_orm(primary_key, auto_increment = false)]
        pub dataset_id: String,
        pub title: String,
        pub description: Option<String>,
        pub category: Option<String>,
        #[sea_orm(column_type = "Json")]
        pub tags: serde_json::Value,
        pub publisher: Option<String>,
        pub updated_at: Option<DateTime<Utc>>,
        pub row_count: Option<i64>,
        pub view_count: Option<i64>,
        pub link: Option<String>,
        pub active: bool,
        pub first_seen: DateTime<Utc>,
        pub last_seen: DateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Resume-state entity for the `resume_state` table (§3 ResumeState),
/// singleton per `pipeline`.
pub mod resume_state {
    use chrono::{DateTime, Utc};
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "resume_state")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub pipeline: String,
        pub resume_token: String,
        pub last_processed_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
