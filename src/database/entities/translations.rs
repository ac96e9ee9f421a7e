use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One translated value: (table, column, record, locale) → value.
///
/// The default locale never appears here; its value lives on the record.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "translations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub table_name: String,
    pub column_name: String,
    pub foreign_key: i32,
    pub locale: String,
    pub value: String,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
