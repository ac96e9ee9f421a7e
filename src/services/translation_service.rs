//! Translation side-table operations
//!
//! Rows are keyed by (table name, column name, record id, locale). The
//! default locale is never stored here. Every function is generic over the
//! connection so callers can run them inside a transaction.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::database::entities::translations::{self, Entity as Translations};

/// Connection-bound access to the translation side table
#[derive(Clone)]
pub struct TranslationService {
    db: DatabaseConnection,
}

impl TranslationService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn translate(
        &self,
        table: &str,
        column: &str,
        record_id: i32,
        locale: &str,
    ) -> Result<Option<String>, DbErr> {
        translate(&self.db, table, column, record_id, locale).await
    }

    pub async fn upsert(
        &self,
        table: &str,
        column: &str,
        record_id: i32,
        locale: &str,
        value: String,
    ) -> Result<translations::Model, DbErr> {
        upsert(&self.db, table, column, record_id, locale, value).await
    }

    pub async fn translations_for_record(
        &self,
        table: &str,
        column: &str,
        record_id: i32,
    ) -> Result<Vec<translations::Model>, DbErr> {
        for_record(&self.db, table, column, record_id).await
    }

    pub async fn translations_for_column(
        &self,
        table: &str,
        column: &str,
    ) -> Result<Vec<translations::Model>, DbErr> {
        for_column(&self.db, table, column).await
    }

    pub async fn delete_for_record(&self, table: &str, record_id: i32) -> Result<u64, DbErr> {
        delete_for_record(&self.db, table, record_id).await
    }

    pub async fn mirror(
        &self,
        table: &str,
        column: &str,
        from_id: i32,
        to_id: i32,
    ) -> Result<(), DbErr> {
        mirror(&self.db, table, column, from_id, to_id).await
    }
}

fn record_filter(
    table: &str,
    column: &str,
    record_id: i32,
) -> sea_orm::Select<Translations> {
    Translations::find()
        .filter(translations::Column::TableName.eq(table))
        .filter(translations::Column::ColumnName.eq(column))
        .filter(translations::Column::ForeignKey.eq(record_id))
}

/// Translated value of one column for `locale`, if a row exists
pub async fn translate<C: ConnectionTrait>(
    conn: &C,
    table: &str,
    column: &str,
    record_id: i32,
    locale: &str,
) -> Result<Option<String>, DbErr> {
    let row = record_filter(table, column, record_id)
        .filter(translations::Column::Locale.eq(locale))
        .one(conn)
        .await?;
    Ok(row.map(|t| t.value))
}

/// Update the translation row if it exists, create it otherwise
pub async fn upsert<C: ConnectionTrait>(
    conn: &C,
    table: &str,
    column: &str,
    record_id: i32,
    locale: &str,
    value: String,
) -> Result<translations::Model, DbErr> {
    let now = Utc::now();
    let existing = record_filter(table, column, record_id)
        .filter(translations::Column::Locale.eq(locale))
        .one(conn)
        .await?;

    match existing {
        Some(row) => {
            let mut row: translations::ActiveModel = row.into();
            row.value = Set(value);
            row.updated_at = Set(now);
            row.update(conn).await
        }
        None => {
            translations::ActiveModel {
                table_name: Set(table.to_string()),
                column_name: Set(column.to_string()),
                foreign_key: Set(record_id),
                locale: Set(locale.to_string()),
                value: Set(value),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(conn)
            .await
        }
    }
}

/// All translations of one column of a record, ordered by locale
pub async fn for_record<C: ConnectionTrait>(
    conn: &C,
    table: &str,
    column: &str,
    record_id: i32,
) -> Result<Vec<translations::Model>, DbErr> {
    record_filter(table, column, record_id)
        .order_by_asc(translations::Column::Locale)
        .all(conn)
        .await
}

/// All translations of one column across a table
pub async fn for_column<C: ConnectionTrait>(
    conn: &C,
    table: &str,
    column: &str,
) -> Result<Vec<translations::Model>, DbErr> {
    Translations::find()
        .filter(translations::Column::TableName.eq(table))
        .filter(translations::Column::ColumnName.eq(column))
        .order_by_asc(translations::Column::ForeignKey)
        .all(conn)
        .await
}

/// Delete every translation of a record, across all columns
pub async fn delete_for_record<C: ConnectionTrait>(
    conn: &C,
    table: &str,
    record_id: i32,
) -> Result<u64, DbErr> {
    let result = Translations::delete_many()
        .filter(translations::Column::TableName.eq(table))
        .filter(translations::Column::ForeignKey.eq(record_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

/// Make `to_id`'s translations of `column` identical to `from_id`'s
pub async fn mirror<C: ConnectionTrait>(
    conn: &C,
    table: &str,
    column: &str,
    from_id: i32,
    to_id: i32,
) -> Result<(), DbErr> {
    let source = for_record(conn, table, column, from_id).await?;
    let locales: Vec<String> = source.iter().map(|t| t.locale.clone()).collect();

    let mut stale = Translations::delete_many()
        .filter(translations::Column::TableName.eq(table))
        .filter(translations::Column::ColumnName.eq(column))
        .filter(translations::Column::ForeignKey.eq(to_id));
    if !locales.is_empty() {
        stale = stale.filter(translations::Column::Locale.is_not_in(locales));
    }
    stale.exec(conn).await?;

    for row in source {
        upsert(conn, table, column, to_id, &row.locale, row.value).await?;
    }
    Ok(())
}
