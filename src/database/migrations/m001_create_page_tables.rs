use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Pages::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Pages::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Pages::Title).text().not_null())
                    .col(ColumnDef::new(Pages::Slug).text().not_null())
                    .col(ColumnDef::new(Pages::RouteName).text().not_null().unique_key())
                    .col(ColumnDef::new(Pages::Status).text().not_null().default("INACTIVE"))
                    .col(ColumnDef::new(Pages::Layout).text())
                    .col(ColumnDef::new(Pages::Site).text())
                    .col(ColumnDef::new(Pages::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Pages::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PageBlocks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PageBlocks::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(PageBlocks::PageId).integer().not_null())
                    .col(ColumnDef::new(PageBlocks::Type).text().not_null())
                    .col(ColumnDef::new(PageBlocks::Path).text().not_null())
                    .col(ColumnDef::new(PageBlocks::Controller).text())
                    .col(ColumnDef::new(PageBlocks::Data).text().not_null())
                    .col(ColumnDef::new(PageBlocks::Order).big_integer().not_null().default(0))
                    .col(ColumnDef::new(PageBlocks::IsHidden).boolean().not_null().default(false))
                    .col(ColumnDef::new(PageBlocks::IsMinimized).boolean().not_null().default(false))
                    .col(ColumnDef::new(PageBlocks::IsDeleteDenied).boolean().not_null().default(false))
                    .col(ColumnDef::new(PageBlocks::CacheTtl).integer())
                    .col(ColumnDef::new(PageBlocks::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(PageBlocks::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_page_blocks_page_id")
                            .from(PageBlocks::Table, PageBlocks::PageId)
                            .to(Pages::Table, Pages::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Translations::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Translations::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Translations::TableName).text().not_null())
                    .col(ColumnDef::new(Translations::ColumnName).text().not_null())
                    .col(ColumnDef::new(Translations::ForeignKey).integer().not_null())
                    .col(ColumnDef::new(Translations::Locale).text().not_null())
                    .col(ColumnDef::new(Translations::Value).text().not_null())
                    .col(ColumnDef::new(Translations::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Translations::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_page_blocks_page_id_order")
                    .table(PageBlocks::Table)
                    .col(PageBlocks::PageId)
                    .col(PageBlocks::Order)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_page_blocks_path")
                    .table(PageBlocks::Table)
                    .col(PageBlocks::Path)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_translations_record_locale")
                    .table(Translations::Table)
                    .col(Translations::TableName)
                    .col(Translations::ColumnName)
                    .col(Translations::ForeignKey)
                    .col(Translations::Locale)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Translations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PageBlocks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Pages::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Pages {
    Table,
    Id,
    Title,
    Slug,
    RouteName,
    Status,
    Layout,
    Site,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PageBlocks {
    Table,
    Id,
    PageId,
    Type,
    Path,
    Controller,
    Data,
    Order,
    IsHidden,
    IsMinimized,
    IsDeleteDenied,
    CacheTtl,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Translations {
    Table,
    Id,
    TableName,
    ColumnName,
    ForeignKey,
    Locale,
    Value,
    CreatedAt,
    UpdatedAt,
}
