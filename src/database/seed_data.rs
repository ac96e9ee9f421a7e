use anyhow::Result;
use chrono::Utc;
use sea_orm::*;
use tracing::info;

use crate::blocks::TemplateResolver;
use crate::database::entities::page_blocks::BlockType;
use crate::database::entities::{pages, PageStatus};
use crate::services::BlockEditor;

/// Create an active `home` page holding one block per configured template.
///
/// Returns the page id; an existing `home` page is left untouched.
pub async fn create_home_page(
    db: &DatabaseConnection,
    editor: &BlockEditor,
    templates: &TemplateResolver,
) -> Result<i32> {
    let existing = pages::Entity::find()
        .filter(pages::Column::RouteName.eq("home"))
        .one(db)
        .await?;

    if let Some(page) = existing {
        info!("Home page already exists, skipping seed data creation");
        return Ok(page.id);
    }

    let now = Utc::now();
    let page = pages::ActiveModel {
        title: Set("Home".to_string()),
        slug: Set("home".to_string()),
        route_name: Set("home".to_string()),
        status: Set(PageStatus::ACTIVE.to_string()),
        layout: Set(None),
        site: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let page_id = pages::Entity::insert(page).exec(db).await?.last_insert_id;
    info!("Created home page with ID: {}", page_id);

    for schema in templates.all() {
        let block_type = schema.block_type.as_deref().unwrap_or(BlockType::TEMPLATE);
        let block = editor
            .create(page_id, &format!("{}|{}", block_type, schema.path))
            .await?;
        info!("Seeded {} block {} on home page", schema.path, block.id);
    }

    Ok(page_id)
}
