//! Route resolution and page composition tests

mod common;

use anyhow::Result;
use pageblocks::database::entities::PageStatus;
use pageblocks::errors::BlockError;
use pageblocks::services::BlockUpdate;
use pageblocks::views::DEFAULT_LAYOUT;
use serde_json::json;

use common::{active_page, create_page, setup};

#[tokio::test]
async fn test_root_path_loads_home_page() -> Result<()> {
    let ctx = setup().await?;
    let home = active_page(&ctx.db, "home").await?;
    let block = ctx.editor.create(home.id, "template|hero").await?;

    let page = ctx.loader.load("/").await?;

    assert_eq!(page.page.id, home.id);
    assert_eq!(page.locale, "en");
    assert_eq!(page.layout, DEFAULT_LAYOUT);
    assert!(page.html.contains("<html lang=\"en\">"));
    assert!(page.html.contains(&format!("id=\"block-id-{}\"", block.id)));
    assert!(page.html.contains("<h1>Welcome</h1>"));
    Ok(())
}

#[tokio::test]
async fn test_inactive_and_unknown_pages_are_not_found() -> Result<()> {
    let ctx = setup().await?;
    active_page(&ctx.db, "home").await?;
    create_page(&ctx.db, "draft", "draft", PageStatus::INACTIVE).await?;

    let draft = ctx.loader.load("/draft").await;
    assert!(matches!(draft, Err(BlockError::RouteNotFound(_))));

    let unknown = ctx.loader.load("/nowhere").await;
    assert!(matches!(unknown, Err(ref e) if e.is_not_found()));
    Ok(())
}

#[tokio::test]
async fn test_translated_slug_and_title() -> Result<()> {
    let ctx = setup().await?;
    let about = active_page(&ctx.db, "about").await?;
    ctx.translations
        .upsert("pages", "slug", about.id, "de", "ueber-uns".to_string())
        .await?;
    ctx.translations
        .upsert("pages", "title", about.id, "de", "Über uns".to_string())
        .await?;

    let table = ctx.loader.route_table().await?;
    assert_eq!(table["about"]["en"], "about");
    assert_eq!(table["about"]["de"], "ueber-uns");
    assert_eq!(table["about"]["fr"], "about");

    let de = ctx.loader.load("/de/ueber-uns").await?;
    assert_eq!(de.page.id, about.id);
    assert_eq!(de.locale, "de");
    assert_eq!(de.title, "Über uns");
    assert!(de.html.contains("<title>Über uns</title>"));

    let fallback = ctx.loader.load("/de/about").await?;
    assert_eq!(fallback.page.id, about.id);

    let en = ctx.loader.load("/about").await?;
    assert_eq!(en.title, "about title");
    Ok(())
}

#[tokio::test]
async fn test_layout_falls_back_when_view_is_missing() -> Result<()> {
    let ctx = setup().await?;
    let home = active_page(&ctx.db, "home").await?;

    ctx.editor
        .change_layout(home.id, Some("layouts.landing".to_string()))
        .await?;
    let landing = ctx.loader.load("/").await?;
    assert_eq!(landing.layout, "layouts.landing");
    assert!(landing.html.starts_with("<main data-layout=\"landing\">"));

    ctx.editor
        .change_layout(home.id, Some("layouts.missing".to_string()))
        .await?;
    let fallback = ctx.loader.load("/").await?;
    assert_eq!(fallback.layout, DEFAULT_LAYOUT);
    Ok(())
}

#[tokio::test]
async fn test_route_table_is_cached_until_expiry() -> Result<()> {
    let ctx = setup().await?;
    active_page(&ctx.db, "home").await?;
    ctx.loader.load("/").await?;

    active_page(&ctx.db, "contact").await?;
    let stale = ctx.loader.load("/contact").await;
    assert!(matches!(stale, Err(BlockError::RouteNotFound(_))));

    ctx.cache.flush().await;
    let fresh = ctx.loader.load("/contact").await?;
    assert_eq!(fresh.page.route_name, "contact");
    Ok(())
}

#[tokio::test]
async fn test_localized_page_renders_translated_blocks() -> Result<()> {
    let ctx = setup().await?;
    let home = active_page(&ctx.db, "home").await?;
    let block = ctx.editor.create(home.id, "template|hero").await?;
    ctx.editor
        .update(
            block.id,
            BlockUpdate {
                values: json!({"title_i18n": {"en": "Hello", "fr": "Bonjour"}})
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
                ..Default::default()
            },
        )
        .await?;

    let fr = ctx.loader.load("/fr").await?;
    assert!(fr.html.contains("<h1>Bonjour</h1>"));
    assert!(fr.html.contains("<html lang=\"fr\">"));
    Ok(())
}
