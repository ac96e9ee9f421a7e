//! HTTP surface tests: admin page-block endpoints and public pages

mod common;

use anyhow::Result;
use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use pageblocks::database::entities::page_blocks::{decode_data, Entity as PageBlocks};
use pageblocks::server::app::{create_app, with_blocks};
use sea_orm::{ConnectionTrait, EntityTrait};
use serde_json::{json, Value};

use common::{active_page, setup, TestContext};

async fn setup_test_server() -> Result<(TestServer, TestContext)> {
    let ctx = setup().await?;
    let state = with_blocks(ctx.db.clone(), &ctx.config, ctx.blocks.clone());
    let app = create_app(state, Some("*")).await?;
    let server = TestServer::new(app)?;
    Ok((server, ctx))
}

async fn create_block(server: &TestServer, page_id: i32, block_type: &str) -> i32 {
    let response = server
        .post("/admin/page-blocks")
        .json(&json!({"page_id": page_id, "type": block_type}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    body["id"].as_i64().unwrap_or_default() as i32
}

#[tokio::test]
async fn test_health_endpoint() -> Result<()> {
    let (server, _ctx) = setup_test_server().await?;

    let response = server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["service"], "pageblocks-server");
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_index_redirects_to_pages() -> Result<()> {
    let (server, _ctx) = setup_test_server().await?;

    let response = server.get("/admin/page-blocks").await;

    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/admin/pages");
    Ok(())
}

#[tokio::test]
async fn test_create_and_edit_listing() -> Result<()> {
    let (server, ctx) = setup_test_server().await?;
    let page = active_page(&ctx.db, "home").await?;

    let response = server
        .post("/admin/page-blocks")
        .json(&json!({"page_id": page.id, "type": "template|hero"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let flash: Value = response.json();
    assert_eq!(flash["alert_type"], "success");
    assert!(flash["message"].is_string());

    let response = server.get(&format!("/admin/page-blocks/{}", page.id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["page"]["id"], json!(page.id));
    assert_eq!(body["blocks"][0]["path"], "hero");
    assert_eq!(body["blocks"][0]["values"]["title"], "Welcome");
    assert_eq!(body["blocks"][0]["schema"]["fields"][0]["field"], "title");
    let types: Vec<&str> = body["types"]
        .as_array()
        .map(|t| t.iter().filter_map(|o| o["value"].as_str()).collect())
        .unwrap_or_default();
    assert!(types.contains(&"template|hero"));
    assert!(types.contains(&"include|recent"));
    assert!(types.contains(&"include"));

    let missing = server.get("/admin/page-blocks/999").await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_create_with_unconfigured_path_reports_message() -> Result<()> {
    let (server, ctx) = setup_test_server().await?;
    let page = active_page(&ctx.db, "home").await?;

    let response = server
        .post("/admin/page-blocks")
        .json(&json!({"page_id": page.id, "type": "template|nope"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let flash: Value = response.json();
    assert_eq!(flash["alert_type"], "danger");
    assert_eq!(flash["message"], "Page block template 'nope' is not configured");
    Ok(())
}

#[tokio::test]
async fn test_multipart_update() -> Result<()> {
    let (server, ctx) = setup_test_server().await?;
    let page = active_page(&ctx.db, "home").await?;
    let id = create_block(&server, page.id, "template|hero").await;

    let form = MultipartForm::new()
        .add_text("title_i18n", r#"{"en":"Hello","de":"Hallo"}"#)
        .add_text("subtitle", "Welcome aboard")
        .add_text("is_hidden", "1")
        .add_text("cache_ttl", "15")
        .add_part(
            "image",
            Part::bytes(vec![1, 2, 3])
                .file_name("hero.png")
                .mime_type("image/png"),
        );
    let response = server
        .post(&format!("/admin/page-blocks/{}", id))
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let block = PageBlocks::find_by_id(id).one(&ctx.db).await?.expect("block exists");
    let data = decode_data(&block.data)?;
    assert_eq!(data["title"], "Hello");
    assert_eq!(data["subtitle"], "Welcome aboard");
    assert!(data["image"].as_str().unwrap_or_default().ends_with(".png"));
    assert!(block.is_hidden);
    assert_eq!(block.cache_ttl, Some(15));
    Ok(())
}

#[tokio::test]
async fn test_multipart_update_validation_errors() -> Result<()> {
    let (server, ctx) = setup_test_server().await?;
    let page = active_page(&ctx.db, "home").await?;
    let id = create_block(&server, page.id, "template|hero").await;

    let form = MultipartForm::new().add_text("title_i18n", r#"{"en":""}"#);
    let response = server
        .post(&format!("/admin/page-blocks/{}", id))
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["alert_type"], "danger");
    assert_eq!(body["errors"]["title"][0], "The Title field is required.");
    Ok(())
}

#[tokio::test]
async fn test_sort_minimize_and_layout() -> Result<()> {
    let (server, ctx) = setup_test_server().await?;
    let page = active_page(&ctx.db, "home").await?;
    let a = create_block(&server, page.id, "template|hero").await;
    let b = create_block(&server, page.id, "template|banner").await;

    let response = server
        .post("/admin/page-blocks/sort")
        .json(&json!({"order": [{"id": b}, {"id": a}]}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let first = PageBlocks::find_by_id(b).one(&ctx.db).await?.expect("block exists");
    assert_eq!(first.order, 1);

    let response = server
        .post("/admin/page-blocks/minimize")
        .json(&json!({"id": a, "is_minimized": true}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let minimized = PageBlocks::find_by_id(a).one(&ctx.db).await?.expect("block exists");
    assert!(minimized.is_minimized);

    let response = server
        .post(&format!("/admin/page-blocks/{}/layout", page.id))
        .json(&json!({"layout": "layouts.landing"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = server.get("/").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().starts_with("<main data-layout=\"landing\">"));
    Ok(())
}

#[tokio::test]
async fn test_delete_block() -> Result<()> {
    let (server, ctx) = setup_test_server().await?;
    let page = active_page(&ctx.db, "home").await?;
    let id = create_block(&server, page.id, "template|hero").await;

    let response = server.delete(&format!("/admin/page-blocks/{}", id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let flash: Value = response.json();
    assert_eq!(flash["alert_type"], "success");

    let again = server.delete(&format!("/admin/page-blocks/{}", id)).await;
    assert_eq!(again.status_code(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_failed_delete_returns_conflict_flash() -> Result<()> {
    let (server, ctx) = setup_test_server().await?;
    let page = active_page(&ctx.db, "home").await?;
    let id = create_block(&server, page.id, "template|hero").await;
    ctx.db.execute_unprepared("DROP TABLE translations").await?;

    let response = server.delete(&format!("/admin/page-blocks/{}", id)).await;

    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let flash: Value = response.json();
    assert_eq!(flash["alert_type"], "danger");
    assert!(flash["message"]
        .as_str()
        .unwrap_or_default()
        .starts_with(&format!("Unable to delete page block {}", id)));
    assert!(PageBlocks::find_by_id(id).one(&ctx.db).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn test_public_pages() -> Result<()> {
    let (server, ctx) = setup_test_server().await?;
    let home = active_page(&ctx.db, "home").await?;
    active_page(&ctx.db, "about").await?;
    create_block(&server, home.id, "template|hero").await;

    let response = server.get("/").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains("<h1>Welcome</h1>"));

    let about = server.get("/de/about").await;
    assert_eq!(about.status_code(), StatusCode::OK);
    assert!(about.text().contains("<html lang=\"de\">"));

    let missing = server.get("/nowhere").await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    Ok(())
}
