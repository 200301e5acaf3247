use anyhow::Result;
use axum::http::StatusCode;
use democracy_core::{
    Role,
    api::{utils as route_utils, v1},
};
use serde_json::{Value, json};

#[path = "support/mod.rs"]
mod support;

use support::{bearer, create_user, login, seed_account, start};

fn members(group_id: i64) -> String {
    route_utils::replace_param(v1::groups::MEMBERS, "{id}", group_id.to_string())
}

#[tokio::test]
async fn group_membership_lifecycle() -> Result<()> {
    let harness = start().await?;
    let auth = bearer(&harness.admin_token);
    let user_id = create_user(&harness, "voter@example.org").await?;

    let group = harness
        .server
        .post(v1::groups::COLLECTION)
        .add_header("Authorization", auth.clone())
        .json(&json!({ "description": "  Class 11B  " }))
        .await;
    group.assert_status(StatusCode::CREATED);
    let group: Value = group.json();
    assert_eq!(group["data"]["description"], "Class 11B");
    let group_id = group["data"]["group_id"].as_i64().unwrap();

    let added = harness
        .server
        .post(&members(group_id))
        .add_header("Authorization", auth.clone())
        .json(&json!({ "user_id": user_id }))
        .await;
    added.assert_status(StatusCode::CREATED);
    assert_eq!(added.json::<Value>()["data"]["user_id"], user_id);

    harness
        .server
        .post(&members(group_id))
        .add_header("Authorization", auth.clone())
        .json(&json!({ "user_id": user_id }))
        .await
        .assert_status(StatusCode::CONFLICT);

    harness
        .server
        .post(&members(group_id))
        .add_header("Authorization", auth.clone())
        .json(&json!({ "user_id": 9999 }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    harness
        .server
        .post(&members(9999))
        .add_header("Authorization", auth)
        .json(&json!({ "user_id": user_id }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn descriptions_are_validated() -> Result<()> {
    let harness = start().await?;
    let auth = bearer(&harness.admin_token);

    let blank = harness
        .server
        .post(v1::votings::COLLECTION)
        .add_header("Authorization", auth.clone())
        .json(&json!({ "description": "   " }))
        .await;
    blank.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        blank.json::<Value>()["error"]["fields"][0]["field"],
        "description"
    );

    harness
        .server
        .post(v1::groups::COLLECTION)
        .add_header("Authorization", auth)
        .json(&json!({ "description": "x".repeat(51) }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn membership_routes_are_admin_only() -> Result<()> {
    let harness = start().await?;
    seed_account(&harness.state, "clerk@example.org", "clerk-pass", &[Role::User]).await?;
    let token = login(&harness.server, "clerk@example.org", "clerk-pass").await?;

    harness
        .server
        .post(v1::groups::COLLECTION)
        .add_header("Authorization", bearer(&token))
        .json(&json!({ "description": "Class 11B" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    harness
        .server
        .post(v1::votings::COLLECTION)
        .json(&json!({ "description": "Council" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    Ok(())
}
