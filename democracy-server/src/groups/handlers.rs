use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::info;

use democracy_core::{
    api::ApiResponse,
    domain::{
        groups::{
            Candidacy, Group, GroupId, GroupMembership, Voting, VotingId, validate_description,
        },
        users::UserId,
    },
};

use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

#[derive(Debug, Deserialize)]
pub struct DescriptionRequest {
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct LinkUserRequest {
    pub user_id: UserId,
}

fn validated_description(request: &DescriptionRequest) -> AppResult<String> {
    validate_description(&request.description)
        .map_err(|message| AppError::bad_request(message).with_field("description"))
}

pub async fn create_group(
    State(state): State<AppState>,
    Json(request): Json<DescriptionRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Group>>)> {
    let description = validated_description(&request)?;
    let group = state.membership().create_group(&description).await?;
    info!(group_id = group.group_id, "group created");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(group))))
}

pub async fn add_group_member(
    State(state): State<AppState>,
    Path(group_id): Path<GroupId>,
    Json(request): Json<LinkUserRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<GroupMembership>>)> {
    let membership = state
        .membership()
        .add_group_member(group_id, request.user_id)
        .await?;
    info!(group_id, user_id = request.user_id, "group member added");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(membership))))
}

pub async fn create_voting(
    State(state): State<AppState>,
    Json(request): Json<DescriptionRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Voting>>)> {
    let description = validated_description(&request)?;
    let voting = state.membership().create_voting(&description).await?;
    info!(voting_id = voting.voting_id, "voting created");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(voting))))
}

pub async fn add_candidate(
    State(state): State<AppState>,
    Path(voting_id): Path<VotingId>,
    Json(request): Json<LinkUserRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Candidacy>>)> {
    let candidacy = state
        .membership()
        .add_candidate(voting_id, request.user_id)
        .await?;
    info!(voting_id, user_id = request.user_id, "candidate added");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(candidacy))))
}
