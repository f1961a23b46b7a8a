use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::core::error::Result;
use crate::features::meta::dtos::{DifficultyDto, MetadataDto, PublicStatsDto};
use crate::features::meta::services::MetaService;
use crate::features::topics::dtos::TopicResponseDto;
use crate::shared::types::{ApiResponse, Meta};

#[utoipa::path(
    get,
    path = "/api/meta/topics",
    tag = "meta",
    responses(
        (status = 200, description = "Active topics", body = ApiResponse<Vec<TopicResponseDto>>)
    )
)]
pub async fn list_topics(
    State(service): State<Arc<MetaService>>,
) -> Result<Json<ApiResponse<Vec<TopicResponseDto>>>> {
    let topics = service.topics().await?;
    let total = topics.len() as i64;
    Ok(Json(ApiResponse::success(Some(topics), None, Some(Meta { total }))))
}

#[utoipa::path(
    get,
    path = "/api/meta/difficulties",
    tag = "meta",
    responses(
        (status = 200, description = "Quiz difficulty levels", body = ApiResponse<Vec<DifficultyDto>>)
    )
)]
pub async fn list_difficulties(
    State(service): State<Arc<MetaService>>,
) -> Json<ApiResponse<Vec<DifficultyDto>>> {
    Json(ApiResponse::success(Some(service.difficulties()), None, None))
}

#[utoipa::path(
    get,
    path = "/api/meta/stats",
    tag = "meta",
    responses(
        (status = 200, description = "Public counters", body = ApiResponse<PublicStatsDto>)
    )
)]
pub async fn get_public_stats(
    State(service): State<Arc<MetaService>>,
) -> Result<Json<ApiResponse<PublicStatsDto>>> {
    let stats = service.stats().await?;
    Ok(Json(ApiResponse::success(Some(stats), None, None)))
}

#[utoipa::path(
    get,
    path = "/api/meta/{key}",
    tag = "meta",
    params(("key" = String, Path, description = "Metadata key")),
    responses(
        (status = 200, description = "Public metadata value", body = ApiResponse<MetadataDto>),
        (status = 404, description = "Key missing or not public")
    )
)]
pub async fn get_metadata(
    State(service): State<Arc<MetaService>>,
    Path(key): Path<String>,
) -> Result<Json<ApiResponse<MetadataDto>>> {
    let metadata = service.get_public(&key).await?;
    Ok(Json(ApiResponse::success(Some(metadata), None, None)))
}
