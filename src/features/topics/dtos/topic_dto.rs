use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::topics::models::Topic;
use crate::shared::validation::SLUG_REGEX;

/// Response DTO for topic
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TopicResponseDto {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub display_order: i32,
}

impl From<Topic> for TopicResponseDto {
    fn from(t: Topic) -> Self {
        Self {
            id: t.id,
            slug: t.slug,
            name: t.name,
            description: t.description,
            is_active: t.is_active,
            display_order: t.display_order,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTopicDto {
    /// Lowercase alphanumeric with single hyphens, e.g. `organic-chemistry`
    #[validate(
        length(min = 1, max = 64, message = "Slug must be 1-64 characters"),
        regex(path = *SLUG_REGEX, message = "Slug must be lowercase alphanumeric with hyphens")
    )]
    pub slug: String,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(max = 500, message = "Description must not exceed 500 characters"))]
    pub description: Option<String>,

    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateTopicDto {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Description must not exceed 500 characters"))]
    pub description: Option<String>,

    pub is_active: Option<bool>,

    pub display_order: Option<i32>,
}
