use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::admin::{dtos as admin_dtos, handlers as admin_handlers};
use crate::features::auth::{self, dtos as auth_dtos};
use crate::features::checkout::{
    dtos as checkout_dtos, handlers as checkout_handlers, models as checkout_models,
};
use crate::features::documents::{dtos as documents_dtos, handlers as documents_handlers};
use crate::features::meta::{dtos as meta_dtos, handlers as meta_handlers};
use crate::features::quizzes::{
    dtos as quizzes_dtos, handlers as quizzes_handlers, models as quizzes_models,
};
use crate::features::reports::{
    dtos as reports_dtos, handlers as reports_handlers, models as reports_models,
};
use crate::features::topics::dtos as topics_dtos;
use crate::features::users::{dtos as users_dtos, handlers::user_handler, models as users_models};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth
        auth::handlers::request_magic_link,
        auth::handlers::signin_email,
        auth::handlers::callback,
        auth::handlers::get_me,
        // Users
        user_handler::get_profile,
        user_handler::update_profile,
        user_handler::get_stats,
        user_handler::delete_account,
        // Quizzes
        quizzes_handlers::generate_quiz,
        quizzes_handlers::list_quizzes,
        quizzes_handlers::get_quiz,
        quizzes_handlers::save_progress,
        quizzes_handlers::submit_quiz,
        quizzes_handlers::delete_quiz,
        // Documents
        documents_handlers::upload_document,
        documents_handlers::list_documents,
        documents_handlers::get_document,
        documents_handlers::delete_document,
        // Meta
        meta_handlers::list_topics,
        meta_handlers::list_difficulties,
        meta_handlers::get_public_stats,
        meta_handlers::get_metadata,
        // Reports
        reports_handlers::create_report,
        reports_handlers::list_reports,
        reports_handlers::get_report,
        // Checkout
        checkout_handlers::create_checkout_session,
        checkout_handlers::stripe_webhook,
        checkout_handlers::payment_history,
        // Admin
        admin_handlers::list_users,
        admin_handlers::get_user,
        admin_handlers::update_user,
        admin_handlers::delete_user,
        admin_handlers::list_documents,
        admin_handlers::delete_document,
        admin_handlers::list_topics,
        admin_handlers::create_topic,
        admin_handlers::update_topic,
        admin_handlers::delete_topic,
        admin_handlers::list_reports,
        admin_handlers::update_report,
        admin_handlers::upsert_metadata,
        admin_handlers::get_stats,
    ),
    components(
        schemas(
            Meta,
            // Auth
            auth_dtos::MagicLinkRequestDto,
            auth_dtos::MagicLinkResponseDto,
            auth_dtos::SignInFormDto,
            auth_dtos::SessionResponseDto,
            auth_dtos::MeResponseDto,
            ApiResponse<auth_dtos::MagicLinkResponseDto>,
            ApiResponse<auth_dtos::SessionResponseDto>,
            ApiResponse<auth_dtos::MeResponseDto>,
            // Users
            users_models::UserRole,
            users_dtos::UserProfileDto,
            users_dtos::UpdateProfileDto,
            users_dtos::TopicStatsDto,
            users_dtos::UserStatsDto,
            ApiResponse<users_dtos::UserProfileDto>,
            ApiResponse<users_dtos::UserStatsDto>,
            // Quizzes
            quizzes_models::QuizDifficulty,
            quizzes_models::QuizStatus,
            quizzes_models::QuestionKind,
            quizzes_dtos::GenerateQuizDto,
            quizzes_dtos::AnswerDto,
            quizzes_dtos::SaveProgressDto,
            quizzes_dtos::SubmitQuizDto,
            quizzes_dtos::QuizSummaryDto,
            quizzes_dtos::QuestionDto,
            quizzes_dtos::QuizDetailDto,
            quizzes_dtos::QuizResultDto,
            ApiResponse<Vec<quizzes_dtos::QuizSummaryDto>>,
            ApiResponse<quizzes_dtos::QuizDetailDto>,
            ApiResponse<quizzes_dtos::QuizResultDto>,
            // Documents
            documents_dtos::UploadDocumentDto,
            documents_dtos::DocumentResponseDto,
            documents_dtos::DocumentDetailDto,
            ApiResponse<documents_dtos::DocumentResponseDto>,
            ApiResponse<Vec<documents_dtos::DocumentResponseDto>>,
            ApiResponse<documents_dtos::DocumentDetailDto>,
            // Topics & meta
            topics_dtos::TopicResponseDto,
            topics_dtos::CreateTopicDto,
            topics_dtos::UpdateTopicDto,
            meta_dtos::MetadataDto,
            meta_dtos::UpsertMetadataDto,
            meta_dtos::DifficultyDto,
            meta_dtos::PublicStatsDto,
            ApiResponse<Vec<topics_dtos::TopicResponseDto>>,
            ApiResponse<topics_dtos::TopicResponseDto>,
            ApiResponse<Vec<meta_dtos::DifficultyDto>>,
            ApiResponse<meta_dtos::PublicStatsDto>,
            ApiResponse<meta_dtos::MetadataDto>,
            // Reports
            reports_models::ReportKind,
            reports_models::ReportStatus,
            reports_dtos::CreateReportDto,
            reports_dtos::UpdateReportDto,
            reports_dtos::ReportResponseDto,
            ApiResponse<Vec<reports_dtos::ReportResponseDto>>,
            ApiResponse<reports_dtos::ReportResponseDto>,
            // Checkout
            checkout_models::PaymentStatus,
            checkout_dtos::CreditPack,
            checkout_dtos::CreateCheckoutDto,
            checkout_dtos::CheckoutSessionDto,
            checkout_dtos::PaymentDto,
            checkout_dtos::WebhookAckDto,
            ApiResponse<checkout_dtos::CheckoutSessionDto>,
            ApiResponse<Vec<checkout_dtos::PaymentDto>>,
            ApiResponse<checkout_dtos::WebhookAckDto>,
            // Admin
            admin_dtos::SortDirection,
            admin_dtos::AdminUserDto,
            admin_dtos::UpdateUserAdminDto,
            admin_dtos::AdminStatsDto,
            ApiResponse<Vec<admin_dtos::AdminUserDto>>,
            ApiResponse<admin_dtos::AdminUserDto>,
            ApiResponse<admin_dtos::AdminStatsDto>,
        )
    ),
    tags(
        (name = "auth", description = "Magic-link sign-in and sessions"),
        (name = "users", description = "Profile, statistics and account deletion"),
        (name = "quizzes", description = "AI-generated practice quizzes"),
        (name = "documents", description = "Study material used as generation context"),
        (name = "meta", description = "Public reference data and counters"),
        (name = "reports", description = "Support reports"),
        (name = "checkout", description = "Credit packs via Stripe Checkout"),
        (name = "admin", description = "Admin endpoints (admin role only)"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Brainwave API",
        version = "0.1.0",
        description = "AI practice exams: generation, grading, documents and billing",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
