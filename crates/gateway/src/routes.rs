//! Record lookup and chat endpoints.
//!
//! - `GET  /user-progress?email=`
//! - `GET  /mentors?topic=`
//! - `GET  /next-milestone?stage=`
//! - `GET  /lessons-feedback?email=`
//! - `GET  /student-feedback?email=`
//! - `GET  /mentor-feedback?email=`
//! - `GET  /conversation-summary?email=`
//! - `GET  /all-courses`
//! - `GET  /weekly-feedback`
//! - `GET  /pitch-submissions`
//! - `GET  /modules-by-course?course_name=`
//! - `GET  /internal-lessons?module_id=`
//! - `GET  /lesson-links?lesson_name=`
//! - `GET  /quiz-scores?email=`
//! - `POST /chat`
//!
//! Single-record lookups answer `{}` when nothing matches.

use axum::{
    Router,
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Query, State},
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use averygate_chat::{ChatReply, ChatRequest};
use averygate_core::records::FieldMap;

use crate::SharedState;
use crate::error::ApiError;

type ListResponse = Result<Json<Vec<FieldMap>>, ApiError>;
type ObjectResponse = Result<Json<Value>, ApiError>;

/// The record and chat routes, without middleware.
pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/user-progress", get(user_progress))
        .route("/mentors", get(mentors))
        .route("/next-milestone", get(next_milestone))
        .route("/lessons-feedback", get(lessons_feedback))
        .route("/student-feedback", get(student_feedback))
        .route("/mentor-feedback", get(mentor_feedback))
        .route("/conversation-summary", get(conversation_summary))
        .route("/all-courses", get(all_courses))
        .route("/weekly-feedback", get(weekly_feedback))
        .route("/pitch-submissions", get(pitch_submissions))
        .route("/modules-by-course", get(modules_by_course))
        .route("/internal-lessons", get(internal_lessons))
        .route("/lesson-links", get(lesson_links))
        .route("/quiz-scores", get(quiz_scores))
        .route("/chat", post(chat))
}

// ── Query parameters ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct EmailQuery {
    email: String,
}

#[derive(Debug, Deserialize)]
struct TopicQuery {
    topic: String,
}

#[derive(Debug, Deserialize)]
struct StageQuery {
    stage: String,
}

#[derive(Debug, Deserialize)]
struct CourseQuery {
    course_name: String,
}

#[derive(Debug, Deserialize)]
struct ModuleQuery {
    module_id: String,
}

#[derive(Debug, Deserialize)]
struct LessonQuery {
    lesson_name: String,
}

/// Render an optional record, `{}` when absent.
fn object_or_empty<T: Serialize>(record: Option<T>) -> ObjectResponse {
    let value = match record {
        Some(record) => serde_json::to_value(record)?,
        None => Value::Object(FieldMap::new()),
    };
    Ok(Json(value))
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn user_progress(
    State(state): State<SharedState>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> ObjectResponse {
    let Query(q) = query?;
    object_or_empty(state.records.user_progress(&q.email).await?)
}

async fn mentors(
    State(state): State<SharedState>,
    query: Result<Query<TopicQuery>, QueryRejection>,
) -> ListResponse {
    let Query(q) = query?;
    Ok(Json(state.records.mentors_by_topic(&q.topic).await?))
}

async fn next_milestone(
    State(state): State<SharedState>,
    query: Result<Query<StageQuery>, QueryRejection>,
) -> ObjectResponse {
    let Query(q) = query?;
    object_or_empty(state.records.next_milestone(&q.stage).await?)
}

async fn lessons_feedback(
    State(state): State<SharedState>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> ListResponse {
    let Query(q) = query?;
    Ok(Json(state.records.lessons_feedback(&q.email).await?))
}

async fn student_feedback(
    State(state): State<SharedState>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> ListResponse {
    let Query(q) = query?;
    Ok(Json(state.records.student_feedback(&q.email).await?))
}

async fn mentor_feedback(
    State(state): State<SharedState>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> ListResponse {
    let Query(q) = query?;
    Ok(Json(state.records.mentor_feedback(&q.email).await?))
}

async fn conversation_summary(
    State(state): State<SharedState>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> ObjectResponse {
    let Query(q) = query?;
    object_or_empty(state.records.conversation_summary(&q.email).await?)
}

async fn all_courses(State(state): State<SharedState>) -> ListResponse {
    Ok(Json(state.records.all_courses().await?))
}

async fn weekly_feedback(State(state): State<SharedState>) -> ListResponse {
    Ok(Json(state.records.weekly_feedback().await?))
}

async fn pitch_submissions(State(state): State<SharedState>) -> ListResponse {
    Ok(Json(state.records.pitch_submissions().await?))
}

async fn modules_by_course(
    State(state): State<SharedState>,
    query: Result<Query<CourseQuery>, QueryRejection>,
) -> ListResponse {
    let Query(q) = query?;
    Ok(Json(state.records.modules_by_course(&q.course_name).await?))
}

async fn internal_lessons(
    State(state): State<SharedState>,
    query: Result<Query<ModuleQuery>, QueryRejection>,
) -> ListResponse {
    let Query(q) = query?;
    Ok(Json(state.records.internal_lessons(&q.module_id).await?))
}

async fn lesson_links(
    State(state): State<SharedState>,
    query: Result<Query<LessonQuery>, QueryRejection>,
) -> ObjectResponse {
    let Query(q) = query?;
    object_or_empty(state.records.lesson_link(&q.lesson_name).await?)
}

async fn quiz_scores(
    State(state): State<SharedState>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> ObjectResponse {
    let Query(q) = query?;
    object_or_empty(state.records.quiz_scores(&q.email).await?)
}

async fn chat(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(request) = payload?;
    info!(
        message_len = request.message.len(),
        has_email = request.email.is_some(),
        has_session = request.session_id.is_some(),
        "Chat request"
    );
    Ok(Json(state.chat.handle(request).await?))
}
