//! Named record lookups exposed by the gateway.
//!
//! Every lookup is a [`TableQuery`] run through one of three generic paths:
//! [`RecordsClient::list`], [`RecordsClient::first`] or
//! [`RecordsClient::first_as`]. Tables whose shape the chat flow depends on
//! are decoded into typed records with documented defaults; the rest are
//! passed through as raw field maps.

use averygate_core::error::RecordError;
use averygate_core::records::{FieldMap, Filter, RecordStore, TableQuery};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::sync::Arc;

use crate::fields;

/// Table names in the records base.
pub mod tables {
    pub const SIGNUPS: &str = "Incubator signup data";
    pub const MENTORS: &str = "Mentors Table";
    pub const ROADMAP: &str = "Roadmap Table";
    pub const LESSONS_FEEDBACK: &str = "LessonsFeedback";
    pub const USER_PROFILES: &str = "User Profile Data";
    pub const ALL_COURSES: &str = "All Courses";
    pub const MODULES: &str = "Module Table";
    pub const INTERNAL_LESSONS: &str = "Internal Lessons";
    pub const LESSON_URLS: &str = "Lesson URL's";
    pub const QUIZ_SCORES: &str = "Table 22";
    pub const WEEKLY_FEEDBACK: &str = "Weekly Response Forms";
    pub const PITCH_UPLOADS: &str = "Pitch for ya life file Uploads";
    pub const STUDENT_FEEDBACK: &str = "Student to mentor feedback";
    pub const MENTOR_FEEDBACK: &str = "Mentor to student feedback table";
}

/// Decode a typed record from a raw field map. Never fails: absent fields
/// take their documented defaults.
pub trait FromFields: Sized {
    fn from_fields(fields: &FieldMap) -> Self;
}

/// A learner's progress snapshot from the signup table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub name: Option<String>,
    pub email: Option<String>,
    /// Current stage / major focus
    pub stage: Option<String>,
    /// Module reference(s), joined when the lookup yields several
    pub current_module: Option<String>,
    #[serde(default)]
    pub completed_courses: Vec<String>,
    /// Running points total; 0 when absent
    pub total_points: Number,
}

impl FromFields for UserProgress {
    fn from_fields(f: &FieldMap) -> Self {
        Self {
            name: fields::text(f, "Name"),
            email: fields::text(f, "Email"),
            stage: fields::text(f, "Major Focuss"),
            current_module: fields::text(f, "ModuleID_ForigneKey (from Internal Lessons)"),
            completed_courses: fields::list(f, "CoursesThatareCompleted"),
            total_points: fields::number(f, "User_TotalPoints"),
        }
    }
}

/// Conversation counters from the user profile table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub name: Option<String>,
    pub email: Option<String>,
    pub total_started: Number,
    pub total_received: Number,
    pub total: Number,
}

impl FromFields for ConversationSummary {
    fn from_fields(f: &FieldMap) -> Self {
        Self {
            name: fields::text(f, "Name"),
            email: fields::text(f, "Email"),
            total_started: fields::number(f, "Total conversations started"),
            total_received: fields::number(f, "Total conversations received"),
            total: fields::number(f, "Total conversation"),
        }
    }
}

/// Typed lookups over any [`RecordStore`].
#[derive(Clone)]
pub struct RecordsClient {
    store: Arc<dyn RecordStore>,
}

impl RecordsClient {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    // --- Generic paths ---

    /// Every matching record.
    pub async fn list(&self, query: TableQuery) -> Result<Vec<FieldMap>, RecordError> {
        self.store.query(&query).await
    }

    /// The first matching record, if any.
    pub async fn first(&self, query: TableQuery) -> Result<Option<FieldMap>, RecordError> {
        let records = self.store.query(&query.first()).await?;
        Ok(records.into_iter().next())
    }

    /// The first matching record decoded as `T`.
    pub async fn first_as<T: FromFields>(&self, query: TableQuery) -> Result<Option<T>, RecordError> {
        Ok(self.first(query).await?.as_ref().map(T::from_fields))
    }

    // --- Named lookups ---

    pub async fn user_progress(&self, email: &str) -> Result<Option<UserProgress>, RecordError> {
        self.first_as(TableQuery::table(tables::SIGNUPS).filter(Filter::equals("Email", email)))
            .await
    }

    /// Mentors whose tags contain `topic`, case-insensitively.
    pub async fn mentors_by_topic(&self, topic: &str) -> Result<Vec<FieldMap>, RecordError> {
        self.list(
            TableQuery::table(tables::MENTORS).filter(Filter::contains_ignore_case("Tags", topic)),
        )
        .await
    }

    pub async fn next_milestone(&self, stage: &str) -> Result<Option<FieldMap>, RecordError> {
        self.first(TableQuery::table(tables::ROADMAP).filter(Filter::equals("Stage", stage)))
            .await
    }

    pub async fn lessons_feedback(&self, email: &str) -> Result<Vec<FieldMap>, RecordError> {
        self.list(
            TableQuery::table(tables::LESSONS_FEEDBACK)
                .filter(Filter::equals("Email (from Name_ForeignKey)", email)),
        )
        .await
    }

    pub async fn conversation_summary(
        &self,
        email: &str,
    ) -> Result<Option<ConversationSummary>, RecordError> {
        self.first_as(TableQuery::table(tables::USER_PROFILES).filter(Filter::equals("Email", email)))
            .await
    }

    pub async fn all_courses(&self) -> Result<Vec<FieldMap>, RecordError> {
        self.list(TableQuery::table(tables::ALL_COURSES)).await
    }

    pub async fn modules_by_course(&self, course_name: &str) -> Result<Vec<FieldMap>, RecordError> {
        self.list(TableQuery::table(tables::MODULES).filter(Filter::equals(
            "CourseName (from AllCourses_foreignkey) 2",
            course_name,
        )))
        .await
    }

    pub async fn internal_lessons(&self, module_id: &str) -> Result<Vec<FieldMap>, RecordError> {
        self.list(
            TableQuery::table(tables::INTERNAL_LESSONS)
                .filter(Filter::equals("ModuleID_ForigneKey", module_id)),
        )
        .await
    }

    pub async fn lesson_link(&self, lesson_name: &str) -> Result<Option<FieldMap>, RecordError> {
        self.first(
            TableQuery::table(tables::LESSON_URLS)
                .filter(Filter::equals("LessonName_LinkName", lesson_name)),
        )
        .await
    }

    pub async fn quiz_scores(&self, email: &str) -> Result<Option<FieldMap>, RecordError> {
        self.first(TableQuery::table(tables::QUIZ_SCORES).filter(Filter::equals("Name/Email", email)))
            .await
    }

    pub async fn weekly_feedback(&self) -> Result<Vec<FieldMap>, RecordError> {
        self.list(TableQuery::table(tables::WEEKLY_FEEDBACK)).await
    }

    pub async fn pitch_submissions(&self) -> Result<Vec<FieldMap>, RecordError> {
        self.list(TableQuery::table(tables::PITCH_UPLOADS)).await
    }

    pub async fn student_feedback(&self, email: &str) -> Result<Vec<FieldMap>, RecordError> {
        self.list(
            TableQuery::table(tables::STUDENT_FEEDBACK).filter(Filter::equals("Your Email ID", email)),
        )
        .await
    }

    pub async fn mentor_feedback(&self, email: &str) -> Result<Vec<FieldMap>, RecordError> {
        self.list(
            TableQuery::table(tables::MENTOR_FEEDBACK)
                .filter(Filter::equals("Mentor Email ID", email)),
        )
        .await
    }
}
