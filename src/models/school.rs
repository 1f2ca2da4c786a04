use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::ScopedResource;
use crate::authz::resources;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Announcement {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    /// `None` for school-wide announcements
    pub class_id: Option<String>,
}

impl ScopedResource for Announcement {
    const RESOURCE: &'static str = resources::ANNOUNCEMENTS;
    const TABLE: &'static str = "announcements";
    const COLUMNS: &'static [&'static str] = &["id", "title", "description", "date", "class_id"];
    const ORDER_BY: &'static str = "date DESC";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub class_id: Option<String>,
}

impl ScopedResource for Event {
    const RESOURCE: &'static str = resources::EVENTS;
    const TABLE: &'static str = "events";
    const COLUMNS: &'static [&'static str] = &["id", "title", "description", "start_time", "end_time", "class_id"];
    const ORDER_BY: &'static str = "start_time ASC";
}

/// One slot of a class schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Lesson {
    pub id: String,
    pub name: String,
    #[schema(example = "monday")]
    pub day: String,
    #[schema(example = "08:00")]
    pub start_time: String,
    #[schema(example = "08:45")]
    pub end_time: String,
    pub class_id: String,
    pub teacher_id: String,
}

impl ScopedResource for Lesson {
    const RESOURCE: &'static str = resources::CLASS_SCHEDULES;
    const TABLE: &'static str = "lessons";
    const COLUMNS: &'static [&'static str] =
        &["id", "name", "day", "start_time", "end_time", "class_id", "teacher_id"];
    const ORDER_BY: &'static str = "day ASC, start_time ASC";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct FeeRecord {
    pub id: String,
    pub student_id: String,
    pub description: String,
    pub amount_cents: i64,
    pub due_date: DateTime<Utc>,
    pub paid: bool,
}

impl ScopedResource for FeeRecord {
    const RESOURCE: &'static str = resources::FEE_RECORDS;
    const TABLE: &'static str = "fees";
    const COLUMNS: &'static [&'static str] =
        &["id", "student_id", "description", "amount_cents", "due_date", "paid"];
    const ORDER_BY: &'static str = "due_date ASC";
}
