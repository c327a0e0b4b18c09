//! crates/learnstake_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Users
//=========================================================================================

/// The privilege level of an account. Only `Admin` may log in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Represents a user - used throughout the app. Never carries the password hash.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub hashed_password: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub hashed_password: String,
    pub role: Role,
}

/// A partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub hashed_password: Option<String>,
    pub role: Option<Role>,
}

//=========================================================================================
// Courses and Lessons
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub instructor_id: Option<Uuid>,
    pub category: Option<String>,
    pub thumbnail: Option<String>,
    pub price: f64,
    /// Ordered by the time each lesson was attached.
    pub lesson_ids: Vec<Uuid>,
    pub enrolled_student_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub instructor_id: Option<Uuid>,
    pub category: Option<String>,
    pub thumbnail: Option<String>,
    pub price: f64,
    pub enrolled_student_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct CourseChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub instructor_id: Option<Uuid>,
    pub category: Option<String>,
    pub thumbnail: Option<String>,
    pub price: Option<f64>,
    pub enrolled_student_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lesson {
    pub id: Uuid,
    pub title: String,
    pub content: Option<String>,
    pub course_id: Uuid,
    /// In minutes.
    pub duration: Option<i32>,
    pub video_url: String,
    /// Identity of the video on the media host, kept so the video can be removed later.
    pub video_public_id: Option<String>,
    pub resources: Vec<String>,
    pub quiz_id: Option<Uuid>,
    pub order: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct NewLesson {
    pub title: String,
    pub content: Option<String>,
    pub course_id: Uuid,
    pub duration: Option<i32>,
    pub video_url: String,
    pub video_public_id: Option<String>,
    pub order: Option<i32>,
}

/// Metadata edits only; the owning course and the video stay fixed.
#[derive(Debug, Clone, Default)]
pub struct LessonChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub duration: Option<i32>,
    pub order: Option<i32>,
    pub resources: Option<Vec<String>>,
}

//=========================================================================================
// Quiz
//=========================================================================================

/// A multiple-choice question. `correct_answer_id` is unset only between the
/// creation of the question and the save that records its correct option.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: Uuid,
    pub course_id: Uuid,
    pub question_text: String,
    pub correct_answer_id: Option<Uuid>,
}

/// One answer choice, owned by a question.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOption {
    pub id: Uuid,
    pub question_id: Uuid,
    pub option_text: String,
}

//=========================================================================================
// Media
//=========================================================================================

/// Where the media host put an uploaded file.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMedia {
    pub secure_url: String,
    pub public_id: String,
}
