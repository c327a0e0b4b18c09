//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Queries are checked at runtime (`sqlx::query_as::<_, Record>`), so building the
//! service does not need a live database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use learnstake_core::domain::{
    AnswerOption, Course, CourseChanges, Lesson, LessonChanges, NewCourse, NewLesson, NewUser,
    Question, Role, User, UserChanges, UserCredentials,
};
use learnstake_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found(kind: &str, id: Uuid) -> PortError {
    PortError::NotFound(format!("{} {} not found", kind, id))
}

fn parse_role(raw: &str) -> PortResult<Role> {
    raw.parse::<Role>().map_err(PortError::Unexpected)
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const USER_COLUMNS: &str = "id, name, email, phone, role, hashed_password, created_at";

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    role: String,
    hashed_password: String,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        Ok(User {
            id: self.id,
            role: parse_role(&self.role)?,
            name: self.name,
            email: self.email,
            phone: self.phone,
            created_at: self.created_at,
        })
    }

    fn to_credentials(self) -> PortResult<UserCredentials> {
        Ok(UserCredentials {
            user_id: self.id,
            role: parse_role(&self.role)?,
            email: self.email,
            hashed_password: self.hashed_password,
        })
    }
}

const COURSE_COLUMNS: &str = "id, title, description, instructor_id, category, thumbnail, price, \
     lesson_ids, enrolled_student_ids, created_at";

#[derive(FromRow)]
struct CourseRecord {
    id: Uuid,
    title: String,
    description: String,
    instructor_id: Option<Uuid>,
    category: Option<String>,
    thumbnail: Option<String>,
    price: f64,
    lesson_ids: Vec<Uuid>,
    enrolled_student_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
}
impl CourseRecord {
    fn to_domain(self) -> Course {
        Course {
            id: self.id,
            title: self.title,
            description: self.description,
            instructor_id: self.instructor_id,
            category: self.category,
            thumbnail: self.thumbnail,
            price: self.price,
            lesson_ids: self.lesson_ids,
            enrolled_student_ids: self.enrolled_student_ids,
            created_at: self.created_at,
        }
    }
}

const LESSON_COLUMNS: &str = "id, title, content, course_id, duration, video_url, \
     video_public_id, resources, quiz_id, lesson_order";

#[derive(FromRow)]
struct LessonRecord {
    id: Uuid,
    title: String,
    content: Option<String>,
    course_id: Uuid,
    duration: Option<i32>,
    video_url: String,
    video_public_id: Option<String>,
    resources: Vec<String>,
    quiz_id: Option<Uuid>,
    lesson_order: Option<i32>,
}
impl LessonRecord {
    fn to_domain(self) -> Lesson {
        Lesson {
            id: self.id,
            title: self.title,
            content: self.content,
            course_id: self.course_id,
            duration: self.duration,
            video_url: self.video_url,
            video_public_id: self.video_public_id,
            resources: self.resources,
            quiz_id: self.quiz_id,
            order: self.lesson_order,
        }
    }
}

#[derive(FromRow)]
struct QuestionRecord {
    id: Uuid,
    course_id: Uuid,
    question_text: String,
    correct_answer_id: Option<Uuid>,
}
impl QuestionRecord {
    fn to_domain(self) -> Question {
        Question {
            id: self.id,
            course_id: self.course_id,
            question_text: self.question_text,
            correct_answer_id: self.correct_answer_id,
        }
    }
}

#[derive(FromRow)]
struct OptionRecord {
    id: Uuid,
    question_id: Uuid,
    option_text: String,
}
impl OptionRecord {
    fn to_domain(self) -> AnswerOption {
        AnswerOption {
            id: self.id,
            question_id: self.question_id,
            option_text: self.option_text,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    // --- Users ---

    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (id, name, email, phone, hashed_password, role) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.hashed_password)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| not_found("User", user_id))?
        .to_domain()
    }

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<User>> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(UserRecord::to_domain)
        .transpose()
    }

    async fn get_user_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User with email {} not found", email)))?
        .to_credentials()
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(UserRecord::to_domain)
        .collect()
    }

    async fn update_user(&self, user_id: Uuid, changes: UserChanges) -> PortResult<User> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET \
                name = COALESCE($2, name), \
                email = COALESCE($3, email), \
                phone = COALESCE($4, phone), \
                hashed_password = COALESCE($5, hashed_password), \
                role = COALESCE($6, role) \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.phone)
        .bind(changes.hashed_password)
        .bind(changes.role.map(|role| role.as_str()))
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| not_found("User", user_id))?
        .to_domain()
    }

    async fn delete_user(&self, user_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(not_found("User", user_id));
        }
        Ok(())
    }

    // --- Courses ---

    async fn create_course(&self, course: NewCourse) -> PortResult<Course> {
        let record = sqlx::query_as::<_, CourseRecord>(&format!(
            "INSERT INTO courses \
                (id, title, description, instructor_id, category, thumbnail, price, enrolled_student_ids) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {COURSE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&course.title)
        .bind(&course.description)
        .bind(course.instructor_id)
        .bind(&course.category)
        .bind(&course.thumbnail)
        .bind(course.price)
        .bind(&course.enrolled_student_ids)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_course_by_id(&self, course_id: Uuid) -> PortResult<Course> {
        let record = sqlx::query_as::<_, CourseRecord>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| not_found("Course", course_id))?;
        Ok(record.to_domain())
    }

    async fn find_course_by_title(&self, title: &str) -> PortResult<Option<Course>> {
        let record = sqlx::query_as::<_, CourseRecord>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE title = $1"
        ))
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(CourseRecord::to_domain))
    }

    async fn list_courses(&self) -> PortResult<Vec<Course>> {
        let records = sqlx::query_as::<_, CourseRecord>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(CourseRecord::to_domain).collect())
    }

    async fn update_course(&self, course_id: Uuid, changes: CourseChanges) -> PortResult<Course> {
        let record = sqlx::query_as::<_, CourseRecord>(&format!(
            "UPDATE courses SET \
                title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                instructor_id = COALESCE($4, instructor_id), \
                category = COALESCE($5, category), \
                thumbnail = COALESCE($6, thumbnail), \
                price = COALESCE($7, price), \
                enrolled_student_ids = COALESCE($8, enrolled_student_ids) \
             WHERE id = $1 RETURNING {COURSE_COLUMNS}"
        ))
        .bind(course_id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.instructor_id)
        .bind(changes.category)
        .bind(changes.thumbnail)
        .bind(changes.price)
        .bind(changes.enrolled_student_ids)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| not_found("Course", course_id))?;
        Ok(record.to_domain())
    }

    async fn delete_course(&self, course_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(course_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(not_found("Course", course_id));
        }
        Ok(())
    }

    async fn append_course_lesson(&self, course_id: Uuid, lesson_id: Uuid) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE courses SET lesson_ids = array_append(lesson_ids, $2) WHERE id = $1",
        )
        .bind(course_id)
        .bind(lesson_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(not_found("Course", course_id));
        }
        Ok(())
    }

    async fn remove_course_lesson(&self, course_id: Uuid, lesson_id: Uuid) -> PortResult<()> {
        sqlx::query("UPDATE courses SET lesson_ids = array_remove(lesson_ids, $2) WHERE id = $1")
            .bind(course_id)
            .bind(lesson_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    // --- Lessons ---

    async fn create_lesson(&self, lesson: NewLesson) -> PortResult<Lesson> {
        let record = sqlx::query_as::<_, LessonRecord>(&format!(
            "INSERT INTO lessons \
                (id, title, content, course_id, duration, video_url, video_public_id, lesson_order) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {LESSON_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&lesson.title)
        .bind(&lesson.content)
        .bind(lesson.course_id)
        .bind(lesson.duration)
        .bind(&lesson.video_url)
        .bind(&lesson.video_public_id)
        .bind(lesson.order)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_lesson_by_id(&self, lesson_id: Uuid) -> PortResult<Lesson> {
        let record = sqlx::query_as::<_, LessonRecord>(&format!(
            "SELECT {LESSON_COLUMNS} FROM lessons WHERE id = $1"
        ))
        .bind(lesson_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| not_found("Lesson", lesson_id))?;
        Ok(record.to_domain())
    }

    async fn find_lesson_by_title(
        &self,
        course_id: Uuid,
        title: &str,
    ) -> PortResult<Option<Lesson>> {
        let record = sqlx::query_as::<_, LessonRecord>(&format!(
            "SELECT {LESSON_COLUMNS} FROM lessons WHERE course_id = $1 AND title = $2"
        ))
        .bind(course_id)
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(LessonRecord::to_domain))
    }

    async fn list_lessons(&self) -> PortResult<Vec<Lesson>> {
        let records = sqlx::query_as::<_, LessonRecord>(&format!(
            "SELECT {LESSON_COLUMNS} FROM lessons ORDER BY seq ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(LessonRecord::to_domain).collect())
    }

    async fn list_lessons_by_course(&self, course_id: Uuid) -> PortResult<Vec<Lesson>> {
        let records = sqlx::query_as::<_, LessonRecord>(&format!(
            "SELECT {LESSON_COLUMNS} FROM lessons WHERE course_id = $1 ORDER BY seq ASC"
        ))
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(LessonRecord::to_domain).collect())
    }

    async fn update_lesson(&self, lesson_id: Uuid, changes: LessonChanges) -> PortResult<Lesson> {
        let record = sqlx::query_as::<_, LessonRecord>(&format!(
            "UPDATE lessons SET \
                title = COALESCE($2, title), \
                content = COALESCE($3, content), \
                duration = COALESCE($4, duration), \
                lesson_order = COALESCE($5, lesson_order), \
                resources = COALESCE($6, resources) \
             WHERE id = $1 RETURNING {LESSON_COLUMNS}"
        ))
        .bind(lesson_id)
        .bind(changes.title)
        .bind(changes.content)
        .bind(changes.duration)
        .bind(changes.order)
        .bind(changes.resources)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| not_found("Lesson", lesson_id))?;
        Ok(record.to_domain())
    }

    async fn delete_lesson(&self, lesson_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM lessons WHERE id = $1")
            .bind(lesson_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(not_found("Lesson", lesson_id));
        }
        Ok(())
    }

    async fn delete_lessons_by_course(&self, course_id: Uuid) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM lessons WHERE course_id = $1")
            .bind(course_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    // --- Questions ---

    async fn create_question(&self, course_id: Uuid, question_text: &str) -> PortResult<Question> {
        let record = sqlx::query_as::<_, QuestionRecord>(
            "INSERT INTO questions (id, course_id, question_text) VALUES ($1, $2, $3) \
             RETURNING id, course_id, question_text, correct_answer_id",
        )
        .bind(Uuid::new_v4())
        .bind(course_id)
        .bind(question_text)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_question_by_id(&self, question_id: Uuid) -> PortResult<Question> {
        let record = sqlx::query_as::<_, QuestionRecord>(
            "SELECT id, course_id, question_text, correct_answer_id FROM questions WHERE id = $1",
        )
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| not_found("Question", question_id))?;
        Ok(record.to_domain())
    }

    async fn list_questions_by_course(&self, course_id: Uuid) -> PortResult<Vec<Question>> {
        let records = sqlx::query_as::<_, QuestionRecord>(
            "SELECT id, course_id, question_text, correct_answer_id FROM questions \
             WHERE course_id = $1 ORDER BY seq ASC",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(QuestionRecord::to_domain).collect())
    }

    async fn update_question_text(
        &self,
        question_id: Uuid,
        question_text: &str,
    ) -> PortResult<()> {
        let result = sqlx::query("UPDATE questions SET question_text = $2 WHERE id = $1")
            .bind(question_id)
            .bind(question_text)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(not_found("Question", question_id));
        }
        Ok(())
    }

    async fn set_correct_answer(&self, question_id: Uuid, option_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("UPDATE questions SET correct_answer_id = $2 WHERE id = $1")
            .bind(question_id)
            .bind(option_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(not_found("Question", question_id));
        }
        Ok(())
    }

    async fn delete_question(&self, question_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(question_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(not_found("Question", question_id));
        }
        Ok(())
    }

    // --- Options ---

    async fn create_option(
        &self,
        question_id: Uuid,
        option_text: &str,
    ) -> PortResult<AnswerOption> {
        let record = sqlx::query_as::<_, OptionRecord>(
            "INSERT INTO options (id, question_id, option_text) VALUES ($1, $2, $3) \
             RETURNING id, question_id, option_text",
        )
        .bind(Uuid::new_v4())
        .bind(question_id)
        .bind(option_text)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_options_for_question(&self, question_id: Uuid) -> PortResult<Vec<AnswerOption>> {
        let records = sqlx::query_as::<_, OptionRecord>(
            "SELECT id, question_id, option_text FROM options WHERE question_id = $1 ORDER BY seq ASC",
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(OptionRecord::to_domain).collect())
    }

    async fn list_options_for_questions(
        &self,
        question_ids: &[Uuid],
    ) -> PortResult<Vec<AnswerOption>> {
        if question_ids.is_empty() {
            return Ok(Vec::new());
        }
        let records = sqlx::query_as::<_, OptionRecord>(
            "SELECT id, question_id, option_text FROM options \
             WHERE question_id = ANY($1) ORDER BY seq ASC",
        )
        .bind(question_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(OptionRecord::to_domain).collect())
    }

    async fn update_option_text(&self, option_id: Uuid, option_text: &str) -> PortResult<()> {
        let result = sqlx::query("UPDATE options SET option_text = $2 WHERE id = $1")
            .bind(option_id)
            .bind(option_text)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(not_found("Option", option_id));
        }
        Ok(())
    }

    async fn delete_options_for_question(&self, question_id: Uuid) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM options WHERE question_id = $1")
            .bind(question_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn delete_options_except(&self, question_id: Uuid, keep: &[Uuid]) -> PortResult<u64> {
        let result =
            sqlx::query("DELETE FROM options WHERE question_id = $1 AND NOT (id = ANY($2))")
                .bind(question_id)
                .bind(keep)
                .execute(&self.pool)
                .await
                .map_err(unexpected)?;
        Ok(result.rows_affected())
    }
}
