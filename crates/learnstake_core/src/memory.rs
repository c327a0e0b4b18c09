//! crates/learnstake_core/src/memory.rs
//!
//! An in-memory `DatabaseService`, used by tests. Rows are kept in insertion
//! order, which is also the order every list method returns them in.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    AnswerOption, Course, CourseChanges, Lesson, LessonChanges, NewCourse, NewLesson, NewUser,
    Question, User, UserChanges, UserCredentials,
};
use crate::ports::{DatabaseService, PortError, PortResult};

#[derive(Default)]
struct Tables {
    users: Vec<(User, String)>,
    courses: Vec<Course>,
    lessons: Vec<Lesson>,
    questions: Vec<Question>,
    options: Vec<AnswerOption>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn questions(&self) -> Vec<Question> {
        self.tables().questions.clone()
    }

    pub fn options(&self) -> Vec<AnswerOption> {
        self.tables().options.clone()
    }

    pub fn lessons(&self) -> Vec<Lesson> {
        self.tables().lessons.clone()
    }

    /// The stored password hash for a user, if the user exists.
    pub fn password_hash(&self, user_id: Uuid) -> Option<String> {
        self.tables()
            .users
            .iter()
            .find(|(user, _)| user.id == user_id)
            .map(|(_, hash)| hash.clone())
    }
}

fn not_found(kind: &str, id: Uuid) -> PortError {
    PortError::NotFound(format!("{} {} not found", kind, id))
}

#[async_trait]
impl DatabaseService for InMemoryStore {
    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let mut tables = self.tables();
        if tables.users.iter().any(|(u, _)| u.email == user.email) {
            return Err(PortError::Unexpected(format!(
                "duplicate email {}",
                user.email
            )));
        }
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            phone: user.phone,
            role: user.role,
            created_at: Utc::now(),
        };
        tables.users.push((created.clone(), user.hashed_password));
        Ok(created)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.tables()
            .users
            .iter()
            .find(|(u, _)| u.id == user_id)
            .map(|(u, _)| u.clone())
            .ok_or_else(|| not_found("User", user_id))
    }

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<User>> {
        Ok(self
            .tables()
            .users
            .iter()
            .find(|(u, _)| u.email == email)
            .map(|(u, _)| u.clone()))
    }

    async fn get_user_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.tables()
            .users
            .iter()
            .find(|(u, _)| u.email == email)
            .map(|(u, hash)| UserCredentials {
                user_id: u.id,
                email: u.email.clone(),
                role: u.role,
                hashed_password: hash.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("User with email {} not found", email)))
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        Ok(self.tables().users.iter().map(|(u, _)| u.clone()).collect())
    }

    async fn update_user(&self, user_id: Uuid, changes: UserChanges) -> PortResult<User> {
        let mut tables = self.tables();
        let (user, hash) = tables
            .users
            .iter_mut()
            .find(|(u, _)| u.id == user_id)
            .ok_or_else(|| not_found("User", user_id))?;
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(phone) = changes.phone {
            user.phone = Some(phone);
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(hashed_password) = changes.hashed_password {
            *hash = hashed_password;
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, user_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables();
        let before = tables.users.len();
        tables.users.retain(|(u, _)| u.id != user_id);
        if tables.users.len() == before {
            return Err(not_found("User", user_id));
        }
        Ok(())
    }

    async fn create_course(&self, course: NewCourse) -> PortResult<Course> {
        let created = Course {
            id: Uuid::new_v4(),
            title: course.title,
            description: course.description,
            instructor_id: course.instructor_id,
            category: course.category,
            thumbnail: course.thumbnail,
            price: course.price,
            lesson_ids: Vec::new(),
            enrolled_student_ids: course.enrolled_student_ids,
            created_at: Utc::now(),
        };
        self.tables().courses.push(created.clone());
        Ok(created)
    }

    async fn get_course_by_id(&self, course_id: Uuid) -> PortResult<Course> {
        self.tables()
            .courses
            .iter()
            .find(|c| c.id == course_id)
            .cloned()
            .ok_or_else(|| not_found("Course", course_id))
    }

    async fn find_course_by_title(&self, title: &str) -> PortResult<Option<Course>> {
        Ok(self
            .tables()
            .courses
            .iter()
            .find(|c| c.title == title)
            .cloned())
    }

    async fn list_courses(&self) -> PortResult<Vec<Course>> {
        Ok(self.tables().courses.clone())
    }

    async fn update_course(&self, course_id: Uuid, changes: CourseChanges) -> PortResult<Course> {
        let mut tables = self.tables();
        let course = tables
            .courses
            .iter_mut()
            .find(|c| c.id == course_id)
            .ok_or_else(|| not_found("Course", course_id))?;
        if let Some(title) = changes.title {
            course.title = title;
        }
        if let Some(description) = changes.description {
            course.description = description;
        }
        if let Some(instructor_id) = changes.instructor_id {
            course.instructor_id = Some(instructor_id);
        }
        if let Some(category) = changes.category {
            course.category = Some(category);
        }
        if let Some(thumbnail) = changes.thumbnail {
            course.thumbnail = Some(thumbnail);
        }
        if let Some(price) = changes.price {
            course.price = price;
        }
        if let Some(students) = changes.enrolled_student_ids {
            course.enrolled_student_ids = students;
        }
        Ok(course.clone())
    }

    async fn delete_course(&self, course_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables();
        let before = tables.courses.len();
        tables.courses.retain(|c| c.id != course_id);
        if tables.courses.len() == before {
            return Err(not_found("Course", course_id));
        }
        Ok(())
    }

    async fn append_course_lesson(&self, course_id: Uuid, lesson_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables();
        let course = tables
            .courses
            .iter_mut()
            .find(|c| c.id == course_id)
            .ok_or_else(|| not_found("Course", course_id))?;
        course.lesson_ids.push(lesson_id);
        Ok(())
    }

    async fn remove_course_lesson(&self, course_id: Uuid, lesson_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables();
        if let Some(course) = tables.courses.iter_mut().find(|c| c.id == course_id) {
            course.lesson_ids.retain(|id| *id != lesson_id);
        }
        Ok(())
    }

    async fn create_lesson(&self, lesson: NewLesson) -> PortResult<Lesson> {
        let created = Lesson {
            id: Uuid::new_v4(),
            title: lesson.title,
            content: lesson.content,
            course_id: lesson.course_id,
            duration: lesson.duration,
            video_url: lesson.video_url,
            video_public_id: lesson.video_public_id,
            resources: Vec::new(),
            quiz_id: None,
            order: lesson.order,
        };
        self.tables().lessons.push(created.clone());
        Ok(created)
    }

    async fn get_lesson_by_id(&self, lesson_id: Uuid) -> PortResult<Lesson> {
        self.tables()
            .lessons
            .iter()
            .find(|l| l.id == lesson_id)
            .cloned()
            .ok_or_else(|| not_found("Lesson", lesson_id))
    }

    async fn find_lesson_by_title(
        &self,
        course_id: Uuid,
        title: &str,
    ) -> PortResult<Option<Lesson>> {
        Ok(self
            .tables()
            .lessons
            .iter()
            .find(|l| l.course_id == course_id && l.title == title)
            .cloned())
    }

    async fn list_lessons(&self) -> PortResult<Vec<Lesson>> {
        Ok(self.tables().lessons.clone())
    }

    async fn list_lessons_by_course(&self, course_id: Uuid) -> PortResult<Vec<Lesson>> {
        Ok(self
            .tables()
            .lessons
            .iter()
            .filter(|l| l.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn update_lesson(&self, lesson_id: Uuid, changes: LessonChanges) -> PortResult<Lesson> {
        let mut tables = self.tables();
        let lesson = tables
            .lessons
            .iter_mut()
            .find(|l| l.id == lesson_id)
            .ok_or_else(|| not_found("Lesson", lesson_id))?;
        if let Some(title) = changes.title {
            lesson.title = title;
        }
        if let Some(content) = changes.content {
            lesson.content = Some(content);
        }
        if let Some(duration) = changes.duration {
            lesson.duration = Some(duration);
        }
        if let Some(order) = changes.order {
            lesson.order = Some(order);
        }
        if let Some(resources) = changes.resources {
            lesson.resources = resources;
        }
        Ok(lesson.clone())
    }

    async fn delete_lesson(&self, lesson_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables();
        let before = tables.lessons.len();
        tables.lessons.retain(|l| l.id != lesson_id);
        if tables.lessons.len() == before {
            return Err(not_found("Lesson", lesson_id));
        }
        Ok(())
    }

    async fn delete_lessons_by_course(&self, course_id: Uuid) -> PortResult<u64> {
        let mut tables = self.tables();
        let before = tables.lessons.len();
        tables.lessons.retain(|l| l.course_id != course_id);
        Ok((before - tables.lessons.len()) as u64)
    }

    async fn create_question(&self, course_id: Uuid, question_text: &str) -> PortResult<Question> {
        let created = Question {
            id: Uuid::new_v4(),
            course_id,
            question_text: question_text.to_string(),
            correct_answer_id: None,
        };
        self.tables().questions.push(created.clone());
        Ok(created)
    }

    async fn get_question_by_id(&self, question_id: Uuid) -> PortResult<Question> {
        self.tables()
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .cloned()
            .ok_or_else(|| not_found("Question", question_id))
    }

    async fn list_questions_by_course(&self, course_id: Uuid) -> PortResult<Vec<Question>> {
        Ok(self
            .tables()
            .questions
            .iter()
            .filter(|q| q.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn update_question_text(
        &self,
        question_id: Uuid,
        question_text: &str,
    ) -> PortResult<()> {
        let mut tables = self.tables();
        let question = tables
            .questions
            .iter_mut()
            .find(|q| q.id == question_id)
            .ok_or_else(|| not_found("Question", question_id))?;
        question.question_text = question_text.to_string();
        Ok(())
    }

    async fn set_correct_answer(&self, question_id: Uuid, option_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables();
        let question = tables
            .questions
            .iter_mut()
            .find(|q| q.id == question_id)
            .ok_or_else(|| not_found("Question", question_id))?;
        question.correct_answer_id = Some(option_id);
        Ok(())
    }

    async fn delete_question(&self, question_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables();
        let before = tables.questions.len();
        tables.questions.retain(|q| q.id != question_id);
        if tables.questions.len() == before {
            return Err(not_found("Question", question_id));
        }
        Ok(())
    }

    async fn create_option(
        &self,
        question_id: Uuid,
        option_text: &str,
    ) -> PortResult<AnswerOption> {
        let created = AnswerOption {
            id: Uuid::new_v4(),
            question_id,
            option_text: option_text.to_string(),
        };
        self.tables().options.push(created.clone());
        Ok(created)
    }

    async fn list_options_for_question(&self, question_id: Uuid) -> PortResult<Vec<AnswerOption>> {
        Ok(self
            .tables()
            .options
            .iter()
            .filter(|o| o.question_id == question_id)
            .cloned()
            .collect())
    }

    async fn list_options_for_questions(
        &self,
        question_ids: &[Uuid],
    ) -> PortResult<Vec<AnswerOption>> {
        Ok(self
            .tables()
            .options
            .iter()
            .filter(|o| question_ids.contains(&o.question_id))
            .cloned()
            .collect())
    }

    async fn update_option_text(&self, option_id: Uuid, option_text: &str) -> PortResult<()> {
        let mut tables = self.tables();
        let option = tables
            .options
            .iter_mut()
            .find(|o| o.id == option_id)
            .ok_or_else(|| not_found("Option", option_id))?;
        option.option_text = option_text.to_string();
        Ok(())
    }

    async fn delete_options_for_question(&self, question_id: Uuid) -> PortResult<u64> {
        let mut tables = self.tables();
        let before = tables.options.len();
        tables.options.retain(|o| o.question_id != question_id);
        Ok((before - tables.options.len()) as u64)
    }

    async fn delete_options_except(&self, question_id: Uuid, keep: &[Uuid]) -> PortResult<u64> {
        let mut tables = self.tables();
        let before = tables.options.len();
        tables
            .options
            .retain(|o| o.question_id != question_id || keep.contains(&o.id));
        Ok((before - tables.options.len()) as u64)
    }
}
