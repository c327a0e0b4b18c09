pub mod domain;
pub mod error;
pub mod generation;
pub mod ports;
pub mod quiz;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use domain::{
    AnswerOption, Course, CourseChanges, Lesson, LessonChanges, NewCourse, NewLesson, NewUser,
    Question, Role, StoredMedia, User, UserChanges, UserCredentials,
};
pub use error::{ServiceError, ServiceResult};
pub use ports::{
    DatabaseService, MediaStorageService, PortError, PortResult, QuizGenerationService,
};
