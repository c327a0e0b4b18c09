pub mod cloudinary;
pub mod db;
pub mod quiz_llm;

pub use cloudinary::CloudinaryMediaAdapter;
pub use db::DbAdapter;
pub use quiz_llm::OpenAiQuizAdapter;
