//! Row types read from the backing store.
//!
//! - `Lesson`: a scheduled lesson ("aula") with date, time and subject
//! - `Student`: a student ("aluno")
//! - `AssistantReply`: the teacher-assistant function's answer

pub mod assistant;
pub mod lesson;
pub mod student;

pub use assistant::{AssistantAction, AssistantContext, AssistantReply, AssistantRequest};
pub use lesson::{Lesson, LessonStatus};
pub use student::Student;
