pub mod chat;
pub mod session;
pub mod user;

pub use chat::ChatMessage;
pub use session::{Difficulty, InterviewSession, SessionStatus};
pub use user::User;
