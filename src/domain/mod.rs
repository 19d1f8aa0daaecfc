pub mod error;
pub mod favorite;
pub mod preferences;
pub mod question;
pub mod quiz_result;
pub mod user;
