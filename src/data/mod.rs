//! Document models and the `mongodb::Database` extension traits that
//! persist them.

pub mod course;
pub mod user;
