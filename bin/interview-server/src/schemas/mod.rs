//! Request / response bodies of the JSON API.

pub mod chat;
pub mod jobs;
pub mod session;
