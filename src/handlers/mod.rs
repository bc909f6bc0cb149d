pub mod admin;
pub mod applications;
pub mod auth;
pub mod dashboard;
pub mod organizations;
pub mod profile;
pub mod reports;
pub mod students;
pub mod supervisor;
pub mod users;
