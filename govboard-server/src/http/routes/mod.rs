//! Route handlers organized by resource

pub mod dashboard;
pub mod github;
pub mod health;
pub mod koios;
pub mod projects;
pub mod roles;
pub mod sync;
