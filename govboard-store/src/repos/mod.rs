pub mod github;
pub mod locations;
pub mod npm;
pub mod projects;
pub mod roles;

pub use github::GithubRepo;
pub use locations::LocationRepo;
pub use npm::NpmRepo;
pub use projects::ProjectRepo;
pub use roles::RoleRepo;
