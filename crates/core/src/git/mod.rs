//! Git and GitHub access for f2clipboard.

pub mod client;
pub mod github;
pub mod remote_url;

pub use client::GitClient;
pub use github::GitHubClient;
pub use remote_url::{PrIdentifier, RepoSlug};
