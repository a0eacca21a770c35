//! Concrete adapters for the collaborator contracts.

pub mod elastic;
pub mod jira;
pub mod memory;
pub mod slack;

pub use elastic::ElasticStore;
pub use jira::JiraClient;
pub use memory::MemoryStore;
pub use slack::SlackNotifier;
