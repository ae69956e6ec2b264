pub mod handlers;
pub mod orchestrator;
pub mod prompts;
pub mod store;

pub use orchestrator::Optimizer;
pub use store::ResumeStore;
