use std::sync::Arc;

use crate::config::Config;
use crate::optimizer::{Optimizer, ResumeStore};
use crate::render::StyleRules;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Completion provider and similarity scorer, both shared read-only.
    pub optimizer: Optimizer,
    pub store: ResumeStore,
    /// Styling markers for downloads. Defaults to the built-in resume headings.
    pub style_rules: Arc<StyleRules>,
}
