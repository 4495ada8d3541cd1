//! Application state: content bank, session store and the session engine.
//!
//! Content comes from the TOML bank (if configured) plus built-in seeds.
//! Seeds never overwrite ids already provided by the bank.

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, instrument, warn};

use crate::config::{load_content, ContentConfig, Settings};
use crate::engine::SessionEngine;
use crate::seeds::{seed_blueprints, seed_level_descriptions, seed_questionnaires, seed_questions};
use crate::store::{MemoryContentStore, MemorySessionStore};

pub struct AppState {
    pub engine: SessionEngine,
}

impl AppState {
    /// Build state from settings: load the content bank, add seeds, wire the engine.
    #[instrument(level = "info", skip_all)]
    pub async fn new(settings: &Settings) -> Self {
        let cfg = settings.content_path.as_deref().and_then(load_content);
        if settings.content_path.is_some() && cfg.is_none() {
            warn!(target: "lingotest_backend", "Content bank unavailable; serving built-in seeds only");
        }
        Self::with_content(cfg.unwrap_or_default(), settings.selection_seed).await
    }

    pub async fn with_content(cfg: ContentConfig, selection_seed: Option<u64>) -> Self {
        let content = Arc::new(MemoryContentStore::new());

        for bp in cfg.blueprints.into_iter().chain(seed_blueprints()) {
            content.insert_blueprint(bp).await;
        }
        for q in cfg.questions.into_iter().chain(seed_questions()) {
            content.insert_question(q).await;
        }
        for q in cfg.questionnaires.into_iter().chain(seed_questionnaires()) {
            content.insert_questionnaire(q).await;
        }
        for d in cfg.level_descriptions.into_iter().chain(seed_level_descriptions()) {
            content.insert_level_description(d).await;
        }

        let (blueprints, questionnaires, questions, levels) = content.inventory().await;
        info!(target: "lingotest_backend", blueprints, questionnaires, questions, level_descriptions = levels, "Startup content inventory");

        let rng = match selection_seed {
            Some(seed) => {
                info!(target: "lingotest_backend", seed, "Pool draws use a fixed seed");
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_entropy(),
        };

        Self {
            engine: SessionEngine::new(content, Arc::new(MemorySessionStore::new()), Arc::new(Mutex::new(rng))),
        }
    }
}
