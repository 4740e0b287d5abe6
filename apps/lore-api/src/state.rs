use std::sync::Arc;

use lore_engine::{Engine, Providers};
use lore_index::Corpus;

#[derive(Clone)]
pub struct AppState {
	pub engine: Arc<Engine>,
}
impl AppState {
	pub fn new(config: lore_config::Config) -> Self {
		Self::with_providers(config, Providers::http())
	}

	pub fn with_providers(config: lore_config::Config, providers: Providers) -> Self {
		let corpus = Arc::new(Corpus::new());
		let engine = Engine::new(config, corpus, providers);

		Self { engine: Arc::new(engine) }
	}
}
