use crate::classifier::{Classifier, LlmClassifier, RuleClassifier};
use crate::command::{CommandHandler, QueryFilter};
use crate::config::{AgentConfig, ClassifierMode, EmbedMode};
use crate::history::ConversationHistory;
use crate::notifier::{LogNotifier, Notifier};
use anyhow::{Context, Result};
use meeting_indexer::{BootstrapReport, Catalog, CatalogOptions};
use meeting_vector_store::{Embedder, HashingEmbedder, OllamaEmbedder};
use std::sync::Arc;

/// Everything a chat session needs, built once at startup.
pub struct AppContext {
    config: AgentConfig,
    classifier: Box<dyn Classifier>,
    handler: CommandHandler,
    history: ConversationHistory,
    report: BootstrapReport,
}

impl AppContext {
    pub async fn bootstrap(config: AgentConfig) -> Result<Self> {
        let embedder = build_embedder(&config).await?;
        Self::bootstrap_with(config, embedder, Arc::new(LogNotifier)).await
    }

    /// Bootstrap with an explicit embedder and notifier
    pub async fn bootstrap_with(
        config: AgentConfig,
        embedder: Arc<dyn Embedder>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let mut options =
            CatalogOptions::new(&config.data_dir).with_embed_timeout(config.embed_timeout);
        if let Some(seed) = &config.seed_file {
            options = options.with_seed_file(seed);
        }
        let (catalog, report) = Catalog::open(options, embedder)
            .await
            .with_context(|| format!("Failed to open catalog in {}", config.data_dir.display()))?;

        let classifier = build_classifier(&config)?;
        log::info!(
            "Meeting agent ready: {} meetings, classifier '{}'",
            report.records,
            classifier.name()
        );
        let handler = CommandHandler::new(catalog, notifier, config.query_top_k)
            .with_query_filter(config.query_filter());
        let history = ConversationHistory::new(config.history_turns, config.history_chars);
        Ok(Self {
            config,
            classifier,
            handler,
            history,
            report,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn report(&self) -> &BootstrapReport {
        &self.report
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn handler(&self) -> &CommandHandler {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut CommandHandler {
        &mut self.handler
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut ConversationHistory {
        &mut self.history
    }
}

async fn build_embedder(config: &AgentConfig) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match config.embed_mode {
        EmbedMode::Hash => Arc::new(HashingEmbedder::new(config.hash_dimension)),
        EmbedMode::Ollama => Arc::new(
            OllamaEmbedder::connect(&config.ollama_url, &config.embed_model, config.embed_timeout)
                .await
                .with_context(|| {
                    format!(
                        "Failed to reach embedding model '{}' at {}",
                        config.embed_model, config.ollama_url
                    )
                })?,
        ),
    };
    Ok(embedder)
}

fn build_classifier(config: &AgentConfig) -> Result<Box<dyn Classifier>> {
    Ok(match config.classifier {
        ClassifierMode::Rules => Box::new(RuleClassifier),
        ClassifierMode::Llm => Box::new(LlmClassifier::new(
            &config.ollama_url,
            &config.llm_model,
            config.llm_timeout,
        )?),
    })
}
