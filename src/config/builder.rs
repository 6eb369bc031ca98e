use super::types::{Config, LlmSettings, ModelSettings, PipelineSettings, ServerSettings};

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    pub(super) llm: LlmSettings,
    pub(super) models: ModelSettings,
    pub(super) pipeline: PipelineSettings,
    pub(super) server: ServerSettings,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_llm<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&mut LlmSettings),
    {
        update(&mut self.llm);
        self
    }

    pub fn with_models<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&mut ModelSettings),
    {
        update(&mut self.models);
        self
    }

    pub fn with_pipeline<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&mut PipelineSettings),
    {
        update(&mut self.pipeline);
        self
    }

    pub fn with_server<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&mut ServerSettings),
    {
        update(&mut self.server);
        self
    }

    pub fn build(self) -> Config {
        Config {
            llm: self.llm,
            models: self.models,
            pipeline: self.pipeline,
            server: self.server,
        }
    }
}
