use anyhow::Result;
use async_trait::async_trait;

use crate::prompts::{guidance_prompt, recommendation_prompt};
use crate::providers::{GuidanceGenerator, RecommendationGenerator};

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Offline client returning the same canned completion for every prompt.
#[derive(Clone, Debug, Default)]
pub struct StaticLlmClient {
    response: String,
}

impl StaticLlmClient {
    pub fn new(response: impl Into<String>) -> Self {
        Self { response: response.into() }
    }
}

#[async_trait]
impl LlmClient for StaticLlmClient {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Ok(self.response.clone())
    }
}

#[derive(Clone, Debug)]
pub struct LlmGuidanceGenerator<C> {
    client: C,
}

impl<C> LlmGuidanceGenerator<C>
where
    C: LlmClient,
{
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C> GuidanceGenerator for LlmGuidanceGenerator<C>
where
    C: LlmClient,
{
    async fn generate_guidance(
        &self,
        transcript: &str,
        question_template: &str,
    ) -> Result<String> {
        self.client.complete(&guidance_prompt(transcript, question_template)).await
    }
}

#[derive(Clone, Debug)]
pub struct LlmRecommendationGenerator<C> {
    client: C,
}

impl<C> LlmRecommendationGenerator<C>
where
    C: LlmClient,
{
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C> RecommendationGenerator for LlmRecommendationGenerator<C>
where
    C: LlmClient,
{
    async fn generate_recommendation(&self, transcript: &str) -> Result<String> {
        self.client.complete(&recommendation_prompt(transcript)).await
    }
}
