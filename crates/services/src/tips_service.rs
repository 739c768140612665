use std::env;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::TipsError;

/// Text shown whenever tips cannot be fetched, whatever the reason.
pub const TIPS_FALLBACK: &str = "Não foi possível carregar as dicas de ensino no momento.";

#[derive(Clone, Debug)]
pub struct TipsConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl TipsConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("STUDY_TIPS_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url = env::var("STUDY_TIPS_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into());
        let model = env::var("STUDY_TIPS_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// Fetches short teaching suggestions for a lesson from a language model.
///
/// The public entry point never fails: anything that goes wrong, from a
/// missing API key to a garbled response, collapses into [`TIPS_FALLBACK`].
#[derive(Clone)]
pub struct TipsService {
    client: Client,
    config: Option<TipsConfig>,
}

impl TipsService {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(TipsConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<TipsConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Teaching tips for a lesson, or the fallback text when unavailable.
    pub async fn teaching_tips(&self, lesson: u32, topic: Option<&str>) -> String {
        match self.request_tips(lesson, topic).await {
            Ok(tips) => tips,
            Err(err) => {
                log::warn!("teaching tips unavailable: {err}");
                TIPS_FALLBACK.to_owned()
            }
        }
    }

    /// Fetch tips from the model.
    ///
    /// # Errors
    ///
    /// Returns `TipsError` when the service is disabled, the request fails,
    /// or the response carries no text.
    async fn request_tips(&self, lesson: u32, topic: Option<&str>) -> Result<String, TipsError> {
        let config = self.config.as_ref().ok_or(TipsError::Disabled)?;

        let url = format!(
            "{}/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );
        let payload = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: build_prompt(lesson, topic),
                }],
            }],
        };

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TipsError::HttpStatus(response.status()));
        }

        let body: GenerateResponse = response.json().await?;
        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(TipsError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}

fn build_prompt(lesson: u32, topic: Option<&str>) -> String {
    let mut prompt = format!(
        "Estou dirigindo um estudo bíblico do livro \"Seja Feliz Para Sempre!\", \
         lição número {lesson}."
    );
    if let Some(topic) = topic {
        prompt.push_str(&format!("\nO tópico atual é: {topic}."));
    }
    prompt.push_str(
        "\n\nPor favor, forneça 3 dicas curtas e práticas para ensinar esta lição \
         de forma eficaz. Inclua uma pergunta de ponto de vista sugerida para \
         engajar o estudante. A resposta deve ser encorajadora e formatada em \
         Markdown.",
    );
    prompt
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
