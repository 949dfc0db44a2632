#[cfg(test)]
#[path = "gemini_test.rs"]
mod tests;

use std::time::Duration;

use anyhow::anyhow;
use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use serde_json::json;
use tokio::sync::Mutex;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Backend;
use crate::domain::models::ImageState;
use crate::domain::models::Plant;
use crate::domain::models::RequestOptions;

const CHAT_INSTRUCTION: &str = "You are Bloom, a friendly and knowledgeable gardening assistant. You help users with their gardening questions and provide tips on how to use this landscape design app. Keep your responses concise and helpful.";

const PLANTS_INSTRUCTION: &str = "Analyze this image of a garden. List the names of the plants visible. Return the result as a JSON object with a key 'plants' containing an array of strings. Example: {\"plants\": [\"Lavender\", \"Rose Bush\"]}. If no plants are clearly identifiable, return an empty array.";

fn design_prompt(prompt: &str) -> String {
    return format!(
        r#"Act as a professional landscape designer. The user has provided an image of their garden and wants a new design based on their request.
Generate a photorealistic image showing the redesigned garden.
It is crucial to accurately include any specific plants mentioned by the user. For context:
- 'luohansong' refers to Podocarpus macrophyllus (Buddhist Pine).
- 'foxtail' can refer to Foxtail Fern (Asparagus densiflorus 'Myersii') or various foxtail grasses. Please use a visually appropriate one.

User's request: "{prompt}"

Incorporate the user's request into the provided garden image."#
    );
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentPartsBlob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum ContentParts {
    Text(String),
    InlineData(ContentPartsBlob),
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    role: String,
    parts: Vec<ContentParts>,
}

impl Content {
    fn user(parts: Vec<ContentParts>) -> Content {
        return Content {
            role: "user".to_string(),
            parts,
        };
    }

    fn model(text: &str) -> Content {
        return Content {
            role: "model".to_string(),
            parts: vec![ContentParts::Text(text.to_string())],
        };
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Default, Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<ContentPartsBlob>,
}

#[derive(Default, Debug, Clone, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Default, Debug, Clone, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Default, Debug, Clone, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    fn parts(&self) -> Vec<&ResponsePart> {
        return self
            .candidates
            .first()
            .and_then(|candidate| return candidate.content.as_ref())
            .map(|content| return content.parts.iter().collect())
            .unwrap_or_default();
    }

    fn text(&self) -> String {
        return self
            .parts()
            .iter()
            .filter_map(|part| return part.text.as_deref())
            .collect::<Vec<&str>>()
            .join("");
    }

    fn first_image(&self) -> Option<ImageState> {
        return self
            .parts()
            .iter()
            .find_map(|part| return part.inline_data.as_ref())
            .map(|blob| return ImageState::new(&blob.data, &blob.mime_type));
    }
}

fn parse_plants(text: &str) -> Result<Vec<Plant>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(vec![]);
    }

    let value = match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) => value,
        Err(err) => {
            tracing::error!(error = ?err, received = text, "Error parsing JSON from plant identification");
            bail!("Failed to parse plant data from the AI response.");
        }
    };

    let names = match value.get("plants").and_then(|plants| return plants.as_array()) {
        Some(names) => names,
        None => {
            tracing::warn!(received = text, "Plant identification returned malformed data structure");
            bail!("AI returned an unexpected data structure for plants.");
        }
    };

    return Ok(names
        .iter()
        .map(|name| match name {
            serde_json::Value::String(name) => return Plant::new(name),
            other => return Plant::new(&other.to_string()),
        })
        .collect());
}

pub struct Gemini {
    url: String,
    token: String,
    image_model: String,
    text_model: String,
    timeout: String,
    chat_history: Mutex<Vec<Content>>,
}

impl Default for Gemini {
    fn default() -> Gemini {
        return Gemini {
            url: Config::get(ConfigKey::GeminiURL),
            token: Config::get(ConfigKey::GeminiToken),
            image_model: Config::get(ConfigKey::ImageModel),
            text_model: Config::get(ConfigKey::TextModel),
            timeout: Config::get(ConfigKey::RequestTimeout),
            chat_history: Mutex::new(vec![]),
        };
    }
}

impl Gemini {
    fn model_url(&self, model: &str, method: &str) -> String {
        let suffix = if method.is_empty() {
            "".to_string()
        } else {
            format!(":{method}")
        };

        return format!(
            "{url}/v1beta/models/{model}{suffix}?key={key}",
            url = self.url.trim_end_matches('/'),
            model = model.trim_start_matches("models/"),
            key = self.token,
        );
    }

    fn default_timeout(&self) -> Result<Duration> {
        return Ok(Duration::from_millis(self.timeout.parse::<u64>()?));
    }

    async fn generate_content(
        &self,
        model: &str,
        req: &GenerateContentRequest,
        timeout: Duration,
    ) -> Result<GenerateContentResponse> {
        let res = reqwest::Client::new()
            .post(self.model_url(model, "generateContent"))
            .timeout(timeout)
            .json(req)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            tracing::error!(status, model, "Failed to make generateContent request to Gemini");
            bail!("Failed to make request to Gemini, {status}");
        }

        return Ok(res.json::<GenerateContentResponse>().await?);
    }
}

#[async_trait]
impl Backend for Gemini {
    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> Result<()> {
        if self.url.is_empty() {
            bail!("Gemini URL is not defined");
        }
        if self.token.is_empty() {
            bail!("Gemini token is not defined. Set it with --gemini-token or GARDENIA_GEMINI_TOKEN");
        }

        let res = reqwest::Client::new()
            .get(self.model_url(&self.image_model, ""))
            .timeout(self.default_timeout()?)
            .send()
            .await;

        let status = match res {
            Ok(res) => res.status().as_u16(),
            Err(err) => {
                tracing::error!(error = ?err, "Gemini is not reachable");
                bail!("Gemini is not reachable");
            }
        };
        if status >= 400 {
            tracing::error!(status = status, "Gemini health check failed");
            bail!("Gemini health check failed");
        }

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn generate_image(
        &self,
        image: &ImageState,
        prompt: &str,
        options: &RequestOptions,
    ) -> Result<ImageState> {
        let req = GenerateContentRequest {
            contents: vec![Content::user(vec![
                ContentParts::InlineData(ContentPartsBlob {
                    mime_type: image.mime_type.to_string(),
                    data: image.base64.to_string(),
                }),
                ContentParts::Text(design_prompt(prompt)),
            ])],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["IMAGE".to_string()]),
                ..GenerationConfig::default()
            }),
        };

        let res = self
            .generate_content(&self.image_model, &req, options.timeout)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, "Error generating landscape design");
                return anyhow!("Failed to generate landscape design. {err}");
            })?;

        match res.first_image() {
            Some(image) => return Ok(image),
            None => bail!("No image was generated."),
        }
    }

    #[allow(clippy::implicit_return)]
    async fn identify_plants(
        &self,
        image: &ImageState,
        options: &RequestOptions,
    ) -> Result<Vec<Plant>> {
        let req = GenerateContentRequest {
            contents: vec![Content::user(vec![
                ContentParts::InlineData(ContentPartsBlob {
                    mime_type: image.mime_type.to_string(),
                    data: image.base64.to_string(),
                }),
                ContentParts::Text(PLANTS_INSTRUCTION.to_string()),
            ])],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(json!({
                    "type": "OBJECT",
                    "properties": {
                        "plants": {
                            "type": "ARRAY",
                            "items": {
                                "type": "STRING",
                                "description": "The common name of a plant."
                            }
                        }
                    },
                    "required": ["plants"]
                })),
                ..GenerationConfig::default()
            }),
        };

        let res = self
            .generate_content(&self.text_model, &req, options.timeout)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, "Error identifying plants");
                return anyhow!("Failed to identify plants in the generated image.");
            })?;

        return parse_plants(&res.text());
    }

    #[allow(clippy::implicit_return)]
    async fn send_chat_message(&self, text: &str) -> Result<String> {
        // Held for the whole exchange so replies land in the order they were asked.
        let mut history = self.chat_history.lock().await;

        let mut contents = history.clone();
        contents.push(Content::user(vec![ContentParts::Text(text.to_string())]));

        let req = GenerateContentRequest {
            contents: contents.clone(),
            system_instruction: Some(Content {
                role: "".to_string(),
                parts: vec![ContentParts::Text(CHAT_INSTRUCTION.to_string())],
            }),
            generation_config: None,
        };

        let res = self
            .generate_content(&self.text_model, &req, self.default_timeout()?)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, "Error sending chat message");
                return anyhow!("Sorry, I couldn't process your message right now.");
            })?;

        let reply = res.text();
        contents.push(Content::model(&reply));
        *history = contents;

        return Ok(reply);
    }
}
