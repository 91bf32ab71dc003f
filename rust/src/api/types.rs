//! Wire types for the CookedGPT backend. Field names follow the server's
//! JSON; every record is also exported to the platform UI.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::CacheItem;

#[derive(uniffi::Enum, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProviderKind {
    Openai,
    Openrouter,
    Gemini,
    /// Any provider the client has no shape rule for.
    #[serde(other)]
    Other,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Openai => "OPENAI",
            ProviderKind::Openrouter => "OPENROUTER",
            ProviderKind::Gemini => "GEMINI",
            ProviderKind::Other => "OTHER",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPENAI" => Ok(ProviderKind::Openai),
            "OPENROUTER" => Ok(ProviderKind::Openrouter),
            "GEMINI" => Ok(ProviderKind::Gemini),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

#[derive(uniffi::Enum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModelPerformance {
    Average,
    Good,
    Excellent,
    #[serde(other)]
    Unknown,
}

impl Default for ModelPerformance {
    fn default() -> Self {
        ModelPerformance::Unknown
    }
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomTag {
    pub id: String,
    pub name: String,
    pub prompt: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPrompt {
    pub name: String,
    pub prompt: String,
}

/// Merged style catalog from `GET /user/tags`.
#[derive(uniffi::Record, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCatalog {
    #[serde(default)]
    pub default_tags: Vec<String>,
    #[serde(default)]
    pub custom_tags: Vec<TagPrompt>,
}

impl TagCatalog {
    pub fn tag_names(&self) -> Vec<String> {
        self.default_tags
            .iter()
            .cloned()
            .chain(self.custom_tags.iter().map(|t| t.name.clone()))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CustomTagList {
    #[serde(default)]
    pub data: Vec<CustomTag>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: String,
    pub api_key: String,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub performance: ModelPerformance,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    #[serde(default)]
    pub pro: bool,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub accuracy: f64,
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transformation {
    pub id: String,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub input: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformationPage {
    #[serde(default)]
    pub transformations: Vec<Transformation>,
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub total_transformations: Option<u32>,
    #[serde(default)]
    pub found_transformations: Option<u32>,
}

fn first_page() -> u32 {
    1
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformRequest {
    pub content: String,
    pub tags: Vec<String>,
    pub model: String,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformationResult {
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub model_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub total_transformations: u32,
    #[serde(default)]
    pub user: Option<ProfileUser>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUser {
    #[serde(default)]
    pub created_at: Option<String>,
}

impl CacheItem for CustomTag {
    fn item_id(&self) -> &str {
        &self.id
    }
}

impl CacheItem for ApiKey {
    fn item_id(&self) -> &str {
        &self.id
    }
}

impl CacheItem for Transformation {
    fn item_id(&self) -> &str {
        &self.id
    }
}

impl CacheItem for Model {
    fn item_id(&self) -> &str {
        &self.id
    }
}
