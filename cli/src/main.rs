use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use cooked_core::api::{
    ApiKey, CookedApi, HttpApi, ProviderKind, TransformRequest, TransformationPage, ALL_TAG,
};
use cooked_core::key_format::{is_valid_api_key, mask_key};
use serde_json::json;

#[derive(Debug, Parser)]
#[command(name = "cooked")]
#[command(about = "CookedGPT command line client")]
struct Cli {
    /// API base URL, e.g. https://api.cookedgpt.app/api/v1
    #[arg(long, env = "COOKED_API_BASE_URL", default_value = "http://127.0.0.1:4000/api/v1")]
    base_url: String,

    /// Bearer token from the identity provider
    #[arg(long, env = "COOKED_TOKEN", hide_env_values = true)]
    token: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 20)]
    timeout: u64,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List default and custom tags
    Tags,

    /// Manage custom tags
    CustomTags {
        #[command(subcommand)]
        cmd: CustomTagCommand,
    },

    /// Manage provider API keys (always printed masked)
    Keys {
        #[command(subcommand)]
        cmd: KeyCommand,
    },

    /// Page through transformation history
    History {
        /// Tag filter
        #[arg(long, default_value = ALL_TAG)]
        tag: String,

        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Search transformation history
    Search {
        #[arg(long)]
        keyword: String,

        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Delete a transformation from history
    DeleteTransformation {
        #[arg(long)]
        id: String,

        /// Skip the confirmation refusal
        #[arg(long)]
        yes: bool,
    },

    /// List available models
    Models {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Transform text
    Transform {
        #[arg(long)]
        content: String,

        /// Tag to apply (repeatable)
        #[arg(long = "tag", default_value = "SAVAGE")]
        tags: Vec<String>,

        #[arg(long, default_value = "gemini-2.0-flash-lite")]
        model: String,

        /// Model provider: OPENAI, OPENROUTER or GEMINI
        #[arg(long, default_value = "GEMINI")]
        kind: ProviderKind,

        #[arg(long)]
        model_id: Option<String>,
    },

    /// Show transformation totals for the signed-in user
    Profile,
}

#[derive(Debug, Subcommand)]
enum CustomTagCommand {
    List,
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        prompt: String,
    },
    Update {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        prompt: String,
    },
    Delete {
        #[arg(long)]
        id: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
enum KeyCommand {
    List,
    Add {
        /// Provider: OPENAI, OPENROUTER or GEMINI
        #[arg(long)]
        provider: ProviderKind,
        #[arg(long, env = "COOKED_PROVIDER_KEY", hide_env_values = true)]
        key: String,
    },
    Update {
        #[arg(long)]
        id: String,
        #[arg(long, env = "COOKED_PROVIDER_KEY", hide_env_values = true)]
        key: String,
    },
    Delete {
        #[arg(long)]
        id: String,
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let api =
        HttpApi::new(&cli.base_url).with_timeout(Duration::from_secs(cli.timeout.max(1)));
    tracing::debug!(base_url = %api.base_url(), "cooked: starting");
    let token = cli.token.as_str();

    match cli.cmd {
        Command::Tags => cmd_tags(&api, token).await,
        Command::CustomTags { cmd } => cmd_custom_tags(&api, token, cmd).await,
        Command::Keys { cmd } => cmd_keys(&api, token, cmd).await,
        Command::History { tag, page } => {
            let page = api.list_transformations(token, &tag, page).await?;
            print(page_json(&page));
            Ok(())
        }
        Command::Search { keyword, page } => {
            let page = api.search_transformations(token, &keyword, page).await?;
            print(page_json(&page));
            Ok(())
        }
        Command::DeleteTransformation { id, yes } => {
            confirm(yes, "transformation", &id)?;
            api.delete_transformation(token, &id).await?;
            print(json!({ "deleted": id }));
            Ok(())
        }
        Command::Models { page } => {
            let models = api.list_models(token, page).await?;
            print(json!({
                "page": page,
                "has_more": !models.is_empty(),
                "models": models,
            }));
            Ok(())
        }
        Command::Transform {
            content,
            tags,
            model,
            kind,
            model_id,
        } => {
            cmd_transform(&api, token, content, tags, model, kind, model_id).await
        }
        Command::Profile => {
            let profile = api.get_profile(token).await?;
            print(json!({
                "total_transformations": profile.total_transformations,
                "member_since": profile.user.and_then(|u| u.created_at),
            }));
            Ok(())
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn print(v: serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(&v).expect("json encode"));
}

fn confirm(yes: bool, what: &str, id: &str) -> anyhow::Result<()> {
    if !yes {
        bail!("refusing to delete {what} {id} without --yes");
    }
    Ok(())
}

fn key_json(key: &ApiKey) -> serde_json::Value {
    json!({
        "id": key.id,
        "provider": key.kind.as_str(),
        "key": mask_key(&key.api_key),
        "created_at": key.created_at,
        "updated_at": key.updated_at,
    })
}

fn page_json(page: &TransformationPage) -> serde_json::Value {
    json!({
        "page": page.page,
        "has_next_page": page.has_next_page,
        "total": page.total_transformations,
        "found": page.found_transformations,
        "transformations": page.transformations,
    })
}

// ── Commands ────────────────────────────────────────────────────────────────

async fn cmd_tags(api: &HttpApi, token: &str) -> anyhow::Result<()> {
    let catalog = api.list_tags(token).await.context("list tags")?;
    print(json!({
        "default_tags": catalog.default_tags,
        "custom_tags": catalog.custom_tags,
    }));
    Ok(())
}

async fn cmd_custom_tags(api: &HttpApi, token: &str, cmd: CustomTagCommand) -> anyhow::Result<()> {
    match cmd {
        CustomTagCommand::List => {
            let tags = api.list_custom_tags(token).await?;
            print(json!({ "custom_tags": tags }));
        }
        CustomTagCommand::Add { name, prompt } => {
            if name.trim().is_empty() || prompt.trim().is_empty() {
                bail!("name and prompt are required");
            }
            let tag = api.create_custom_tag(token, &name, prompt.trim()).await?;
            print(json!(tag));
        }
        CustomTagCommand::Update { id, name, prompt } => {
            if name.trim().is_empty() || prompt.trim().is_empty() {
                bail!("name and prompt are required");
            }
            let tag = api
                .update_custom_tag(token, &id, &name, prompt.trim())
                .await?;
            print(json!(tag));
        }
        CustomTagCommand::Delete { id, yes } => {
            confirm(yes, "custom tag", &id)?;
            api.delete_custom_tag(token, &id).await?;
            print(json!({ "deleted": id }));
        }
    }
    Ok(())
}

async fn cmd_keys(api: &HttpApi, token: &str, cmd: KeyCommand) -> anyhow::Result<()> {
    match cmd {
        KeyCommand::List => {
            let keys = api.list_api_keys(token).await?;
            let keys: Vec<_> = keys.iter().map(key_json).collect();
            print(json!({ "api_keys": keys }));
        }
        KeyCommand::Add { provider, key } => {
            if !is_valid_api_key(&key, provider) {
                bail!("not a valid {provider} API key");
            }
            let created = api.create_api_key(token, &key, provider).await?;
            print(key_json(&created));
        }
        KeyCommand::Update { id, key } => {
            // The stored provider decides the format; look it up first.
            let keys = api.list_api_keys(token).await?;
            let provider = keys
                .iter()
                .find(|k| k.id == id)
                .map(|k| k.kind)
                .unwrap_or(ProviderKind::Other);
            if !is_valid_api_key(&key, provider) {
                bail!("not a valid {provider} API key");
            }
            let updated = api.update_api_key(token, &id, &key).await?;
            print(key_json(&updated));
        }
        KeyCommand::Delete { id, yes } => {
            confirm(yes, "API key", &id)?;
            api.delete_api_key(token, &id).await?;
            print(json!({ "deleted": id }));
        }
    }
    Ok(())
}

async fn cmd_transform(
    api: &HttpApi,
    token: &str,
    content: String,
    tags: Vec<String>,
    model: String,
    kind: ProviderKind,
    model_id: Option<String>,
) -> anyhow::Result<()> {
    let content = content.trim().to_string();
    if content.is_empty() {
        bail!("nothing to transform");
    }
    if content.chars().count() > 7000 {
        bail!("content is longer than 7000 characters");
    }
    let request = TransformRequest {
        content,
        tags: tags.iter().map(|t| t.trim().to_uppercase()).collect(),
        model,
        kind,
        model_id,
    };
    let result = api.transform(token, &request).await.context("transform")?;
    print(json!(result));
    Ok(())
}
