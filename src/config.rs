use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

pub const DEFAULT_GALLERY_URL: &str =
    "http://www.agenciabrasil.gov.br/imagens/banco_de_imagens_view/lista";

/// Runtime settings. Sources, lowest precedence first: defaults,
/// `abrcrawl.toml` in the working directory, `ABR_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub gallery_url: String,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gallery_url: DEFAULT_GALLERY_URL.to_string(),
            user_agent: default_user_agent(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        Config::builder()
            .set_default("gallery_url", DEFAULT_GALLERY_URL)?
            .set_default("user_agent", default_user_agent())?
            .add_source(File::with_name("abrcrawl").required(false))
            .add_source(Environment::with_prefix("ABR"))
            .build()
            .and_then(|c| c.try_deserialize())
            .context("Failed to load settings")
    }

    #[cfg(test)]
    pub fn with_gallery_url(url: impl Into<String>) -> Self {
        Self {
            gallery_url: url.into(),
            ..Self::default()
        }
    }
}

fn default_user_agent() -> String {
    format!("abrcrawl/{}", env!("CARGO_PKG_VERSION"))
}
