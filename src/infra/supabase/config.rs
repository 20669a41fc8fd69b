use anyhow::{Context, Result};

pub const URL_VAR: &str = "SUPABASE_URL";
pub const KEY_VAR: &str = "SUPABASE_KEY";

/// Connection settings for the hosted reference tables.
///
/// Read from the environment, after `.env` has been loaded:
/// ```text
/// SUPABASE_URL=https://<project>.supabase.co
/// SUPABASE_KEY=<anon or service key>
/// ```
#[derive(Clone)]
pub struct StoreConfig {
    pub url: String,
    pub key: String,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl StoreConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source. Blank values count as unset.
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |name: &str| {
            get(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .with_context(|| format!("{name} must be set"))
        };

        Ok(Self {
            url: read(URL_VAR)?,
            key: read(KEY_VAR)?,
        })
    }

    /// Whether both variables are present, without validating them further.
    pub fn is_configured() -> bool {
        Self::from_env().is_ok()
    }
}
