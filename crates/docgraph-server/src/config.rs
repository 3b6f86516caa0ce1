use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    /// Bearer token required on every API call. `None` disables auth.
    pub api_token: Option<String>,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            api_token: env::var("DOCGRAPH_API_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_token: None,
            port: 3000,
        }
    }
}
