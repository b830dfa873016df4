use std::env;

use secrecy::SecretString;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Mongo,
    Memory,
}

impl StorageBackend {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" | "inmemory" => StorageBackend::Memory,
            _ => StorageBackend::Mongo,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub web_server_host: String,
    pub web_server_port: u16,
    pub storage_backend: StorageBackend,
    pub mongo_conn_string: String,
    pub mongo_db_name: String,
    pub openai_api_key: SecretString,
    pub openai_base_url: String,
    pub generation_model: String,
    pub generation_timeout_secs: u64,
    pub summary_chunk_size: usize,
    pub summary_max_tokens: u32,
    pub quiz_max_tokens: u32,
    pub grading_max_tokens: u32,
    pub evidence_max_tokens: u32,
    pub translation_max_tokens: u32,
    pub translation_target_language: String,
    pub evidence_min_length: usize,
    pub evidence_generic_prefixes: Vec<String>,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            web_server_host: env_or("WEB_SERVER_HOST", "localhost"),
            web_server_port: env_parsed("WEB_SERVER_PORT", 8080),
            storage_backend: StorageBackend::parse(&env_or("STORAGE_BACKEND", "mongo")),
            mongo_conn_string: env_or("MONGO_CONN_STRING", "mongodb://localhost:27017"),
            mongo_db_name: env_or("MONGO_DB_NAME", "studygen-local"),
            openai_api_key: SecretString::from(env_or("OPENAI_API_KEY", "")),
            openai_base_url: env_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            generation_model: env_or("GENERATION_MODEL", "gpt-4o-mini"),
            generation_timeout_secs: env_parsed("GENERATION_TIMEOUT_SECS", 60),
            summary_chunk_size: env_parsed("SUMMARY_CHUNK_SIZE", 10),
            summary_max_tokens: env_parsed("SUMMARY_MAX_TOKENS", 1500),
            quiz_max_tokens: env_parsed("QUIZ_MAX_TOKENS", 4000),
            grading_max_tokens: env_parsed("GRADING_MAX_TOKENS", 800),
            evidence_max_tokens: env_parsed("EVIDENCE_MAX_TOKENS", 500),
            translation_max_tokens: env_parsed("TRANSLATION_MAX_TOKENS", 2000),
            translation_target_language: env_or("TRANSLATION_TARGET_LANGUAGE", "Korean"),
            evidence_min_length: env_parsed("EVIDENCE_MIN_LENGTH", 15),
            evidence_generic_prefixes: env::var("EVIDENCE_GENERIC_PREFIXES")
                .map(|raw| {
                    raw.split(',')
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Validate that production-critical configuration is set
    /// Panics if the generation service cannot be reached with these settings
    pub fn validate_for_production(&self) {
        use secrecy::ExposeSecret;

        if self.openai_api_key.expose_secret().trim().is_empty() {
            panic!("FATAL: OPENAI_API_KEY is not set! The generation service requires an API key.");
        }

        if self.summary_chunk_size == 0 {
            panic!("FATAL: SUMMARY_CHUNK_SIZE must be greater than zero.");
        }

        if self.storage_backend == StorageBackend::Memory {
            log::warn!("STORAGE_BACKEND=memory: generated artifacts will not survive a restart");
        }
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 8080,
            storage_backend: StorageBackend::Memory,
            mongo_conn_string: "mongodb://localhost:27017".to_string(),
            mongo_db_name: "studygen-test".to_string(),
            openai_api_key: SecretString::from("sk-test".to_string()),
            openai_base_url: "http://127.0.0.1:9".to_string(),
            generation_model: "test-model".to_string(),
            generation_timeout_secs: 5,
            summary_chunk_size: 10,
            summary_max_tokens: 1500,
            quiz_max_tokens: 4000,
            grading_max_tokens: 800,
            evidence_max_tokens: 500,
            translation_max_tokens: 2000,
            translation_target_language: "Korean".to_string(),
            evidence_min_length: 15,
            evidence_generic_prefixes: Vec::new(),
        }
    }
}
