pub mod app_config;
pub mod config;
pub mod products;
pub mod run;
pub mod selectors;

pub use app_config::{AppConfig, ScrapeSettings};
pub use config::{load_app_config, load_app_config_from_env};
pub use products::{PetCategory, ProductRecord, SearchFilters, DEFAULT_SELLER, NOT_AVAILABLE};
pub use run::{normalize_search_term, report_name, RunConfig};
pub use selectors::{load_selector_profile, SelectorProfile};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid search term {term:?}: {reason}")]
    InvalidSearchTerm { term: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read selector profile {path}: {source}")]
    SelectorsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse selector profile: {0}")]
    SelectorsFileParse(#[from] serde_yaml::Error),

    #[error("selector profile validation failed: {0}")]
    Validation(String),
}
