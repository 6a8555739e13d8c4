pub mod loader;
pub mod schema;

pub use loader::{default_config_path, load_config, load_config_from_str, validate_config};
pub use schema::{
    ApiKeyProvider, BudgetConfig, Config, GeminiProvider, HttpConfig, KlingProvider,
    PollingConfig, ProvidersConfig, StylesConfig, ToolSettings,
};
