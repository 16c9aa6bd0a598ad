//! Configuration loading, validation, and env substitution.
//!
//! Config files: `aula.toml`, `aula.yaml`, or `aula.json`
//! Searched in `./` then `~/.config/aula/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in all
//! string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{
        config_dir, data_dir, discover_and_load, find_config_file, load_config, reports_dir,
        storage_path,
    },
    schema::{
        AulaConfig, BotConfig, ChannelsConfig, ClassConfig, DiscordConfig, EmojiConfig,
        GradesConfig, PartialConfig, QuizConfig, parse_clock_time,
    },
    validate::{Diagnostic, Severity, ValidationResult},
};
