// pokeapi-client - PokeAPI lookups with retry, backoff and cancellation

pub mod client;
pub mod config;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use client::{PokeClient, Pokemon, PokemonList};
pub use config::{ClientConfig, Config};
pub use tokio_util::sync::CancellationToken;
pub use types::{ClientError, ClientResult, ConfigError, LookupError, RetryError};
pub use utils::retry::{retry, RetryCondition, RetryEngine, RetryPolicy};
