use serde::{Deserialize, Deserializer, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::PokeClient;
use crate::types::{ClientError, ClientResult};

/// A single pokemon as returned by the `pokemon/{name}` endpoint.
///
/// Missing or `null` fields decode to their zero value; the listing endpoint
/// only carries `name` for each entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pokemon {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub base_experience: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub height: i64,
}

/// Listing returned by the bare `pokemon` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PokemonList {
    #[serde(deserialize_with = "null_as_default")]
    pub results: Vec<Pokemon>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl PokeClient {
    /// Fetch one pokemon by name or numeric id.
    pub async fn fetch_by_identifier(
        &self,
        identifier: &str,
        cancel: &CancellationToken,
    ) -> ClientResult<Pokemon> {
        let url = self.endpoint(Some(identifier));
        info!(identifier = %identifier, "Fetching pokemon");

        self.engine
            .execute(|| self.get_json::<Pokemon>(&url), cancel)
            .await
            .map_err(|source| {
                warn!(identifier = %identifier, error = %source, "Pokemon lookup failed");
                ClientError::Pokemon {
                    name: identifier.to_string(),
                    source,
                }
            })
    }

    /// Fetch the pokemon listing.
    pub async fn fetch_all(&self, cancel: &CancellationToken) -> ClientResult<PokemonList> {
        let url = self.endpoint(None);
        info!("Fetching pokemon list");

        let list = self
            .engine
            .execute(|| self.get_json::<PokemonList>(&url), cancel)
            .await
            .map_err(|source| {
                warn!(error = %source, "Pokemon list lookup failed");
                ClientError::PokemonList { source }
            })?;

        info!(count = list.results.len(), "Pokemon list fetched");
        Ok(list)
    }

    /// [`Self::fetch_by_identifier`] without external cancellation.
    pub async fn get_pokemon(&self, identifier: &str) -> ClientResult<Pokemon> {
        self.fetch_by_identifier(identifier, &CancellationToken::new())
            .await
    }

    /// [`Self::fetch_all`] without external cancellation.
    pub async fn get_all_pokemon(&self) -> ClientResult<PokemonList> {
        self.fetch_all(&CancellationToken::new()).await
    }
}
