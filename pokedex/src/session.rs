pub mod pokeapi;

mod throttle;

pub use throttle::{Permit, Priority, Throttle};

use crate::cache::{self, Cache, Kind, Variant};
use crate::creature::{self, Creature};
use crate::evolution::{self, Chain};
use crate::{Config, Error, Index, Species, Sprite};

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock, MutexGuard, PoisonError, RwLock};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time;

/// The client of the remote data API.
///
/// Every fetch goes through the [`Cache`] first and writes successful
/// downloads back to it.
#[derive(Debug, Clone)]
pub struct Session {
    client: reqwest::Client,
    config: Arc<Config>,
    cache: Cache,
    throttle: Throttle,
    inflight: Inflight,
    unavailable: Arc<RwLock<HashSet<creature::Id>>>,
}

impl Session {
    pub fn new(config: Config, cache: Cache) -> Self {
        log::info!("Session started (API: {})", config.api_url);

        Self {
            client: CLIENT.clone(),
            throttle: Throttle::new(config.interval, config.concurrency),
            config: Arc::new(config),
            cache,
            inflight: Inflight::default(),
            unavailable: Arc::default(),
        }
    }

    /// Opens the cache configured in `config` and starts a session on it.
    pub async fn open(config: Config) -> Result<Self, cache::Error> {
        let cache = Cache::open(&config.cache_dir).await?;

        Ok(Self::new(config, cache))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Remembers that `id` failed for good, so background warming stops
    /// asking for it.
    pub(crate) fn mark_unavailable(&self, id: creature::Id) {
        let _ = self
            .unavailable
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
    }

    pub(crate) fn is_unavailable(&self, id: creature::Id) -> bool {
        self.unavailable
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&id)
    }

    pub async fn fetch_creature(&self, id: creature::Id) -> Result<Arc<Creature>, Error> {
        self.fetch_creature_with(id, Priority::Foreground).await
    }

    pub async fn fetch_creature_with(
        &self,
        id: creature::Id,
        priority: Priority,
    ) -> Result<Arc<Creature>, Error> {
        let url = format!("{}/pokemon/{}", self.api_url(), id.number());

        self.fetch_record((Kind::Creature, id.number()), &url, priority, pokeapi::creature)
            .await
            .map(Arc::new)
    }

    pub async fn fetch_species(&self, id: creature::Id) -> Result<Arc<Species>, Error> {
        self.fetch_species_with(id, Priority::Foreground).await
    }

    pub async fn fetch_species_with(
        &self,
        id: creature::Id,
        priority: Priority,
    ) -> Result<Arc<Species>, Error> {
        let url = format!("{}/pokemon-species/{}", self.api_url(), id.number());

        self.fetch_record((Kind::Species, id.number()), &url, priority, pokeapi::species)
            .await
            .map(Arc::new)
    }

    /// Resolves the evolution chain of `species`, if it has one.
    pub async fn fetch_evolution(&self, species: &Species) -> Result<Option<Arc<Chain>>, Error> {
        self.fetch_evolution_with(species, Priority::Foreground)
            .await
    }

    pub async fn fetch_evolution_with(
        &self,
        species: &Species,
        priority: Priority,
    ) -> Result<Option<Arc<Chain>>, Error> {
        let Some(evolution::Id(chain)) = species.evolution_chain else {
            return Ok(None);
        };

        let url = format!("{}/evolution-chain/{chain}", self.api_url());

        let chain = self
            .fetch_record((Kind::Evolution, chain), &url, priority, pokeapi::evolution)
            .await?;

        Ok(Some(Arc::new(chain)))
    }

    /// Fetches the names of every creature.
    pub async fn fetch_index(&self) -> Result<Index, Error> {
        let url = format!(
            "{}/pokemon-species?limit={}",
            self.api_url(),
            creature::Id::MAX
        );

        self.fetch_record((Kind::Index, 0), &url, Priority::Foreground, pokeapi::index)
            .await
    }

    /// Fetches a sprite, falling back to a placeholder when it is not
    /// available anywhere.
    pub async fn fetch_sprite(&self, id: creature::Id, shiny: bool) -> Sprite {
        match self.try_fetch_sprite(id, shiny).await {
            Ok(bytes) => Sprite::new(bytes),
            Err(error) => {
                log::warn!("Sprite of {id} unavailable, using placeholder: {error}");

                Sprite::placeholder()
            }
        }
    }

    async fn try_fetch_sprite(&self, id: creature::Id, shiny: bool) -> Result<Bytes, Error> {
        let key = (Kind::Sprite(Variant::from_shiny(shiny)), id.number());

        if let Some(bytes) = self.cached_sprite(key).await {
            return Ok(bytes);
        }

        let _guard = self.inflight.lock(key).await;

        if let Some(bytes) = self.cached_sprite(key).await {
            return Ok(bytes);
        }

        let creature = self.fetch_creature(id).await?;

        let Some(url) = creature.sprites.url(shiny) else {
            return Err(Error::InvalidRecord(format!("{id} has no sprite")));
        };

        let bytes = self.download(url, Priority::Foreground).await?;

        if image::guess_format(&bytes).is_err() {
            return Err(Error::InvalidRecord(format!("sprite of {id} is not an image")));
        }

        self.store(key, bytes.clone()).await;

        Ok(bytes)
    }

    async fn cached_sprite(&self, (kind, id): cache::Key) -> Option<Bytes> {
        let bytes = self.cache.get(kind, id).await?;

        if image::guess_format(&bytes).is_err() {
            log::warn!("Corrupt sprite {kind:?} {id} in cache, evicting");
            self.cache.evict(kind, id).await;

            return None;
        }

        Some(bytes)
    }

    async fn fetch_record<T>(
        &self,
        key: cache::Key,
        url: &str,
        priority: Priority,
        decode: fn(&[u8]) -> Result<T, Error>,
    ) -> Result<T, Error>
    where
        T: Serialize + DeserializeOwned,
    {
        if let Some(record) = self.cached(key).await {
            return Ok(record);
        }

        // Concurrent fetches of the same key wait here and reuse the result
        let _guard = self.inflight.lock(key).await;

        if let Some(record) = self.cached(key).await {
            return Ok(record);
        }

        let bytes = self.download(url, priority).await?;
        let record = decode(&bytes)?;

        self.store(key, serde_json::to_vec(&record)?).await;

        Ok(record)
    }

    async fn cached<T: DeserializeOwned>(&self, (kind, id): cache::Key) -> Option<T> {
        let bytes = self.cache.get(kind, id).await?;

        match serde_json::from_slice(&bytes) {
            Ok(record) => Some(record),
            Err(error) => {
                log::warn!("Corrupt cache entry {kind:?} {id}, refetching: {error}");
                self.cache.evict(kind, id).await;

                None
            }
        }
    }

    async fn store(&self, (kind, id): cache::Key, bytes: impl Into<Bytes>) {
        if let Err(error) = self.cache.put(kind, id, bytes.into()).await {
            log::warn!("{error}");
        }
    }

    async fn download(&self, url: &str, priority: Priority) -> Result<Bytes, Error> {
        retry(&self.config, || async move {
            let _permit = self.throttle.acquire(priority).await;

            log::info!("Downloading: {url}");

            let response = self
                .client
                .get(url)
                .timeout(self.config.timeout)
                .send()
                .await?
                .error_for_status()?;

            Ok(response.bytes().await?)
        })
        .await
    }

    fn api_url(&self) -> &str {
        self.config.api_url.trim_end_matches('/')
    }
}

static CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::ClientBuilder::new()
        .user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
        .build()
        .expect("Build reqwest client")
});

async fn retry<T, F>(config: &Config, f: impl Fn() -> F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(value) => break Ok(value),
            Err(error) if error.is_retryable() && attempt < config.retries => {
                let retries = config.retries - attempt;

                log::warn!(
                    "{error} ({retries} {} left)",
                    if retries == 1 { "retry" } else { "retries" }
                );

                time::sleep(config.backoff(attempt)).await;
                attempt += 1;
            }
            Err(error) => break Err(error),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Inflight(Arc<std::sync::Mutex<HashMap<cache::Key, Arc<Mutex<()>>>>>);

impl Inflight {
    async fn lock(&self, key: cache::Key) -> Guard {
        let lock = Arc::clone(self.locks().entry(key).or_default());

        Guard {
            key,
            inflight: self.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    fn locks(&self) -> MutexGuard<'_, HashMap<cache::Key, Arc<Mutex<()>>>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds the lock of a key until dropped. The last holder removes the key.
struct Guard {
    key: cache::Key,
    inflight: Inflight,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for Guard {
    fn drop(&mut self) {
        let mut locks = self.inflight.locks();

        self.guard = None;

        let is_unused = locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);

        if is_unused {
            let _ = locks.remove(&self.key);
        }
    }
}
