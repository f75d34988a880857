#![allow(dead_code)]

use pokedex::cache::Kind;
use pokedex::creature::{self, Sprites};
use pokedex::evolution::{self, Chain, Stage};
use pokedex::{Cache, Config, Creature, Locale, Session, Species, Type};

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{self, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time;

pub const LEGENDARY: [u32; 4] = [144, 145, 146, 150];
pub const MYTHICAL: [u32; 1] = [151];

/// A session whose API lives on a closed local port, so only cached data
/// is available.
pub async fn offline(root: &Path) -> Session {
    let config = Config {
        api_url: "http://127.0.0.1:9".to_owned(),
        cache_dir: root.to_path_buf(),
        retries: 0,
        backoff: Duration::ZERO,
        interval: Duration::ZERO,
        timeout: Duration::from_secs(2),
        ..Config::default()
    };

    Session::open(config).await.expect("open session")
}

/// A session backed by a local [`Server`], with quick retries.
pub async fn online(root: &Path, server: &Server) -> Session {
    let config = Config {
        api_url: server.url.clone(),
        cache_dir: root.to_path_buf(),
        retries: 2,
        backoff: Duration::from_millis(5),
        interval: Duration::ZERO,
        timeout: Duration::from_secs(5),
        ..Config::default()
    };

    Session::open(config).await.expect("open session")
}

/// Answers a request path, given the base URL of the server.
type Routes = dyn Fn(&str, &str) -> (u16, Vec<u8>) + Send + Sync;

/// A local HTTP server answering every request through its routes and
/// counting the hits of each path.
pub struct Server {
    pub url: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
    accept: JoinHandle<()>,
}

impl Server {
    pub async fn start(
        routes: impl Fn(&str, &str) -> (u16, Vec<u8>) + Send + Sync + 'static,
    ) -> Self {
        Self::with_delay(Duration::ZERO, routes).await
    }

    /// Starts a server that waits `delay` before answering.
    pub async fn with_delay(
        delay: Duration,
        routes: impl Fn(&str, &str) -> (u16, Vec<u8>) + Send + Sync + 'static,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("http://{}", listener.local_addr().expect("local address"));

        let hits = Arc::new(Mutex::new(HashMap::new()));
        let routes: Arc<Routes> = Arc::new(routes);

        let accept = tokio::spawn({
            let url = url.clone();
            let hits = Arc::clone(&hits);

            async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let url = url.clone();
                    let hits = Arc::clone(&hits);
                    let routes = Arc::clone(&routes);

                    let _ = tokio::spawn(async move {
                        let _ = respond(stream, &url, &*routes, &hits, delay).await;
                    });
                }
            }
        });

        Self { url, hits, accept }
    }

    pub fn hits(&self, path: &str) -> usize {
        self.hits
            .lock()
            .expect("hits")
            .get(path)
            .copied()
            .unwrap_or(0)
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.accept.abort();
    }
}

async fn respond(
    mut stream: TcpStream,
    url: &str,
    routes: &Routes,
    hits: &Mutex<HashMap<String, usize>>,
    delay: Duration,
) -> io::Result<()> {
    let mut request = Vec::new();
    let mut buffer = [0; 1024];

    while !request.windows(4).any(|window| window == b"\r\n\r\n") {
        let read = stream.read(&mut buffer).await?;

        if read == 0 {
            return Ok(());
        }

        request.extend_from_slice(&buffer[..read]);
    }

    let path = String::from_utf8_lossy(&request)
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_owned();

    *hits.lock().expect("hits").entry(path.clone()).or_default() += 1;

    time::sleep(delay).await;

    let (status, body) = routes(url, &path);
    let reason = if status < 400 { "OK" } else { "Error" };

    let head = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );

    stream.write_all(head.as_bytes()).await?;
    stream.write_all(&body).await?;
    stream.shutdown().await
}

pub fn not_found() -> (u16, Vec<u8>) {
    (404, b"Not Found".to_vec())
}

/// A `/pokemon/{number}` response with sprites hosted on `url`.
pub fn raw_creature(url: &str, number: u32, type_: Type) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "id": number,
        "name": format!("creature-{number}"),
        "height": 7,
        "weight": 69,
        "types": [{"slot": 1, "type": {"name": type_.as_str().to_lowercase(), "url": ""}}],
        "sprites": {
            "front_default": format!("{url}/sprites/{number}.png"),
            "front_shiny": null,
        },
    }))
    .expect("serialize")
}

/// A `/pokemon-species/{number}` response.
pub fn raw_species(url: &str, number: u32, chain: Option<u32>) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "id": number,
        "names": [{"name": format!("Creature {number}"), "language": {"name": "en", "url": ""}}],
        "is_legendary": LEGENDARY.contains(&number),
        "is_mythical": MYTHICAL.contains(&number),
        "evolution_chain": chain.map(|chain| serde_json::json!({
            "url": format!("{url}/evolution-chain/{chain}/"),
        })),
    }))
    .expect("serialize")
}

/// A linear `/evolution-chain/{chain}` response over `members`.
pub fn raw_chain(url: &str, chain: u32, members: &[u32]) -> Vec<u8> {
    let link = members.iter().rev().fold(None, |next, member| {
        Some(serde_json::json!({
            "species": {"name": "", "url": format!("{url}/pokemon-species/{member}/")},
            "evolves_to": next.into_iter().collect::<Vec<_>>(),
        }))
    });

    serde_json::to_vec(&serde_json::json!({ "id": chain, "chain": link }))
        .expect("serialize")
}

pub fn id(number: u32) -> creature::Id {
    creature::Id::new(number).expect("valid id")
}

pub fn creature(number: u32, types: &[Type]) -> Creature {
    Creature {
        id: id(number),
        name: [(Locale::english(), format!("Creature {number}"))]
            .into_iter()
            .collect(),
        types: types.to_vec(),
        height: 0.7,
        weight: 6.9,
        sprites: Sprites {
            normal: Some(format!("http://127.0.0.1:9/sprites/{number}.png")),
            shiny: None,
        },
    }
}

pub fn species(number: u32, chain: Option<u32>) -> Species {
    Species {
        id: id(number),
        name: [
            (Locale::english(), format!("Creature {number}")),
            (Locale::new("de"), format!("Kreatur {number}")),
        ]
        .into_iter()
        .collect(),
        is_legendary: LEGENDARY.contains(&number),
        is_mythical: MYTHICAL.contains(&number),
        evolution_chain: chain.map(evolution::Id),
    }
}

/// Two linear chains: 1 → 2 → 3 and 4 → 5 → 6.
pub fn chains() -> [Chain; 2] {
    let linear = |chain: u32, first: u32| Chain {
        id: evolution::Id(chain),
        root: Stage {
            species: id(first),
            evolves_to: vec![Stage {
                species: id(first + 1),
                evolves_to: vec![Stage::leaf(id(first + 2))],
            }],
        },
    };

    [linear(1, 1), linear(2, 4)]
}

pub fn type_of(number: u32) -> Type {
    Type::ALL[number as usize % Type::ALL.len()]
}

pub fn chain_of(number: u32) -> Option<u32> {
    match number {
        1..=3 => Some(1),
        4..=6 => Some(2),
        _ => None,
    }
}

pub async fn seed(cache: &Cache, creature: &Creature, species: &Species) {
    let number = creature.id.number();

    cache
        .put(Kind::Creature, number, json(creature))
        .await
        .expect("seed creature");

    cache
        .put(Kind::Species, number, json(species))
        .await
        .expect("seed species");
}

/// Seeds every creature of the first generation, each with a single type.
pub async fn seed_first_generation(cache: &Cache) {
    for number in 1..=151 {
        seed(
            cache,
            &creature(number, &[type_of(number)]),
            &species(number, chain_of(number)),
        )
        .await;
    }

    for chain in chains() {
        cache
            .put(Kind::Evolution, chain.id.0, json(&chain))
            .await
            .expect("seed chain");
    }
}

pub fn json(value: &impl serde::Serialize) -> bytes::Bytes {
    serde_json::to_vec(value).expect("serialize").into()
}
