//! Persistent storage for fetched records and sprites.
//!
//! Every entry lives in its own file under the cache root:
//!
//! ```text
//! <root>/pokemon/<id>.json
//! <root>/species/<id>.json
//! <root>/evolution/<id>.json
//! <root>/index/<id>.json
//! <root>/sprites/normal/<id>.png
//! <root>/sprites/shiny/<id>.png
//! ```
//!
//! Writes go to a temporary file that is then renamed into place, so readers
//! never observe a partially written entry.
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{self, AtomicU64};
use std::sync::{Arc, RwLock};
use tokio::fs;

#[derive(Clone)]
pub struct Cache(Arc<Inner>);

struct Inner {
    root: PathBuf,
    index: RwLock<HashSet<Key>>,
    memory: RwLock<HashMap<Key, Bytes>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Creature,
    Species,
    Evolution,
    Index,
    Sprite(Variant),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Normal,
    Shiny,
}

pub type Key = (Kind, u32);

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("could not open cache at {path}: {error}")]
    Open { path: PathBuf, error: Arc<io::Error> },
    #[error("could not write {path}: {error}")]
    Write { path: PathBuf, error: Arc<io::Error> },
}

impl Kind {
    pub const ALL: [Self; 6] = [
        Self::Creature,
        Self::Species,
        Self::Evolution,
        Self::Index,
        Self::Sprite(Variant::Normal),
        Self::Sprite(Variant::Shiny),
    ];

    fn directory(self) -> &'static str {
        match self {
            Self::Creature => "pokemon",
            Self::Species => "species",
            Self::Evolution => "evolution",
            Self::Index => "index",
            Self::Sprite(Variant::Normal) => "sprites/normal",
            Self::Sprite(Variant::Shiny) => "sprites/shiny",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Sprite(_) => "png",
            _ => "json",
        }
    }
}

impl Variant {
    pub fn from_shiny(shiny: bool) -> Self {
        if shiny { Self::Shiny } else { Self::Normal }
    }
}

impl Cache {
    /// Opens the cache at `root`, creating its layout and indexing every
    /// entry already on disk.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root = root.into();
        let mut index = HashSet::new();

        for kind in Kind::ALL {
            let directory = root.join(kind.directory());

            fs::create_dir_all(&directory)
                .await
                .map_err(|error| Error::Open {
                    path: directory.clone(),
                    error: Arc::new(error),
                })?;

            scan(&directory, kind, &mut index).await;
        }

        log::info!(
            "Opened cache at {} with {} entries",
            root.display(),
            index.len()
        );

        Ok(Self(Arc::new(Inner {
            root,
            index: RwLock::new(index),
            memory: RwLock::new(HashMap::new()),
        })))
    }

    pub fn contains(&self, kind: Kind, id: u32) -> bool {
        let key = (kind, id);

        self.0
            .memory
            .read()
            .is_ok_and(|memory| memory.contains_key(&key))
            || self.0.index.read().is_ok_and(|index| index.contains(&key))
    }

    pub fn len(&self, kind: Kind) -> usize {
        let on_disk: HashSet<u32> = self
            .0
            .index
            .read()
            .map(|index| {
                index
                    .iter()
                    .filter(|(candidate, _)| *candidate == kind)
                    .map(|(_, id)| *id)
                    .collect()
            })
            .unwrap_or_default();

        let in_memory = self
            .0
            .memory
            .read()
            .map(|memory| {
                memory
                    .keys()
                    .filter(|(candidate, id)| *candidate == kind && !on_disk.contains(id))
                    .count()
            })
            .unwrap_or_default();

        on_disk.len() + in_memory
    }

    /// Looks up an entry. Never touches the network.
    ///
    /// An indexed file that can no longer be read is evicted and reported
    /// as absent.
    pub async fn get(&self, kind: Kind, id: u32) -> Option<Bytes> {
        let key = (kind, id);

        if let Some(bytes) = self
            .0
            .memory
            .read()
            .ok()
            .and_then(|memory| memory.get(&key).cloned())
        {
            return Some(bytes);
        }

        if !self.0.index.read().is_ok_and(|index| index.contains(&key)) {
            return None;
        }

        match fs::read(self.path(kind, id)).await {
            Ok(bytes) if !bytes.is_empty() => Some(Bytes::from(bytes)),
            Ok(_) => {
                log::warn!("Empty cache entry {kind:?} {id}, evicting");
                self.evict(kind, id).await;

                None
            }
            Err(error) => {
                log::warn!("Unreadable cache entry {kind:?} {id} ({error}), evicting");
                self.forget(key);

                None
            }
        }
    }

    /// Stores an entry.
    ///
    /// The entry is usable for the rest of the session even if persisting
    /// it fails.
    pub async fn put(&self, kind: Kind, id: u32, bytes: Bytes) -> Result<(), Error> {
        let key = (kind, id);

        if let Ok(mut memory) = self.0.memory.write() {
            let _ = memory.insert(key, bytes.clone());
        }

        let path = self.path(kind, id);
        let temporary = temporary_path(&path);

        let write = async {
            fs::write(&temporary, &bytes).await?;
            fs::rename(&temporary, &path).await
        };

        if let Err(error) = write.await {
            let _ = fs::remove_file(&temporary).await;

            return Err(Error::Write {
                path,
                error: Arc::new(error),
            });
        }

        if let Ok(mut index) = self.0.index.write() {
            let _ = index.insert(key);
        }

        Ok(())
    }

    /// Removes an entry everywhere, e.g. after it failed to decode.
    pub async fn evict(&self, kind: Kind, id: u32) {
        self.forget((kind, id));

        let _ = fs::remove_file(self.path(kind, id)).await;
    }

    fn forget(&self, key: Key) {
        if let Ok(mut memory) = self.0.memory.write() {
            let _ = memory.remove(&key);
        }

        if let Ok(mut index) = self.0.index.write() {
            let _ = index.remove(&key);
        }
    }

    fn path(&self, kind: Kind, id: u32) -> PathBuf {
        self.0
            .root
            .join(kind.directory())
            .join(format!("{id}.{extension}", extension = kind.extension()))
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("root", &self.0.root)
            .field(
                "entries",
                &self.0.index.read().map(|index| index.len()).unwrap_or(0),
            )
            .finish()
    }
}

async fn scan(directory: &Path, kind: Kind, index: &mut HashSet<Key>) {
    let Ok(mut entries) = fs::read_dir(directory).await else {
        return;
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();

        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };

        if name.contains(".tmp") {
            let _ = fs::remove_file(&path).await;
            continue;
        }

        let Some(id) = name
            .strip_suffix(kind.extension())
            .and_then(|stem| stem.strip_suffix('.'))
            .and_then(|stem| stem.parse::<u32>().ok())
        else {
            continue;
        };

        let is_readable = entry
            .metadata()
            .await
            .is_ok_and(|metadata| metadata.is_file() && metadata.len() > 0);

        if is_readable {
            let _ = index.insert((kind, id));
        }
    }
}

fn temporary_path(path: &Path) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let n = COUNTER.fetch_add(1, atomic::Ordering::Relaxed);

    path.with_extension(format!("tmp.{pid}.{n}", pid = std::process::id()))
}
