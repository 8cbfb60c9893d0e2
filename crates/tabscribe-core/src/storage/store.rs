use crate::model::{ChatRequest, RawResult};
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// The five parallel artifact streams kept per unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Linearization,
    Input,
    Raw,
    Processed,
    BackInput,
}

impl StreamKind {
    pub const ALL: [StreamKind; 5] = [
        StreamKind::Linearization,
        StreamKind::Input,
        StreamKind::Raw,
        StreamKind::Processed,
        StreamKind::BackInput,
    ];

    /// Streams rewritten after every completed call.
    pub const RESULTS: [StreamKind; 3] =
        [StreamKind::Raw, StreamKind::Processed, StreamKind::BackInput];

    pub fn dir_name(&self) -> &'static str {
        match self {
            StreamKind::Linearization => "linearization",
            StreamKind::Input => "input",
            StreamKind::Raw => "raw",
            StreamKind::Processed => "processed",
            StreamKind::BackInput => "back_input",
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            StreamKind::Raw => "msgpack",
            _ => "json",
        }
    }
}

/// In-memory view of one unit's artifacts. Result slots are `None` until written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Streams {
    pub linearization: Vec<String>,
    pub input: Vec<ChatRequest>,
    pub raw: Vec<Option<RawResult>>,
    pub processed: Vec<Option<String>>,
    pub back_input: Vec<Option<ChatRequest>>,
}

/// Directory-per-stream artifact store: `<root>/<stream>/<name>.<ext>`.
#[derive(Debug, Clone)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    /// Opens the store, creating every stream directory up front.
    pub fn open(root: &Path) -> anyhow::Result<Self> {
        for kind in StreamKind::ALL {
            let dir = root.join(kind.dir_name());
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create store dir {}", dir.display()))?;
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Read-only handle over an existing store; nothing is created on disk.
    pub fn read_only(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact_path(&self, kind: StreamKind, name: &str) -> PathBuf {
        self.root
            .join(kind.dir_name())
            .join(format!("{}.{}", name, kind.extension()))
    }

    /// Loads every stream for `name`; missing artifacts come back empty.
    pub fn load(&self, name: &str) -> anyhow::Result<Streams> {
        Ok(Streams {
            linearization: self.read_json(StreamKind::Linearization, name)?,
            input: self.read_json(StreamKind::Input, name)?,
            raw: self.read_msgpack(StreamKind::Raw, name)?,
            processed: self.read_json(StreamKind::Processed, name)?,
            back_input: self.read_json(StreamKind::BackInput, name)?,
        })
    }

    /// Persists only the listed streams, leaving the others on disk untouched.
    pub fn save(&self, name: &str, streams: &Streams, kinds: &[StreamKind]) -> anyhow::Result<()> {
        for kind in kinds {
            match kind {
                StreamKind::Linearization => {
                    self.write_json(*kind, name, &streams.linearization)?
                }
                StreamKind::Input => self.write_json(*kind, name, &streams.input)?,
                StreamKind::Raw => {
                    let bytes = rmp_serde::to_vec_named(&streams.raw)
                        .context("failed to encode raw results")?;
                    self.write_atomic(*kind, name, &bytes)?
                }
                StreamKind::Processed => self.write_json(*kind, name, &streams.processed)?,
                StreamKind::BackInput => self.write_json(*kind, name, &streams.back_input)?,
            }
        }
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, kind: StreamKind, name: &str) -> anyhow::Result<Vec<T>> {
        let path = self.artifact_path(kind, name);
        let Some(bytes) = read_if_exists(&path)? else {
            return Ok(Vec::new());
        };
        serde_json::from_slice(&bytes).with_context(|| format!("corrupt artifact {}", path.display()))
    }

    fn read_msgpack<T: DeserializeOwned>(
        &self,
        kind: StreamKind,
        name: &str,
    ) -> anyhow::Result<Vec<T>> {
        let path = self.artifact_path(kind, name);
        let Some(bytes) = read_if_exists(&path)? else {
            return Ok(Vec::new());
        };
        rmp_serde::from_slice(&bytes).with_context(|| format!("corrupt artifact {}", path.display()))
    }

    fn write_json<T: Serialize>(&self, kind: StreamKind, name: &str, value: &T) -> anyhow::Result<()> {
        let mut bytes = serde_json::to_vec_pretty(value)
            .with_context(|| format!("failed to encode {} stream", kind.dir_name()))?;
        bytes.push(b'\n');
        self.write_atomic(kind, name, &bytes)
    }

    // temp file in the same directory, then rename over the old artifact
    fn write_atomic(&self, kind: StreamKind, name: &str, bytes: &[u8]) -> anyhow::Result<()> {
        let path = self.artifact_path(kind, name);
        let dir = self.root.join(kind.dir_name());
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path)
            .with_context(|| format!("failed to write artifact {}", path.display()))?;
        Ok(())
    }
}

fn read_if_exists(path: &Path) -> anyhow::Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(b) => Ok(Some(b)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("failed to read artifact {}", path.display())),
    }
}
