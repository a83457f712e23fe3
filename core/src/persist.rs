use crate::builder::DocumentFragment;
use crate::index::{CorpusIndex, DocKey, DocumentEntry, InvertedIndex, PositionalIndex, Vocabulary};
use crate::vector::VectorModel;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const INDEX_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: usize,
    pub num_terms: usize,
    pub created_at: String,
    pub version: u32,
}

/// One line of the append-only metadata log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub doc_id: DocKey,
    pub path: PathBuf,
    pub content_hash: String,
    pub tokens: usize,
    pub unique_tokens: usize,
    pub stemmed_tokens: usize,
    pub fragment_file: PathBuf,
    pub created_at: String,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    fn documents(&self) -> PathBuf { self.root.join("documents.json") }
    fn inverted(&self) -> PathBuf { self.root.join("inverted_index.json") }
    fn positional(&self) -> PathBuf { self.root.join("positional_index.json") }
    fn vocabulary(&self) -> PathBuf { self.root.join("vocabulary.json") }
    fn metadata_log(&self) -> PathBuf { self.root.join("metadata.jsonl") }
    fn fragments_dir(&self) -> PathBuf { self.root.join("fragments") }
    fn vector_model(&self) -> PathBuf { self.root.join("vector_model.bin") }

    pub fn fragment(&self, doc_id: &str) -> PathBuf {
        self.fragments_dir().join(format!("{doc_id}.json"))
    }

    /// Files that must all exist for [`load_index`] to succeed.
    pub fn required_files(&self) -> Vec<PathBuf> {
        vec![self.meta(), self.documents(), self.inverted(), self.positional(), self.vocabulary()]
    }

    pub fn missing_files(&self) -> Vec<PathBuf> {
        self.required_files().into_iter().filter(|p| !p.is_file()).collect()
    }
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, value).with_context(|| format!("writing {}", path.display()))?;
    w.flush()?;
    Ok(())
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let value = serde_json::from_reader(BufReader::new(f)).with_context(|| format!("parsing {}", path.display()))?;
    Ok(value)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    save_json(&paths.meta(), meta)
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    load_json(&paths.meta())
}

/// Persist the three index maps, the document table and `meta.json`.
pub fn save_index(paths: &IndexPaths, index: &CorpusIndex) -> Result<()> {
    create_dir_all(&paths.root)?;
    save_json(&paths.documents(), &index.documents)?;
    save_json(&paths.inverted(), &index.inverted)?;
    save_json(&paths.positional(), &index.positional)?;
    save_json(&paths.vocabulary(), &index.vocabulary)?;
    let meta = MetaFile {
        num_docs: index.documents.len(),
        num_terms: index.inverted.len(),
        created_at: now_rfc3339(),
        version: INDEX_VERSION,
    };
    save_meta(paths, &meta)
}

pub fn load_index(paths: &IndexPaths) -> Result<CorpusIndex> {
    let meta = load_meta(paths)?;
    if meta.version != INDEX_VERSION {
        anyhow::bail!("index version {} is not supported (expected {})", meta.version, INDEX_VERSION);
    }
    let documents: Vec<DocumentEntry> = load_json(&paths.documents())?;
    let inverted: InvertedIndex = load_json(&paths.inverted())?;
    let positional: PositionalIndex = load_json(&paths.positional())?;
    let vocabulary: Vocabulary = load_json(&paths.vocabulary())?;
    Ok(CorpusIndex { documents, inverted, positional, vocabulary })
}

pub fn save_fragment(paths: &IndexPaths, fragment: &DocumentFragment) -> Result<PathBuf> {
    create_dir_all(paths.fragments_dir())?;
    let file = paths.fragment(&fragment.doc_id);
    save_json(&file, fragment)?;
    Ok(file)
}

pub fn load_fragment(path: &Path) -> Result<DocumentFragment> {
    load_json(path)
}

pub fn append_metadata(paths: &IndexPaths, entries: &[MetadataEntry]) -> Result<()> {
    if entries.is_empty() {
        return Ok(());
    }
    create_dir_all(&paths.root)?;
    let path = paths.metadata_log();
    let f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut w = BufWriter::new(f);
    for entry in entries {
        serde_json::to_writer(&mut w, entry)?;
        w.write_all(b"\n")?;
    }
    w.flush()?;
    Ok(())
}

/// Latest log entry per document. A missing log is an empty log.
pub fn load_metadata(paths: &IndexPaths) -> Result<HashMap<DocKey, MetadataEntry>> {
    let path = paths.metadata_log();
    let f = match File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => return Err(e).with_context(|| format!("opening {}", path.display())),
    };
    let mut latest = HashMap::new();
    for (lineno, line) in BufReader::new(f).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        match serde_json::from_str::<MetadataEntry>(&line) {
            Ok(entry) => { latest.insert(entry.doc_id.clone(), entry); }
            Err(e) => tracing::warn!(line = lineno + 1, error = %e, "skipping unreadable metadata entry"),
        }
    }
    Ok(latest)
}

pub fn save_vector_model(paths: &IndexPaths, model: &VectorModel) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.vector_model())?;
    let bytes = bincode::serialize(model)?;
    f.write_all(&bytes)?;
    Ok(())
}

pub fn load_vector_model(paths: &IndexPaths) -> Result<VectorModel> {
    let mut f = File::open(paths.vector_model())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let model = bincode::deserialize(&buf)?;
    Ok(model)
}
