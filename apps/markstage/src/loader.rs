//! # Dataset Loading
//!
//! CSV bytes -> `RawTable` -> core schema adapter -> `ProductRecord`s.
//!
//! `DatasetCache` keeps the parsed records per source file, keyed by the
//! BLAKE3 hash of the file contents. A `load` re-reads the file and reuses
//! the parsed records when the bytes are unchanged; `invalidate` drops an
//! entry explicitly.

use markstage_core::{
    FieldAliases, MarkstageError, ProductRecord, RawTable, RecordFilter, SchemaError, SchemaKind,
    StageMetric, StageMetricsBuilder,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// =============================================================================
// FILE LIMITS
// =============================================================================

/// Maximum dataset file size (100 MB).
const MAX_DATA_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Resolve a data path and check it is a readable regular file.
fn validate_data_path(path: &Path) -> Result<PathBuf, MarkstageError> {
    let canonical = path.canonicalize().map_err(|e| {
        MarkstageError::IoError(format!("Invalid data path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(MarkstageError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    let size = std::fs::metadata(&canonical)
        .map_err(|e| MarkstageError::IoError(format!("Cannot read file metadata: {}", e)))?
        .len();
    if size > MAX_DATA_FILE_SIZE {
        return Err(MarkstageError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            size, MAX_DATA_FILE_SIZE
        )));
    }

    Ok(canonical)
}

// =============================================================================
// SCHEMA CHOICE
// =============================================================================

/// Which adapter to use: a fixed layout or detection from the headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaChoice {
    #[default]
    Auto,
    Wide,
    Long,
}

impl SchemaChoice {
    /// The concrete layout for `table`.
    pub fn resolve(self, table: &RawTable, aliases: &FieldAliases) -> SchemaKind {
        match self {
            SchemaChoice::Auto => SchemaKind::detect(table, aliases),
            SchemaChoice::Wide => SchemaKind::Wide,
            SchemaChoice::Long => SchemaKind::Long,
        }
    }
}

impl std::str::FromStr for SchemaChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(SchemaChoice::Auto),
            "wide" => Ok(SchemaChoice::Wide),
            "long" => Ok(SchemaChoice::Long),
            other => Err(format!("unknown schema '{}'. Use: auto, wide, long", other)),
        }
    }
}

// =============================================================================
// CSV -> RAW TABLE
// =============================================================================

/// Read CSV into a raw table. Cells are kept verbatim.
///
/// Rows with a different cell count are passed through; the adapters
/// report them with their row number. A data cell that is not valid UTF-8
/// is a schema error naming its row and column. Header cells are decoded
/// lossily, so a garbled header simply fails to resolve.
pub fn read_table<R: Read>(reader: R) -> Result<RawTable, MarkstageError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .byte_headers()
        .map_err(|e| MarkstageError::SerializationError(format!("CSV header: {}", e)))?
        .iter()
        .map(|cell| String::from_utf8_lossy(cell).into_owned())
        .collect();

    let mut rows = Vec::new();
    for (idx, result) in csv_reader.byte_records().enumerate() {
        let row = idx + 1;
        let record = result.map_err(|e| {
            MarkstageError::SerializationError(format!("CSV row {}: {}", row, e))
        })?;
        let cells = record
            .iter()
            .enumerate()
            .map(|(col, cell)| match std::str::from_utf8(cell) {
                Ok(text) => Ok(text.to_string()),
                Err(_) => Err(SchemaError::NotText {
                    row,
                    column: headers
                        .get(col)
                        .cloned()
                        .unwrap_or_else(|| format!("#{}", col + 1)),
                }),
            })
            .collect::<Result<Vec<String>, SchemaError>>()?;
        rows.push(cells);
    }

    Ok(RawTable::new(headers, rows))
}

/// Parse CSV bytes into validated records.
pub fn parse_records(
    bytes: &[u8],
    choice: SchemaChoice,
    aliases: &FieldAliases,
) -> Result<(SchemaKind, Vec<ProductRecord>), MarkstageError> {
    let table = read_table(bytes)?;
    let kind = choice.resolve(&table, aliases);
    let records = kind.normalize(&table, aliases)?;
    Ok((kind, records))
}

// =============================================================================
// DATASET
// =============================================================================

/// One parsed snapshot of a source file.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub source: PathBuf,
    /// BLAKE3 hex digest of the file bytes.
    pub fingerprint: String,
    pub schema: SchemaKind,
    pub records: Vec<ProductRecord>,
}

/// What the dataset contains, for status output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub source: String,
    pub fingerprint: String,
    pub schema: SchemaKind,
    pub products: usize,
    pub categories: Vec<String>,
    pub seasons: Vec<String>,
}

impl Dataset {
    #[must_use]
    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            source: self.source.to_string_lossy().into_owned(),
            fingerprint: self.fingerprint.clone(),
            schema: self.schema,
            products: self.records.len(),
            categories: RecordFilter::categories(&self.records),
            seasons: RecordFilter::seasons(&self.records),
        }
    }

    /// Stage metrics of the records that pass `filter`.
    ///
    /// A filter that keeps nothing is `EmptyInput`.
    pub fn metrics(&self, filter: &RecordFilter) -> Result<Vec<StageMetric>, MarkstageError> {
        let records = filter.apply(&self.records);
        if records.is_empty() {
            return Err(MarkstageError::EmptyInput("the selected category and season"));
        }
        StageMetricsBuilder::build_parallel(&records)
    }
}

// =============================================================================
// DATASET CACHE
// =============================================================================

/// Hit and miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Read-through cache of parsed datasets.
///
/// Each requested path is canonicalized once, on its first successful
/// `load`. `get` and `invalidate` use that stored key and never touch the
/// filesystem, so a snapshot outlives its source file.
#[derive(Debug)]
pub struct DatasetCache {
    aliases: FieldAliases,
    schema: SchemaChoice,
    keys: BTreeMap<PathBuf, PathBuf>,
    entries: BTreeMap<PathBuf, Arc<Dataset>>,
    stats: CacheStats,
}

impl DatasetCache {
    #[must_use]
    pub fn new(aliases: FieldAliases, schema: SchemaChoice) -> Self {
        Self {
            aliases,
            schema,
            keys: BTreeMap::new(),
            entries: BTreeMap::new(),
            stats: CacheStats::default(),
        }
    }

    /// The cached snapshot for `path`, without touching the file.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<Arc<Dataset>> {
        let key = self.keys.get(path)?;
        self.entries.get(key).cloned()
    }

    /// Read `path` and return its dataset.
    ///
    /// The file is always read and hashed. Parsing is skipped when the hash
    /// matches the cached entry.
    pub fn load(&mut self, path: &Path) -> Result<Arc<Dataset>, MarkstageError> {
        let key = validate_data_path(path)?;
        self.keys.insert(path.to_path_buf(), key.clone());
        let bytes = std::fs::read(&key)
            .map_err(|e| MarkstageError::IoError(format!("Read '{}': {}", key.display(), e)))?;
        let fingerprint = blake3::hash(&bytes).to_hex().to_string();

        match self.entries.get(&key) {
            Some(cached) if cached.fingerprint == fingerprint => {
                self.stats.hits += 1;
                tracing::debug!(source = %key.display(), "dataset cache hit");
                return Ok(Arc::clone(cached));
            }
            _ => {}
        }

        self.stats.misses += 1;
        let (schema, records) = parse_records(&bytes, self.schema, &self.aliases)?;
        tracing::info!(
            source = %key.display(),
            schema = ?schema,
            products = records.len(),
            fingerprint = %fingerprint,
            "dataset loaded"
        );

        let dataset = Arc::new(Dataset {
            source: key.clone(),
            fingerprint,
            schema,
            records,
        });
        self.entries.insert(key, Arc::clone(&dataset));
        Ok(dataset)
    }

    /// Drop the entry for `path`. Returns whether one existed.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        let Some(key) = self.keys.get(path) else {
            return false;
        };
        let removed = self.entries.remove(key).is_some();
        if removed {
            tracing::info!(source = %key.display(), "dataset cache entry invalidated");
        }
        removed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
