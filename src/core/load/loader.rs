//! Concurrent bulk loader
//!
//! Documents are striped into sub-lists of bounded size. Sub-lists run one after
//! another; the chunks of a sub-list run concurrently, each on its own store
//! handle. Store errors never escape [`BulkLoader::load`]; they become failures
//! of the chunk that raised them.

use super::outcome::LoadOutcome;
use crate::adapters::store::{DocumentStore, InsertedDocument, StoreConnector};
use crate::domain::{CifdbError, Document, KeyPath, KeyTuple, Result};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

/// How the target collection is prepared before inserting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Drop and recreate the collection, then insert
    #[default]
    Full,
    /// Create the collection if missing, then insert
    Append,
    /// Delete documents sharing a key with the input, then insert
    Replace,
}

impl LoadMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadMode::Full => "full",
            LoadMode::Append => "append",
            LoadMode::Replace => "replace",
        }
    }
}

impl FromStr for LoadMode {
    type Err = CifdbError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(LoadMode::Full),
            "append" => Ok(LoadMode::Append),
            "replace" => Ok(LoadMode::Replace),
            other => Err(CifdbError::Configuration(format!(
                "Invalid load mode '{other}'. Must be one of: full, append, replace"
            ))),
        }
    }
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target database and collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTarget {
    pub database: String,
    pub collection: String,
}

impl LoadTarget {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for LoadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Loader tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Upper bound on the length of one sub-list
    pub max_step_length: usize,
    /// Documents per worker task; 0 spreads a sub-list evenly over the workers
    pub chunk_size: usize,
    /// Worker pool size
    pub concurrency: usize,
    /// Load only the first N documents
    pub document_limit: Option<usize>,
    /// Re-fetch every inserted document and compare it with the input
    pub read_back_check: bool,
    /// Log the plan and report success without touching the store
    pub dry_run: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_step_length: 2000,
            chunk_size: 15,
            concurrency: 4,
            document_limit: None,
            read_back_check: false,
            dry_run: false,
        }
    }
}

/// Splits `indices` into `ceil(len / max_step)` striped sub-lists
pub fn stripe_sub_lists(indices: &[usize], max_step_length: usize) -> Vec<Vec<usize>> {
    if indices.is_empty() {
        return Vec::new();
    }
    let step = max_step_length.max(1);
    let count = indices.len().div_ceil(step);
    (0..count)
        .map(|offset| indices.iter().skip(offset).step_by(count).copied().collect())
        .collect()
}

/// Splits one sub-list into worker chunks
pub fn chunk_sub_list(sub_list: &[usize], chunk_size: usize, concurrency: usize) -> Vec<Vec<usize>> {
    if sub_list.is_empty() {
        return Vec::new();
    }
    let size = if chunk_size > 0 && chunk_size < sub_list.len() {
        chunk_size
    } else {
        sub_list.len().div_ceil(concurrency.max(1))
    };
    sub_list.chunks(size.max(1)).map(<[usize]>::to_vec).collect()
}

/// Key tuple to input index, restricted to the documents being loaded
struct KeyIndex {
    paths: Vec<KeyPath>,
    index: HashMap<KeyTuple, usize>,
}

/// Concurrent bulk loader
pub struct BulkLoader {
    connector: Arc<dyn StoreConnector>,
    options: LoadOptions,
}

impl BulkLoader {
    pub fn new(connector: Arc<dyn StoreConnector>, options: LoadOptions) -> Self {
        Self { connector, options }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Load documents into the target collection
    ///
    /// # Arguments
    ///
    /// * `target` - Database and collection
    /// * `mode` - Collection preparation mode
    /// * `documents` - Documents to insert
    /// * `index_attributes` - Dot-notation paths for the collection index; defaults to `key_names`
    /// * `key_names` - Dot-notation document key used for replace and reconciliation
    ///
    /// # Returns
    ///
    /// The outcome of the load. Errors are logged and reported as failures of
    /// every affected document, never returned.
    pub async fn load(
        &self,
        target: &LoadTarget,
        mode: LoadMode,
        documents: &[Document],
        index_attributes: Option<&[String]>,
        key_names: Option<&[String]>,
    ) -> LoadOutcome {
        let start = Instant::now();
        let documents = match self.options.document_limit {
            Some(limit) if limit < documents.len() => &documents[..limit],
            _ => documents,
        };
        tracing::info!(
            target = %target,
            mode = %mode,
            documents = documents.len(),
            store = %self.connector.describe(),
            "Starting bulk load"
        );

        let outcome = match self
            .try_load(target, mode, documents, index_attributes, key_names)
            .await
        {
            Ok(outcome) => outcome.finalize(),
            Err(e) => {
                tracing::error!(target = %target, error = %e, "Bulk load failed");
                LoadOutcome::failed(0..documents.len(), e.to_string())
            }
        };

        tracing::info!(
            target = %target,
            success = outcome.success,
            loaded = outcome.success_list.len(),
            failed = outcome.fail_list.len(),
            superseded = outcome.superseded.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Completed bulk load"
        );
        outcome
    }

    async fn try_load(
        &self,
        target: &LoadTarget,
        mode: LoadMode,
        documents: &[Document],
        index_attributes: Option<&[String]>,
        key_names: Option<&[String]>,
    ) -> Result<LoadOutcome> {
        let key_paths = parse_paths(key_names)?;
        let index_paths = match parse_paths(index_attributes)? {
            Some(paths) => Some(paths),
            None => key_paths.clone(),
        };
        if mode == LoadMode::Replace && key_paths.is_none() {
            return Err(CifdbError::Configuration(
                "Replace mode requires key paths".to_string(),
            ));
        }

        let mut outcome = LoadOutcome::new();
        let (keys, active) = self.build_key_index(mode, documents, key_paths, &mut outcome);

        if self.options.dry_run {
            let plan = stripe_sub_lists(&active, self.options.max_step_length);
            tracing::info!(
                target = %target,
                mode = %mode,
                documents = active.len(),
                sub_lists = plan.len(),
                "Dry run: skipping store writes"
            );
            active.iter().for_each(|&i| outcome.add_success(i));
            return Ok(outcome);
        }

        let store = self.connector.connect().await?;
        prepare_collection(store.as_ref(), target, mode, index_paths.as_deref()).await?;

        let sub_lists = stripe_sub_lists(&active, self.options.max_step_length);
        let sub_list_count = sub_lists.len();
        for (position, sub_list) in sub_lists.into_iter().enumerate() {
            let chunks =
                chunk_sub_list(&sub_list, self.options.chunk_size, self.options.concurrency);
            let workers = self.options.concurrency.max(1).min(chunks.len().max(1));
            crate::log_sub_list_progress!(position + 1, sub_list_count, sub_list.len(), chunks.len(), workers);

            let results: Vec<LoadOutcome> = stream::iter(chunks)
                .map(|chunk| self.load_chunk(target, mode, documents, chunk, keys.as_ref()))
                .buffer_unordered(workers)
                .collect()
                .await;
            results.into_iter().for_each(|r| outcome.merge(r));
        }
        Ok(outcome)
    }

    /// Maps key tuples to input indices and picks the documents to load
    ///
    /// In replace mode the last document of a key wins and earlier ones are
    /// superseded; other modes only warn about collisions.
    fn build_key_index(
        &self,
        mode: LoadMode,
        documents: &[Document],
        key_paths: Option<Vec<KeyPath>>,
        outcome: &mut LoadOutcome,
    ) -> (Option<KeyIndex>, Vec<usize>) {
        let Some(paths) = key_paths else {
            return (None, (0..documents.len()).collect());
        };

        let mut index = HashMap::with_capacity(documents.len());
        let mut missing = 0;
        let mut collisions = Vec::new();
        for (i, document) in documents.iter().enumerate() {
            let key = KeyTuple::from_document(document, &paths);
            if key.has_missing() {
                missing += 1;
            }
            if let Some(previous) = index.insert(key, i) {
                collisions.push(previous);
            }
        }

        if missing > 0 {
            tracing::warn!(missing, "Documents missing key path components");
        }
        if !collisions.is_empty() {
            tracing::warn!(
                collisions = collisions.len(),
                mode = %mode,
                "Input documents share key values"
            );
        }

        let active = if mode == LoadMode::Replace {
            let superseded: HashSet<usize> = collisions.iter().copied().collect();
            outcome.superseded.extend(collisions);
            (0..documents.len())
                .filter(|i| !superseded.contains(i))
                .collect()
        } else {
            (0..documents.len()).collect()
        };
        (Some(KeyIndex { paths, index }), active)
    }

    async fn load_chunk(
        &self,
        target: &LoadTarget,
        mode: LoadMode,
        documents: &[Document],
        chunk: Vec<usize>,
        keys: Option<&KeyIndex>,
    ) -> LoadOutcome {
        match self.try_load_chunk(target, mode, documents, &chunk, keys).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(
                    target = %target,
                    documents = chunk.len(),
                    error = %e,
                    "Chunk load failed"
                );
                LoadOutcome::failed(chunk, e.to_string())
            }
        }
    }

    async fn try_load_chunk(
        &self,
        target: &LoadTarget,
        mode: LoadMode,
        documents: &[Document],
        chunk: &[usize],
        keys: Option<&KeyIndex>,
    ) -> Result<LoadOutcome> {
        let store = self.connector.connect().await?;
        let batch: Vec<Document> = chunk.iter().map(|&i| documents[i].clone()).collect();

        if mode == LoadMode::Replace {
            if let Some(keys) = keys {
                let tuples: Vec<KeyTuple> = batch
                    .iter()
                    .map(|d| KeyTuple::from_document(d, &keys.paths))
                    .collect();
                let deleted = store
                    .delete_many(&target.database, &target.collection, &keys.paths, &tuples)
                    .await?;
                tracing::debug!(target = %target, deleted, "Deleted documents before replace");
            }
        }

        let inserted = store
            .insert_many(&target.database, &target.collection, &batch)
            .await?;

        let resolved = resolve_inserted(chunk, &inserted, keys);
        let mut outcome = LoadOutcome::new();
        match &resolved {
            Some(resolved) => {
                let confirmed: HashSet<usize> = resolved.iter().filter_map(|r| *r).collect();
                for &index in chunk {
                    if confirmed.contains(&index) {
                        outcome.add_success(index);
                    } else {
                        outcome.add_failure(index);
                    }
                }
                if confirmed.len() < chunk.len() {
                    tracing::warn!(
                        target = %target,
                        requested = chunk.len(),
                        confirmed = confirmed.len(),
                        "Insert confirmed fewer documents than requested"
                    );
                }
            }
            None => {
                tracing::warn!(
                    target = %target,
                    requested = chunk.len(),
                    confirmed = inserted.len(),
                    "Insert count mismatch without key paths; failing chunk"
                );
                chunk.iter().for_each(|&i| outcome.add_failure(i));
            }
        }

        if self.options.read_back_check {
            if let Some(resolved) = &resolved {
                for (copy, index) in inserted.iter().zip(resolved) {
                    let Some(index) = *index else { continue };
                    let fetched = store
                        .fetch_one(&target.database, &target.collection, &copy.id)
                        .await?;
                    if fetched.as_ref() != Some(&documents[index]) {
                        tracing::warn!(
                            target = %target,
                            id = %copy.id,
                            index,
                            "Read-back document differs from input"
                        );
                        outcome.add_read_back_mismatch(index);
                    }
                }
            }
        }
        Ok(outcome)
    }
}

fn parse_paths(names: Option<&[String]>) -> Result<Option<Vec<KeyPath>>> {
    match names {
        Some(names) if !names.is_empty() => KeyPath::parse_list(names)
            .map(Some)
            .map_err(CifdbError::Configuration),
        _ => Ok(None),
    }
}

/// Attributes each inserted copy to an input index
///
/// A full count match is positional. Otherwise the key tuple of each returned
/// copy is looked up in the key index, limited to this chunk. Returns `None`
/// when the counts differ and no key paths are available.
fn resolve_inserted(
    chunk: &[usize],
    inserted: &[InsertedDocument],
    keys: Option<&KeyIndex>,
) -> Option<Vec<Option<usize>>> {
    if inserted.len() == chunk.len() {
        return Some(chunk.iter().map(|&i| Some(i)).collect());
    }
    let keys = keys?;
    let members: HashSet<usize> = chunk.iter().copied().collect();
    Some(
        inserted
            .iter()
            .map(|copy| {
                keys.index
                    .get(&KeyTuple::from_document(&copy.document, &keys.paths))
                    .copied()
                    .filter(|i| members.contains(i))
            })
            .collect(),
    )
}

async fn prepare_collection(
    store: &dyn DocumentStore,
    target: &LoadTarget,
    mode: LoadMode,
    index_paths: Option<&[KeyPath]>,
) -> Result<()> {
    let (database, collection) = (target.database.as_str(), target.collection.as_str());
    match mode {
        LoadMode::Full => {
            store.drop_collection(database, collection).await?;
            store.create_collection(database, collection).await?;
        }
        LoadMode::Append | LoadMode::Replace => {
            let exists = store.database_exists(database).await?
                && store.collection_exists(database, collection).await?;
            if !exists {
                store.create_collection(database, collection).await?;
            }
        }
    }
    if let Some(paths) = index_paths {
        store.create_index(database, collection, paths, false).await?;
    }
    Ok(())
}
