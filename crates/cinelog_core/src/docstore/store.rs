use super::lock::lock_for;
use super::{Document, StoreError, StoreResult, ID_FIELD};
use log::{error, info, warn};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Collection of `D` documents persisted as one JSON array file.
///
/// Cloning is cheap; clones share the per-file lock.
pub struct DocumentStore<D> {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
    _kind: PhantomData<fn() -> D>,
}

impl<D> Clone for DocumentStore<D> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            lock: Arc::clone(&self.lock),
            _kind: PhantomData,
        }
    }
}

impl<D: Document> DocumentStore<D> {
    /// Opens the store at `path`, creating `[]` there if the file is missing.
    ///
    /// # Errors
    /// - Returns [`StoreError::Io`] when the file or its parent directory
    ///   cannot be created or resolved.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let requested = path.as_ref();
        let created = ensure_file(requested)?;
        let canonical = fs::canonicalize(requested).map_err(|err| io_error(requested, err))?;
        info!(
            "event=doc_store_init module=docstore status=ok kind={} created={} path={}",
            D::KIND,
            created,
            canonical.display()
        );
        Ok(Self {
            lock: lock_for(&canonical),
            path: canonical,
            _kind: PhantomData,
        })
    }

    /// Canonical path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the backing file with an empty array if it does not exist.
    ///
    /// Never touches an existing file.
    pub fn ensure_initialized(&self) -> StoreResult<()> {
        ensure_file(&self.path).map(|_| ())
    }

    /// Appends `document` and returns its id.
    ///
    /// # Errors
    /// - [`StoreError::InvalidDocument`] when the serialized form has no
    ///   non-empty `id` matching [`Document::document_id`].
    /// - [`StoreError::DuplicateId`] when the id is already stored.
    /// - [`StoreError::Io`] / [`StoreError::Corrupt`] on file failures.
    pub fn add(&self, document: &D) -> StoreResult<String> {
        let value = serde_json::to_value(document)
            .map_err(|err| StoreError::InvalidDocument(err.to_string()))?;
        let id = match value_id(&value) {
            Some(id) if !id.trim().is_empty() => id,
            _ => {
                return Err(StoreError::InvalidDocument(format!(
                    "{} document requires a non-empty `{ID_FIELD}`",
                    D::KIND
                )))
            }
        };
        if id != document.document_id() {
            return Err(StoreError::InvalidDocument(format!(
                "serialized `{ID_FIELD}` `{id}` differs from document id `{}`",
                document.document_id()
            )));
        }

        self.modify("add", |documents| {
            if documents
                .iter()
                .any(|existing| value_id(existing).as_deref() == Some(id.as_str()))
            {
                return Err(StoreError::DuplicateId(id.clone()));
            }
            documents.push(value);
            Ok((id.clone(), true))
        })
    }

    /// Returns every decodable document in insertion order.
    ///
    /// An unreadable or corrupt file yields an empty vector.
    pub fn get_all(&self) -> Vec<D> {
        self.read_lenient()
            .into_iter()
            .filter_map(|value| self.decode_lenient(value))
            .collect()
    }

    /// Returns the first document whose `id` equals `id` as a string.
    pub fn get_by_id(&self, id: &str) -> Option<D> {
        self.read_lenient()
            .into_iter()
            .find(|value| value_id(value).as_deref() == Some(id))
            .and_then(|value| self.decode_lenient(value))
    }

    /// Looks up many ids with a single file scan.
    pub fn get_many(&self, ids: &[String]) -> HashMap<String, D> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut found = HashMap::with_capacity(wanted.len());
        for value in self.read_lenient() {
            let Some(id) = value_id(&value) else {
                continue;
            };
            if !wanted.contains(id.as_str()) || found.contains_key(&id) {
                continue;
            }
            if let Some(document) = self.decode_lenient(value) {
                found.insert(id, document);
            }
        }
        found
    }

    /// Returns the ids of all stored documents.
    pub fn ids(&self) -> Vec<String> {
        self.read_lenient().iter().filter_map(value_id).collect()
    }

    /// Shallow-merges `fields` into the document with `id`.
    ///
    /// Returns `false` when no such document exists. The file is rewritten
    /// only when the merge changes something.
    ///
    /// # Errors
    /// - [`StoreError::InvalidDocument`] when `fields` changes `id` or the
    ///   merged document no longer decodes as `D`.
    pub fn update_fields(&self, id: &str, fields: Map<String, Value>) -> StoreResult<bool> {
        if let Some(new_id) = fields.get(ID_FIELD) {
            if id_text(new_id).as_deref() != Some(id) {
                return Err(StoreError::InvalidDocument(format!(
                    "`{ID_FIELD}` of {} document `{id}` is immutable",
                    D::KIND
                )));
            }
        }

        self.modify("update_fields", |documents| {
            let Some(existing) = find_mut(documents, id) else {
                return Ok((false, false));
            };
            let Value::Object(current) = existing else {
                return Ok((false, false));
            };
            let mut merged = current.clone();
            merged.extend(fields);
            let merged = Value::Object(merged);
            serde_json::from_value::<D>(merged.clone()).map_err(|err| {
                StoreError::InvalidDocument(format!(
                    "{} document `{id}` would not decode after update: {err}",
                    D::KIND
                ))
            })?;

            let changed = *existing != merged;
            *existing = merged;
            Ok((true, changed))
        })
    }

    /// Applies a typed mutation to the document with `id`.
    ///
    /// `apply` returns whether it changed the document. Returns `None` when
    /// the document does not exist, otherwise `Some(changed)`.
    pub fn update_with(
        &self,
        id: &str,
        apply: impl FnOnce(&mut D) -> bool,
    ) -> StoreResult<Option<bool>> {
        self.modify("update_with", |documents| {
            let Some(existing) = find_mut(documents, id) else {
                return Ok((None, false));
            };
            let mut document: D = serde_json::from_value(existing.clone()).map_err(|err| {
                StoreError::InvalidDocument(format!(
                    "stored {} document `{id}` does not decode: {err}",
                    D::KIND
                ))
            })?;
            if !apply(&mut document) {
                return Ok((Some(false), false));
            }

            let value = serde_json::to_value(&document)
                .map_err(|err| StoreError::InvalidDocument(err.to_string()))?;
            if value_id(&value).as_deref() != Some(id) {
                return Err(StoreError::InvalidDocument(format!(
                    "`{ID_FIELD}` of {} document `{id}` is immutable",
                    D::KIND
                )));
            }
            *existing = value;
            Ok((Some(true), true))
        })
    }

    /// Removes the document with `id`. Returns whether the array shrank.
    pub fn remove(&self, id: &str) -> StoreResult<bool> {
        self.remove_many(&[id.to_string()]).map(|removed| removed > 0)
    }

    /// Removes every document whose id is in `ids` with one rewrite.
    pub fn remove_many(&self, ids: &[String]) -> StoreResult<usize> {
        let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
        self.modify("remove", |documents| {
            let before = documents.len();
            documents.retain(|value| {
                value_id(value)
                    .map(|id| !doomed.contains(id.as_str()))
                    .unwrap_or(true)
            });
            let removed = before - documents.len();
            Ok((removed, removed > 0))
        })
    }

    /// Runs one read-modify-write cycle under the per-file lock.
    ///
    /// `apply` returns the operation output and whether the array is dirty.
    fn modify<T>(
        &self,
        operation: &'static str,
        apply: impl FnOnce(&mut Vec<Value>) -> StoreResult<(T, bool)>,
    ) -> StoreResult<T> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let result = self.read_strict().and_then(|mut documents| {
            let (output, dirty) = apply(&mut documents)?;
            if dirty {
                self.write_atomic(&documents)?;
            }
            Ok(output)
        });

        if let Err(err) = &result {
            match err {
                StoreError::Io { .. } | StoreError::Corrupt { .. } => error!(
                    "event=doc_store_write module=docstore status=error kind={} op={} error_code={} path={}",
                    D::KIND,
                    operation,
                    err.code(),
                    self.path.display()
                ),
                _ => warn!(
                    "event=doc_store_write module=docstore status=rejected kind={} op={} error_code={}",
                    D::KIND,
                    operation,
                    err.code()
                ),
            }
        }
        result
    }

    fn read_strict(&self) -> StoreResult<Vec<Value>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_error(&self.path, err)),
        };
        parse_array(&raw).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn read_lenient(&self) -> Vec<Value> {
        match self.read_strict() {
            Ok(documents) => documents,
            Err(err) => {
                warn!(
                    "event=doc_store_read module=docstore status=degraded kind={} error_code={} path={}",
                    D::KIND,
                    err.code(),
                    self.path.display()
                );
                Vec::new()
            }
        }
    }

    fn decode_lenient(&self, value: Value) -> Option<D> {
        let id = value_id(&value).unwrap_or_default();
        match serde_json::from_value(value) {
            Ok(document) => Some(document),
            Err(_) => {
                warn!(
                    "event=doc_store_read module=docstore status=skipped kind={} id={} error_code=undecodable_document",
                    D::KIND,
                    id
                );
                None
            }
        }
    }

    fn write_atomic(&self, documents: &[Value]) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(documents)
            .map_err(|err| StoreError::InvalidDocument(err.to_string()))?;
        let tmp_path = tmp_path_for(&self.path);

        let mut file = File::create(&tmp_path).map_err(|err| io_error(&tmp_path, err))?;
        file.write_all(&bytes)
            .and_then(|()| file.sync_all())
            .map_err(|err| io_error(&tmp_path, err))?;
        drop(file);

        fs::rename(&tmp_path, &self.path).map_err(|err| {
            let _ = fs::remove_file(&tmp_path);
            io_error(&self.path, err)
        })
    }
}

fn ensure_file(path: &Path) -> StoreResult<bool> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| io_error(parent, err))?;
    }
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            file.write_all(b"[]")
                .and_then(|()| file.sync_all())
                .map_err(|err| io_error(path, err))?;
            Ok(true)
        }
        Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(err) => Err(io_error(path, err)),
    }
}

fn parse_array(raw: &str) -> Result<Vec<Value>, serde_json::Error> {
    // A writer may have been interrupted between create and first write.
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw)
}

fn find_mut<'a>(documents: &'a mut [Value], id: &str) -> Option<&'a mut Value> {
    documents
        .iter_mut()
        .find(|value| value_id(value).as_deref() == Some(id))
}

fn value_id(value: &Value) -> Option<String> {
    value.get(ID_FIELD).and_then(id_text)
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("store"));
    name.push(".tmp");
    path.with_file_name(name)
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_array, tmp_path_for, value_id};
    use serde_json::json;
    use std::path::Path;

    #[test]
    fn ids_compare_as_strings() {
        assert_eq!(value_id(&json!({"id": "a1"})).as_deref(), Some("a1"));
        assert_eq!(value_id(&json!({"id": 42})).as_deref(), Some("42"));
        assert_eq!(value_id(&json!({"id": null})), None);
        assert_eq!(value_id(&json!(["id"])), None);
    }

    #[test]
    fn blank_file_parses_as_empty_array() {
        assert!(parse_array("").unwrap().is_empty());
        assert!(parse_array("  \n").unwrap().is_empty());
        assert!(parse_array("[{").is_err());
        assert!(parse_array("{\"id\": \"x\"}").is_err());
    }

    #[test]
    fn tmp_file_sits_next_to_store_file() {
        assert_eq!(
            tmp_path_for(Path::new("/data/storage_article.json")),
            Path::new("/data/storage_article.json.tmp")
        );
    }
}
