//! Flat JSON-file invoice storage.
//!
//! One pretty-printed JSON file per invoice under a data directory. The
//! interesting part is [`InvoiceStore::update`]: a versioned read-modify-write
//! that refuses to apply against a stale copy, which is what keeps the
//! paid-marking transition from firing twice when two verification calls
//! race on the same invoice.

use std::fs;
use std::path::{Path, PathBuf};

use crate::invoice::Invoice;

/// Storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invoice {0:?} not found")]
    NotFound(String),
    #[error("Invalid invoice number {0:?}")]
    InvalidNumber(String),
    #[error("Failed to access {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse invoice file: {0}")]
    Json(#[from] serde_json::Error),
    /// The invoice changed underneath a versioned update.
    #[error("Invoice {number:?} changed concurrently (expected version {expected}, found {actual})")]
    VersionConflict {
        number: String,
        expected: u64,
        actual: u64,
    },
}

/// Narrow persistence interface the rest of the application depends on.
///
/// The verification core never touches files directly; it only needs load
/// plus a versioned update. The remaining methods serve the CRUD surface.
pub trait InvoiceStore {
    fn load(&self, number: &str) -> Result<Invoice, StorageError>;
    fn save(&self, invoice: &Invoice) -> Result<(), StorageError>;
    fn list(&self) -> Result<Vec<Invoice>, StorageError>;
    fn delete(&self, number: &str) -> Result<(), StorageError>;

    /// Applies `apply` to the stored invoice if its version still equals
    /// `expected_version`, bumping the version in the same write.
    ///
    /// Returns the updated invoice. Fails with
    /// [`StorageError::VersionConflict`] if another writer got there first.
    fn update<F>(
        &self,
        number: &str,
        expected_version: u64,
        apply: F,
    ) -> Result<Invoice, StorageError>
    where
        F: FnOnce(&mut Invoice);
}

/// [`InvoiceStore`] backed by one JSON file per invoice.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `dir`. The directory is created lazily on
    /// the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonFileStore { dir: dir.into() }
    }

    fn path_for(&self, number: &str) -> Result<PathBuf, StorageError> {
        // Invoice numbers become file names; anything path-like is refused.
        let valid = !number.is_empty()
            && number
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidNumber(number.to_string()));
        }
        Ok(self.dir.join(format!("{number}.json")))
    }

    fn read(&self, path: &Path, number: &str) -> Result<Invoice, StorageError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(number.to_string()));
            }
            Err(e) => return Err(StorageError::Io(path.to_path_buf(), e)),
        };
        let invoice = serde_json::from_str(&content)?;
        Ok(invoice)
    }

    fn write(&self, path: &Path, invoice: &Invoice) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|e| StorageError::Io(self.dir.clone(), e))?;
        let content = serde_json::to_string_pretty(invoice)?;
        fs::write(path, content).map_err(|e| StorageError::Io(path.to_path_buf(), e))
    }
}

impl InvoiceStore for JsonFileStore {
    fn load(&self, number: &str) -> Result<Invoice, StorageError> {
        let path = self.path_for(number)?;
        self.read(&path, number)
    }

    fn save(&self, invoice: &Invoice) -> Result<(), StorageError> {
        let path = self.path_for(&invoice.number)?;
        self.write(&path, invoice)
    }

    fn list(&self) -> Result<Vec<Invoice>, StorageError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Io(self.dir.clone(), e)),
        };
        let mut invoices = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::Io(self.dir.clone(), e))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let content =
                fs::read_to_string(&path).map_err(|e| StorageError::Io(path.clone(), e))?;
            let invoice: Invoice = serde_json::from_str(&content)?;
            invoices.push(invoice);
        }
        invoices.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(invoices)
    }

    fn delete(&self, number: &str) -> Result<(), StorageError> {
        let path = self.path_for(number)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(number.to_string()))
            }
            Err(e) => Err(StorageError::Io(path, e)),
        }
    }

    fn update<F>(
        &self,
        number: &str,
        expected_version: u64,
        apply: F,
    ) -> Result<Invoice, StorageError>
    where
        F: FnOnce(&mut Invoice),
    {
        let path = self.path_for(number)?;
        let mut invoice = self.read(&path, number)?;
        if invoice.version != expected_version {
            return Err(StorageError::VersionConflict {
                number: number.to_string(),
                expected: expected_version,
                actual: invoice.version,
            });
        }
        apply(&mut invoice);
        invoice.version += 1;
        self.write(&path, &invoice)?;
        Ok(invoice)
    }
}
