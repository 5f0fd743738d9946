//! File-backed [`TokenCache`] so several processes can share one token.
//!
//! The file is the only source of truth: every read loads it again, and every mutation reloads,
//! applies its change, and atomically replaces it. A token written by one instance is therefore
//! visible to every other instance opened on the same path, and writers never erase keys they
//! did not touch.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
	process,
};
// self
use crate::{
	_prelude::*,
	cache::{CacheEntry, CacheError, CacheFuture, CacheKey, TokenCache},
};

type Entries = HashMap<CacheKey, CacheEntry>;

/// JSON file holding one entry per [`CacheKey`].
#[derive(Clone, Debug)]
pub struct FileCache {
	path: PathBuf,
	write_lock: Arc<Mutex<()>>,
}
impl FileCache {
	/// Opens (or creates the directory for) a cache at `path`.
	///
	/// An existing file is parsed once so a corrupted cache is reported up front.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
		let path = path.into();

		ensure_parent_exists(&path)?;
		read_entries(&path)?;

		Ok(Self { path, write_lock: Arc::new(Mutex::new(())) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn update<T>(&self, apply: impl FnOnce(&mut Entries) -> (T, bool)) -> Result<T, CacheError> {
		let _guard = self.write_lock.lock();
		let mut entries = read_entries(&self.path)?;
		let (outcome, changed) = apply(&mut entries);

		if changed {
			write_entries(&self.path, &entries)?;
		}

		Ok(outcome)
	}
}
impl TokenCache for FileCache {
	fn get<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, Option<CacheEntry>> {
		Box::pin(async move { Ok(read_entries(&self.path)?.remove(key)) })
	}

	fn put<'a>(&'a self, key: &'a CacheKey, entry: CacheEntry) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			self.update(|entries| {
				entries.insert(key.to_owned(), entry);

				((), true)
			})
		})
	}

	fn forget<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, bool> {
		Box::pin(async move {
			self.update(|entries| {
				let removed = entries.remove(key).is_some();

				(removed, removed)
			})
		})
	}

	fn flush(&self) -> CacheFuture<'_, ()> {
		Box::pin(async move {
			self.update(|entries| {
				entries.clear();

				((), true)
			})
		})
	}
}

fn read_entries(path: &Path) -> Result<Entries, CacheError> {
	if !path.exists() {
		return Ok(HashMap::new());
	}

	let bytes = fs::read(path).map_err(|e| CacheError::Backend {
		message: format!("Failed to read {}: {e}", path.display()),
	})?;

	if bytes.iter().all(u8::is_ascii_whitespace) {
		return Ok(HashMap::new());
	}

	serde_json::from_slice(&bytes).map_err(|e| CacheError::Serialization {
		message: format!("Failed to parse {}: {e}", path.display()),
	})
}

fn write_entries(path: &Path, entries: &Entries) -> Result<(), CacheError> {
	ensure_parent_exists(path)?;

	let serialized = serde_json::to_vec_pretty(entries).map_err(|e| CacheError::Serialization {
		message: format!("Failed to serialize cache entries: {e}"),
	})?;
	// One scratch file per process so concurrent writers never share it.
	let tmp_path = path.with_extension(format!("{}.tmp", process::id()));
	let mut file = File::create(&tmp_path).map_err(|e| CacheError::Backend {
		message: format!("Failed to create {}: {e}", tmp_path.display()),
	})?;

	file.write_all(&serialized).and_then(|()| file.sync_all()).map_err(|e| {
		CacheError::Backend { message: format!("Failed to write {}: {e}", tmp_path.display()) }
	})?;
	fs::rename(&tmp_path, path).map_err(|e| CacheError::Backend {
		message: format!("Failed to replace {}: {e}", path.display()),
	})
}

fn ensure_parent_exists(path: &Path) -> Result<(), CacheError> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(|e| CacheError::Backend {
			message: format!("Failed to create cache directory {}: {e}", parent.display()),
		})?;
	}

	Ok(())
}
