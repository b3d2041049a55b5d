// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Durable key-value storage for the handful of settings that survive a
//! reload: the opt-out flag and experiment variant assignments.
//!
//! The browser equivalent is localStorage. Native hosts get a JSON file
//! in the XDG state directory; hosts with their own storage (or tests)
//! plug in [`MemorySettingStore`] or their own [`SettingStore`] impl.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::{Result, TelemetryError};

/// Durable string-to-string storage.
///
/// Implementations must tolerate concurrent access from one process;
/// cross-process coordination is not required.
pub trait SettingStore: Send + Sync {
	/// Reads a value, `None` if absent.
	fn get(&self, key: &str) -> Result<Option<String>>;
	/// Writes a value, replacing any existing one.
	fn set(&self, key: &str, value: &str) -> Result<()>;
	/// Deletes a key; deleting an absent key is not an error.
	fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory store; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemorySettingStore {
	entries: Mutex<HashMap<String, String>>,
}

impl MemorySettingStore {
	pub fn new() -> Self {
		Self::default()
	}
}

impl SettingStore for MemorySettingStore {
	fn get(&self, key: &str) -> Result<Option<String>> {
		Ok(self.entries.lock().expect("store lock").get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<()> {
		self
			.entries
			.lock()
			.expect("store lock")
			.insert(key.to_string(), value.to_string());
		Ok(())
	}

	fn remove(&self, key: &str) -> Result<()> {
		self.entries.lock().expect("store lock").remove(key);
		Ok(())
	}
}

/// File-backed store: a single JSON object of string values.
///
/// The file is small (a few keys), so every operation reads and rewrites
/// it whole. Writes go through a temp file and rename so a crash mid-write
/// cannot leave a torn file behind.
#[derive(Debug)]
pub struct FileSettingStore {
	path: PathBuf,
	// Serializes read-modify-write cycles within this process.
	write_lock: Mutex<()>,
}

impl FileSettingStore {
	/// Creates a store at an explicit path.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			write_lock: Mutex::new(()),
		}
	}

	/// Creates a store at the default XDG state path:
	/// `$XDG_STATE_HOME/loom/telemetry-settings.json`
	/// (or `~/.local/state/loom/telemetry-settings.json`).
	pub fn at_default_path() -> Result<Self> {
		Ok(Self::new(Self::default_path()?))
	}

	fn default_path() -> Result<PathBuf> {
		let state_home = std::env::var_os("XDG_STATE_HOME")
			.map(PathBuf::from)
			.or_else(|| dirs::home_dir().map(|home| home.join(".local/state")))
			.ok_or(TelemetryError::HomeDirNotFound)?;
		Ok(state_home.join("loom").join("telemetry-settings.json"))
	}

	fn load(&self) -> Result<HashMap<String, String>> {
		match fs::read(&self.path) {
			Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
			Err(err) => Err(err.into()),
		}
	}

	fn save(&self, entries: &HashMap<String, String>) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent)?;
		}
		let tmp = self.path.with_extension("json.tmp");
		fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
		fs::rename(&tmp, &self.path)?;
		Ok(())
	}
}

impl SettingStore for FileSettingStore {
	fn get(&self, key: &str) -> Result<Option<String>> {
		Ok(self.load()?.get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<()> {
		let _guard = self.write_lock.lock().expect("store lock");
		let mut entries = self.load()?;
		entries.insert(key.to_string(), value.to_string());
		self.save(&entries)
	}

	fn remove(&self, key: &str) -> Result<()> {
		let _guard = self.write_lock.lock().expect("store lock");
		let mut entries = self.load()?;
		if entries.remove(key).is_some() {
			self.save(&entries)?;
		}
		Ok(())
	}
}
