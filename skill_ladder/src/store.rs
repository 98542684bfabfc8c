//! Persistent player profile.
//!
//! One JSON document holds every skill track:
//!
//! ```json
//! { "motor": { "level": 3, "tasksCompleted": 4, "lastScore": 70 } }
//! ```
//!
//! Older files used flat keys (`"motor-level": 3, "motor-tasks": 4`); those
//! are still read, and rewritten in the nested form on the next save.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_LEVEL: u32 = 2;

// ════════════════════════════════════════════════════════════════════════════
// SkillLevel / PlayerProfile
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillLevel {
    pub level:           u32,
    #[serde(default)]
    pub tasks_completed: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_score:      Option<u32>,
}

impl Default for SkillLevel {
    fn default() -> Self {
        SkillLevel { level: DEFAULT_LEVEL, tasks_completed: 0, last_score: None }
    }
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile is not valid JSON: {0}")]
    Corrupt(String),

    #[error("failed to read profile {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write profile {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Every track's skill level, keyed by track name.
///
/// Keys that are not readable tracks (other tools' data, a track with a bad
/// value) are carried through unchanged and written back on save.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlayerProfile {
    tracks: BTreeMap<String, SkillLevel>,
    extra:  Map<String, Value>,
}

impl PlayerProfile {
    pub fn new() -> Self {
        PlayerProfile::default()
    }

    pub fn from_json(text: &str) -> Result<Self, ProfileError> {
        let doc: Value = serde_json::from_str(text).map_err(|e| ProfileError::Corrupt(e.to_string()))?;
        let obj = doc.as_object()
            .ok_or_else(|| ProfileError::Corrupt("top level is not an object".into()))?;

        let mut profile = PlayerProfile::new();
        for (key, value) in obj {
            if value.is_object() {
                match serde_json::from_value::<SkillLevel>(value.clone()) {
                    Ok(skill) => {
                        profile.tracks.insert(key.clone(), skill);
                    }
                    Err(e) => {
                        warn!("track {:?} is unreadable ({}); leaving it as stored", key, e);
                        profile.extra.insert(key.clone(), value.clone());
                    }
                }
            } else if !is_legacy_key(key, value) {
                profile.extra.insert(key.clone(), value.clone());
            }
        }
        // Flat legacy keys fill in tracks the nested form does not define.
        for (key, value) in obj {
            let Some(n) = value.as_u64() else { continue };
            let n = u32::try_from(n).unwrap_or(u32::MAX);
            if let Some(track) = key.strip_suffix("-level") {
                if !obj.contains_key(track) {
                    profile.tracks.entry(track.to_string()).or_default().level = n;
                }
            } else if let Some(track) = key.strip_suffix("-tasks") {
                if !obj.contains_key(track) {
                    profile.tracks.entry(track.to_string()).or_default().tasks_completed = n;
                }
            }
        }
        Ok(profile)
    }

    pub fn to_json(&self) -> String {
        let mut doc = self.extra.clone();
        for (name, skill) in &self.tracks {
            if let Ok(value) = serde_json::to_value(skill) {
                doc.insert(name.clone(), value);
            }
        }
        serde_json::to_string_pretty(&Value::Object(doc)).unwrap_or_else(|_| "{}".into())
    }

    pub fn track(&self, name: &str) -> Option<SkillLevel> {
        self.tracks.get(name).copied()
    }

    pub fn set_track(&mut self, name: &str, skill: SkillLevel) {
        self.extra.remove(name);
        self.tracks.insert(name.to_string(), skill);
    }
}

fn is_legacy_key(key: &str, value: &Value) -> bool {
    value.is_u64() && (key.ends_with("-level") || key.ends_with("-tasks"))
}

// ════════════════════════════════════════════════════════════════════════════
// ProfileStore
// ════════════════════════════════════════════════════════════════════════════

pub trait ProfileStore: Send {
    /// `Ok(None)` when no profile has been saved yet.
    fn load(&self) -> Result<Option<PlayerProfile>, ProfileError>;

    /// Replace the stored profile. On error the previous profile is intact.
    fn save(&self, profile: &PlayerProfile) -> Result<(), ProfileError>;

    /// One track's level, falling back to defaults when the profile is
    /// missing or unreadable, and clamping levels outside `1..=max_level`.
    fn load_track(&self, track: &str, max_level: u32) -> SkillLevel {
        let stored = match self.load() {
            Ok(Some(p)) => p.track(track),
            Ok(None)    => None,
            Err(e) => {
                warn!("{}; starting {:?} from defaults", e, track);
                None
            }
        };
        let mut skill = stored.unwrap_or_default();
        let max_level = max_level.max(1);
        if !(1..=max_level).contains(&skill.level) {
            let fixed = skill.level.clamp(1, max_level);
            warn!("stored level {} for {:?} outside 1..={}, using {}", skill.level, track, max_level, fixed);
            skill.level = fixed;
        }
        skill
    }

    /// Read-modify-write of one track. A document that is not JSON at all is
    /// replaced; one that cannot be read is left alone and the save fails.
    fn save_track(&self, track: &str, skill: SkillLevel) -> Result<(), ProfileError> {
        let mut profile = match self.load() {
            Ok(p) => p.unwrap_or_default(),
            Err(e @ ProfileError::Corrupt(_)) => {
                warn!("{}; rewriting profile", e);
                PlayerProfile::new()
            }
            Err(e) => return Err(e),
        };
        profile.set_track(track, skill);
        self.save(&profile)?;
        debug!("saved {:?}: level {}, tasks {}", track, skill.level, skill.tasks_completed);
        Ok(())
    }
}

// ── JSON file ─────────────────────────────────────────────────────────────

/// Profile stored in a JSON file. Saves write a sibling temp file, fsync it,
/// then rename it over the target.
#[derive(Clone, Debug)]
pub struct JsonProfileStore {
    path: PathBuf,
}

impl JsonProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonProfileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path { &self.path }

    fn temp_path(&self) -> PathBuf {
        let name = self.path.file_name().map_or("profile".into(), |n| n.to_string_lossy().into_owned());
        self.path.with_file_name(format!(".{}.tmp", name))
    }

    fn write_replace(&self, text: &str) -> io::Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.temp_path();
        let result = (|| {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(text.as_bytes())?;
            f.sync_all()?;
            fs::rename(&tmp, &self.path)
        })();
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }
}

impl ProfileStore for JsonProfileStore {
    fn load(&self) -> Result<Option<PlayerProfile>, ProfileError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => PlayerProfile::from_json(&text).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ProfileError::Read { path: self.path.clone(), source }),
        }
    }

    fn save(&self, profile: &PlayerProfile) -> Result<(), ProfileError> {
        self.write_replace(&profile.to_json())
            .map_err(|source| ProfileError::Write { path: self.path.clone(), source })
    }
}

// ── in memory ─────────────────────────────────────────────────────────────

/// Profile kept in memory. Clones share the same document.
#[derive(Clone, Debug, Default)]
pub struct MemoryProfileStore {
    doc:         Arc<Mutex<Option<String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        MemoryProfileStore::default()
    }

    /// Store seeded with raw document text.
    pub fn with_document(text: &str) -> Self {
        let store = MemoryProfileStore::new();
        *store.lock() = Some(text.to_string());
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.doc.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Raw text of the last successful save.
    pub fn document(&self) -> Option<String> {
        self.lock().clone()
    }

    /// Make subsequent saves fail, as a full disk would.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load(&self) -> Result<Option<PlayerProfile>, ProfileError> {
        match self.lock().as_deref() {
            Some(text) => PlayerProfile::from_json(text).map(Some),
            None       => Ok(None),
        }
    }

    fn save(&self, profile: &PlayerProfile) -> Result<(), ProfileError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ProfileError::Write {
                path:   PathBuf::from("<memory>"),
                source: io::Error::new(io::ErrorKind::Other, "writes disabled"),
            });
        }
        *self.lock() = Some(profile.to_json());
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("skill_ladder_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir.join("profile.json")
    }

    #[test]
    fn missing_profile_uses_defaults() {
        let store = MemoryProfileStore::new();
        assert_eq!(store.load_track("motor", 5), SkillLevel { level: 2, tasks_completed: 0, last_score: None });
    }

    #[test]
    fn corrupt_profile_uses_defaults_and_is_replaced() {
        let store = MemoryProfileStore::with_document("{ not json");
        assert_eq!(store.load_track("motor", 5), SkillLevel::default());
        store.save_track("motor", SkillLevel { level: 3, tasks_completed: 1, last_score: None }).unwrap();
        assert_eq!(store.load_track("motor", 5).level, 3);
    }

    #[test]
    fn out_of_range_level_is_clamped() {
        let store = MemoryProfileStore::with_document(r#"{"motor":{"level":9,"tasksCompleted":2}}"#);
        let skill = store.load_track("motor", 5);
        assert_eq!(skill.level, 5);
        assert_eq!(skill.tasks_completed, 2);
        let zero = MemoryProfileStore::with_document(r#"{"motor":{"level":0}}"#);
        assert_eq!(zero.load_track("motor", 5).level, 1);
    }

    #[test]
    fn legacy_flat_keys_are_read() {
        let p = PlayerProfile::from_json(r#"{"motor-level":3,"motor-tasks":4,"memory":{"level":1}}"#).unwrap();
        assert_eq!(p.track("motor"), Some(SkillLevel { level: 3, tasks_completed: 4, last_score: None }));
        assert_eq!(p.track("memory").map(|s| s.level), Some(1));
        assert!(PlayerProfile::from_json("[1,2]").is_err());
    }

    #[test]
    fn save_track_keeps_other_tracks() {
        let store = MemoryProfileStore::with_document(r#"{"memory":{"level":4,"tasksCompleted":9}}"#);
        store.save_track("motor", SkillLevel { level: 3, tasks_completed: 4, last_score: Some(70) }).unwrap();
        let p = store.load().unwrap().unwrap();
        assert_eq!(p.track("memory").map(|s| s.tasks_completed), Some(9));
        assert_eq!(p.track("motor").and_then(|s| s.last_score), Some(70));
        let doc = store.document().unwrap();
        assert!(doc.contains("\"tasksCompleted\": 4"));
        assert!(doc.contains("\"lastScore\": 70"));
    }

    #[test]
    fn bad_track_is_set_aside_and_siblings_survive() {
        let store = MemoryProfileStore::with_document(
            r#"{"cognitive":{"level":3,"tasksCompleted":9},"motor":{"level":"bad"},"speech":{"level":"x"}}"#,
        );
        assert_eq!(store.load_track("cognitive", 5), SkillLevel { level: 3, tasks_completed: 9, last_score: None });
        assert_eq!(store.load_track("motor", 5), SkillLevel::default());

        store.save_track("motor", SkillLevel { level: 4, tasks_completed: 1, last_score: None }).unwrap();
        let p = store.load().unwrap().unwrap();
        assert_eq!(p.track("cognitive").map(|s| s.tasks_completed), Some(9));
        assert_eq!(p.track("motor").map(|s| s.level), Some(4));
        // Untouched bad tracks stay as they were.
        assert!(store.document().unwrap().contains("\"x\""));
    }

    #[test]
    fn unknown_keys_survive_a_save() {
        let store = MemoryProfileStore::with_document(r#"{"playerName":"Sam","motor":{"level":2}}"#);
        store.save_track("motor", SkillLevel { level: 3, ..SkillLevel::default() }).unwrap();
        let doc: Value = serde_json::from_str(&store.document().unwrap()).unwrap();
        assert_eq!(doc["playerName"], "Sam");
        assert_eq!(doc["motor"]["level"], 3);
    }

    #[test]
    fn unreadable_file_is_not_overwritten() {
        // A directory in place of the file cannot be read.
        let path = scratch("unreadable");
        fs::create_dir_all(&path).unwrap();
        let store = JsonProfileStore::new(&path);
        let err = store.save_track("motor", SkillLevel::default());
        assert!(matches!(err, Err(ProfileError::Read { .. })));
        assert!(path.is_dir());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn failed_write_leaves_previous_document() {
        let store = MemoryProfileStore::with_document(r#"{"motor":{"level":2}}"#);
        store.fail_writes(true);
        let err = store.save_track("motor", SkillLevel { level: 3, ..SkillLevel::default() });
        assert!(matches!(err, Err(ProfileError::Write { .. })));
        assert_eq!(store.load_track("motor", 5).level, 2);
    }

    #[test]
    fn json_file_round_trip() {
        let path = scratch("roundtrip");
        let store = JsonProfileStore::new(&path);
        assert!(store.load().unwrap().is_none());
        store.save_track("motor", SkillLevel { level: 4, tasks_completed: 2, last_score: None }).unwrap();
        assert_eq!(store.load_track("motor", 5).level, 4);
        assert!(!store.temp_path().exists());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn json_file_write_failure_is_reported() {
        // A directory where the file should be makes the rename fail.
        let path = scratch("blocked");
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();
        let store = JsonProfileStore::new(&path);
        let err = store.save(&PlayerProfile::new()).unwrap_err();
        assert!(matches!(err, ProfileError::Write { .. }));
        assert!(path.join("keep").exists());
        assert!(!store.temp_path().exists());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
