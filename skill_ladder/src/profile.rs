//! Declarative level profiles.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything a level changes about a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProfile {
    pub entity_count:     usize,
    /// Entity speed, px/s.
    pub speed_range:      (f32, f32),
    pub spawn_interval:   f32,
    #[serde(default)]
    pub size_jitter:      f32,
    /// Seconds per session.
    pub session_duration: f32,
    /// Window performance at or above this moves the player up.
    pub up_threshold:     u32,
    /// Window performance strictly below this moves the player down.
    pub down_threshold:   u32,
    /// Catches/matches that end the session early.
    #[serde(default)]
    pub objective:        Option<u32>,
}

#[derive(Debug, Error, PartialEq)]
pub enum LadderError {
    #[error("profile table must define at least one level")]
    EmptyTable,
}

/// Level profiles for levels `1..=max_level()`, in order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LevelProfile>", into = "Vec<LevelProfile>")]
pub struct ProfileTable {
    levels: Vec<LevelProfile>,
}

impl ProfileTable {
    pub fn new(levels: Vec<LevelProfile>) -> Result<Self, LadderError> {
        if levels.is_empty() {
            return Err(LadderError::EmptyTable);
        }
        Ok(ProfileTable { levels })
    }

    /// One-level table; extend with [`ProfileTable::then`].
    pub fn single(level: LevelProfile) -> Self {
        ProfileTable { levels: vec![level] }
    }

    /// Append the next level up.
    pub fn then(mut self, level: LevelProfile) -> Self {
        self.levels.push(level);
        self
    }

    pub fn max_level(&self) -> u32 {
        self.levels.len() as u32
    }

    /// Nearest valid level.
    pub fn clamp(&self, level: u32) -> u32 {
        level.clamp(1, self.max_level())
    }

    /// Profile for `level`, clamped into range.
    pub fn get(&self, level: u32) -> &LevelProfile {
        &self.levels[(self.clamp(level) - 1) as usize]
    }

    pub fn levels(&self) -> &[LevelProfile] {
        &self.levels
    }
}

impl TryFrom<Vec<LevelProfile>> for ProfileTable {
    type Error = LadderError;
    fn try_from(levels: Vec<LevelProfile>) -> Result<Self, Self::Error> {
        ProfileTable::new(levels)
    }
}

impl From<ProfileTable> for Vec<LevelProfile> {
    fn from(t: ProfileTable) -> Self { t.levels }
}
