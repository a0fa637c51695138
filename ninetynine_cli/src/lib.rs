pub mod api;
pub mod config;
pub mod console;
pub mod error;
pub mod protocol;
pub mod session;
pub mod utils;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

pub use error::{ProbeError, Result};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub value: i64,
    #[serde(default)]
    pub is_special: bool,
}

impl Card {
    pub fn new(value: i64, is_special: bool) -> Self {
        Self { value, is_special }
    }
}

/// Room document as returned by `/createroom` and `/joinroom`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Room {
    pub room_id: String,
    #[serde(alias = "createTime")]
    pub created_at: i64,
    pub owner_id: String,
    pub max_capacity: u32,
    pub max_spectator: u32,
    pub status: String,
    pub players: Vec<String>,
    pub spectators: Vec<String>,
}

impl Room {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        if self.created_at <= 0 {
            return None;
        }
        Utc.timestamp_opt(self.created_at, 0).single()
    }

    pub fn is_full(&self) -> bool {
        self.max_capacity > 0 && self.players.len() >= self.max_capacity as usize
    }
}
