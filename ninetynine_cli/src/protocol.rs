//! JSON frames exchanged over `/ws/<roomId>`.
//!
//! Outbound actions are shaped exactly as the server reads them. Inbound frames
//! are decoded leniently: the server's game-state layout has drifted before, so
//! every field is optional and the raw JSON is always kept alongside.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::Card;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ClientAction {
    Join {
        #[serde(rename = "userId")]
        user_id: String,
        username: String,
        #[serde(rename = "profilePic")]
        profile_pic: String,
    },
    Start,
    Play {
        card: Card,
    },
    Leave,
}

impl ClientAction {
    pub fn join(user_id: impl Into<String>, username: impl Into<String>, profile_pic: impl Into<String>) -> Self {
        ClientAction::Join {
            user_id: user_id.into(),
            username: username.into(),
            profile_pic: profile_pic.into(),
        }
    }

    pub fn play(value: i64, is_special: bool) -> Self {
        ClientAction::Play {
            card: Card::new(value, is_special),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ClientAction::Join { .. } => "join",
            ClientAction::Start => "start",
            ClientAction::Play { .. } => "play",
            ClientAction::Leave => "leave",
        }
    }

    pub fn to_frame(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerInfo {
    pub player_id: String,
    pub player_name: String,
    #[serde(rename = "playerAvatarURL")]
    pub player_avatar_url: String,
    pub is_out: bool,
    pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameData {
    pub players: Vec<PlayerInfo>,
    pub player_cards: Vec<Card>,
    pub status: String,
    pub current_player_index: i64,
    pub current_direction: i64,
    pub stack_value: i64,
    pub max_stack_value: i64,
    pub last_played_card: Option<Card>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerFrame {
    pub error: Option<String>,
    pub action: Option<String>,
    pub game_data: Option<GameData>,
}

impl ServerFrame {
    /// The server sends `"error": ""` on success.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }
}

/// One inbound text frame.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub raw: Value,
    pub frame: Option<ServerFrame>,
}

impl Inbound {
    pub fn parse(text: &str) -> Self {
        let raw = match serde_json::from_str::<Value>(text) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("inbound frame is not JSON: {}", e);
                return Inbound {
                    raw: Value::String(text.to_string()),
                    frame: None,
                };
            }
        };

        let frame = if raw.is_object() {
            match serde_json::from_value::<ServerFrame>(raw.clone()) {
                Ok(frame) => Some(frame),
                Err(e) => {
                    tracing::debug!("frame does not match known layout: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Inbound { raw, frame }
    }

    pub fn summary(&self) -> String {
        let Some(frame) = &self.frame else {
            return "unrecognized frame".to_string();
        };
        if let Some(err) = frame.error() {
            return format!("error: {err}");
        }

        let mut parts = Vec::new();
        if let Some(action) = frame.action.as_deref().filter(|a| !a.is_empty()) {
            parts.push(format!("[{action}]"));
        }
        match &frame.game_data {
            Some(game) => {
                if !game.status.is_empty() {
                    parts.push(format!("status={}", game.status));
                }
                parts.push(format!("stack={}/{}", game.stack_value, game.max_stack_value));
                parts.push(format!("turn={}", game.current_player_index));
                parts.push(format!("players={}", game.players.len()));
                let cards: Vec<String> = game.player_cards.iter().map(card_label).collect();
                parts.push(format!("cards=[{}]", cards.join(", ")));
            }
            None => parts.push("no game data".to_string()),
        }
        parts.join(" ")
    }
}

/// Special cards carry a trailing `*`.
pub fn card_label(card: &Card) -> String {
    if card.is_special {
        format!("{}*", card.value)
    } else {
        card.value.to_string()
    }
}
