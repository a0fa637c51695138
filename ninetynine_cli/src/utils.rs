use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde_json::Value;

use crate::api::ApiResponse;
use crate::error::Result;
use crate::session::SessionEvent;
use crate::Room;

pub fn save_json(data: &Value, filename: &Path) -> Result<()> {
    let mut file = File::create(filename)?;
    file.write_all(serde_json::to_string_pretty(data)?.as_bytes())?;
    println!("✅ {} written.", filename.display());
    Ok(())
}

pub fn pretty(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Status line, then the body.
pub fn render_response(res: &ApiResponse) -> String {
    let mut out = res.status.as_u16().to_string();
    if let Some(reason) = res.status.canonical_reason() {
        out.push(' ');
        out.push_str(reason);
    }
    if let Some(err) = res.error_message() {
        out.push_str(&format!("\n❌ {err}"));
    }
    if !res.body.is_null() {
        out.push('\n');
        out.push_str(&pretty(&res.body));
    }
    out
}

pub fn print_response(res: &ApiResponse) {
    println!("{}", render_response(res));
}

pub fn render_event(event: &SessionEvent) -> String {
    match event {
        SessionEvent::Frame(inbound) => format!("<< {}\n{}", inbound.summary(), pretty(&inbound.raw)),
        SessionEvent::Closed(Some(reason)) => format!("connection closed: {reason}"),
        SessionEvent::Closed(None) => "connection closed".to_string(),
        SessionEvent::Failed(err) => format!("❌ connection error: {err}"),
    }
}

pub fn print_event(event: &SessionEvent) {
    println!("{}", render_event(event));
}

pub fn format_room(room: &Room) -> String {
    let created = room
        .created_at_utc()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "room {} owner={} status={} players={}/{} spectators={}/{} created {}",
        room.room_id,
        room.owner_id,
        room.status,
        room.players.len(),
        room.max_capacity,
        room.spectators.len(),
        room.max_spectator,
        created
    )
}
