//! Text form of the session feed the binary reads on stdin.
//!
//! * `+name` participant joined
//! * `-name` participant left
//! * `name: text` chat line
use crate::common::dj_error::DjError;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Joined(String),
    Left(String),
    Chat { from: String, text: String },
}

impl SessionEvent {
    pub fn parse(line: &str) -> Result<SessionEvent, DjError> {
        let line = line.trim();
        if let Some(name) = line.strip_prefix('+') {
            return named(name).map(SessionEvent::Joined);
        }
        if let Some(name) = line.strip_prefix('-') {
            return named(name).map(SessionEvent::Left);
        }
        match line.split_once(':') {
            Some((from, text)) if !from.trim().is_empty() => Ok(SessionEvent::Chat {
                from: from.trim().to_string(),
                text: text.trim().to_string(),
            }),
            _ => Err(DjError::InvalidInput(format!("can't parse session line '{}'", line))),
        }
    }
}

fn named(name: &str) -> Result<String, DjError> {
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(DjError::InvalidInput(format!("bad participant name '{}'", name)));
    }
    Ok(name.to_string())
}
