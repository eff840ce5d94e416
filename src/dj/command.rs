//! chat command parsing
//!
//! Commands arrive as the words after the bot's name:
//!
//! ```text
//! random [key] [duration] [#tag ...]
//! track <id> | playlist <id> | stop | play | next | help | playing | queue
//! ```
use std::{fmt, time::Duration};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{common::dj_error::DjError, tracks::key::KeyMode};

#[derive(Debug, Clone, PartialEq)]
pub enum JamCommand {
    Random {
        key: Option<KeyMode>,
        duration: Option<Duration>,
        tags: Vec<String>,
    },
    Track(u32),
    Playlist(u32),
    Stop,
    Play,
    Next,
    Help,
    Playing,
    Queue,
}

static DURATION_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?$").ok());

/// parse `1h30m`, `10m`, `90s`.  `None` when the token is not a duration.
pub fn parse_duration(token: &str) -> Option<Duration> {
    let caps = DURATION_RE.as_ref()?.captures(token)?;
    let mut secs: u64 = 0;
    let mut seen = false;
    for (idx, scale) in [(1, 3600u64), (2, 60), (3, 1)] {
        if let Some(m) = caps.get(idx) {
            secs = secs.checked_add(m.as_str().parse::<u64>().ok()?.checked_mul(scale)?)?;
            seen = true;
        }
    }
    if !seen {
        return None;
    }
    Some(Duration::from_secs(secs))
}

fn parse_id(what: &str, token: Option<&str>) -> Result<u32, DjError> {
    match token {
        Some(t) => t
            .parse::<u32>()
            .map_err(|_| DjError::InvalidInput(format!("bad {} id '{}'", what, t))),
        None => Err(DjError::InvalidInput(format!("{} id missing", what))),
    }
}

impl JamCommand {
    pub fn parse(text: &str) -> Result<JamCommand, DjError> {
        let mut words = text.split_whitespace();
        let verb = match words.next() {
            Some(v) => v.to_lowercase(),
            None => return Err(DjError::InvalidInput("empty command".to_string())),
        };
        let cmd = match verb.as_str() {
            "random" => {
                let mut key = None;
                let mut duration = None;
                let mut tags = vec![];
                for word in words.by_ref() {
                    if let Some(tag) = word.strip_prefix('#') {
                        if !tag.is_empty() {
                            tags.push(tag.to_string());
                        }
                    } else if let Some(d) = parse_duration(word) {
                        duration = Some(d);
                    } else if let Some(km) = KeyMode::by_name(word) {
                        key = Some(km);
                    } else {
                        return Err(DjError::InvalidInput(format!("unknown random option '{}'", word)));
                    }
                }
                JamCommand::Random { key, duration, tags }
            }
            "track" => JamCommand::Track(parse_id("track", words.next())?),
            "playlist" => JamCommand::Playlist(parse_id("playlist", words.next())?),
            "stop" => JamCommand::Stop,
            "play" => JamCommand::Play,
            "next" => JamCommand::Next,
            "help" => JamCommand::Help,
            "playing" => JamCommand::Playing,
            "queue" => JamCommand::Queue,
            other => return Err(DjError::InvalidInput(format!("unknown command '{}'", other))),
        };
        if let Some(extra) = words.next() {
            return Err(DjError::InvalidInput(format!("unexpected '{}'", extra)));
        }
        Ok(cmd)
    }
}

impl fmt::Display for JamCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JamCommand::Random { key, duration, tags } => {
                write!(f, "random")?;
                if let Some(k) = key {
                    write!(f, " key: {}", k)?;
                }
                if let Some(d) = duration {
                    write!(f, " duration: {}s", d.as_secs())?;
                }
                for t in tags {
                    write!(f, " #{}", t)?;
                }
                Ok(())
            }
            JamCommand::Track(id) => write!(f, "track {}", id),
            JamCommand::Playlist(id) => write!(f, "playlist {}", id),
            JamCommand::Stop => write!(f, "stop"),
            JamCommand::Play => write!(f, "play"),
            JamCommand::Next => write!(f, "next"),
            JamCommand::Help => write!(f, "help"),
            JamCommand::Playing => write!(f, "playing"),
            JamCommand::Queue => write!(f, "queue"),
        }
    }
}

#[cfg(test)]
mod test_command {
    use super::*;
    use crate::tracks::key::{Key, Mode};

    #[test]
    fn durations() {
        assert!(DURATION_RE.is_some());
        assert_eq!(parse_duration("10m"), Some(Duration::from_secs(600)));
        assert_eq!(parse_duration("90s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("1h30m"), Some(Duration::from_secs(5400)));
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("Am"), None);
        assert_eq!(parse_duration("m"), None);
    }

    #[test]
    fn random_with_options() {
        let cmd = JamCommand::parse("random Am 10m #rock #blues").unwrap();
        assert_eq!(
            cmd,
            JamCommand::Random {
                key: Some(KeyMode { key: Key::A, mode: Mode::Minor }),
                duration: Some(Duration::from_secs(600)),
                tags: vec!["rock".to_string(), "blues".to_string()],
            }
        );
        assert_eq!(cmd.to_string(), "random key: A minor duration: 600s #rock #blues");
    }

    #[test]
    fn bare_random() {
        assert_eq!(
            JamCommand::parse("RANDOM").unwrap(),
            JamCommand::Random { key: None, duration: None, tags: vec![] }
        );
    }

    #[test]
    fn simple_verbs() {
        assert_eq!(JamCommand::parse("track 5").unwrap(), JamCommand::Track(5));
        assert_eq!(JamCommand::parse(" playlist  12 ").unwrap(), JamCommand::Playlist(12));
        assert_eq!(JamCommand::parse("stop").unwrap(), JamCommand::Stop);
        assert_eq!(JamCommand::parse("queue").unwrap(), JamCommand::Queue);
    }

    #[test]
    fn rejects_garbage() {
        assert!(JamCommand::parse("").is_err());
        assert!(JamCommand::parse("dance").is_err());
        assert!(JamCommand::parse("track").is_err());
        assert!(JamCommand::parse("track five").is_err());
        assert!(JamCommand::parse("stop now").is_err());
        assert!(JamCommand::parse("random purple").is_err());
    }
}
