//! typed settings for the bot, read through [`Config`]
use std::{str::FromStr, time::Duration};

use json::JsonValue;

use crate::common::{box_error::BoxError, config::Config, messages::Locale};

use super::play_duration::PlayDurationPolicy;

#[derive(Debug, Clone, PartialEq)]
pub struct DjSettings {
    pub bot_name: String,
    pub tracks_path: String,
    pub catalog_file: String,
    pub language: Locale,
    pub block_size: usize,
    /// channel the bot's intervals are sent on
    pub channel_index: u8,
    pub play_duration: PlayDurationPolicy,
    pub dump_file: String,
}

impl DjSettings {
    pub fn defaults() -> JsonValue {
        json::object! {
            "bot_name": "dj",
            "tracks_path": "tracks",
            "catalog_file": "catalog.json",
            "language": "en",
            "block_size": 8192,
            "channel_index": 0,
            "turns_per_track": 4,
            "min_turn_secs": 60,
            "max_turn_secs": 180,
            "dump_file": "intervals.dmp"
        }
    }

    pub fn from_config(config: &Config) -> Result<DjSettings, BoxError> {
        let turns = config.get_u32_value("turns_per_track", None)?;
        let min = config.get_u32_value("min_turn_secs", None)?;
        let max = config.get_u32_value("max_turn_secs", None)?;
        Ok(DjSettings {
            bot_name: config.get_str_value("bot_name", None)?,
            tracks_path: config.get_str_value("tracks_path", None)?,
            catalog_file: config.get_str_value("catalog_file", None)?,
            language: Locale::from_str(&config.get_str_value("language", None)?)?,
            block_size: config.get_u32_value("block_size", None)? as usize,
            channel_index: u8::try_from(config.get_u32_value("channel_index", None)?)?,
            play_duration: PlayDurationPolicy::new(
                turns,
                Duration::from_secs(min as u64),
                Duration::from_secs(max as u64),
            ),
            dump_file: config.get_str_value("dump_file", None)?,
        })
    }
}
