//! Localized message catalog.
//!
//! A [`MessageCatalog`] is built once for the configured [`Locale`] and handed
//! to every component that talks to the chat.  Templates use `{}` placeholders
//! that are filled in order by [`MessageCatalog::format`].
use std::{collections::HashMap, fmt, str::FromStr};

use crate::common::dj_error::DjError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locale {
    English,
    Russian,
}

impl FromStr for Locale {
    type Err = DjError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "eng" | "english" => Ok(Locale::English),
            "ru" | "rus" | "russian" => Ok(Locale::Russian),
            other => Err(DjError::InvalidInput(format!("unknown language '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    AlreadyStarted,
    CantStartRandomTrack,
    UnableToRecognizeCommand,
    PlayingTrack,
    PlaylistStarted,
    PlaylistFinished,
    PlaylistPlaying,
    PlaybackStopped,
    NothingPlaying,
    NextOnlyInPlaylist,
    TrackInterrupted,
    Help,
    QueueEmpty,
    QueueList,
    NowPlaying,
    IsNext,
    GetReady,
    ErrorGeneral,
    ErrorTrackNotSelected,
    ErrorTrackNotFound,
    ErrorTagNotFound,
    ErrorPlaylistNotFound,
    ErrorPlaylistIsEmpty,
}

const ENGLISH: &[(MessageId, &str)] = &[
    (MessageId::AlreadyStarted, "playing already started"),
    (MessageId::CantStartRandomTrack, "can't start random track"),
    (
        MessageId::UnableToRecognizeCommand,
        "unable to recognize command, please use \"{} help\" to get the list and format of the available commands",
    ),
    (MessageId::PlayingTrack, "playing track {}"),
    (MessageId::PlaylistStarted, "playlist {} started"),
    (MessageId::PlaylistFinished, "playlist {} finished"),
    (MessageId::PlaylistPlaying, "playlist {} is playing"),
    (MessageId::PlaybackStopped, "playback stopped"),
    (MessageId::NothingPlaying, "nothing is playing"),
    (MessageId::NextOnlyInPlaylist, "next track is available only while a playlist is playing"),
    (MessageId::TrackInterrupted, "track {} was interrupted by an error"),
    (
        MessageId::Help,
        "DJ Bot commands: \n\
         {} random - start random track\n\
         {} random Am 10m #rock - start random track with key, duration and tags\n\
         {} track 5 - start track by ID\n\
         {} stop - stop track\n\
         {} play - start selected track again\n\
         {} playlist 12 - start playlist by ID\n\
         {} next - next track (only if playlist playing)\n\
         {} playing - show current track/playlist info\n\
         {} queue - show the players queue",
    ),
    (MessageId::QueueEmpty, "queue is empty"),
    (MessageId::QueueList, "queue: {}"),
    (MessageId::NowPlaying, "{} is playing now"),
    (MessageId::IsNext, "{} is next"),
    (MessageId::GetReady, "{}, get ready, your turn starts in 15 seconds"),
    (MessageId::ErrorGeneral, "an error has occurred"),
    (MessageId::ErrorTrackNotSelected, "track not selected, please select track"),
    (MessageId::ErrorTrackNotFound, "track {} not found"),
    (MessageId::ErrorTagNotFound, "tag {} not found"),
    (MessageId::ErrorPlaylistNotFound, "playlist {} not found"),
    (MessageId::ErrorPlaylistIsEmpty, "playlist {} is empty"),
];

const RUSSIAN: &[(MessageId, &str)] = &[
    (MessageId::AlreadyStarted, "воспроизведение уже запущено"),
    (MessageId::CantStartRandomTrack, "не удалось запустить случайный трек"),
    (
        MessageId::UnableToRecognizeCommand,
        "невозможно распознать команду, используйте \"{} help\" для получения списка и формата доступных команд",
    ),
    (MessageId::PlayingTrack, "запущен трек {}"),
    (MessageId::PlaylistStarted, "запущен плейлист {}"),
    (MessageId::PlaylistFinished, "плейлист {} закончился"),
    (MessageId::PlaylistPlaying, "играет плейлист {}"),
    (MessageId::PlaybackStopped, "воспроизведение остановлено"),
    (MessageId::NothingPlaying, "сейчас ничего не играет"),
    (MessageId::NextOnlyInPlaylist, "следующий трек доступен только во время воспроизведения плейлиста"),
    (MessageId::TrackInterrupted, "трек {} прерван из-за ошибки"),
    (
        MessageId::Help,
        "Команды DJ-бота: \n\
         {} random - запустить случайный трек\n\
         {} random Am 10m #rock - запустить случайный трек с тональностью, длительностью и тегами\n\
         {} track 5 - запустить трек с заданным ID\n\
         {} stop - остановить трек\n\
         {} play - снова запустить выбранный трек\n\
         {} playlist 12 - запустить плейлист с заданным ID\n\
         {} next - следующий трек (только если играет плейлист)\n\
         {} playing - показать информацию о текущем треке/плейлисте\n\
         {} queue - показать очередь музыкантов",
    ),
    (MessageId::QueueEmpty, "очередь пуста"),
    (MessageId::QueueList, "очередь: {}"),
    (MessageId::NowPlaying, "сейчас играет {}"),
    (MessageId::IsNext, "следующий {}"),
    (MessageId::GetReady, "{}, приготовьтесь, ваша очередь через 15 секунд"),
    (MessageId::ErrorGeneral, "произошла ошибка"),
    (MessageId::ErrorTrackNotSelected, "трек не выбран, пожалуйста, выберите трек"),
    (MessageId::ErrorTrackNotFound, "трек {} не найден"),
    (MessageId::ErrorTagNotFound, "тег {} не найден"),
    (MessageId::ErrorPlaylistNotFound, "плейлист {} не найден"),
    (MessageId::ErrorPlaylistIsEmpty, "плейлист {} не содержит треков"),
];

pub struct MessageCatalog {
    locale: Locale,
    templates: HashMap<(Locale, MessageId), String>,
}

impl MessageCatalog {
    /// catalog with the built in english and russian templates
    pub fn new(locale: Locale) -> MessageCatalog {
        let mut catalog = MessageCatalog {
            locale,
            templates: HashMap::new(),
        };
        for (id, template) in ENGLISH {
            catalog.set(Locale::English, *id, template);
        }
        for (id, template) in RUSSIAN {
            catalog.set(Locale::Russian, *id, template);
        }
        catalog
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// override or add a template
    pub fn set(&mut self, locale: Locale, id: MessageId, template: &str) {
        self.templates.insert((locale, id), template.to_string());
    }

    fn template(&self, id: MessageId) -> &str {
        self.templates
            .get(&(self.locale, id))
            .or_else(|| self.templates.get(&(Locale::English, id)))
            .map(|t| t.as_str())
            .unwrap_or("")
    }

    pub fn text(&self, id: MessageId) -> String {
        self.template(id).to_string()
    }

    /// fill the `{}` placeholders in order.  Missing arguments leave the rest empty.
    pub fn format(&self, id: MessageId, args: &[&dyn fmt::Display]) -> String {
        let template = self.template(id);
        let mut out = String::with_capacity(template.len());
        let mut args = args.iter();
        let mut rest = template;
        while let Some(pos) = rest.find("{}") {
            out.push_str(&rest[..pos]);
            if let Some(arg) = args.next() {
                out.push_str(&arg.to_string());
            }
            rest = &rest[pos + 2..];
        }
        out.push_str(rest);
        out
    }

    /// one short sentence for an operator facing failure
    pub fn error_message(&self, err: &DjError) -> String {
        match err {
            DjError::Busy => self.text(MessageId::AlreadyStarted),
            DjError::NoSelection => self.text(MessageId::ErrorTrackNotSelected),
            DjError::Exhausted => self.text(MessageId::CantStartRandomTrack),
            _ => self.text(MessageId::ErrorGeneral),
        }
    }
}

#[cfg(test)]
mod test_messages {
    use super::*;

    #[test]
    fn english_format() {
        let catalog = MessageCatalog::new(Locale::English);
        assert_eq!(catalog.format(MessageId::ErrorPlaylistIsEmpty, &[&7]), "playlist 7 is empty");
        assert_eq!(catalog.text(MessageId::PlaybackStopped), "playback stopped");
    }

    #[test]
    fn russian_format() {
        let catalog = MessageCatalog::new(Locale::Russian);
        assert_eq!(
            catalog.format(MessageId::ErrorPlaylistIsEmpty, &[&7]),
            "плейлист 7 не содержит треков"
        );
    }

    #[test]
    fn help_repeats_prefix() {
        let catalog = MessageCatalog::new(Locale::English);
        let name: &dyn fmt::Display = &"dj";
        let help = catalog.format(MessageId::Help, &[name; 9]);
        assert!(help.starts_with("DJ Bot commands"));
        assert_eq!(help.matches("dj ").count(), 9);
        assert!(!help.contains("{}"));
    }

    #[test]
    fn falls_back_to_english() {
        let mut catalog = MessageCatalog::new(Locale::Russian);
        catalog.templates.remove(&(Locale::Russian, MessageId::QueueEmpty));
        assert_eq!(catalog.text(MessageId::QueueEmpty), "queue is empty");
    }

    #[test]
    fn override_template() {
        let mut catalog = MessageCatalog::new(Locale::English);
        catalog.set(Locale::English, MessageId::NowPlaying, "on stage: {}");
        assert_eq!(catalog.format(MessageId::NowPlaying, &[&"bob"]), "on stage: bob");
    }

    #[test]
    fn locale_from_str() {
        assert_eq!("RU".parse::<Locale>().unwrap(), Locale::Russian);
        assert_eq!("en".parse::<Locale>().unwrap(), Locale::English);
        assert!("klingon".parse::<Locale>().is_err());
    }

    #[test]
    fn error_sentences() {
        let catalog = MessageCatalog::new(Locale::English);
        assert_eq!(catalog.error_message(&DjError::Busy), "playing already started");
        assert_eq!(catalog.error_message(&DjError::Internal("x".to_string())), "an error has occurred");
    }
}
