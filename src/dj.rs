//! The session side of the bot: who has the floor, what track is playing and
//! how chat commands reach the player.
pub mod command;
pub mod jam_manager;
pub mod notifier;
pub mod play_duration;
pub mod queue_manager;
pub mod session_event;
pub mod settings;
