//! Run the dj bot against a session feed on stdin.
//!
//! Lines look like `+alice` (joined), `-alice` (left) or `alice: dj random Am 10m`.
//! Intervals go to a dump file instead of a jam server.
use std::{
    io::{self, BufRead},
    sync::Arc,
};

use clap::Parser;
use jam_dj_bot::{
    common::{box_error::BoxError, config::Config, messages::MessageCatalog},
    dj::{
        jam_manager::{lock_manager, JamManager},
        notifier::{ConsoleNotifier, Notifier},
        queue_manager::QueueManager,
        session_event::SessionEvent,
        settings::DjSettings,
    },
    player::{interval_dump::IntervalDumpWriter, interval_encoder::PcmBlockEncoder, jam_player::JamPlayer, sample_source::WavLoader},
    tracks::track_store::CatalogStore,
};
use log::{info, warn};

/// Stream backing tracks into a jam and rotate who has the floor
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// settings file (json)
    #[arg(short, long, default_value = "dj_settings.json")]
    config: String,

    /// where to write the transmitted intervals, overrides the settings file
    #[arg(short, long)]
    dump: Option<String>,
}

fn addressed_to_bot(bot_name: &str, text: &str) -> bool {
    text.split_whitespace()
        .next()
        .map(|w| w.eq_ignore_ascii_case(bot_name))
        .unwrap_or(false)
}

fn main() -> Result<(), BoxError> {
    env_logger::init();
    let args = Args::parse();

    let mut config = Config::build(args.config, DjSettings::defaults())?;
    if let Some(dump) = args.dump {
        config.set_value("dump_file", dump)?;
    }
    let settings = DjSettings::from_config(&config)?;
    info!("settings: {:?}", settings);

    let store = match CatalogStore::from_file(&settings.catalog_file) {
        Ok(store) => store,
        Err(e) => {
            warn!("no catalog loaded from {}: {}", settings.catalog_file, e);
            CatalogStore::new()
        }
    };
    let writer = IntervalDumpWriter::new(&settings.dump_file)?;
    info!("writing intervals to {}", writer.get_filename());

    let catalog = Arc::new(MessageCatalog::new(settings.language));
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);
    let mut player = JamPlayer::new(
        &settings.tracks_path,
        Arc::new(WavLoader),
        Arc::new(PcmBlockEncoder::new(settings.block_size)),
        Arc::new(writer),
    );
    player.set_channel_index(settings.channel_index);
    let queue = Arc::new(QueueManager::new(
        &settings.bot_name,
        settings.play_duration,
        catalog.clone(),
        notifier.clone(),
    ));
    queue.start_supervisor();

    let mut manager = JamManager::new(&settings.bot_name, Box::new(player), Arc::new(store), catalog, notifier.clone());
    manager.set_queue(queue.clone());
    let manager = manager.into_shared();

    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match SessionEvent::parse(&line) {
            Ok(SessionEvent::Joined(name)) => {
                queue.add(&name);
            }
            Ok(SessionEvent::Left(name)) => {
                queue.del(&name);
            }
            Ok(SessionEvent::Chat { from, text }) => {
                if !addressed_to_bot(&settings.bot_name, &text) {
                    continue;
                }
                info!("{} asks: {}", from, text);
                let reply = lock_manager(&manager).command(&text);
                if !reply.is_empty() {
                    notifier.send_message(&reply);
                }
            }
            Err(e) => warn!("{}", e),
        }
    }

    lock_manager(&manager).stop();
    queue.shutdown();
    Ok(())
}
