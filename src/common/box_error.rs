//! error type that can cross thread boundaries.
//!
//! The decode and pacing threads hand their failures back to the thread that
//! owns the player, so every plumbing error has to be Send + Sync.
pub type BoxError = std::boxed::Box<
    dyn std::error::Error // must implement Error to satisfy ?
        + std::marker::Send // needed for threads
        + std::marker::Sync, // needed for threads
>;
