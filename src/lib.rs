//! jam_dj_bot - automated participant for a real time jam session
//!
//! provides the pieces to stream backing tracks into a jam as tempo aligned
//! intervals and to rotate which live participant has the floor.
extern crate json;
#[macro_use]
extern crate num_derive;

pub mod common;
pub mod dj;
pub mod player;
pub mod tracks;
