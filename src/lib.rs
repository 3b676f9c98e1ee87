//! Redub - Automated Speech Dubbing
//!
//! Translates timed subtitle segments with a machine-translation engine,
//! voices them with a text-to-speech engine, fits each clip into its original
//! time slot and assembles a single dubbed track, optionally muxed back into
//! the source video with ffmpeg.

pub mod align;
pub mod assemble;
pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod registry;
pub mod segment;
pub mod subtitle;
pub mod synth;
pub mod translate;
pub mod workflow;
