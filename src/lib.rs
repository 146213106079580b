//! Workspace facade crate.
//!
//! Exposes one dependency surface over the member crates (`core-runtime`,
//! `core-playback`, `bridge-traits`, `bridge-desktop`) so host applications
//! pull `smc-workspace` with the documented features instead of wiring each
//! member themselves.
