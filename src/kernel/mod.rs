//! Page-view telemetry kernel.
//!
//! # CONSENT INVARIANT
//! Nothing leaves the page unless the durable consent flag reads `accepted`
//! at the moment the report is built. The flag is re-read for every report.
//!
//! # PRIVACY INVARIANT
//! Reports carry the page path, an opaque session id, and small event fields
//! (depths, elapsed seconds, link targets, at most 50 characters of visible
//! text). No form contents beyond what page code passes explicitly.

pub mod clicks;
pub mod consent;
pub mod event;
pub mod scroll;
pub mod session;
pub mod time;
pub mod tracker;
