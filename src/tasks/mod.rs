//! Background Tasks Module
//!
//! Contains background tasks that run alongside a cache.
//!
//! # Tasks
//! - Active Reaper: Removes expired cache entries every expiration interval

mod reaper;

pub(crate) use reaper::{spawn_reaper, ReaperHandle};
