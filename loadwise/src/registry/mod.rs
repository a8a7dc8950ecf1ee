//! Operation registry.
//!
//! The registry is the single source of truth for which operations are
//! visibly loading or failed. It is mutated only through
//! [`RegistryCommand`]s and publishes a [`RegistryEvent`] after every change.
//!
//! # Commands
//!
//! | Command    | Known id                              | Unknown id |
//! |------------|---------------------------------------|------------|
//! | `Start`    | replaces the record                   | inserts    |
//! | `Stop`     | removes                               | no-op      |
//! | `Progress` | clamps to `[0, 100]` and stores       | no-op      |
//! | `Text`     | stores                                | no-op      |
//! | `Error`    | stores, marks not loading, keeps it   | no-op      |
//! | `Clear`    | removes everything                    | -          |
//! | `Sweep`    | removes records past the age ceiling  | -          |

mod state;
mod store;

pub use state::{clamp_progress, LoadingState};
pub use store::{Registry, RegistryCommand, RegistryEvent, RegistryEventKind};
