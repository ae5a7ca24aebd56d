//! freqmap
//!
//! A Rust library for exploring public-transit service frequency maps of the
//! Lisbon region. Pairs with the `freqmap` CLI and the `freqmap-gui` panel.
//!
//! ### Features
//! - Per-operator line layers or a per-parish aggregate layer for any date
//!   and hour slot of the catalog
//! - Incremental operator toggles that never disturb other mounted layers
//! - A municipal boundary overlay mounted once and kept on top
//! - Hour playback that wraps around past midnight
//! - Persisted colour/detail preferences and URL-style launch options
//!
//! ### Example
//! ```
//! use std::sync::Arc;
//! use freqmap::{DataCatalog, Event, LaunchOptions, Session};
//! use freqmap::prefs::MemoryPreferences;
//! use freqmap::surface::RecordingSurface;
//!
//! let catalog = Arc::new(DataCatalog::lisbon());
//! let launch = LaunchOptions::from_query("?map=lines", &catalog);
//! let mut session = Session::start(
//!     catalog,
//!     launch,
//!     Box::new(MemoryPreferences::default()),
//!     RecordingSurface::new(),
//! )?;
//! session.dispatch(Event::DisableOperator("CP".into()))?;
//! session.dispatch(Event::SelectHour(4))?;
//! assert_eq!(session.hour_label(), "00");
//! # Ok::<(), freqmap::session::SessionError>(())
//! ```

pub mod catalog;
pub mod launch;
pub mod layer;
pub mod models;
pub mod playback;
pub mod prefs;
pub mod remote;
pub mod session;
pub mod state;
pub mod style;
pub mod surface;
pub mod sync;

pub use catalog::{DataCatalog, DateOption, OperatorMeta};
pub use launch::LaunchOptions;
pub use layer::{LayerDescriptor, LayerFactory};
pub use models::{ColorMode, FeatureProperties, LayerHandle, LayerKey, MapMode};
pub use playback::PlaybackController;
pub use session::Session;
pub use state::ViewState;
pub use sync::{Event, LayerSynchronizer, MapCommand};
