//! Configuration loading and validation.

mod settings;

pub use settings::{
    CacheSettings, EngineSettings, IndexerSettings, LoggingSettings, PlatformSettings,
    RealmSettings, Settings, StoreSettings,
};
