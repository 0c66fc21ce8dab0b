//! tilepager - paging of procedurally compiled map tiles
//!
//! Tiles are compiled on worker threads from vector features into drawable
//! content. Everything that can be shared between tiles is shared: loaded
//! resources, compiled models and textures, and render states. A durable
//! cache bin stores compiled tiles so that revisiting a key skips the build.
//!
//! ```text
//! FeatureSource ──► TileBuilder ──► CompiledTile ──► DurableCacheBin
//!                       │
//!                       ├── ResourceCache   (strong, expiring)
//!                       ├── ResidentArena   (weak, find-only)
//!                       └── StateCache
//!
//! PagingDirector ── tile-worker-N ── TileBuilder::build
//! ```
//!
//! # Example
//!
//! ```ignore
//! use tilepager::builder::{Session, TileBuilder};
//! use tilepager::director::{PagerConfig, PagingDirector};
//! use tilepager::manager::CacheManager;
//!
//! let manager = Arc::new(CacheManager::new(loader));
//! let session = Arc::new(Session::new(manager, styles));
//! let builder = TileBuilder::new()
//!     .with_session(session)
//!     .with_feature_source(source)
//!     .with_content_factory(Arc::new(ExtrusionFactory::new()));
//!
//! let director = PagingDirector::new(builder, PagerConfig::default())?;
//! let tile = director.request(key).wait()?;
//! ```

pub mod arena;
pub mod builder;
pub mod cache;
pub mod compiled;
pub mod config;
pub mod content;
pub mod coord;
pub mod director;
pub mod feature;
pub mod logging;
pub mod manager;
pub mod resource;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
