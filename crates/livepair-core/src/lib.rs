//! Livepair Core - operation surface over the pairing components
//!
//! This crate wires the classifier, frame decoder, and live encoder
//! behind one closed [`Operation`] enum and injects the platform
//! capabilities ([`AssetStore`], [`GalleryPublisher`]) as traits so no
//! component ever reaches into process-global state.

pub mod context;
pub mod executor;
pub mod operation;
pub mod publish;
pub mod store;

pub use context::{Context, CoreConfig, ExecutionMode};
pub use executor::OperationExecutor;
pub use operation::{Operation, OperationOutput};
pub use publish::{FsGalleryPublisher, GalleryPublisher};
pub use store::FsAssetStore;

pub use livepair_asset_classifier::AssetStore;
