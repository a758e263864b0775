//! Command implementations

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use livepair_common::CancelToken;
use livepair_core::{
    Context, CoreConfig, FsAssetStore, FsGalleryPublisher, Operation, OperationExecutor,
    OperationOutput,
};

pub mod detect;
pub mod extract;
pub mod inspect;
pub mod synthesize;

/// Build an executor over directory-backed capabilities and run one
/// operation. Ctrl-C cancels in-flight synthesis work.
pub(crate) async fn run_operation(
    library: PathBuf,
    gallery: PathBuf,
    consent: bool,
    verbose: bool,
    operation: Operation,
) -> Result<OperationOutput> {
    let executor = OperationExecutor::new(
        Arc::new(FsAssetStore::new(library)),
        Arc::new(FsGalleryPublisher::new(gallery).with_consent(consent)),
        CoreConfig::default(),
    );
    let context = if verbose {
        Context::debug()
    } else {
        Context::performance()
    };

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let output = executor.execute(&context, operation, &cancel).await?;
    Ok(output)
}

/// Operations that never touch the library or gallery still need the
/// executor; point both capabilities at the working directory.
pub(crate) async fn run_local(verbose: bool, operation: Operation) -> Result<OperationOutput> {
    run_operation(
        PathBuf::from("."),
        PathBuf::from("."),
        false,
        verbose,
        operation,
    )
    .await
}
