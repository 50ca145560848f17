use anyhow::Result;

/// Every mutation of the store happens on a single thread, so the application never needs more
/// than a current-thread runtime.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
