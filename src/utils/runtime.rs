use anyhow::Result;

/// The sampler lives on its own task, so the tracker needs worker threads to keep it independent
/// from persistence and rendering.
pub fn multi_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}
