use crate::traits::{KvStore, ListOptions, StorageResult};

/// Delete every key in a namespace, page by page. Returns the number of keys deleted.
pub async fn drain(store: &dyn KvStore) -> StorageResult<usize> {
    let mut deleted = 0;
    let mut cursor = None;
    loop {
        let page = store
            .list(ListOptions {
                prefix: None,
                cursor,
                limit: 0,
            })
            .await?;
        for key in &page.keys {
            store.delete(&key.name).await?;
            deleted += 1;
        }
        if page.list_complete {
            break;
        }
        cursor = page.cursor;
    }

    tracing::info!(
        backend = %store.backend_type(),
        deleted,
        "Namespace drained"
    );
    Ok(deleted)
}
