use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

pub(crate) type Guard = OwnedMutexGuard<()>;

/// One async mutex per aggregate id.
///
/// Slots nobody holds or waits on are dropped on the next lock call.
#[derive(Debug, Default)]
pub(crate) struct Locks {
    slots: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl Locks {
    pub(crate) async fn lock(&self, id: Uuid) -> Guard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.retain(|key, slot| *key == id || Arc::strong_count(slot) > 1);
            Arc::clone(slots.entry(id).or_default())
        };
        slot.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_id_is_serialized() {
        let locks = Arc::new(Locks::default());
        let id = Uuid::new_v4();
        let guard = locks.lock(id).await;

        let other = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move { locks.lock(id).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!other.is_finished());

        drop(guard);
        other.await.unwrap();
    }

    #[tokio::test]
    async fn different_ids_do_not_block() {
        let locks = Locks::default();
        let _a = locks.lock(Uuid::new_v4()).await;
        let _b = locks.lock(Uuid::new_v4()).await;
    }
}
