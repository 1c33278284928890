use tokio::sync::watch;

/// Resolve once shutdown has been requested.
///
/// Returns immediately if the flag is already set. A dropped sender counts as
/// shutdown: nobody is left to keep the process running. Cancel safe.
pub async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_returns_when_flag_set() {
        let (tx, mut rx) = watch::channel(false);
        let waiter = tokio::spawn(async move { wait_for_shutdown(&mut rx).await });

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_returns_when_sender_dropped() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), wait_for_shutdown(&mut rx))
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_while_flag_clear() {
        let (_tx, mut rx) = watch::channel(false);
        let result =
            tokio::time::timeout(Duration::from_secs(5), wait_for_shutdown(&mut rx)).await;
        assert!(result.is_err());
    }
}
