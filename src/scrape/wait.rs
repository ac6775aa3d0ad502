use std::future::Future;
use std::time::{Duration, Instant};

/// Poll `probe` until it yields a value or `timeout` elapses.
///
/// The probe always runs at least once. Probe errors count as "not yet":
/// nodes come and go while the page re-renders.
pub async fn wait_until<T, F, Fut>(timeout: Duration, poll_interval: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<Option<T>>>,
{
    let start = Instant::now();
    loop {
        match probe().await {
            Ok(Some(value)) => return Some(value),
            Ok(None) => {}
            Err(e) => tracing::debug!(error = %e, "Wait probe failed; retrying"),
        }
        if start.elapsed() >= timeout {
            return None;
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Fixed pause for rendering that has no observable completion signal.
pub async fn settle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn returns_first_value() {
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let found = wait_until(Duration::from_secs(1), Duration::from_millis(1), || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok((n >= 2).then_some(n))
        })
        .await;
        assert_eq!(found, Some(2));
    }

    #[tokio::test]
    async fn errors_are_retried_until_timeout() {
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let found: Option<()> = wait_until(Duration::from_millis(10), Duration::from_millis(1), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!("node detached"))
        })
        .await;
        assert_eq!(found, None);
        assert!(calls.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn zero_timeout_still_probes_once() {
        let found = wait_until(Duration::ZERO, Duration::from_millis(1), || async { Ok(Some(7)) }).await;
        assert_eq!(found, Some(7));
    }
}
