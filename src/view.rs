//! Mounted-view scope for protected data fetches.
//!
//! A view that goes away before its request resolves must not apply the late
//! result. `ViewScope::run` races the future against unmount and yields `None`
//! once the scope is gone.

use std::future::Future;

use tokio::sync::watch;

pub struct ViewScope {
    unmounted: watch::Sender<bool>,
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewScope {
    #[must_use]
    pub fn new() -> Self {
        Self { unmounted: watch::Sender::new(false) }
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        !*self.unmounted.borrow()
    }

    /// Mark the view as gone. Pending `run` calls resolve to `None`.
    pub fn unmount(&self) {
        self.unmounted.send_if_modified(|gone| !std::mem::replace(gone, true));
    }

    /// Await `fut` unless the scope is unmounted first.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        let mut rx = self.unmounted.subscribe();
        if *rx.borrow_and_update() {
            return None;
        }

        let unmounted = async {
            loop {
                if rx.changed().await.is_err() {
                    // Sender lives as long as `self`; nothing left to wait for.
                    std::future::pending::<()>().await;
                }
                if *rx.borrow_and_update() {
                    break;
                }
            }
        };

        tokio::select! {
            output = fut => self.is_mounted().then_some(output),
            () = unmounted => {
                tracing::debug!("view unmounted; discarding pending result");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "view_test.rs"]
mod tests;
