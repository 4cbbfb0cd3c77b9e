//! Runs guards against live auth state.
//!
//! A guard on its own is a pure state machine. A driver is the task that
//! mounts one: it re-evaluates the guard every time [`AuthState`] changes,
//! publishes each new [`GuardView`] on a channel, and runs the side effect
//! the admin guard asks for.
//!
//! ```text
//! watch::Receiver<AuthState> ──→ driver task ──→ evaluate() ──→ GuardView channel
//!                                                    │
//!                                                    └─ effect ──→ spawned sign-out
//!                                                                       │
//!                                               still mounted? ──→ Redirect
//! ```
//!
//! Consecutive identical views are sent once.

use hearth_guard::{AdminGuard, GuardEffect, GuardInput, GuardView, Redirect, RouteGuard};
use hearth_provider::{ProfileStore, SessionProvider};
use hearth_session::{AuthActions, AuthState, SessionStore};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Handle to a mounted guard.
///
/// Dropping it unmounts the guard in the background;
/// [`unmount`](Self::unmount) does the same and waits for the driver task
/// to finish.
pub struct GuardDriver {
    views: mpsc::UnboundedReceiver<GuardView>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl GuardDriver {
    fn spawn<F>(
        views: mpsc::UnboundedReceiver<GuardView>,
        run: impl FnOnce(oneshot::Receiver<()>) -> F,
    ) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (stop, stopped) = oneshot::channel();
        Self {
            views,
            stop: Some(stop),
            task: Some(tokio::spawn(run(stopped))),
        }
    }

    /// Waits for the next view. Returns `None` once the driver and any
    /// sign-out it started have finished and every queued view is read.
    pub async fn next_view(&mut self) -> Option<GuardView> {
        self.views.recv().await
    }

    /// Returns the next view if one is already queued.
    pub fn try_next_view(&mut self) -> Option<GuardView> {
        self.views.try_recv().ok()
    }

    /// Unmounts the guard.
    ///
    /// After this returns the guard has been dropped, so a denial sign-out
    /// still in flight will not navigate when it completes. Views already
    /// queued can still be read.
    pub async fn unmount(&mut self) {
        drop(self.stop.take());
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

/// Mounts `guard` for `path` over the store's auth state.
pub fn drive_route_guard<P, S>(
    store: &SessionStore<P, S>,
    guard: RouteGuard,
    path: impl Into<String>,
) -> GuardDriver
where
    P: SessionProvider,
    S: ProfileStore,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let state = store.subscribe();
    let path = path.into();
    GuardDriver::spawn(rx, move |stop| run_route_guard(guard, path, state, tx, stop))
}

/// Mounts `guard` for `path`. A denial signs out through `actions`.
pub fn drive_admin_guard<P, S>(
    actions: &AuthActions<P, S>,
    guard: AdminGuard,
    path: impl Into<String>,
) -> GuardDriver
where
    P: SessionProvider,
    S: ProfileStore,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let actions = actions.clone();
    let path = path.into();
    GuardDriver::spawn(rx, move |stop| run_admin_guard(actions, guard, path, tx, stop))
}

// ---------------------------------------------------------------------------
// Driver loops
// ---------------------------------------------------------------------------

/// Sends `view` unless it repeats the previous one.
fn publish(tx: &mpsc::UnboundedSender<GuardView>, last: &mut Option<GuardView>, view: GuardView) {
    if last.as_ref() == Some(&view) {
        return;
    }
    let _ = tx.send(view.clone());
    *last = Some(view);
}

/// Waits for the next state change. Returns `false` when the driver
/// should stop.
async fn next_change(
    state: &mut watch::Receiver<AuthState>,
    stop: &mut oneshot::Receiver<()>,
) -> bool {
    tokio::select! {
        _ = stop => false,
        changed = state.changed() => changed.is_ok(),
    }
}

async fn run_route_guard(
    guard: RouteGuard,
    path: String,
    mut state: watch::Receiver<AuthState>,
    tx: mpsc::UnboundedSender<GuardView>,
    mut stop: oneshot::Receiver<()>,
) {
    let mut last = None;
    loop {
        let input = GuardInput::from(&*state.borrow_and_update());
        let decision = guard.evaluate(&input, &path);
        publish(&tx, &mut last, decision.view);

        if !next_change(&mut state, &mut stop).await {
            break;
        }
    }
    tracing::debug!(%path, "route guard unmounted");
}

async fn run_admin_guard<P, S>(
    actions: AuthActions<P, S>,
    mut guard: AdminGuard,
    path: String,
    tx: mpsc::UnboundedSender<GuardView>,
    mut stop: oneshot::Receiver<()>,
) where
    P: SessionProvider,
    S: ProfileStore,
{
    let mut state = actions.store().subscribe();
    let mut last = None;
    loop {
        let input = GuardInput::from(&*state.borrow_and_update());
        let decision = guard.evaluate(&input, &path);

        if let Some(GuardEffect::SignOutThenRedirect(redirect)) = decision.effect {
            spawn_denial(&actions, &guard, redirect, tx.clone());
        }
        publish(&tx, &mut last, decision.view);

        if !next_change(&mut state, &mut stop).await {
            break;
        }
    }
    // `guard` drops here, which unmounts it.
    tracing::debug!(%path, "admin guard unmounted");
}

/// Signs out in the background and navigates afterwards if the guard is
/// still mounted. The driver keeps evaluating meanwhile; the guard's latch
/// keeps those evaluations from starting another sign-out.
fn spawn_denial<P, S>(
    actions: &AuthActions<P, S>,
    guard: &AdminGuard,
    redirect: Redirect,
    tx: mpsc::UnboundedSender<GuardView>,
) where
    P: SessionProvider,
    S: ProfileStore,
{
    let actions = actions.clone();
    let mount = guard.mount_token();
    tokio::spawn(async move {
        if let Err(e) = actions.sign_out().await {
            tracing::warn!(error = %e, "denial sign-out failed at the provider");
        }
        if mount.is_mounted() {
            let _ = tx.send(GuardView::Redirect(redirect));
        } else {
            tracing::debug!(
                to = %redirect.to,
                "guard unmounted during sign-out, skipping redirect"
            );
        }
    });
}
