use std::sync::Arc;
use std::time::Duration;

use hearth::guard_driver::GuardDriver;
use hearth::prelude::*;

// ---------------------------------------------------------------------------
// Seed data
// ---------------------------------------------------------------------------

struct Account {
    email: &'static str,
    password: &'static str,
    role: Option<&'static str>,
}

const ACCOUNTS: &[Account] = &[
    Account {
        email: "owner@hearth.example",
        password: "owner-pass",
        role: Some("Admin"),
    },
    Account {
        email: "agent@hearth.example",
        password: "agent-pass",
        role: Some("agent"),
    },
    Account {
        email: "buyer@hearth.example",
        password: "buyer-pass",
        role: None,
    },
];

type Provider = InMemorySessionProvider;
type Profiles = InMemoryProfileStore;

fn seed() -> (Arc<Provider>, Arc<Profiles>) {
    let provider = Arc::new(Provider::new());
    let profiles = Arc::new(Profiles::new());
    for account in ACCOUNTS {
        let user = provider.register(account.email, account.password);
        let mut profile = Profile::new(user.id);
        if let Some(role) = account.role {
            profile = profile.with_role(role);
        }
        profiles.insert(profile);
    }
    (provider, profiles)
}

// ---------------------------------------------------------------------------
// Walkthrough
// ---------------------------------------------------------------------------

/// Collects views until the page settles (nothing new for a short while).
async fn settle(page: &mut GuardDriver) -> Vec<GuardView> {
    let mut views = Vec::new();
    while let Ok(Some(view)) =
        tokio::time::timeout(Duration::from_millis(100), page.next_view()).await
    {
        views.push(view);
    }
    views
}

fn describe(view: &GuardView) -> String {
    match view {
        GuardView::Waiting => "waiting".to_string(),
        GuardView::Render => "render back office".to_string(),
        GuardView::Redirect(Redirect {
            to,
            return_to: Some(back),
        }) => format!("redirect to {to} (then {back})"),
        GuardView::Redirect(Redirect { to, return_to: None }) => {
            format!("redirect to {to}")
        }
    }
}

/// Visits `/admin` as `email` and returns the final view.
async fn visit_admin(
    hearth: &Hearth<Provider, Profiles>,
    email: &str,
    password: &str,
) -> Result<Option<GuardView>, HearthError> {
    let mut page = hearth.watch_admin("/admin");
    settle(&mut page).await;

    hearth.actions().sign_in(email, password).await?;
    let views = settle(&mut page).await;
    for view in &views {
        tracing::info!(%email, view = %describe(view), "admin page");
    }
    page.unmount().await;

    if hearth.state().is_authenticated() {
        hearth.actions().sign_out().await?;
    }
    Ok(views.last().cloned())
}

#[tokio::main]
async fn main() -> Result<(), HearthError> {
    hearth::init_tracing();

    let (provider, profiles) = seed();
    let hearth = HearthBuilder::new().start(provider, profiles).await;

    for account in ACCOUNTS {
        let outcome = visit_admin(&hearth, account.email, account.password).await?;
        let summary = outcome.as_ref().map_or_else(|| "nothing".to_string(), describe);
        println!("{:<24} {summary}", account.email);
    }

    hearth.shutdown().await;
    Ok(())
}
