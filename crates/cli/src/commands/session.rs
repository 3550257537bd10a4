//! Login, logout and session inspection.
//!
//! # Usage
//!
//! ```bash
//! bs-cli login --token eyJhbGciOi...
//! bs-cli whoami
//! bs-cli logout
//! ```

use buen_sabor_client::SessionPhase;

use crate::app::App;
use crate::telemetry;

/// Store `token` and report who it belongs to.
///
/// A token that does not resolve stays stored but leaves the session signed
/// out, exactly as it would after a restart.
#[allow(clippy::print_stdout)]
pub fn login(app: &mut App, token: &str) -> buen_sabor_client::Result<()> {
    match app.tracker.login(token)? {
        Some(identity) => {
            telemetry::set_sentry_user(&identity);
            println!("Logged in as {} <{}> ({})", identity.name, identity.email, identity.role);
            if identity.first_login {
                println!("First login: remember to complete your profile.");
            }
        }
        None => {
            tracing::warn!("Token did not resolve to a user");
            println!("Not logged in: the token is blank, malformed or expired.");
        }
    }
    Ok(())
}

/// Sign out and empty the cart.
#[allow(clippy::print_stdout)]
pub fn logout(app: &mut App) {
    let was_authenticated = app.tracker.is_authenticated();
    app.tracker.logout();
    telemetry::clear_sentry_user();

    if was_authenticated {
        println!("Logged out.");
    } else {
        println!("Nobody was logged in.");
    }
}

/// Print the current session.
#[allow(clippy::print_stdout)]
pub fn whoami(app: &App) {
    let snapshot = app.tracker.snapshot();
    match (snapshot.phase, snapshot.identity) {
        (SessionPhase::Authenticated, Some(identity)) => {
            println!("{} <{}>", identity.name, identity.email);
            println!("  id:    {}", identity.id);
            if identity.role.is_staff() {
                println!("  role:  {} (staff)", identity.role);
            } else {
                println!("  role:  {}", identity.role);
            }
            if let Some(phone) = identity.phone {
                println!("  phone: {phone}");
            }
            if !identity.active {
                println!("  account is deactivated");
            }
        }
        (phase, _) => println!("Not logged in ({phase:?})."),
    }
}
