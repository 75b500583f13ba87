//! `bazaar login` / `bazaar logout`

use std::io::{BufRead, Write};

use bazaar_storefront::error::StorefrontError;
use bazaar_storefront::models::Session;
use bazaar_storefront::services::OtpAuthService;
use bazaar_storefront::wishlist::WishlistMode;

use crate::context::Context;

/// Request a code, read it back from the terminal, then bind the wishlist
/// to the new account.
pub async fn login(ctx: &Context, email: &str) -> Result<(), StorefrontError> {
    if ctx.wishlist.mode() == WishlistMode::Account {
        tracing::info!("Already signed in; run `bazaar logout` first");
        return Ok(());
    }

    let auth = OtpAuthService::new(ctx.config.otp);
    let issued = auth.request_code(email)?;

    // Delivery is mocked: show the code instead of emailing it
    tracing::info!(
        "Your login code for {} is {} (valid until {})",
        issued.email.masked(),
        issued.code(),
        issued.expires_at.format("%H:%M:%S UTC")
    );
    let code = prompt("Enter code: ").unwrap_or_default();

    let session = auth.verify(email, &code)?;
    session.save(ctx.storage.as_ref())?;
    let user_email = session.user.email.clone();

    let report = ctx.wishlist.login(session).await?;
    tracing::info!("Signed in as {user_email}");
    if !report.merged.is_empty() {
        tracing::info!(
            "Saved {} guest wishlist item(s) to your account",
            report.merged.len()
        );
    }
    for product_id in &report.failed {
        tracing::info!("Could not save {product_id} to your account");
    }
    Ok(())
}

pub fn logout(ctx: &Context) -> Result<(), StorefrontError> {
    ctx.wishlist.logout();
    Session::forget(ctx.storage.as_ref())?;
    tracing::info!("Signed out");
    Ok(())
}

/// Read one trimmed line from stdin.
fn prompt(label: &str) -> Option<String> {
    let mut stderr = std::io::stderr();
    // Prompt visibility is best-effort
    let _ = write!(stderr, "{label}");
    let _ = stderr.flush();

    let line = std::io::stdin().lock().lines().next()?.ok()?;
    Some(line.trim().to_owned())
}
