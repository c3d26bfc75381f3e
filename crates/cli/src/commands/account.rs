//! Sign-in, sign-out and account commands.

use std::io::BufRead;

use secrecy::SecretString;
use tracing::info;

use super::{CommandResult, Context};

/// Sign in, reading the password from stdin when not supplied.
///
/// # Errors
///
/// Returns an error if the credentials are rejected.
pub async fn login(ctx: &Context, email: &str, password: Option<String>) -> CommandResult {
    let password = match password {
        Some(password) => SecretString::from(password),
        None => {
            info!("Reading password from stdin");
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            SecretString::from(line.trim_end_matches(['\r', '\n']).to_string())
        }
    };

    let user_id = ctx.storefront.account().login(email, &password).await?;
    match user_id {
        Some(user_id) => info!(%user_id, "Signed in"),
        None => info!("Signed in"),
    }
    Ok(())
}

/// Sign out and forget stored credentials.
pub async fn logout(ctx: &Context) -> CommandResult {
    ctx.storefront.account().logout().await;
    Ok(())
}

/// Show the signed-in user's profile.
///
/// # Errors
///
/// Returns an error if not signed in or the profile cannot be fetched.
#[allow(clippy::print_stdout)]
pub async fn whoami(ctx: &Context) -> CommandResult {
    if !ctx.storefront.account().is_authenticated() {
        return Err("Not signed in, run `tl login` first".into());
    }

    let profile = ctx.storefront.account().profile().await?;
    println!("{} <{}>", profile.name, profile.email);
    println!("  id:    {}", profile.id);
    if let Some(phone) = &profile.phone {
        println!("  phone: {phone}");
    }
    if profile.is_admin {
        println!("  role:  admin");
    }
    Ok(())
}

/// List the signed-in user's orders.
///
/// # Errors
///
/// Returns an error if the orders cannot be fetched.
#[allow(clippy::print_stdout)]
pub async fn orders(ctx: &Context) -> CommandResult {
    let orders = ctx.storefront.account().orders().await?;
    if orders.is_empty() {
        println!("No orders yet");
        return Ok(());
    }

    for order in orders {
        let placed = order
            .created_at
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!(
            "{:<26} {:>10}  {:<10} {:<5} {placed}",
            order.id,
            order.total,
            order.status,
            order.payment_method,
        );
    }
    Ok(())
}
