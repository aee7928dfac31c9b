//! Session commands

use afasa_core::resources::queries;
use afasa_core::QuerySnapshot;
use afasa_domain::Result;

use super::read;
use crate::context::ConsoleContext;
use crate::utils::execute_command;

/// Authorization URL to send the operator to, with its CSRF state
pub fn begin_sign_in(ctx: &ConsoleContext) -> (String, String) {
    ctx.sign_in_url()
}

pub async fn finish_sign_in(ctx: &ConsoleContext, code: &str, state: &str) -> Result<()> {
    execute_command("session::finish_sign_in", || ctx.complete_sign_in(code, state)).await
}

/// Sign out and return the identity provider's end-session URL
pub fn sign_out(ctx: &ConsoleContext) -> String {
    ctx.sign_out()
}

/// Profile of the signed-in operator
pub async fn current_user(ctx: &ConsoleContext) -> Result<QuerySnapshot> {
    execute_command("session::current_user", || async { read(ctx, &queries::current_user()).await }).await
}
