//! Interactive completion of whatever the command line and config file left out.

use dialoguer::{Input, Password};
use harvester_engine::Credentials;

use crate::config::RunConfig;

pub struct RunInputs {
    pub api_url: String,
    pub credentials: Credentials,
}

/// Fills in missing values. The password is moved out of `config`, so after
/// this call it lives only in the returned credentials.
pub fn complete(config: &mut RunConfig) -> dialoguer::Result<RunInputs> {
    let username = match &config.username {
        Some(name) => name.clone(),
        None => Input::<String>::new()
            .with_prompt("bot username (user@botname)")
            .interact_text()?,
    };
    let password = match config.password.take() {
        Some(secret) => secret,
        None => Password::new()
            .with_prompt("bot password (from Special:BotPasswords)")
            .interact()?,
    };
    let api_url = match &config.api_url {
        Some(url) => url.clone(),
        None => Input::<String>::new()
            .with_prompt("api url (ends in /api.php)")
            .interact_text()?,
    };

    Ok(RunInputs {
        api_url: api_url.trim().to_string(),
        credentials: Credentials::new(username.trim(), password),
    })
}
