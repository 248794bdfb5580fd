//! Grant permission command handler

use std::sync::Arc;

use crate::background::BackgroundTasks;
use crate::clock::SystemClock;
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthError, AuthService, AuthSettings, LettreMailer, Permission, SeaOrmAuthService,
};

pub async fn cmd_grant(config: &Config, email: &str, code: &str) -> anyhow::Result<()> {
    let store = Store::from_config(&config.database).await?;
    let tasks = BackgroundTasks::new();

    let auth = SeaOrmAuthService::new(
        store,
        Arc::new(SystemClock),
        Arc::new(LettreMailer::new(&config.mail)?),
        tasks.clone(),
        AuthSettings::from(config),
    );

    match auth.grant_permission_by_email(email, code).await {
        Ok(()) => {
            println!("✓ Granted {code} to {email}");
        }
        Err(AuthError::NotFound) => {
            println!("No user with email {email}.");
        }
        Err(AuthError::UnknownPermission(e)) => {
            println!("{e}");
            println!();
            println!("Known permissions:");
            for permission in Permission::ALL {
                println!("  {permission}");
            }
        }
        Err(e) => return Err(e.into()),
    }

    tasks.shutdown().await;
    Ok(())
}
