use anyhow::Result;
use sea_orm::Database;
use tracing::{error, info};

pub async fn create_admin(
    database_url: &str,
    username: String,
    email: String,
    password: String,
) -> Result<()> {
    info!("Creating administrator account '{}'", username);

    let db = match Database::connect(database_url).await {
        Ok(connection) => connection,
        Err(e) => {
            error!("Failed to connect to database '{}': {}", database_url, e);
            return Err(e.into());
        }
    };

    match model::accounts::create_superuser(&db, username, email, password).await {
        Ok(account) => {
            info!(
                "Administrator account created with ID: {}, username: {}",
                account.id, account.username
            );
            Ok(())
        }
        Err(account_error) => {
            error!("Failed to create administrator account: {}", account_error);
            Err(account_error.into())
        }
    }
}
