use std::sync::Arc;

use cloud_diary::app::App;
use cloud_diary::backend::{AuthSession, EntryStore, StoreFactory, SupabaseAuth, SupabaseEntryStore};
use cloud_diary::config::Config;
use cloud_diary::logging;
use cloud_diary::runtime::Runtime;
use cloud_diary::ui::UI;
use color_eyre::eyre::{eyre, Result};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let config = Config::from_env().map_err(|e| eyre!("Failed to load configuration: {}", e))?;
    logging::init(&config.log_file)?;
    tracing::info!(url = %config.supabase_url, "starting diary client");

    let client = config.http_client()?;
    let auth = Arc::new(SupabaseAuth::new(&config, client.clone()));
    let store_config = config.clone();
    let store_for: StoreFactory = Arc::new(move |session: &AuthSession| {
        let store: Arc<dyn EntryStore> = Arc::new(SupabaseEntryStore::new(
            &store_config,
            client.clone(),
            session.access_token.clone(),
        ));
        store
    });

    let mut app = App::new();
    let mut ui = UI::new()?;
    let result = Runtime::new(auth, store_for).run(&mut app, &mut ui).await;
    drop(ui);

    if let Err(e) = &result {
        tracing::error!("diary client crashed: {:?}", e);
    }
    result
}
