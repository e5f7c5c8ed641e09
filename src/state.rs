use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tokio::sync::Mutex;

use crate::chat::history::ConversationCache;
use crate::chat::llm::ChatModel;
use crate::config::Config;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub jwt_secret: Arc<Vec<u8>>,
    pub llm: Arc<dyn ChatModel>,
    pub conversations: Arc<Mutex<ConversationCache>>,
}

impl AppState {
    pub fn new(db: DbPool, config: Config, jwt_secret: Vec<u8>, llm: Arc<dyn ChatModel>) -> Self {
        let conversations = ConversationCache::new(
            config.chat.history_limit,
            std::time::Duration::from_secs(config.chat.history_ttl_secs),
        );
        Self {
            db,
            config,
            jwt_secret: Arc::new(jwt_secret),
            llm,
            conversations: Arc::new(Mutex::new(conversations)),
        }
    }
}
