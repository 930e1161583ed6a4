pub mod db;
pub mod entities;
pub mod migration;
pub mod repository;

pub use db::init_db;
pub use repository::{
    ChatRepository, QuotaStore, RepositoryError, SeaOrmChatRepository, DEFAULT_DAILY_LIMIT,
};
