pub mod mysql;

pub use mysql::{create_mysql_pool, DbPool};
