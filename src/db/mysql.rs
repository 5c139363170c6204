use crate::config::Config;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};

pub type DbPool = DatabaseConnection;

pub async fn create_mysql_pool(config: &Config) -> Result<DbPool, anyhow::Error> {
    let url = config.mysql_url();
    let db = Database::connect(&url).await?;

    // Schema bootstrap with raw SQL. Every join table carries a unique key
    // on its pair so duplicate inserts fail at the store, which is the
    // atomicity boundary for concurrent toggle calls.
    let sql = r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            email VARCHAR(255) UNIQUE NOT NULL,
            username VARCHAR(150) UNIQUE NOT NULL,
            first_name VARCHAR(150) NOT NULL,
            last_name VARCHAR(150) NOT NULL,
            password_hash VARCHAR(255) NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            is_staff BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS ingredients (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            name VARCHAR(200) UNIQUE NOT NULL,
            measurement_unit VARCHAR(64) NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tags (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            name VARCHAR(50) UNIQUE NOT NULL,
            color VARCHAR(7) NOT NULL,
            slug VARCHAR(50) UNIQUE NOT NULL
        );

        CREATE TABLE IF NOT EXISTS recipes (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            author_id BIGINT NOT NULL,
            name VARCHAR(200) NOT NULL,
            text TEXT NOT NULL,
            cooking_time INT NOT NULL,
            image MEDIUMBLOB NOT NULL,
            pub_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE,
            INDEX idx_author_id (author_id),
            INDEX idx_pub_date (pub_date)
        );

        CREATE TABLE IF NOT EXISTS recipe_tags (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            recipe_id BIGINT NOT NULL,
            tag_id BIGINT NOT NULL,
            UNIQUE KEY unique_recipe_tag (recipe_id, tag_id),
            FOREIGN KEY (recipe_id) REFERENCES recipes(id) ON DELETE CASCADE,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE,
            INDEX idx_tag_id (tag_id)
        );

        CREATE TABLE IF NOT EXISTS recipe_ingredients (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            recipe_id BIGINT NOT NULL,
            ingredient_id BIGINT NOT NULL,
            amount INT NOT NULL,
            UNIQUE KEY unique_recipe_ingredient (recipe_id, ingredient_id),
            FOREIGN KEY (recipe_id) REFERENCES recipes(id) ON DELETE CASCADE,
            FOREIGN KEY (ingredient_id) REFERENCES ingredients(id) ON DELETE CASCADE,
            INDEX idx_ingredient_id (ingredient_id)
        );

        CREATE TABLE IF NOT EXISTS favorites (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            user_id BIGINT NOT NULL,
            recipe_id BIGINT NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            UNIQUE KEY unique_user_recipe (user_id, recipe_id),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (recipe_id) REFERENCES recipes(id) ON DELETE CASCADE,
            INDEX idx_recipe_id (recipe_id)
        );

        CREATE TABLE IF NOT EXISTS shopping_cart (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            user_id BIGINT NOT NULL,
            recipe_id BIGINT NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            UNIQUE KEY unique_user_recipe (user_id, recipe_id),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (recipe_id) REFERENCES recipes(id) ON DELETE CASCADE,
            INDEX idx_recipe_id (recipe_id)
        );

        CREATE TABLE IF NOT EXISTS subscriptions (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            follower_id BIGINT NOT NULL,
            following_id BIGINT NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            UNIQUE KEY unique_follower_following (follower_id, following_id),
            FOREIGN KEY (follower_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (following_id) REFERENCES users(id) ON DELETE CASCADE,
            INDEX idx_following_id (following_id)
        );
    "#;

    for statement in sql.split(';') {
        let statement = statement.trim();
        if !statement.is_empty() {
            let stmt = sea_orm::Statement::from_string(
                sea_orm::DatabaseBackend::MySql,
                statement.to_string(),
            );
            db.execute(stmt).await?;
        }
    }

    Ok(db)
}
