//! Salted password hashing. Work runs on the blocking pool so request
//! handling threads never stall on bcrypt.

use anyhow::Context;

pub async fn hash(password: String, cost: u32) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .context("password hashing task failed")?
        .context("failed to hash password")
}

pub async fn verify(password: String, password_hash: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &password_hash))
        .await
        .context("password verification task failed")?
        .context("failed to verify password")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_is_salted_and_verifiable() {
        let first = hash("password123".to_string(), 4).await.unwrap();
        let second = hash("password123".to_string(), 4).await.unwrap();

        assert_ne!(first, "password123");
        assert_ne!(first, second);
        assert!(verify("password123".to_string(), first.clone()).await.unwrap());
        assert!(!verify("wrongpassword".to_string(), first).await.unwrap());
    }

    #[tokio::test]
    async fn garbage_hash_is_an_error() {
        assert!(verify("password123".to_string(), "not-a-hash".to_string())
            .await
            .is_err());
    }
}
