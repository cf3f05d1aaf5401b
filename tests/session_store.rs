use storefront::session::{Session, SessionError, SessionStore};
use tempfile::TempDir;

fn logged_in() -> Session {
    Session {
        user_id: Some("user-1".into()),
        access_token: Some("token-abc".into()),
        first_name: Some("Ana".into()),
        last_name: Some("Lopez".into()),
        address: Some("Calle Falsa 123".into()),
        ..Session::default()
    }
}

#[tokio::test]
async fn missing_file_opens_as_logged_out() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = SessionStore::open(dir.path().join("session.json")).await?;

    assert!(!store.is_logged_in());
    assert_eq!(store.snapshot(), Session::default());
    assert!(!store.path().exists());
    Ok(())
}

#[tokio::test]
async fn saved_session_survives_reopen() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("nested").join("session.json");

    let store = SessionStore::open(&path).await?;
    store.save_session(logged_in()).await?;
    store.save_cart_id(Some(7)).await?;

    let reopened = SessionStore::open(&path).await?;
    assert!(reopened.is_logged_in());
    assert_eq!(reopened.user_id().as_deref(), Some("user-1"));
    assert_eq!(reopened.token().as_deref(), Some("token-abc"));
    assert_eq!(reopened.cart_id(), Some(7));
    assert_eq!(reopened.snapshot(), store.snapshot());
    Ok(())
}

#[tokio::test]
async fn field_setters_update_memory_and_disk() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("session.json");
    let store = SessionStore::open(&path).await?;
    store.save_session(logged_in()).await?;

    store.save_first_name("Maria").await?;
    store.save_phone("555-0100").await?;
    store.save_email("maria@example.com").await?;
    store.save_address("Av. Central 9").await?;

    assert_eq!(store.user_name().as_deref(), Some("Maria Lopez"));
    let reopened = SessionStore::open(&path).await?;
    assert_eq!(reopened.first_name().as_deref(), Some("Maria"));
    assert_eq!(reopened.phone().as_deref(), Some("555-0100"));
    assert_eq!(reopened.email().as_deref(), Some("maria@example.com"));
    assert_eq!(reopened.address().as_deref(), Some("Av. Central 9"));
    assert_eq!(reopened.token().as_deref(), Some("token-abc"));
    Ok(())
}

#[tokio::test]
async fn user_name_needs_both_parts() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = SessionStore::open(dir.path().join("session.json")).await?;

    store.save_first_name("Ana").await?;
    assert_eq!(store.user_name(), None);

    store.save_last_name("Lopez").await?;
    assert_eq!(store.user_name().as_deref(), Some("Ana Lopez"));
    Ok(())
}

#[tokio::test]
async fn clear_resets_and_removes_the_file() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("session.json");
    let store = SessionStore::open(&path).await?;
    store.save_session(logged_in()).await?;
    assert!(path.exists());

    store.clear_session().await?;

    assert!(!path.exists());
    assert!(!store.is_logged_in());
    assert_eq!(store.snapshot(), Session::default());
    // Clearing twice is fine.
    store.clear_session().await?;
    Ok(())
}

#[tokio::test]
async fn corrupt_file_is_reported() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("session.json");
    std::fs::write(&path, b"{not json")?;

    let err = SessionStore::open(&path).await.err();

    assert!(matches!(err, Some(SessionError::Corrupt(_))));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn session_file_is_owner_only() -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new()?;
    let path = dir.path().join("session.json");
    let store = SessionStore::open(&path).await?;
    store.save_session(logged_in()).await?;

    let mode = std::fs::metadata(&path)?.permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    Ok(())
}
