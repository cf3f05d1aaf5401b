use std::time::Duration;

use storefront::{
    error::AppError,
    middleware::auth::{issue_token, verify_token_for},
};

const SECRET: &str = "test-secret";

#[test]
fn supplied_tokens_must_verify_for_the_profile() -> anyhow::Result<()> {
    let token = issue_token(SECRET, "user-1", Duration::from_secs(600))?;
    let user = verify_token_for(SECRET, &token, "user-1")?;
    assert_eq!(user.user_id, "user-1");

    assert!(matches!(
        verify_token_for(SECRET, &token, "user-2"),
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        verify_token_for("other-secret", &token, "user-1"),
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        verify_token_for(SECRET, "not-a-jwt", "user-1"),
        Err(AppError::Unauthorized(_))
    ));
    Ok(())
}
