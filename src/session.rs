//! Local key-value session persisted as a JSON file.
//!
//! Holds the signed-in user's id, bearer token, cached profile fields and
//! active cart id. The file is plaintext; on Unix it is restricted to the
//! owner.
use std::{
    io,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

use crate::models::{CartId, UserProfile};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file error: {0}")]
    Io(#[from] io::Error),

    #[error("session file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Option<String>,
    pub access_token: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    pub cart_id: Option<CartId>,
}

impl Session {
    pub fn from_profile(access_token: &str, profile: &UserProfile, cart_id: Option<CartId>) -> Self {
        Self {
            user_id: Some(profile.user_id.clone()),
            access_token: Some(access_token.to_string()),
            first_name: Some(profile.first_name.clone()),
            last_name: Some(profile.last_name.clone()),
            phone: profile.phone.clone(),
            address: profile.address.clone(),
            email: profile.email.clone(),
            is_admin: profile.is_admin,
            cart_id,
        }
    }
}

pub struct SessionStore {
    path: PathBuf,
    state: RwLock<Session>,
}

impl SessionStore {
    /// Loads the session at `path`; a missing file is an empty session.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let session = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Session::default(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            state: RwLock::new(session),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Session {
        self.read(Clone::clone)
    }

    pub fn user_id(&self) -> Option<String> {
        self.read(|s| s.user_id.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.read(|s| s.access_token.clone())
    }

    pub fn is_logged_in(&self) -> bool {
        self.read(|s| s.access_token.is_some() && s.user_id.is_some())
    }

    /// `"first last"`, only when both parts are known.
    pub fn user_name(&self) -> Option<String> {
        self.read(|s| match (&s.first_name, &s.last_name) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            _ => None,
        })
    }

    pub fn first_name(&self) -> Option<String> {
        self.read(|s| s.first_name.clone())
    }

    pub fn last_name(&self) -> Option<String> {
        self.read(|s| s.last_name.clone())
    }

    pub fn phone(&self) -> Option<String> {
        self.read(|s| s.phone.clone())
    }

    pub fn address(&self) -> Option<String> {
        self.read(|s| s.address.clone())
    }

    pub fn email(&self) -> Option<String> {
        self.read(|s| s.email.clone())
    }

    pub fn is_admin(&self) -> bool {
        self.read(|s| s.is_admin)
    }

    pub fn cart_id(&self) -> Option<CartId> {
        self.read(|s| s.cart_id)
    }

    pub async fn save_session(&self, session: Session) -> Result<(), SessionError> {
        self.persist(&session).await?;
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = session;
        Ok(())
    }

    /// Forgets everything and removes the file.
    pub async fn clear_session(&self) -> Result<(), SessionError> {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Session::default();
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn save_first_name(&self, first_name: &str) -> Result<(), SessionError> {
        self.update(|s| s.first_name = Some(first_name.to_string()))
            .await
    }

    pub async fn save_last_name(&self, last_name: &str) -> Result<(), SessionError> {
        self.update(|s| s.last_name = Some(last_name.to_string()))
            .await
    }

    pub async fn save_phone(&self, phone: &str) -> Result<(), SessionError> {
        self.update(|s| s.phone = Some(phone.to_string())).await
    }

    pub async fn save_address(&self, address: &str) -> Result<(), SessionError> {
        self.update(|s| s.address = Some(address.to_string())).await
    }

    pub async fn save_email(&self, email: &str) -> Result<(), SessionError> {
        self.update(|s| s.email = Some(email.to_string())).await
    }

    pub async fn save_cart_id(&self, cart_id: Option<CartId>) -> Result<(), SessionError> {
        self.update(|s| s.cart_id = cart_id).await
    }

    fn read<T>(&self, f: impl FnOnce(&Session) -> T) -> T {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    async fn update(&self, f: impl FnOnce(&mut Session)) -> Result<(), SessionError> {
        let mut session = self.snapshot();
        f(&mut session);
        self.save_session(session).await
    }

    async fn persist(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(session)?;
        fs::write(&self.path, bytes).await?;
        restrict_permissions(&self.path).await?;
        Ok(())
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}
