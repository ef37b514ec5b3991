//! In-memory user repository.

use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::domain::identity::{NewUser, User};
use crate::ports::UserRepository;

pub struct InMemoryUserRepository {
    users: RwLock<Vec<User>>,
    next_id: AtomicI64,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Seeds a user directly, admin flag included. Test setup only.
    pub fn seed(&self, new_user: NewUser, is_admin: bool) -> User {
        let user = User {
            id: UserId::new(self.next_id.fetch_add(1, Ordering::SeqCst)),
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            is_admin,
            home_branch_id: new_user.home_branch_id,
            created_at: Timestamp::now(),
        };
        self.users.write().expect("users lock poisoned").push(user.clone());
        user
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User, DomainError> {
        {
            let users = self.users.read().expect("users lock poisoned");
            if users.iter().any(|u| u.username == new_user.username) {
                return Err(DomainError::conflict("username already taken"));
            }
            if users.iter().any(|u| u.email == new_user.email) {
                return Err(DomainError::conflict("email already registered"));
            }
        }
        Ok(self.seed(new_user, false))
    }

    async fn find_by_id(&self, id: UserId) -> Result<User, DomainError> {
        self.users
            .read()
            .expect("users lock poisoned")
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("user not found"))
    }

    async fn find_by_username_or_email(&self, key: &str) -> Result<User, DomainError> {
        self.users
            .read()
            .expect("users lock poisoned")
            .iter()
            .find(|u| u.username == key || u.email == key)
            .cloned()
            .ok_or_else(|| DomainError::not_found("user not found"))
    }

    async fn list(&self) -> Result<Vec<User>, DomainError> {
        Ok(self.users.read().expect("users lock poisoned").clone())
    }
}
