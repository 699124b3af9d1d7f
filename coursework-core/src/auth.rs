use std::sync::Arc;

use rand::RngCore;

use coursework_contracts::error::{StoreError, StoreResult};
use coursework_contracts::store::{SessionsRepo, UsersRepo};
use coursework_model::Session;

/// Password and session surface consulted by the mail-auth endpoint and the
/// web frontend. Holds no state of its own beyond its two repositories; all
/// durability lives in Postgres.
#[derive(Clone)]
pub struct AuthGateway {
    users: Arc<dyn UsersRepo>,
    sessions: Arc<dyn SessionsRepo>,
    bcrypt_cost: u32,
    session_ttl_secs: i64,
}

impl AuthGateway {
    pub fn new(users: Arc<dyn UsersRepo>, sessions: Arc<dyn SessionsRepo>, bcrypt_cost: u32, session_ttl_secs: i64) -> Self {
        Self { users, sessions, bcrypt_cost, session_ttl_secs }
    }

    /// `validate(username, password) -> bool`. A user with no pwdhash set
    /// yet (pre-registration) never validates.
    pub async fn validate(&self, username: &str, password: &str) -> StoreResult<bool> {
        let Some(user) = self.users.get(username).await? else {
            return Ok(false);
        };
        let Some(pwdhash) = user.pwdhash else {
            return Ok(false);
        };
        Ok(bcrypt::verify(password, &pwdhash).unwrap_or(false))
    }

    /// `session_from_cookie(token) -> username | nil`, lazily sweeping the
    /// session if it has expired.
    pub async fn session_from_cookie(&self, token: &str, now: i64) -> StoreResult<Option<String>> {
        let Some(session) = self.sessions.get(token).await? else {
            return Ok(None);
        };
        if session.is_expired(now) {
            self.sessions.delete_for_user(&session.username).await?;
            return Ok(None);
        }
        Ok(Some(session.username))
    }

    /// Exchange a `student_id` for `(username, generated_password)`,
    /// atomically filling in the placeholder row's pwdhash.
    pub async fn register(&self, student_id: &str) -> StoreResult<(String, String)> {
        let user = self
            .users
            .get_by_student_id(student_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("no roster entry for student id {student_id}")))?;

        if user.pwdhash.is_some() {
            return Err(StoreError::Conflict(format!("{} has already registered", user.username)));
        }

        let password = generate_password();
        let pwdhash = bcrypt::hash(&password, self.bcrypt_cost)
            .map_err(|err| StoreError::Malformed(format!("password hashing failed: {err}")))?;
        self.users.set_pwdhash(&user.username, &pwdhash).await?;
        Ok((user.username, password))
    }

    /// Issue a fresh session for `username`, superseding any prior one.
    pub async fn issue_session(&self, username: &str, now: i64) -> StoreResult<Session> {
        let session = Session {
            token: generate_token(),
            username: username.to_string(),
            expiry: now + self.session_ttl_secs,
        };
        self.sessions.create(&session).await?;
        Ok(session)
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn generate_password() -> String {
    let mut bytes = [0u8; 12];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use coursework_model::User;

    #[derive(Default)]
    struct FakeUsers {
        rows: Mutex<Vec<User>>,
    }

    #[async_trait]
    impl UsersRepo for FakeUsers {
        async fn get(&self, username: &str) -> StoreResult<Option<User>> {
            Ok(self.rows.lock().unwrap().iter().find(|u| u.username == username).cloned())
        }
        async fn list(&self) -> StoreResult<Vec<User>> {
            Ok(self.rows.lock().unwrap().clone())
        }
        async fn get_by_student_id(&self, student_id: &str) -> StoreResult<Option<User>> {
            Ok(self.rows.lock().unwrap().iter().find(|u| u.student_id.as_deref() == Some(student_id)).cloned())
        }
        async fn set_pwdhash(&self, username: &str, pwdhash: &str) -> StoreResult<()> {
            let mut rows = self.rows.lock().unwrap();
            let user = rows.iter_mut().find(|u| u.username == username).unwrap();
            user.pwdhash = Some(pwdhash.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeSessions {
        rows: Mutex<Vec<Session>>,
    }

    #[async_trait]
    impl SessionsRepo for FakeSessions {
        async fn create(&self, session: &Session) -> StoreResult<()> {
            self.rows.lock().unwrap().push(session.clone());
            Ok(())
        }
        async fn get(&self, token: &str) -> StoreResult<Option<Session>> {
            Ok(self.rows.lock().unwrap().iter().find(|s| s.token == token).cloned())
        }
        async fn delete_for_user(&self, username: &str) -> StoreResult<()> {
            self.rows.lock().unwrap().retain(|s| s.username != username);
            Ok(())
        }
        async fn delete_expired(&self, now: i64) -> StoreResult<u64> {
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|s| !s.is_expired(now));
            Ok((before - rows.len()) as u64)
        }
    }

    fn gateway(users: FakeUsers, sessions: FakeSessions) -> AuthGateway {
        AuthGateway::new(Arc::new(users), Arc::new(sessions), 4, 10_800)
    }

    #[tokio::test]
    async fn register_then_validate_round_trips() {
        let users = FakeUsers::default();
        users.rows.lock().unwrap().push(User { username: "alice".into(), pwdhash: None, student_id: Some("S1".into()), fullname: "Alice".into() });
        let gw = gateway(users, FakeSessions::default());

        let (username, password) = gw.register("S1").await.unwrap();
        assert_eq!(username, "alice");
        assert!(gw.validate("alice", &password).await.unwrap());
        assert!(!gw.validate("alice", "wrong-password").await.unwrap());
    }

    #[tokio::test]
    async fn register_twice_conflicts() {
        let users = FakeUsers::default();
        users.rows.lock().unwrap().push(User { username: "alice".into(), pwdhash: None, student_id: Some("S1".into()), fullname: "Alice".into() });
        let gw = gateway(users, FakeSessions::default());

        gw.register("S1").await.unwrap();
        assert!(matches!(gw.register("S1").await, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn expired_session_is_swept_on_access() {
        let gw = gateway(FakeUsers::default(), FakeSessions::default());
        let session = gw.issue_session("alice", 1_000).await.unwrap();

        assert_eq!(gw.session_from_cookie(&session.token, 1_500).await.unwrap(), Some("alice".to_string()));
        assert_eq!(gw.session_from_cookie(&session.token, 1_000 + 10_800 + 1).await.unwrap(), None);
    }
}
