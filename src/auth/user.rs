use oso::PolarClass;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub const DRIVER_ROLE: &str = "driver";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub roles: Vec<String>,
}

impl User {
    pub fn anonymous() -> Self {
        Self {
            id: Uuid::nil(),
            roles: vec![],
        }
    }

    pub fn new_driver() -> Self {
        Self {
            id: Uuid::new_v4(),
            roles: vec![DRIVER_ROLE.into()],
        }
    }

    /// Resolves a bearer token against the driver secret. Anything that does
    /// not match yields an anonymous user.
    pub fn from_bearer(token: Option<&str>, driver_secret: &str) -> Self {
        match token {
            Some(token) if !driver_secret.is_empty() && secrets_match(token, driver_secret) => {
                Self::new_driver()
            }
            _ => Self::anonymous(),
        }
    }

    fn has_role(&self, role: String) -> bool {
        self.roles.iter().any(|x| x == &role)
    }
}

// compare digests so the comparison time does not depend on the secret
fn secrets_match(candidate: &str, secret: &str) -> bool {
    Sha256::digest(candidate.as_bytes()) == Sha256::digest(secret.as_bytes())
}

impl PolarClass for User {
    fn get_polar_class_builder() -> oso::ClassBuilder<User> {
        oso::Class::builder()
            .name("User")
            .add_attribute_getter("id", |recv: &User| recv.id)
            .add_attribute_getter("roles", |recv: &User| recv.roles.clone())
            .add_method("has_role", User::has_role)
    }

    fn get_polar_class() -> oso::Class {
        let builder = User::get_polar_class_builder();
        builder.build()
    }
}

#[test]
fn bearer_matching_secret_is_driver_test() {
    let user = User::from_bearer(Some("s3cret"), "s3cret");

    assert!(user.has_role(DRIVER_ROLE.into()));
}

#[test]
fn bearer_mismatch_is_anonymous_test() {
    for token in [Some("wrong"), Some(""), None] {
        let user = User::from_bearer(token, "s3cret");

        assert!(user.roles.is_empty());
        assert!(user.id.is_nil());
    }
}

#[test]
fn empty_secret_never_matches_test() {
    let user = User::from_bearer(Some(""), "");

    assert!(user.roles.is_empty());
}
