//! Invite codes.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::store::StoreError;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Invite {
    pub code: String,
    pub email: String,
    pub invited_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeemed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeemed_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct InviteRegistry {
    by_code: DashMap<String, Invite>,
    /// Unredeemed invites: email -> code.
    pending: DashMap<String, String>,
}

impl InviteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a code for `email`. At most one unredeemed invite per address.
    pub fn create(&self, invited_by: &str, email: &str) -> Result<Invite, StoreError> {
        self.create_with(invited_by, email, new_code)
    }

    fn create_with(
        &self,
        invited_by: &str,
        email: &str,
        mut next_code: impl FnMut() -> String,
    ) -> Result<Invite, StoreError> {
        let email = email.trim().to_ascii_lowercase();

        // Holding the pending slot serializes creates for one address.
        let slot = match self.pending.entry(email.clone()) {
            Entry::Occupied(_) => return Err(StoreError::InvitePending(email)),
            Entry::Vacant(slot) => slot,
        };

        let invite = loop {
            match self.by_code.entry(next_code()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(vacant) => {
                    let invite = Invite {
                        code: vacant.key().clone(),
                        email,
                        invited_by: invited_by.to_string(),
                        created_at: Utc::now(),
                        redeemed_by: None,
                        redeemed_at: None,
                    };
                    vacant.insert(invite.clone());
                    break invite;
                }
            }
        };

        slot.insert(invite.code.clone());
        Ok(invite)
    }

    pub fn redeem(&self, code: &str, user_id: &str) -> Result<Invite, StoreError> {
        let code = code.trim().to_ascii_uppercase();
        let redeemed = {
            let mut invite = self
                .by_code
                .get_mut(&code)
                .ok_or(StoreError::NotFound("Invite"))?;

            if invite.redeemed_by.is_some() {
                return Err(StoreError::AlreadyRedeemed);
            }
            if invite.invited_by == user_id {
                return Err(StoreError::SelfRedeem);
            }

            invite.redeemed_by = Some(user_id.to_string());
            invite.redeemed_at = Some(Utc::now());
            invite.clone()
        };

        // create() locks pending before by_code; the code guard is released by now.
        self.pending
            .remove_if(&redeemed.email, |_, pending| *pending == redeemed.code);
        Ok(redeemed)
    }

    pub fn get(&self, code: &str) -> Option<Invite> {
        self.by_code
            .get(&code.trim().to_ascii_uppercase())
            .map(|invite| invite.clone())
    }
}

fn new_code() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_ascii_uppercase()
}

/// Loose address check: one `@`, a dotted domain, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.is_empty() || email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_pending_invite_per_email() {
        let invites = InviteRegistry::new();
        let first = invites.create("alice", "Friend@Example.com").unwrap();
        assert_eq!(first.email, "friend@example.com");
        assert_eq!(first.code.len(), 8);

        assert_eq!(
            invites.create("bob", "friend@example.com "),
            Err(StoreError::InvitePending("friend@example.com".into()))
        );

        invites.redeem(&first.code, "friend").unwrap();
        assert!(invites.create("bob", "friend@example.com").is_ok());
    }

    #[test]
    fn redeem_rules() {
        let invites = InviteRegistry::new();
        let invite = invites.create("alice", "x@y.io").unwrap();

        assert_eq!(invites.redeem("nope", "bob"), Err(StoreError::NotFound("Invite")));
        assert_eq!(invites.redeem(&invite.code, "alice"), Err(StoreError::SelfRedeem));

        let redeemed = invites.redeem(&invite.code.to_ascii_lowercase(), "bob").unwrap();
        assert_eq!(redeemed.redeemed_by.as_deref(), Some("bob"));
        assert_eq!(invites.redeem(&invite.code, "carol"), Err(StoreError::AlreadyRedeemed));
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a b@c.co"));
        assert!(!is_valid_email("a@b@c.co"));
        assert!(!is_valid_email("a@.co"));
    }

    #[test]
    fn concurrent_creates_issue_one_invite() {
        use std::sync::{Arc, Barrier};

        let invites = Arc::new(InviteRegistry::new());
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let invites = invites.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    invites.create(&format!("user-{i}"), "race@example.com")
                })
            })
            .collect();

        let created = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Result::is_ok)
            .count();
        assert_eq!(created, 1);
        assert_eq!(invites.by_code.len(), 1);
    }

    #[test]
    fn colliding_code_is_regenerated() {
        let invites = InviteRegistry::new();
        let mut codes = ["AAAAAAAA", "AAAAAAAA", "BBBBBBBB"].into_iter();
        let mut next = || codes.next().unwrap().to_string();

        let first = invites.create_with("alice", "one@example.com", &mut next).unwrap();
        let second = invites.create_with("alice", "two@example.com", &mut next).unwrap();

        assert_eq!(first.code, "AAAAAAAA");
        assert_eq!(second.code, "BBBBBBBB");
        assert_eq!(invites.get("AAAAAAAA").unwrap().email, "one@example.com");
    }
}
