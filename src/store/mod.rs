//! In-process stores for user data.
//!
//! Both stores live in memory and are lost on restart. They key everything
//! by the caller's user ID so one user can never see another's data.

pub mod invites;
pub mod library;

pub use invites::{Invite, InviteRegistry};
pub use library::{MediaItem, MediaLibrary, MediaType, NewMediaItem};

use crate::error::ApiError;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("An invite for {0} is already pending")]
    InvitePending(String),
    #[error("Invite has already been redeemed")]
    AlreadyRedeemed,
    #[error("You cannot redeem your own invite")]
    SelfRedeem,
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ApiError::NotFound(err.to_string()),
            StoreError::InvitePending(_) | StoreError::AlreadyRedeemed => {
                ApiError::Conflict(err.to_string())
            }
            StoreError::SelfRedeem => ApiError::Validation(err.to_string()),
        }
    }
}
