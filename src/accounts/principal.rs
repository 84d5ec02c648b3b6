//! The requesting principal: anonymous or an authenticated user.
//!
//! Modeled as a tagged enum rather than a nullable user so the feature-set
//! accessor is total and no caller can forget the anonymous branch.

use super::error::ApiError;
use super::features::{Feature, FeatureSet, anonymous_features};
use super::session::Session;
use super::user::User;

#[derive(Clone, Debug)]
pub enum Principal {
    Anonymous,
    Authenticated { user: User, session: Session },
}

impl Principal {
    /// The feature set on whose behalf this request executes.
    #[must_use]
    pub fn features(&self) -> FeatureSet {
        match self {
            Self::Anonymous => anonymous_features(),
            Self::Authenticated { user, .. } => user.features.clone(),
        }
    }

    #[must_use]
    pub fn can(&self, feature: Feature) -> bool {
        self.features().contains(feature)
    }

    /// Capability gate run before any mutation; 403 names the missing
    /// feature.
    pub fn require(&self, feature: Feature) -> Result<(), ApiError> {
        if self.can(feature) {
            Ok(())
        } else {
            Err(ApiError::missing_feature(feature))
        }
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { session, .. } => Some(session),
        }
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { user, .. } => Some(user),
        }
    }
}
