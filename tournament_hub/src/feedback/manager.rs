//! Feedback manager: submission, listing and admin review.

use chrono::Utc;
use std::sync::Arc;

use super::models::{Feedback, FeedbackFilter, FeedbackId, FeedbackReview, NewFeedback};
use crate::{
    auth::Principal,
    competition::{CoordinatorError, CoordinatorResult},
    db::Store,
};

/// Feedback manager
#[derive(Clone)]
pub struct FeedbackManager {
    store: Arc<dyn Store>,
}

impl FeedbackManager {
    /// Create a new feedback manager
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    fn require_admin(principal: &Principal, action: &str) -> CoordinatorResult<()> {
        if principal.is_admin() {
            Ok(())
        } else {
            log::warn!("User {} denied {} (admin only)", principal.id, action);
            Err(CoordinatorError::Forbidden(format!("Only admins may {action}")))
        }
    }

    /// Submit feedback on a competition
    ///
    /// # Errors
    ///
    /// * `CoordinatorError::Validation` - Rating or comment out of range
    /// * `CoordinatorError::CompetitionNotFound` - Unknown competition
    /// * `CoordinatorError::Conflict` - Caller already left feedback on it
    pub async fn submit(&self, principal: &Principal, new: NewFeedback) -> CoordinatorResult<Feedback> {
        new.validate().map_err(CoordinatorError::Validation)?;

        if self.store.get_competition(new.competition_id).await?.is_none() {
            return Err(CoordinatorError::CompetitionNotFound(new.competition_id));
        }

        let feedback = self.store.insert_feedback(principal.id, &new, Utc::now()).await?;
        log::info!(
            "Feedback {} submitted for competition {} by user {}",
            feedback.id,
            feedback.competition_id,
            principal.id
        );
        Ok(feedback)
    }

    /// List feedback (admin only)
    pub async fn list(&self, principal: &Principal, filter: &FeedbackFilter) -> CoordinatorResult<Vec<Feedback>> {
        Self::require_admin(principal, "list feedback")?;
        Ok(self.store.list_feedback(filter).await?)
    }

    /// Get one feedback entry (author or admin)
    pub async fn get(&self, principal: &Principal, id: FeedbackId) -> CoordinatorResult<Feedback> {
        let feedback = self
            .store
            .get_feedback(id)
            .await?
            .ok_or(CoordinatorError::FeedbackNotFound(id))?;

        if feedback.user_id != principal.id && !principal.is_admin() {
            return Err(CoordinatorError::Forbidden(
                "Only the author or an admin may view this feedback".to_string(),
            ));
        }
        Ok(feedback)
    }

    /// Update status or respond to feedback (admin only)
    pub async fn review(
        &self,
        principal: &Principal,
        id: FeedbackId,
        review: FeedbackReview,
    ) -> CoordinatorResult<Feedback> {
        Self::require_admin(principal, "review feedback")?;

        let mut feedback = self
            .store
            .get_feedback(id)
            .await?
            .ok_or(CoordinatorError::FeedbackNotFound(id))?;

        if let Some(status) = review.status {
            feedback.status = status;
        }
        if let Some(response) = review.admin_response {
            feedback.admin_response = Some(response);
        }
        feedback.updated_at = Utc::now();

        self.store.save_feedback(&feedback).await?;
        Ok(feedback)
    }

    /// Delete feedback (admin only)
    pub async fn delete(&self, principal: &Principal, id: FeedbackId) -> CoordinatorResult<()> {
        Self::require_admin(principal, "delete feedback")?;

        if !self.store.delete_feedback(id).await? {
            return Err(CoordinatorError::FeedbackNotFound(id));
        }
        log::info!("Feedback {} deleted by user {}", id, principal.id);
        Ok(())
    }
}
