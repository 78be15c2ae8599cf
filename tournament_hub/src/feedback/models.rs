//! Feedback data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::{auth::UserId, competition::CompetitionId};

/// Feedback ID type
pub type FeedbackId = i64;

/// Maximum comment length in characters
pub const MAX_COMMENT_LEN: usize = 500;

/// Feedback category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackCategory {
    Organization,
    Venue,
    Scheduling,
    Refereeing,
    Other,
}

impl FeedbackCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackCategory::Organization => "organization",
            FeedbackCategory::Venue => "venue",
            FeedbackCategory::Scheduling => "scheduling",
            FeedbackCategory::Refereeing => "refereeing",
            FeedbackCategory::Other => "other",
        }
    }
}

impl FromStr for FeedbackCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "organization" => Ok(FeedbackCategory::Organization),
            "venue" => Ok(FeedbackCategory::Venue),
            "scheduling" => Ok(FeedbackCategory::Scheduling),
            "refereeing" => Ok(FeedbackCategory::Refereeing),
            "other" => Ok(FeedbackCategory::Other),
            other => Err(format!("unknown feedback category '{other}'")),
        }
    }
}

impl fmt::Display for FeedbackCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review status of a feedback entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    #[default]
    Pending,
    Reviewed,
    Resolved,
}

impl FeedbackStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackStatus::Pending => "pending",
            FeedbackStatus::Reviewed => "reviewed",
            FeedbackStatus::Resolved => "resolved",
        }
    }
}

impl FromStr for FeedbackStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(FeedbackStatus::Pending),
            "reviewed" => Ok(FeedbackStatus::Reviewed),
            "resolved" => Ok(FeedbackStatus::Resolved),
            other => Err(format!("unknown feedback status '{other}'")),
        }
    }
}

impl fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feedback left by a user on a competition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: FeedbackId,
    pub competition_id: CompetitionId,
    pub user_id: UserId,
    /// 1 to 5
    pub rating: u8,
    pub comment: String,
    pub category: FeedbackCategory,
    pub status: FeedbackStatus,
    pub admin_response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Feedback submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFeedback {
    pub competition_id: CompetitionId,
    pub rating: u8,
    pub comment: String,
    pub category: FeedbackCategory,
}

impl NewFeedback {
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=5).contains(&self.rating) {
            return Err("Rating must be between 1 and 5".to_string());
        }
        let len = self.comment.trim().chars().count();
        if len == 0 {
            return Err("Comment is required".to_string());
        }
        if len > MAX_COMMENT_LEN {
            return Err(format!("Comment must be at most {MAX_COMMENT_LEN} characters"));
        }
        Ok(())
    }
}

/// Admin review of a feedback entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackReview {
    pub status: Option<FeedbackStatus>,
    pub admin_response: Option<String>,
}

/// Listing filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackFilter {
    pub competition_id: Option<CompetitionId>,
    pub status: Option<FeedbackStatus>,
    pub category: Option<FeedbackCategory>,
}

impl FeedbackFilter {
    pub fn matches(&self, feedback: &Feedback) -> bool {
        self.competition_id.is_none_or(|id| feedback.competition_id == id)
            && self.status.is_none_or(|s| feedback.status == s)
            && self.category.is_none_or(|c| feedback.category == c)
    }
}
