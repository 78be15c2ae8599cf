//! Competition feedback.

pub mod manager;
pub mod models;

pub use manager::FeedbackManager;
pub use models::{
    Feedback, FeedbackCategory, FeedbackFilter, FeedbackId, FeedbackReview, FeedbackStatus, NewFeedback,
};
