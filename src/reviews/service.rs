use crate::auth::models::Role;
use crate::reviews::{
    CreateReviewRequest, RatingCalculator, Review, ReviewRepository, ServiceError,
    UpdateReviewRequest,
};
use validator::Validate;

/// Service layer for review business logic
#[derive(Clone)]
pub struct ReviewService {
    repository: ReviewRepository,
    rating_calculator: RatingCalculator,
}

impl ReviewService {
    pub fn new(repository: ReviewRepository, rating_calculator: RatingCalculator) -> Self {
        Self {
            repository,
            rating_calculator,
        }
    }

    fn can_modify(review_user_id: i32, user_id: i32, role: Role) -> bool {
        review_user_id == user_id || role == Role::Admin
    }

    /// Create a new review.
    ///
    /// The tour id comes from the nested route when present, otherwise from
    /// the body. One review per user per tour; the tour must exist. The
    /// tour's rating aggregate is recalculated afterwards.
    pub async fn create_review(
        &self,
        user_id: i32,
        path_tour_id: Option<i32>,
        request: CreateReviewRequest,
    ) -> Result<Review, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(format!("Validation failed: {}", e)))?;

        let tour_id = path_tour_id.or(request.tour_id).ok_or_else(|| {
            ServiceError::ValidationError("tour_id is required".to_string())
        })?;

        if !self.repository.tour_exists(tour_id).await? {
            return Err(ServiceError::TourNotFound);
        }

        if self
            .repository
            .find_by_user_and_tour(user_id, tour_id)
            .await?
            .is_some()
        {
            return Err(ServiceError::DuplicateReview);
        }

        let review = self
            .repository
            .create(user_id, tour_id, request.rating, &request.review)
            .await?;

        self.rating_calculator.recalculate(tour_id).await?;

        Ok(review)
    }

    /// Update a review. Allowed for its author and for admins; the tour's
    /// rating aggregate is recalculated when the rating changed.
    pub async fn update_review(
        &self,
        review_id: i32,
        user_id: i32,
        role: Role,
        request: UpdateReviewRequest,
    ) -> Result<Review, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(format!("Validation failed: {}", e)))?;

        let existing = self
            .repository
            .find_by_id(review_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        if !Self::can_modify(existing.user_id, user_id, role) {
            return Err(ServiceError::Forbidden);
        }

        let updated = self
            .repository
            .update(review_id, request.rating, request.review.as_deref())
            .await?;

        if request.rating.is_some() && request.rating != Some(existing.rating) {
            self.rating_calculator.recalculate(existing.tour_id).await?;
        }

        Ok(updated)
    }

    /// Delete a review (author or admin) and recalculate the tour aggregate.
    pub async fn delete_review(
        &self,
        review_id: i32,
        user_id: i32,
        role: Role,
    ) -> Result<(), ServiceError> {
        let existing = self
            .repository
            .find_by_id(review_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        if !Self::can_modify(existing.user_id, user_id, role) {
            return Err(ServiceError::Forbidden);
        }

        let tour_id = existing.tour_id;
        self.repository.delete(review_id).await?;
        self.rating_calculator.recalculate(tour_id).await?;

        Ok(())
    }

    pub async fn get_review(&self, review_id: i32) -> Result<Review, ServiceError> {
        self.repository
            .find_by_id(review_id)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    pub async fn get_reviews(&self, tour_id: Option<i32>) -> Result<Vec<Review>, ServiceError> {
        match tour_id {
            Some(tour_id) => self.repository.list_for_tour(tour_id).await,
            None => self.repository.list_all().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_can_modify_own_review() {
        assert!(ReviewService::can_modify(7, 7, Role::User));
    }

    #[test]
    fn test_admin_can_modify_any_review() {
        assert!(ReviewService::can_modify(7, 99, Role::Admin));
    }

    #[test]
    fn test_other_users_cannot_modify() {
        assert!(!ReviewService::can_modify(7, 99, Role::User));
        assert!(!ReviewService::can_modify(7, 99, Role::Guide));
        assert!(!ReviewService::can_modify(7, 99, Role::LeadGuide));
    }
}
