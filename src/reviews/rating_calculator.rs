use crate::reviews::{ReviewRepository, ServiceError};

/// Calculator for computing and updating tour rating aggregates
#[derive(Clone)]
pub struct RatingCalculator {
    repository: ReviewRepository,
}

/// Arithmetic mean of the ratings, None when there are none.
fn average_rating(ratings: &[i16]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: i32 = ratings.iter().map(|&r| r as i32).sum();
    Some(sum as f64 / ratings.len() as f64)
}

impl RatingCalculator {
    pub fn new(repository: ReviewRepository) -> Self {
        Self { repository }
    }

    /// Recalculate a tour's ratings_average and ratings_quantity from its
    /// review rows. A tour without reviews goes back to 0 / 0.
    pub async fn recalculate(&self, tour_id: i32) -> Result<Option<f64>, ServiceError> {
        let ratings = self.repository.ratings_for_tour(tour_id).await?;

        let quantity = ratings.len() as i32;
        let average = average_rating(&ratings);

        self.repository
            .update_tour_rating(tour_id, average.unwrap_or(0.0), quantity)
            .await?;

        Ok(average)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_of_mixed_ratings() {
        assert_eq!(average_rating(&[5, 4, 3]), Some(4.0));
        assert_eq!(average_rating(&[5, 4]), Some(4.5));
    }

    #[test]
    fn test_average_of_single_rating() {
        assert_eq!(average_rating(&[5]), Some(5.0));
    }

    #[test]
    fn test_average_of_no_ratings_is_none() {
        assert_eq!(average_rating(&[]), None);
    }

    #[test]
    fn test_average_keeps_precision() {
        let avg = average_rating(&[5, 4, 4]).expect("non-empty");
        assert!((avg - 13.0 / 3.0).abs() < 1e-12);
    }
}
