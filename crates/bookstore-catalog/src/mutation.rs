//! Price updates and deletions keyed by title

use bson::doc;
use tracing::{error, info};

use bookstore_common::{DeleteOutcome, Error, Result, UpdateOutcome};

use crate::catalog::Catalog;

impl Catalog {
    /// Set the price of the book titled `title`
    ///
    /// Matches at most one record. A title that does not exist is not an
    /// error; the outcome reports zero matched.
    pub async fn update_price(&self, title: &str, new_price: f64) -> Result<UpdateOutcome> {
        if !new_price.is_finite() || new_price < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "price must be a non-negative number, got {}",
                new_price
            )));
        }

        let outcome = self
            .store()
            .update_one(doc! { "title": title }, doc! { "$set": { "price": new_price } })
            .await
            .inspect_err(|e| error!(title, error = %e, "price update failed"))?;

        info!(title, new_price, matched = outcome.matched, modified = outcome.modified, "Updated price");
        Ok(outcome)
    }

    /// Remove the book titled `title`, if present
    pub async fn delete_by_title(&self, title: &str) -> Result<DeleteOutcome> {
        let outcome = self
            .store()
            .delete_one(doc! { "title": title })
            .await
            .inspect_err(|e| error!(title, error = %e, "delete failed"))?;

        info!(title, deleted = outcome.deleted, "Deleted book");
        Ok(outcome)
    }
}
