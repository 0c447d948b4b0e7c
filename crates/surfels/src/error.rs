use thiserror::Error;

use crate::handle::SurfelId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Stale surfel handle: {0:?} no longer refers to a live surfel")]
    StaleHandle(SurfelId),
    #[error("Associated surfel list is full (capacity {capacity})")]
    AssociationsFull { capacity: usize },
    #[error("A surfel cannot be associated with itself")]
    SelfAssociation,
}
