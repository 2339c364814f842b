//! Business logic services

pub mod catalogue;
pub mod loans;
pub mod stats;

use std::sync::Arc;

use crate::{access::AccessControl, config::CatalogueConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalogue: catalogue::CatalogueService,
    pub loans: loans::LoansService,
    pub stats: stats::StatsService,
}

impl Services {
    /// Create all services over the given repository
    pub fn new(
        repository: Repository,
        access: Arc<dyn AccessControl>,
        config: CatalogueConfig,
    ) -> Self {
        Self {
            catalogue: catalogue::CatalogueService::new(
                repository.clone(),
                access.clone(),
                config.clone(),
            ),
            loans: loans::LoansService::new(repository.clone(), access, config),
            stats: stats::StatsService::new(repository),
        }
    }
}
