use anyhow::Result;
use tracing::info;

use crate::backend::domain::models::tier::{Tier, TierTable};
use crate::backend::storage::TierRepository;

/// Reads the tier table from storage, seeding it from configuration once
#[derive(Clone)]
pub struct TierService {
    tier_repository: TierRepository,
}

impl TierService {
    pub fn new(tier_repository: TierRepository) -> Self {
        Self { tier_repository }
    }

    pub async fn seed(&self, configured: &[Tier]) -> Result<()> {
        TierTable::validate(configured)?;
        let written = self.tier_repository.seed_if_empty(configured).await?;
        if written > 0 {
            info!("Seeded {} tiers from configuration", written);
        }
        Ok(())
    }

    pub async fn table(&self) -> Result<TierTable> {
        let tiers = self.tier_repository.list_tiers().await?;
        Ok(TierTable::new(tiers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::DbConnection;

    #[tokio::test]
    async fn test_resolution_uses_seeded_table() {
        let db = DbConnection::init_test().await.unwrap();
        let service = TierService::new(TierRepository::new(db));
        service.seed(&TierTable::default_tiers()).await.unwrap();

        let table = service.table().await.unwrap();
        assert_eq!(table.resolve(2000).name, "Gold");
        assert_eq!(table.resolve(1999).name, "Silver");
        assert_eq!(table.next_tier(2000).map(|t| t.name), Some("Platinum".to_string()));
    }

    #[tokio::test]
    async fn test_empty_table_resolves_to_base_tier() {
        let db = DbConnection::init_test().await.unwrap();
        let service = TierService::new(TierRepository::new(db));
        let table = service.table().await.unwrap();
        assert_eq!(table.resolve(10_000), Tier::base());
    }

    #[tokio::test]
    async fn test_invalid_configuration_is_not_seeded() {
        let db = DbConnection::init_test().await.unwrap();
        let service = TierService::new(TierRepository::new(db));
        assert!(service.seed(&[Tier::new("Zero", 0, 0.0)]).await.is_err());
        assert!(service.table().await.unwrap().tiers().is_empty());
    }
}
