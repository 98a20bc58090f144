//! Ledger reconciliation.
//!
//! Rebuilds missing ledger entries from the records that imply them (orders,
//! event registrations, game plays, voucher redemptions and the legacy
//! point history). Runs are idempotent: an implied event is written only when
//! no existing entry carries its dedup key. Balances are never touched, so a
//! run can surface drift but not cause it.

pub mod dedup;
pub mod extractors;

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};

use crate::backend::config::BackfillConfig;
use crate::backend::domain::calendar::CalendarService;
use crate::backend::domain::commands::backfill::BackfillResult;
use crate::backend::domain::models::transaction::Transaction;
use crate::backend::domain::models::{PointsError, PointsResult};
use crate::backend::storage::{
    GamePlayRepository, SourceRepository, TransactionRepository, VoucherRepository,
};
use extractors::{ExtractionContext, ImpliedEvent, ImpliedEventSource};

#[derive(Clone)]
pub struct BackfillService {
    transaction_repository: TransactionRepository,
    source_repository: SourceRepository,
    game_play_repository: GamePlayRepository,
    voucher_repository: VoucherRepository,
    calendar: CalendarService,
    config: BackfillConfig,
}

impl BackfillService {
    pub fn new(
        transaction_repository: TransactionRepository,
        source_repository: SourceRepository,
        game_play_repository: GamePlayRepository,
        voucher_repository: VoucherRepository,
        calendar: CalendarService,
        config: BackfillConfig,
    ) -> Self {
        Self {
            transaction_repository,
            source_repository,
            game_play_repository,
            voucher_repository,
            calendar,
            config,
        }
    }

    /// Write every implied ledger entry the user's ledger is missing
    pub async fn backfill_user(&self, uid: &str) -> PointsResult<BackfillResult> {
        let uid = uid.trim();
        if uid.is_empty() {
            return Err(PointsError::Validation("uid is required".to_string()));
        }
        info!("Starting ledger backfill for {}", uid);

        let existing = self.transaction_repository.get_all_transactions(uid).await?;
        let mut known_keys: HashSet<String> = existing
            .iter()
            .flat_map(dedup::keys_for_transaction)
            .collect();
        debug!("{} has {} ledger entries, {} dedup keys", uid, existing.len(), known_keys.len());

        let events = self.collect_implied_events(uid).await?;

        let mut result = BackfillResult::default();
        let mut pending = Vec::new();
        for event in events {
            let already_recorded = known_keys.contains(&event.key)
                || event.aliases.iter().any(|alias| known_keys.contains(alias));
            if already_recorded {
                result.skipped_count += 1;
                continue;
            }
            known_keys.insert(event.key);
            if event.transaction.metadata.estimated {
                result.estimated_count += 1;
            }
            pending.push(event.transaction);
        }

        pending.sort_by_key(chronological_key);

        let batch_size = self.config.batch_size.max(1);
        for chunk in pending.chunks(batch_size) {
            result.backfilled_count += self.transaction_repository.store_batch(chunk).await?;
            debug!("Backfilled {} entries for {}", result.backfilled_count, uid);
        }

        info!(
            "Backfill for {} complete: {} written, {} already present, {} estimated",
            uid, result.backfilled_count, result.skipped_count, result.estimated_count
        );
        Ok(result)
    }

    async fn collect_implied_events(&self, uid: &str) -> PointsResult<Vec<ImpliedEvent>> {
        let ctx = ExtractionContext {
            uid: uid.to_string(),
            now: self.calendar.now_rfc3339(),
            order_points_per_currency: self.config.order_points_per_currency,
        };

        let orders = self.source_repository.list_orders(uid).await?;
        let registrations = self.source_repository.list_registrations(uid).await?;
        let plays = self.game_play_repository.list_plays(uid).await?;
        let redemptions = self.voucher_repository.list_redemptions(uid).await?;
        let legacy = self.source_repository.list_legacy_entries(uid).await?;

        let mut events = Vec::new();
        events.extend(implied_from(&orders, &ctx));
        events.extend(implied_from(&registrations, &ctx));
        events.extend(implied_from(&plays, &ctx));
        events.extend(implied_from(&redemptions, &ctx));
        events.extend(implied_from(&legacy, &ctx));
        Ok(events)
    }
}

fn implied_from<S: ImpliedEventSource>(records: &[S], ctx: &ExtractionContext) -> Vec<ImpliedEvent> {
    records
        .iter()
        .flat_map(|record| record.implied_events(ctx))
        .collect()
}

/// Parsed instant first; unparseable timestamps sort before everything else
fn chronological_key(transaction: &Transaction) -> (Option<DateTime<Utc>>, String) {
    let raw = transaction.timestamp.trim();
    let instant = DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|t| t.and_utc())
        });
    (instant, raw.to_string())
}
