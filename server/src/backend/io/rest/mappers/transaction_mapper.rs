use crate::backend::domain::commands::ledger::{BalanceSummary, LedgerAudit, TransactionListResult};
use crate::backend::domain::models::transaction::{
    Transaction as DomainTransaction, TransactionType as DomainTransactionType,
};
use shared::{
    BalanceResponse, LedgerAuditResponse, PaginationInfo, Transaction as SharedTransaction,
    TransactionListResponse, TransactionType as SharedTransactionType,
};

use super::tier_mapper::TierMapper;

pub struct TransactionMapper;

impl TransactionMapper {
    pub fn to_dto(domain: DomainTransaction) -> SharedTransaction {
        SharedTransaction {
            id: domain.id,
            transaction_type: Self::to_dto_type(domain.transaction_type),
            amount: domain.amount,
            source: domain.source.as_str().to_string(),
            description: domain.description,
            metadata: serde_json::to_value(&domain.metadata).unwrap_or_default(),
            timestamp: domain.timestamp,
        }
    }

    pub fn to_list_response(result: TransactionListResult) -> TransactionListResponse {
        TransactionListResponse {
            transactions: result.transactions.into_iter().map(Self::to_dto).collect(),
            pagination: PaginationInfo {
                has_more: result.pagination.has_more,
                next_cursor: result.pagination.next_cursor,
            },
        }
    }

    pub fn to_balance_response(summary: BalanceSummary) -> BalanceResponse {
        let xp_to_next_tier = summary.xp_to_next_tier().unwrap_or(0);
        BalanceResponse {
            uid: summary.balance.uid,
            points: summary.balance.points,
            xp: summary.balance.xp,
            game_xp: summary.balance.game_xp,
            current_tier: TierMapper::to_dto(summary.current_tier),
            next_tier: summary.next_tier.map(TierMapper::to_dto),
            xp_to_next_tier,
        }
    }

    pub fn to_audit_response(audit: LedgerAudit) -> LedgerAuditResponse {
        LedgerAuditResponse {
            balance_points: audit.balance_points,
            ledger_points: audit.ledger_points,
            drift: audit.drift(),
            transaction_count: audit.transaction_count,
            backfilled_count: audit.backfilled_count,
            reconciled: audit.is_reconciled(),
        }
    }

    fn to_dto_type(domain_type: DomainTransactionType) -> SharedTransactionType {
        match domain_type {
            DomainTransactionType::Earn => SharedTransactionType::Earn,
            DomainTransactionType::Spend => SharedTransactionType::Spend,
        }
    }
}
