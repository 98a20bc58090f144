use crate::backend::domain::commands::spend::{RedeemVoucherResult, SpinResult, WheelStatus};
use crate::backend::domain::models::voucher::{Voucher, VoucherRedemption};
use crate::backend::domain::models::wheel::WheelPrize;
use shared::{
    ConsumeRedemptionResponse, RedeemVoucherResponse, VoucherDto, VoucherListResponse,
    WheelPrizeDto, WheelSpinResponse, WheelStatusResponse,
};

pub struct SpendMapper;

impl SpendMapper {
    pub fn to_voucher_dto(voucher: Voucher) -> VoucherDto {
        VoucherDto {
            id: voucher.id,
            name: voucher.name,
            points_cost: voucher.points_cost,
            discount_type: voucher.discount_type.as_str().to_string(),
            discount_value: voucher.discount_value,
            validity_days: voucher.validity_days,
            per_user_limit: voucher.per_user_limit,
            min_order_value: voucher.min_order_value,
        }
    }

    pub fn to_catalog_response(vouchers: Vec<Voucher>) -> VoucherListResponse {
        VoucherListResponse {
            vouchers: vouchers.into_iter().map(Self::to_voucher_dto).collect(),
        }
    }

    pub fn to_redeem_response(result: RedeemVoucherResult) -> RedeemVoucherResponse {
        RedeemVoucherResponse {
            success: true,
            code: result.redemption.code,
            voucher_id: result.redemption.voucher_id,
            points_spent: result.redemption.points_spent,
            expires_at: result.redemption.expires_at,
            new_balance: result.new_balance,
        }
    }

    pub fn to_consume_response(redemption: VoucherRedemption) -> ConsumeRedemptionResponse {
        ConsumeRedemptionResponse {
            success: true,
            code: redemption.code,
            voucher_id: redemption.voucher_id,
            used_at: redemption.used_at.unwrap_or_default(),
        }
    }

    /// Weights stay server-side
    pub fn to_prize_dto(prize: WheelPrize) -> WheelPrizeDto {
        WheelPrizeDto {
            id: prize.id,
            label: prize.label,
            kind: prize.kind.as_str().to_string(),
            value: prize.value,
        }
    }

    pub fn to_status_response(status: WheelStatus) -> WheelStatusResponse {
        WheelStatusResponse {
            free_spin_available: status.free_spin_available,
            spin_cost: status.spin_cost,
            balance: status.balance,
            prizes: status.prizes.into_iter().map(Self::to_prize_dto).collect(),
        }
    }

    pub fn to_spin_response(result: SpinResult) -> WheelSpinResponse {
        WheelSpinResponse {
            success: true,
            prize: Self::to_prize_dto(result.prize),
            was_free: result.spin.was_free,
            points_charged: result.spin.points_charged,
            points_won: result.points_won,
            new_balance: result.new_balance,
        }
    }
}
