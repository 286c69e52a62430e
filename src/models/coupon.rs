use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// 管理员定义的优惠券模板; event_id 为空表示跨活动通用
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CouponTemplate {
    pub id: Uuid,
    pub event_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub discount: Option<f64>,
    pub image_url: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub terms: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateCouponTemplateRequest {
    #[schema(example = "VIP Lounge Pass")]
    pub title: String,
    pub description: Option<String>,
    pub discount: Option<f64>,
    pub image_url: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub terms: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateCouponTemplateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub discount: Option<f64>,
    pub image_url: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub terms: Option<String>,
}

/// 个人优惠券 + 模板展示字段 + 活动上下文
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserCouponResponse {
    pub id: Uuid,
    pub code: String,
    pub is_redeemed: bool,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub coupon_template_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub discount: Option<f64>,
    pub image_url: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub terms: Option<String>,
    pub event_id: Uuid,
    pub event_name: String,
}

/// 钱包卡片 JSON (二维码携带券码)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WalletPass {
    pub format_version: u32,
    pub pass_type: String,
    pub organization_name: String,
    pub description: String,
    pub coupon: WalletPassCoupon,
    pub barcode: WalletPassBarcode,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WalletPassCoupon {
    pub title: String,
    pub description: Option<String>,
    pub discount: Option<f64>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub terms: Option<String>,
    pub is_redeemed: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WalletPassBarcode {
    pub format: String,
    pub message: String,
    pub alt_text: String,
}

impl WalletPass {
    pub fn from_coupon(coupon: &UserCouponResponse) -> Self {
        Self {
            format_version: 1,
            pass_type: "coupon".to_string(),
            organization_name: coupon.event_name.clone(),
            description: coupon.title.clone(),
            coupon: WalletPassCoupon {
                title: coupon.title.clone(),
                description: coupon.description.clone(),
                discount: coupon.discount,
                valid_from: coupon.valid_from,
                valid_until: coupon.valid_until,
                terms: coupon.terms.clone(),
                is_redeemed: coupon.is_redeemed,
            },
            barcode: WalletPassBarcode {
                format: "QR".to_string(),
                message: coupon.code.clone(),
                alt_text: coupon.code.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_pass_carries_code_in_barcode() {
        let coupon = UserCouponResponse {
            id: Uuid::new_v4(),
            code: "X7K2P9QR".to_string(),
            is_redeemed: false,
            redeemed_at: None,
            created_at: Utc::now(),
            coupon_template_id: Uuid::new_v4(),
            title: "VIP".to_string(),
            description: Some("Lounge access".to_string()),
            discount: Some(15.0),
            image_url: None,
            valid_from: None,
            valid_until: None,
            terms: None,
            event_id: Uuid::new_v4(),
            event_name: "Gala".to_string(),
        };

        let pass = WalletPass::from_coupon(&coupon);
        assert_eq!(pass.barcode.format, "QR");
        assert_eq!(pass.barcode.message, "X7K2P9QR");
        assert_eq!(pass.pass_type, "coupon");
        assert_eq!(pass.organization_name, "Gala");
        assert_eq!(pass.coupon.discount, Some(15.0));
    }
}
