use chrono::{DateTime, Utc};

/// A purchasable subscription duration. The catalog is fixed at compile
/// time; changing prices means redeploying.
#[derive(Debug, Clone, Copy)]
pub struct Plan {
    pub months: i32,
    pub price_rub: i32,
    pub price_stars: i32,
    pub discount_hint: Option<&'static str>,
}

pub const PLANS: [Plan; 3] = [
    Plan {
        months: 1,
        price_rub: 499,
        price_stars: 499,
        discount_hint: None,
    },
    Plan {
        months: 6,
        price_rub: 2499,
        price_stars: 2499,
        discount_hint: Some("16% off"),
    },
    Plan {
        months: 12,
        price_rub: 3999,
        price_stars: 3999,
        discount_hint: Some("33% off"),
    },
];

pub fn by_months(months: i32) -> Option<&'static Plan> {
    PLANS.iter().find(|p| p.months == months)
}

/// Resolve a plan from an invoice payload of the form
/// `plan-<months>m-<telegram_id>-<unix_ts>`.
pub fn by_payload(payload: &str) -> Option<&'static Plan> {
    PLANS
        .iter()
        .find(|p| payload.starts_with(&format!("plan-{}m", p.months)))
}

/// Build the opaque payload correlating invoice issuance, pre-checkout and
/// payment confirmation.
pub fn invoice_payload(plan: &Plan, telegram_id: i64, issued_at: DateTime<Utc>) -> String {
    format!("plan-{}m-{}-{}", plan.months, telegram_id, issued_at.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn by_months_matches_exactly() {
        assert_eq!(by_months(6).map(|p| p.price_stars), Some(2499));
        assert!(by_months(3).is_none());
    }

    #[test]
    fn payload_resolves_to_unique_plan() {
        for plan in &PLANS {
            let payload = invoice_payload(plan, 555, Utc::now());
            let resolved = by_payload(&payload).expect("catalog plan must resolve");
            assert_eq!(resolved.months, plan.months);
        }
    }

    #[test]
    fn one_month_prefix_does_not_shadow_twelve() {
        assert_eq!(by_payload("plan-12m-555-1700000000").map(|p| p.months), Some(12));
        assert_eq!(by_payload("plan-1m-555-1700000000").map(|p| p.months), Some(1));
    }

    #[test]
    fn unknown_duration_resolves_to_none() {
        assert!(by_payload("plan-5m-555-1700000000").is_none());
        assert!(by_payload("garbage").is_none());
    }
}
