use chrono::{DateTime, TimeZone, Utc};
use dealsync_domain::{Deal, DealPage, DealStageRef, Funnel, Negotiation, NegotiationStatus, Stage};

pub fn created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 3, 13, 30, 0).unwrap()
}

/// Two funnels: "Vendas" (s1, s2) and "Renovação" (s3).
pub fn funnels() -> Vec<Funnel> {
    vec![
        Funnel {
            id: "f1".into(),
            name: "Vendas".into(),
            order: 1,
            deal_stages: vec![
                Stage { id: "s1".into(), name: "Contato".into(), order: 1 },
                Stage { id: "s2".into(), name: "Proposta".into(), order: 2 },
            ],
        },
        Funnel {
            id: "f2".into(),
            name: "Renovação".into(),
            order: 2,
            deal_stages: vec![Stage { id: "s3".into(), name: "Negociação".into(), order: 1 }],
        },
    ]
}

pub fn deal(id: &str, stage_id: &str, win: Option<bool>) -> Deal {
    Deal {
        id: id.into(),
        created_at: created_at(),
        amount_monthly: Some(990.0),
        amount_unique: Some(2500.0),
        prediction_date: None,
        win,
        deal_stage: DealStageRef { id: stage_id.into(), name: None },
        closed_at: None,
    }
}

pub fn deals(prefix: &str, count: usize) -> Vec<Deal> {
    (0..count).map(|i| deal(&format!("{prefix}-{i}"), "s1", None)).collect()
}

pub fn page(deals: Vec<Deal>, has_more: bool) -> DealPage {
    DealPage { deals, has_more, total: None }
}

pub fn negotiation(id: &str) -> Negotiation {
    Negotiation {
        crm_id: id.into(),
        created_at: created_at(),
        recurring_value: None,
        non_recurring_value: None,
        predicted_close_date: None,
        status: NegotiationStatus::InProgress,
        funnel: "Antigo".into(),
        funnel_order: 9,
        stage: "Antigo".into(),
        stage_order: 9,
        closed_at: None,
    }
}
