//! Deal to negotiation mapping

use dealsync_domain::{Deal, DealSyncError, Negotiation, NegotiationStatus, Result};

use super::catalog::StageCatalog;

/// Map one deal into its persisted shape.
///
/// The stage name comes from the deal's own stage entry, falling back to the
/// catalog when the entry has none. An unknown stage id is a data-integrity
/// error.
pub fn normalize(deal: &Deal, catalog: &StageCatalog) -> Result<Negotiation> {
    let stage = catalog.resolve(&deal.deal_stage.id).ok_or_else(|| DealSyncError::UnknownStage {
        deal_id: deal.id.clone(),
        stage_id: deal.deal_stage.id.clone(),
    })?;

    Ok(Negotiation {
        crm_id: deal.id.clone(),
        created_at: deal.created_at,
        recurring_value: deal.amount_monthly,
        non_recurring_value: deal.amount_unique,
        predicted_close_date: deal.prediction_date,
        status: NegotiationStatus::from_win(deal.win),
        funnel: stage.funnel.to_string(),
        funnel_order: stage.funnel_order,
        stage: deal.deal_stage.name.clone().unwrap_or_else(|| stage.stage_name.to_string()),
        stage_order: stage.stage_order,
        closed_at: deal.closed_at,
    })
}

/// Map a batch, stopping at the first failure.
pub fn normalize_all(deals: &[Deal], catalog: &StageCatalog) -> Result<Vec<Negotiation>> {
    deals.iter().map(|deal| normalize(deal, catalog)).collect()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use dealsync_domain::{DealStageRef, ErrorKind, Funnel, Stage};

    use super::*;

    fn catalog() -> StageCatalog {
        StageCatalog::from_funnels(&[Funnel {
            id: "f1".into(),
            name: "Vendas".into(),
            order: 2,
            deal_stages: vec![
                Stage { id: "s1".into(), name: "Contato".into(), order: 1 },
                Stage { id: "s2".into(), name: "Proposta".into(), order: 3 },
            ],
        }])
    }

    fn deal(id: &str, stage_id: &str, win: Option<bool>) -> Deal {
        Deal {
            id: id.into(),
            created_at: Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap(),
            amount_monthly: Some(1500.0),
            amount_unique: None,
            prediction_date: NaiveDate::from_ymd_opt(2025, 6, 30),
            win,
            deal_stage: DealStageRef { id: stage_id.into(), name: Some("Proposta enviada".into()) },
            closed_at: None,
        }
    }

    #[test]
    fn maps_every_field() {
        let negotiation = normalize(&deal("d1", "s2", None), &catalog()).unwrap();

        assert_eq!(negotiation.crm_id, "d1");
        assert_eq!(negotiation.created_at, Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap());
        assert_eq!(negotiation.recurring_value, Some(1500.0));
        assert_eq!(negotiation.non_recurring_value, None);
        assert_eq!(negotiation.predicted_close_date, NaiveDate::from_ymd_opt(2025, 6, 30));
        assert_eq!(negotiation.status, NegotiationStatus::InProgress);
        assert_eq!(negotiation.funnel, "Vendas");
        assert_eq!(negotiation.funnel_order, 2);
        assert_eq!(negotiation.stage, "Proposta enviada");
        assert_eq!(negotiation.stage_order, 3);
        assert_eq!(negotiation.closed_at, None);
    }

    #[test]
    fn status_is_derived_from_win_flag() {
        let catalog = catalog();
        for (win, status) in [
            (None, NegotiationStatus::InProgress),
            (Some(true), NegotiationStatus::Won),
            (Some(false), NegotiationStatus::Lost),
        ] {
            assert_eq!(normalize(&deal("d1", "s1", win), &catalog).unwrap().status, status);
        }
    }

    #[test]
    fn stage_name_falls_back_to_catalog() {
        let mut unnamed = deal("d1", "s1", None);
        unnamed.deal_stage.name = None;

        assert_eq!(normalize(&unnamed, &catalog()).unwrap().stage, "Contato");
    }

    #[test]
    fn unknown_stage_is_a_data_integrity_error() {
        let err = normalize(&deal("d7", "s9", None), &catalog()).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DataIntegrity);
        assert!(err.to_string().contains("d7"));
        assert!(err.to_string().contains("s9"));
    }

    #[test]
    fn batch_stops_at_first_unknown_stage() {
        let deals = vec![deal("d1", "s1", None), deal("d2", "s9", None), deal("d3", "s8", None)];

        match normalize_all(&deals, &catalog()).unwrap_err() {
            DealSyncError::UnknownStage { deal_id, .. } => assert_eq!(deal_id, "d2"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
