use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{CleanedLead, ProcessedLead};

/// Label used when a lead has no value for the grouped field.
pub const UNSPECIFIED: &str = "Sin especificar";

/// Lead counts of a processed batch, broken down by sector, location and credit tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_leads: usize,
    pub leads_by_sector: BTreeMap<String, usize>,
    pub leads_by_location: BTreeMap<String, usize>,
    pub leads_by_credit_potential: BTreeMap<String, usize>,
}

impl BatchSummary {
    pub fn from_leads(leads: &[ProcessedLead]) -> Self {
        Self {
            total_leads: leads.len(),
            leads_by_sector: group_by(leads, |l| &l.sector),
            leads_by_location: group_by(leads, |l| &l.location),
            leads_by_credit_potential: group_by(leads, |l| &l.credit_potential),
        }
    }
}

fn group_by<F>(leads: &[ProcessedLead], field: F) -> BTreeMap<String, usize>
where
    F: Fn(&CleanedLead) -> &Option<String>,
{
    let mut groups = BTreeMap::new();
    for lead in leads {
        let key = field(&lead.lead)
            .as_deref()
            .filter(|v| !v.is_empty())
            .unwrap_or(UNSPECIFIED);
        *groups.entry(key.to_string()).or_insert(0) += 1;
    }
    groups
}
