/// Lead normalization and scoring pipeline
///
/// Turns a batch of raw scraped records into a ranked list of contactable leads:
/// 1. Clean names, phones and emails
/// 2. Drop duplicates (same phone or same lower-cased name)
/// 3. Drop non-viable companies (short names, big brands, no contact channel)
/// 4. Apply caller filters (sectors, locations)
/// 5. Enrich with completeness, preferred contact and urgency
/// 6. Score
/// 7. Sort by score, highest first
///
/// Processing is pure: no I/O, no clock, no randomness. A record that fails at any
/// stage is logged and dropped without affecting the rest of the batch.
use std::collections::HashSet;

use serde_json::Value;

use crate::config::ProcessorConfig;
use crate::errors::RecordError;
use crate::models::{
    CleanedLead, ContactUrgency, CreditPotential, FilterSpec, PreferredContact, ProcessedLead,
    RawLeadRecord,
};
use crate::validation::{clean_email, clean_name, clean_phone};

#[derive(Debug, Clone, Default)]
pub struct LeadProcessor {
    config: ProcessorConfig,
}

impl LeadProcessor {
    pub fn new(config: ProcessorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Run the full pipeline over typed records.
    pub fn process(
        &self,
        raw_leads: &[RawLeadRecord],
        filters: Option<&FilterSpec>,
    ) -> Vec<ProcessedLead> {
        tracing::info!("Processing {} raw leads", raw_leads.len());
        if raw_leads.is_empty() {
            return Vec::new();
        }

        let cleaned = self.clean(raw_leads);
        tracing::info!("After cleaning: {} leads", cleaned.len());

        let unique = self.deduplicate(cleaned);
        tracing::info!("After removing duplicates: {} leads", unique.len());

        let viable = self.filter_viable(unique);
        tracing::info!("Viable leads: {}", viable.len());

        let filtered = match filters {
            Some(spec) if !spec.is_empty() => {
                let filtered = self.apply_filters(viable, spec);
                tracing::info!("After custom filters: {} leads", filtered.len());
                filtered
            }
            _ => viable,
        };

        let mut scored: Vec<ProcessedLead> = filtered
            .into_iter()
            .filter_map(|lead| {
                let label = lead_label(&lead);
                match self.enrich(lead).and_then(|l| self.score(l)) {
                    Ok(processed) => Some(processed),
                    Err(e) => {
                        tracing::warn!("Dropping lead '{}': {}", label, e);
                        None
                    }
                }
            })
            .collect();

        // sort_by is stable: ties keep their pipeline order
        scored.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));

        tracing::info!("✓ Processing complete: {} final leads", scored.len());
        scored
    }

    /// Run the full pipeline over untyped JSON, as received from a lead source.
    ///
    /// Elements that are not objects are dropped; filters that are not an object
    /// are ignored.
    pub fn process_values(&self, raw_leads: Vec<Value>, filters: Option<&Value>) -> Vec<ProcessedLead> {
        let total = raw_leads.len();
        let records: Vec<RawLeadRecord> = raw_leads
            .into_iter()
            .enumerate()
            .filter_map(|(idx, value)| match RawLeadRecord::from_value(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Dropping raw lead #{}: {}", idx, e);
                    None
                }
            })
            .collect();

        if records.len() < total {
            tracing::warn!("{} of {} raw leads were malformed", total - records.len(), total);
        }

        let filters = filters.and_then(FilterSpec::from_value);
        self.process(&records, filters.as_ref())
    }

    // ============ Stage 1: Clean ============

    pub fn clean(&self, raw_leads: &[RawLeadRecord]) -> Vec<CleanedLead> {
        raw_leads
            .iter()
            .filter_map(|raw| match self.clean_record(raw) {
                Ok(lead) => Some(lead),
                Err(e) => {
                    tracing::debug!("Dropping lead at cleaning: {}", e);
                    None
                }
            })
            .collect()
    }

    /// Clean one record. Fails when neither a name nor a phone survives.
    pub fn clean_record(&self, raw: &RawLeadRecord) -> Result<CleanedLead, RecordError> {
        let lead = CleanedLead {
            name: raw
                .name
                .as_deref()
                .and_then(|n| clean_name(n, &self.config.name_stopwords)),
            phone: raw.phone.as_deref().and_then(clean_phone),
            email: raw.email.as_deref().and_then(clean_email),
            address: raw.address.clone(),
            sector: raw.sector.clone(),
            location: raw.location.clone(),
            source: raw.source.clone(),
            website: raw.website.clone(),
            credit_potential: raw.credit_potential.clone(),
            extracted_at: raw.extracted_at.clone(),
        };

        if !lead.has_name() && !lead.has_phone() {
            return Err(RecordError::Unidentifiable);
        }
        Ok(lead)
    }

    // ============ Stage 2: Deduplicate ============

    /// Keep the first lead per phone and per lower-cased name.
    ///
    /// Two distinct businesses with the same generic name collapse into one.
    pub fn deduplicate(&self, leads: Vec<CleanedLead>) -> Vec<CleanedLead> {
        let mut seen_phones: HashSet<String> = HashSet::new();
        let mut seen_names: HashSet<String> = HashSet::new();

        leads
            .into_iter()
            .filter(|lead| {
                let phone = lead.phone.as_deref().unwrap_or("");
                let name = lead.name.as_deref().unwrap_or("").to_lowercase();

                let duplicate = (!phone.is_empty() && seen_phones.contains(phone))
                    || (!name.is_empty() && seen_names.contains(&name));
                if duplicate {
                    tracing::debug!("Duplicate lead skipped: '{}' / '{}'", name, phone);
                    return false;
                }

                if !phone.is_empty() {
                    seen_phones.insert(phone.to_string());
                }
                if !name.is_empty() {
                    seen_names.insert(name);
                }
                true
            })
            .collect()
    }

    // ============ Stage 3: Viability ============

    pub fn filter_viable(&self, leads: Vec<CleanedLead>) -> Vec<CleanedLead> {
        leads.into_iter().filter(|l| self.is_viable(l)).collect()
    }

    /// A viable small business has a real name, is not a denylisted brand, and can
    /// be reached by phone, email, or address.
    pub fn is_viable(&self, lead: &CleanedLead) -> bool {
        let name = lead.name.as_deref().unwrap_or("").to_lowercase();

        if name.chars().count() < self.config.min_name_chars {
            return false;
        }

        if let Some(keyword) = self.big_company_match(&name) {
            tracing::debug!("Excluding big company '{}' (matched '{}')", name, keyword);
            return false;
        }

        lead.has_phone() || lead.has_email() || lead.has_address()
    }

    fn big_company_match(&self, lowered_name: &str) -> Option<&str> {
        self.config
            .big_company_keywords
            .iter()
            .find(|k| !k.is_empty() && lowered_name.contains(k.to_lowercase().as_str()))
            .map(String::as_str)
    }

    // ============ Stage 4: Custom filters ============

    /// Sectors match exactly and locations by substring, both case-insensitive.
    pub fn apply_filters(&self, leads: Vec<CleanedLead>, filters: &FilterSpec) -> Vec<CleanedLead> {
        let sectors: Option<Vec<String>> = filters
            .sectors
            .as_ref()
            .filter(|s| !s.is_empty())
            .map(|s| s.iter().map(|v| v.to_lowercase()).collect());
        let locations: Option<Vec<String>> = filters
            .locations
            .as_ref()
            .filter(|l| !l.is_empty())
            .map(|l| l.iter().map(|v| v.to_lowercase()).collect());

        leads
            .into_iter()
            .filter(|lead| {
                let sector_ok = sectors.as_ref().map_or(true, |targets| {
                    let sector = lead.sector.as_deref().unwrap_or("").to_lowercase();
                    targets.iter().any(|t| *t == sector)
                });
                let location_ok = locations.as_ref().map_or(true, |targets| {
                    let location = lead.location.as_deref().unwrap_or("").to_lowercase();
                    targets.iter().any(|t| location.contains(t.as_str()))
                });
                sector_ok && location_ok
            })
            .collect()
    }

    // ============ Stage 5: Enrich ============

    /// Attach completeness, preferred contact, and urgency. `final_score` is left at 0.
    pub fn enrich(&self, lead: CleanedLead) -> Result<ProcessedLead, RecordError> {
        if !lead.has_name() && !lead.has_phone() {
            return Err(RecordError::Unidentifiable);
        }

        Ok(ProcessedLead {
            data_completeness: data_completeness(&lead),
            preferred_contact: preferred_contact(&lead),
            contact_urgency: contact_urgency(&lead),
            final_score: 0.0,
            lead,
        })
    }

    // ============ Stage 6: Score ============

    pub fn score(&self, mut processed: ProcessedLead) -> Result<ProcessedLead, RecordError> {
        let w = &self.config.score_weights;
        let lead = &processed.lead;

        let mut score = 0.0;
        if lead.has_phone() {
            score += w.phone;
        }
        if lead.has_email() {
            score += w.email;
        }
        if lead.has_address() {
            score += w.address;
        }
        score += match lead.credit_tier() {
            Some(CreditPotential::Alto) => w.credit_alto,
            Some(CreditPotential::Medio) => w.credit_medio,
            Some(CreditPotential::Bajo) | None => w.credit_bajo,
        };

        let score = round_to(score, 2);
        if !(0.0..=100.0).contains(&score) {
            return Err(RecordError::ScoreOutOfRange(score));
        }

        processed.final_score = score;
        Ok(processed)
    }
}

/// Share of tracked fields present, as a percentage with one decimal.
pub fn data_completeness(lead: &CleanedLead) -> f64 {
    let fields = lead.tracked_fields();
    let present = fields
        .iter()
        .filter(|f| f.as_deref().is_some_and(|v| !v.is_empty()))
        .count();

    round_to(present as f64 / fields.len() as f64 * 100.0, 1)
}

pub fn preferred_contact(lead: &CleanedLead) -> PreferredContact {
    if lead.has_phone() {
        PreferredContact::WhatsApp
    } else if lead.has_email() {
        PreferredContact::Email
    } else if lead.has_website() {
        PreferredContact::Website
    } else {
        PreferredContact::VisitaPresencial
    }
}

pub fn contact_urgency(lead: &CleanedLead) -> ContactUrgency {
    let mut points = match lead.credit_tier() {
        Some(CreditPotential::Alto) => 3,
        Some(CreditPotential::Medio) => 2,
        _ => 0,
    };
    if lead.has_phone() {
        points += 2;
    }
    if lead.has_email() {
        points += 1;
    }

    match points {
        p if p >= 5 => ContactUrgency::Alta,
        p if p >= 3 => ContactUrgency::Media,
        _ => ContactUrgency::Baja,
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn lead_label(lead: &CleanedLead) -> String {
    lead.name
        .clone()
        .or_else(|| lead.phone.clone())
        .unwrap_or_default()
}
