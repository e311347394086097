/// End-to-end tests of the lead pipeline
/// Covers the documented scenarios: cleaning, dedup, denylist, filters and ranking
use lead_processor::config::ProcessorConfig;
use lead_processor::models::{ContactUrgency, FilterSpec, PreferredContact, RawLeadRecord};
use lead_processor::processor::LeadProcessor;
use serde_json::{json, Value};

fn processor() -> LeadProcessor {
    LeadProcessor::new(ProcessorConfig::default())
}

fn process_json(leads: Value, filters: Option<Value>) -> Vec<lead_processor::models::ProcessedLead> {
    let leads = leads.as_array().cloned().unwrap_or_default();
    processor().process_values(leads, filters.as_ref())
}

#[cfg(test)]
mod scenario_tests {
    use super::*;

    #[test]
    fn test_name_cleaned_and_scored() {
        let out = process_json(
            json!([{"name": "Taco's El Güero!!", "phone": "442 123 4567", "credit_potential": "ALTO"}]),
            None,
        );

        assert_eq!(out.len(), 1);
        let lead = &out[0];
        assert_eq!(lead.lead.name.as_deref(), Some("Taco's el Güero"));
        assert_eq!(lead.lead.phone.as_deref(), Some("442 123 4567"));
        assert_eq!(lead.final_score, 70.0);
        assert_eq!(lead.contact_urgency, ContactUrgency::Alta);
        assert_eq!(lead.preferred_contact, PreferredContact::WhatsApp);
        assert_eq!(lead.data_completeness, 33.3);
    }

    #[test]
    fn test_duplicate_phone_keeps_first() {
        let out = process_json(
            json!([
                {"name": "Tortillería La Güera", "phone": "4421234567"},
                {"name": "Carnitas Don Memo", "phone": "4421234567"}
            ]),
            None,
        );

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].lead.name.as_deref(), Some("Tortillería la Güera"));
    }

    #[test]
    fn test_denylisted_brand_dropped() {
        let out = process_json(json!([{"name": "Oxxo Centro", "phone": "4421234567"}]), None);
        assert!(out.is_empty());

        let out = process_json(json!([{"name": "SORIANA HIPER", "phone": "4421234567"}]), None);
        assert!(out.is_empty());
    }

    #[test]
    fn test_short_name_dropped() {
        let out = process_json(json!([{"name": "Ab", "phone": "4421234567"}]), None);
        assert!(out.is_empty());
    }

    #[test]
    fn test_invalid_email_without_other_channel_dropped() {
        let out = process_json(json!([{"name": "Consultoría ABC", "email": "bad-email"}]), None);
        assert!(out.is_empty());
    }

    #[test]
    fn test_location_filter_on_fifty_leads() {
        let locations = [
            "Querétaro, Qro.",
            "Ciudad de México",
            "QUERÉTARO",
            "León, Gto.",
            "Santiago de Querétaro",
        ];
        let credits = ["ALTO", "MEDIO", "BAJO", "alto", ""];
        let leads: Vec<Value> = (0..50)
            .map(|i| {
                let email = (i % 3 == 0).then(|| format!("contacto{}@negocio.mx", i));
                let address = (i % 4 == 0).then_some("Av. Universidad 100");
                json!({
                    "name": format!("Negocio Familiar {}", i),
                    "phone": format!("442{:07}", 1_000_000 + i),
                    "email": email,
                    "address": address,
                    "sector": "Comercio",
                    "location": locations[i % locations.len()],
                    "credit_potential": credits[i % credits.len()],
                    "source": "google_maps"
                })
            })
            .collect();

        let out = processor().process_values(leads, Some(&json!({"locations": ["Querétaro"]})));

        // 3 of every 5 locations mention Querétaro in some casing
        assert_eq!(out.len(), 30);
        for lead in &out {
            let location = lead.lead.location.as_deref().unwrap().to_lowercase();
            assert!(location.contains("querétaro"), "unexpected location {}", location);
        }
        for pair in out.windows(2) {
            assert!(pair[0].final_score >= pair[1].final_score);
        }
    }
}

#[cfg(test)]
mod pipeline_tests {
    use super::*;

    #[test]
    fn test_empty_and_malformed_input() {
        assert!(process_json(json!([]), None).is_empty());

        let out = process_json(
            json!([
                {},
                "not an object",
                42,
                null,
                {"name": "Refaccionaria El Pistón", "phone": "(442) 987-6543"}
            ]),
            None,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].lead.name.as_deref(), Some("Refaccionaria el Pistón"));
    }

    #[test]
    fn test_malformed_filters_ignored() {
        let leads = json!([
            {"name": "Zapatería Montes", "phone": "4421110000", "sector": "Calzado"},
            {"name": "Óptica Visión", "phone": "4422220000", "sector": "Salud"}
        ]);

        assert_eq!(process_json(leads.clone(), Some(json!("Salud"))).len(), 2);
        assert_eq!(
            process_json(leads.clone(), Some(json!({"sectors": "Salud"}))).len(),
            2
        );
        assert_eq!(
            process_json(leads, Some(json!({"sectors": ["salud"]}))).len(),
            1
        );
    }

    #[test]
    fn test_sector_and_location_are_anded() {
        let raw = vec![
            RawLeadRecord {
                name: Some("Restaurante La Terraza".to_string()),
                phone: Some("4421000001".to_string()),
                sector: Some("Restaurantes".to_string()),
                location: Some("Querétaro".to_string()),
                ..Default::default()
            },
            RawLeadRecord {
                name: Some("Restaurante El Patio".to_string()),
                phone: Some("4421000002".to_string()),
                sector: Some("Restaurantes".to_string()),
                location: Some("Morelia".to_string()),
                ..Default::default()
            },
            RawLeadRecord {
                name: Some("Hotel Plaza Querétaro".to_string()),
                phone: Some("4421000003".to_string()),
                sector: Some("Hoteles".to_string()),
                location: Some("Querétaro".to_string()),
                ..Default::default()
            },
        ];
        let filters = FilterSpec {
            sectors: Some(vec!["RESTAURANTES".to_string()]),
            locations: Some(vec!["querétaro".to_string()]),
        };

        let out = processor().process(&raw, Some(&filters));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].lead.name.as_deref(), Some("Restaurante la Terraza"));
    }

    #[test]
    fn test_ranking_is_stable_on_ties() {
        let out = process_json(
            json!([
                {"name": "Primero Bajo", "address": "Calle 1", "credit_potential": "BAJO"},
                {"name": "Completo Alto", "phone": "4423334444", "email": "a@completo.mx", "address": "Calle 2", "credit_potential": "ALTO"},
                {"name": "Segundo Bajo", "address": "Calle 3"},
                {"name": "Solo Email", "email": "hola@soloemail.mx", "credit_potential": "MEDIO"}
            ]),
            None,
        );

        let names: Vec<&str> = out
            .iter()
            .map(|l| l.lead.name.as_deref().unwrap())
            .collect();
        assert_eq!(
            names,
            vec!["Completo Alto", "Solo Email", "Primero Bajo", "Segundo Bajo"]
        );
        let scores: Vec<f64> = out.iter().map(|l| l.final_score).collect();
        assert_eq!(scores, vec![100.0, 40.0, 20.0, 20.0]);
    }

    #[test]
    fn test_generic_names_collapse() {
        // Two distinct businesses sharing a generic name are merged by name dedup
        let out = process_json(
            json!([
                {"name": "Restaurante El Rincón", "phone": "4425550001", "location": "Centro"},
                {"name": "RESTAURANTE EL RINCÓN", "phone": "4425550002", "location": "Juriquilla"}
            ]),
            None,
        );

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].lead.location.as_deref(), Some("Centro"));
    }

    #[test]
    fn test_output_serializes_with_nulls() {
        let out = process_json(
            json!([{"name": "Panadería San Rafael", "phone": "4426667777", "credit_potential": "MEDIO"}]),
            None,
        );
        let value = serde_json::to_value(&out[0]).unwrap();

        assert_eq!(value["name"], "Panadería San Rafael");
        assert_eq!(value["email"], Value::Null);
        assert_eq!(value["credit_potential"], "MEDIO");
        assert_eq!(value["final_score"], 60.0);
        assert_eq!(value["contact_urgency"], "MEDIA");
        assert_eq!(value["preferred_contact"], "WhatsApp");
    }
}
