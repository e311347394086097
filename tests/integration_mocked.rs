/// Integration tests with mocked external APIs
/// Exercises the N8N webhook and Chatwoot clients without hitting real services
use std::time::Duration;

use lead_processor::crm_client::{ContactOutcome, CrmClient};
use lead_processor::models::{CleanedLead, ContactUrgency, PreferredContact, ProcessedLead};
use lead_processor::webhook_client::WebhookClient;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper function to create a processed lead
fn processed_lead(name: &str, phone: &str) -> ProcessedLead {
    ProcessedLead {
        lead: CleanedLead {
            name: Some(name.to_string()),
            phone: Some(phone.to_string()),
            sector: Some("Restaurantes".to_string()),
            location: Some("Querétaro".to_string()),
            credit_potential: Some("ALTO".to_string()),
            ..Default::default()
        },
        data_completeness: 66.7,
        preferred_contact: PreferredContact::WhatsApp,
        contact_urgency: ContactUrgency::Alta,
        final_score: 70.0,
    }
}

fn crm_client(server: &MockServer) -> CrmClient {
    CrmClient::new(server.uri(), "test_token".to_string(), "7".to_string())
        .unwrap()
        .with_pacing(Duration::ZERO)
}

#[tokio::test]
async fn test_completion_webhook_delivered() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/webhook/leads"))
        .and(header("authorization", "Bearer test_key"))
        .and(body_partial_json(serde_json::json!({
            "event": "scraping_completed",
            "job_id": "job-42",
            "summary": {"total_leads": 2}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = WebhookClient::new(None, Some("test_key".to_string()), 50).unwrap();
    let leads = vec![
        processed_lead("Taquería el Pastor", "4421234567"),
        processed_lead("Fonda Doña Lupe", "4427654321"),
    ];

    let url = format!("{}/webhook/leads", mock_server.uri());
    let delivered = client.send_completion(&url, "job-42", &leads).await.unwrap();

    assert!(delivered);
}

#[tokio::test]
async fn test_completion_webhook_non_200_is_not_delivered() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let client = WebhookClient::new(None, None, 50).unwrap();
    let delivered = client
        .send_completion(&mock_server.uri(), "job-43", &[])
        .await
        .unwrap();

    assert!(!delivered);
}

#[tokio::test]
async fn test_completion_webhook_unreachable_is_error() {
    let client = WebhookClient::new(None, None, 50).unwrap();

    // Port 9 (discard) is closed on test hosts
    let result = client
        .send_completion("http://127.0.0.1:9/hook", "job-44", &[])
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_trigger_workflow_returns_response_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/webhook/workflow"))
        .and(body_partial_json(serde_json::json!({
            "workflow": "lead_followup",
            "data": {"job_id": "job-50"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"accepted": true})))
        .mount(&mock_server)
        .await;

    let client = WebhookClient::new(
        Some(format!("{}/webhook/workflow", mock_server.uri())),
        None,
        50,
    )
    .unwrap();

    let result = client
        .trigger_workflow("lead_followup", serde_json::json!({"job_id": "job-50"}))
        .await
        .unwrap();

    assert_eq!(result, Some(serde_json::json!({"accepted": true})));
}

#[tokio::test]
async fn test_trigger_workflow_without_url() {
    let client = WebhookClient::new(None, None, 50).unwrap();

    let result = client
        .trigger_workflow("lead_followup", serde_json::json!({}))
        .await
        .unwrap();

    assert_eq!(result, None);
}

#[tokio::test]
async fn test_crm_contact_created() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/7/contacts"))
        .and(header("api_access_token", "test_token"))
        .and(body_partial_json(serde_json::json!({
            "name": "Taquería el Pastor",
            "phone_number": "4421234567",
            "custom_attributes": {"potencial_credito": "ALTO", "prioridad_contacto": "ALTA"}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": 1})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let outcome = crm_client(&mock_server)
        .create_contact(&processed_lead("Taquería el Pastor", "4421234567"))
        .await
        .unwrap();

    assert_eq!(outcome, ContactOutcome::Created);
}

#[tokio::test]
async fn test_crm_contact_already_exists() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422))
        .mount(&mock_server)
        .await;

    let outcome = crm_client(&mock_server)
        .create_contact(&processed_lead("Fonda Doña Lupe", "4427654321"))
        .await
        .unwrap();

    assert_eq!(outcome, ContactOutcome::AlreadyExists);
}

#[tokio::test]
async fn test_crm_server_error_is_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let result = crm_client(&mock_server)
        .create_contact(&processed_lead("Fonda Doña Lupe", "4427654321"))
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_crm_batch_counts_created_contacts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({"name": "Fonda Doña Lupe"})))
        .respond_with(ResponseTemplate::new(422))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let leads = vec![
        processed_lead("Taquería el Pastor", "4421234567"),
        processed_lead("Fonda Doña Lupe", "4427654321"),
        processed_lead("Papelería Lupita", "4425550101"),
    ];

    let created = crm_client(&mock_server)
        .create_contacts_from_leads(&leads)
        .await;

    assert_eq!(created, 2);
}

#[tokio::test]
async fn test_crm_batch_stops_when_circuit_opens() {
    let mock_server = MockServer::start().await;

    // Breaker opens after 5 consecutive failures; the remaining leads are skipped
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(5)
        .mount(&mock_server)
        .await;

    let leads: Vec<ProcessedLead> = (0..8)
        .map(|i| processed_lead(&format!("Negocio {}", i), &format!("44200000{:02}", i)))
        .collect();

    let created = crm_client(&mock_server)
        .create_contacts_from_leads(&leads)
        .await;

    assert_eq!(created, 0);
}
