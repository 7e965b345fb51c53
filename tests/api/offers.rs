use reqwest::StatusCode;

use serde_json::Value;

use uuid::Uuid;

use crate::helpers::{by_name, NewOffer, TestApp};

fn netflix(price: i32) -> NewOffer {
    NewOffer {
        service_name: "Netflix".into(),
        price,
        duration_months: 3,
    }
}

#[tokio::test]
async fn create_returns_created_offer() {
    let app = TestApp::spawn().await;

    let res = app
        .offer_create(&netflix(599))
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::CREATED, res.status());

    let body: Value = res.json().await.expect("Failed to parse response");
    assert_eq!("Netflix", body["service_name"]);
    assert_eq!(599, body["price"]);
    assert_eq!(3, body["duration_months"]);
    assert!(body["offer_id"].is_string());
}

#[tokio::test]
async fn create_duplicate_returns_conflict() {
    let app = TestApp::spawn().await;

    let res = app.offer_create(&netflix(599)).await.unwrap();
    assert_eq!(StatusCode::CREATED, res.status());

    let res = app.offer_create(&netflix(599)).await.unwrap();
    assert_eq!(StatusCode::CONFLICT, res.status());

    let body: Value = res.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn create_returns_bad_request_for_invalid_data() {
    let app = TestApp::spawn().await;

    let test_cases = [
        (
            NewOffer {
                service_name: "  ".into(),
                price: 10,
                duration_months: 1,
            },
            "blank name",
        ),
        (
            NewOffer {
                service_name: "Netflix".into(),
                price: -1,
                duration_months: 1,
            },
            "negative price",
        ),
        (
            NewOffer {
                service_name: "Netflix".into(),
                price: 10,
                duration_months: 0,
            },
            "zero duration",
        ),
    ];

    for (new_offer, description) in test_cases {
        let res = app.offer_create(&new_offer).await.unwrap();

        assert_eq!(
            StatusCode::BAD_REQUEST,
            res.status(),
            "The API did not reject an offer with a {}",
            description
        );
    }
}

#[tokio::test]
async fn list_pages_through_offers() {
    let app = TestApp::spawn().await;
    for price in 0..25 {
        let res = app.offer_create(&netflix(price)).await.unwrap();
        assert_eq!(StatusCode::CREATED, res.status());
    }

    let res = app.offers_list(&[("page", "3")]).await.unwrap();
    assert_eq!(StatusCode::OK, res.status());

    let body: Value = res.json().await.unwrap();
    assert_eq!(3, body["page"]);
    assert_eq!(10, body["page_size"]);
    assert_eq!(25, body["total_items"]);
    assert_eq!(3, body["total_pages"]);
    assert_eq!(5, body["offers"].as_array().unwrap().len());

    let body: Value = app
        .offers_list(&[("page", "9")])
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(25, body["total_items"]);
    assert!(body["offers"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn list_caps_page_size() {
    let app = TestApp::spawn().await;

    let body: Value = app
        .offers_list(&[("page_size", "1000")])
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(100, body["page_size"]);
}

#[tokio::test]
async fn list_rejects_page_zero() {
    let app = TestApp::spawn().await;

    let res = app.offers_list(&[("page", "0")]).await.unwrap();

    assert_eq!(StatusCode::BAD_REQUEST, res.status());
}

#[tokio::test]
async fn delete_missing_offer_returns_not_found() {
    let app = TestApp::spawn().await;

    let res = app
        .offer_delete(&Uuid::new_v4().to_string())
        .await
        .unwrap();

    assert_eq!(StatusCode::NOT_FOUND, res.status());
}

#[tokio::test]
async fn delete_with_malformed_id_returns_bad_request() {
    let app = TestApp::spawn().await;

    let res = app.offer_delete("not-a-uuid").await.unwrap();

    assert_eq!(StatusCode::BAD_REQUEST, res.status());
}

#[tokio::test]
async fn delete_referenced_offer_returns_conflict() {
    let app = TestApp::spawn().await;

    let res = app
        .subscription_create_by_name(&by_name(Uuid::new_v4(), "Netflix", 10, "2024-01-01", None))
        .await
        .unwrap();
    assert_eq!(StatusCode::CREATED, res.status());
    let body: Value = res.json().await.unwrap();
    let offer_id = body["offer_id"].as_str().unwrap().to_string();
    let subscription_id = body["subscription_id"].as_str().unwrap().to_string();

    let res = app.offer_delete(&offer_id).await.unwrap();
    assert_eq!(StatusCode::CONFLICT, res.status());

    let res = app.subscription_delete(&subscription_id).await.unwrap();
    assert_eq!(StatusCode::ACCEPTED, res.status());

    let res = app.offer_delete(&offer_id).await.unwrap();
    assert_eq!(StatusCode::ACCEPTED, res.status());
}
