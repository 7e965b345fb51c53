use reqwest::StatusCode;

use serde_json::Value;

use sqlx::PgPool;

use uuid::Uuid;

use crate::helpers::{by_name, NewOffer, NewSubscriptionByOfferId, TestApp};

#[tokio::test]
async fn create_by_name_returns_full_info() {
    let app = TestApp::spawn().await;
    let user_id = Uuid::new_v4();

    let res = app
        .subscription_create_by_name(&by_name(user_id, "Netflix", 599, "2024-01-15", None))
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::CREATED, res.status());

    let body: Value = res.json().await.unwrap();
    assert_eq!(user_id.to_string(), body["user_id"]);
    assert_eq!("Netflix", body["offer_name"]);
    assert_eq!(599, body["price"]);
    assert_eq!("2024-01-15", body["start_date"]);
    assert_eq!("2024-02-15", body["end_date"]);
}

#[tokio::test]
async fn create_by_name_reuses_the_offer() {
    let app = TestApp::spawn().await;

    for user in 0..2 {
        let start_date = format!("2024-0{}-01", user + 1);
        let res = app
            .subscription_create_by_name(&by_name(Uuid::new_v4(), "Netflix", 10, &start_date, None))
            .await
            .unwrap();
        assert_eq!(StatusCode::CREATED, res.status());
    }

    let transactor = app.transactor.as_ref().unwrap();
    assert_eq!(1, transactor.offers().await.len());
    assert_eq!(2, transactor.subscriptions().await.len());
}

#[tokio::test]
async fn create_by_name_returns_bad_request_for_invalid_data() {
    let app = TestApp::spawn().await;

    let test_cases = [
        (
            by_name(Uuid::new_v4(), "Netflix", 10, "2024-13-01", None),
            "malformed start date",
        ),
        (
            by_name(Uuid::new_v4(), "", 10, "2024-01-01", None),
            "empty service name",
        ),
        (
            by_name(Uuid::new_v4(), "Netflix", -5, "2024-01-01", None),
            "negative price",
        ),
        (
            by_name(Uuid::new_v4(), "Netflix", 10, "2024-01-01", Some("2023-12-01")),
            "end date before the start date",
        ),
    ];

    for (new_subscription, description) in test_cases {
        let res = app
            .subscription_create_by_name(&new_subscription)
            .await
            .unwrap();

        assert_eq!(
            StatusCode::BAD_REQUEST,
            res.status(),
            "The API did not reject a subscription with a {}",
            description
        );
    }

    assert!(app.transactor.as_ref().unwrap().offers().await.is_empty());
}

#[tokio::test]
async fn overlapping_subscription_returns_conflict() {
    let app = TestApp::spawn().await;
    let user_id = Uuid::new_v4();

    let res = app
        .subscription_create_by_name(&by_name(
            user_id,
            "Netflix",
            10,
            "2024-01-01",
            Some("2024-04-01"),
        ))
        .await
        .unwrap();
    assert_eq!(StatusCode::CREATED, res.status());

    let res = app
        .subscription_create_by_name(&by_name(user_id, "Netflix", 10, "2024-02-01", None))
        .await
        .unwrap();
    assert_eq!(StatusCode::CONFLICT, res.status());

    let res = app
        .subscription_create_by_name(&by_name(user_id, "Netflix", 10, "2024-04-01", None))
        .await
        .unwrap();
    assert_eq!(StatusCode::CREATED, res.status());
}

#[tokio::test]
async fn create_by_offer_id_uses_the_offer_duration() {
    let app = TestApp::spawn().await;

    let res = app
        .offer_create(&NewOffer {
            service_name: "Netflix".into(),
            price: 10,
            duration_months: 3,
        })
        .await
        .unwrap();
    let offer: Value = res.json().await.unwrap();
    let offer_id: Uuid = offer["offer_id"].as_str().unwrap().parse().unwrap();

    let res = app
        .subscription_create_by_offer_id(&NewSubscriptionByOfferId {
            user_id: Uuid::new_v4(),
            offer_id,
            start_date: "2024-01-15".into(),
        })
        .await
        .unwrap();
    assert_eq!(StatusCode::CREATED, res.status());

    let body: Value = res.json().await.unwrap();
    assert_eq!(offer_id.to_string(), body["offer_id"]);
    assert_eq!("2024-04-15", body["end_date"]);
}

#[tokio::test]
async fn create_by_unknown_offer_id_returns_not_found() {
    let app = TestApp::spawn().await;

    let res = app
        .subscription_create_by_offer_id(&NewSubscriptionByOfferId {
            user_id: Uuid::new_v4(),
            offer_id: Uuid::new_v4(),
            start_date: "2024-01-15".into(),
        })
        .await
        .unwrap();

    assert_eq!(StatusCode::NOT_FOUND, res.status());
}

#[tokio::test]
async fn delete_missing_subscription_returns_not_found() {
    let app = TestApp::spawn().await;

    let res = app
        .subscription_delete(&Uuid::new_v4().to_string())
        .await
        .unwrap();

    assert_eq!(StatusCode::NOT_FOUND, res.status());
}

#[tokio::test]
async fn list_by_user_only_returns_that_user() {
    let app = TestApp::spawn().await;
    let user_id = Uuid::new_v4();

    for (user_id, service_name) in [
        (user_id, "Netflix"),
        (user_id, "Spotify"),
        (Uuid::new_v4(), "Netflix"),
    ] {
        let res = app
            .subscription_create_by_name(&by_name(user_id, service_name, 10, "2024-01-01", None))
            .await
            .unwrap();
        assert_eq!(StatusCode::CREATED, res.status());
    }

    let user = user_id.to_string();
    let body: Value = app
        .subscriptions_list("by_user", &[("user_id", user.as_str())])
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(2, body["total_items"]);
    assert!(body.get("total_price").is_none());

    let body: Value = app
        .subscriptions_list("", &[])
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(3, body["total_items"]);
}

#[tokio::test]
async fn list_by_user_and_service_name_sums_every_page() {
    let app = TestApp::spawn().await;
    let user_id = Uuid::new_v4();

    for (price, start_date) in [(10, "2024-01-01"), (10, "2024-02-01"), (15, "2024-03-01")] {
        let res = app
            .subscription_create_by_name(&by_name(user_id, "Spotify", price, start_date, None))
            .await
            .unwrap();
        assert_eq!(StatusCode::CREATED, res.status());
    }

    let user = user_id.to_string();
    let res = app
        .subscriptions_list(
            "by_user_service_name",
            &[
                ("user_id", user.as_str()),
                ("service_name", "Spotify"),
                ("page_size", "1"),
                ("page", "2"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());

    let body: Value = res.json().await.unwrap();
    assert_eq!(35, body["total_price"]);
    assert_eq!(3, body["total_items"]);
    assert_eq!(3, body["total_pages"]);
    let subscriptions = body["subscriptions"].as_array().unwrap();
    assert_eq!(1, subscriptions.len());
    assert_eq!("2024-02-01", subscriptions[0]["start_date"]);

    let body: Value = app
        .subscriptions_list(
            "by_user_service_name",
            &[
                ("user_id", user.as_str()),
                ("service_name", "Spotify"),
                ("start_date", "2024-02-01"),
                ("end_date", "2024-03-01"),
            ],
        )
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(25, body["total_price"]);
    assert_eq!(2, body["total_items"]);
}

#[tokio::test]
async fn list_by_user_and_service_name_rejects_reversed_period() {
    let app = TestApp::spawn().await;
    let user = Uuid::new_v4().to_string();

    let res = app
        .subscriptions_list(
            "by_user_service_name",
            &[
                ("user_id", user.as_str()),
                ("service_name", "Spotify"),
                ("start_date", "2024-03-01"),
                ("end_date", "2024-02-01"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(StatusCode::BAD_REQUEST, res.status());
}

#[tokio::test]
async fn list_by_user_requires_a_user_id() {
    let app = TestApp::spawn().await;

    let res = app.subscriptions_list("by_user", &[]).await.unwrap();

    assert_eq!(StatusCode::BAD_REQUEST, res.status());
}

#[sqlx::test]
#[ignore = "requires a Postgres server at DATABASE_URL"]
async fn overlapping_subscription_returns_conflict_on_postgres(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn_with_pool(&pool).await;
    let user_id = Uuid::new_v4();

    let res = app
        .subscription_create_by_name(&by_name(
            user_id,
            "Netflix",
            10,
            "2024-01-01",
            Some("2024-04-01"),
        ))
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::CREATED, res.status());

    let res = app
        .subscription_create_by_name(&by_name(user_id, "Netflix", 10, "2024-02-01", None))
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::CONFLICT, res.status());

    let (count,): (i64,) = sqlx::query_as("select count(*) from subscription")
        .fetch_one(&pool)
        .await?;
    assert_eq!(1, count);

    Ok(())
}
