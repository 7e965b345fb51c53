use std::net::TcpListener;

use reqwest::{Client, Method, Response};

use serde::Serialize;

use sqlx::PgPool;

use uuid::Uuid;

use subscription_service::app;
use subscription_service::repo::{InMemoryTransactor, PgTransactor, Transactor};
use subscription_service::service::Engine;

#[derive(Debug, Serialize)]
pub struct NewOffer {
    pub service_name: String,
    pub price: i32,
    pub duration_months: i32,
}

#[derive(Debug, Serialize)]
pub struct NewSubscriptionByName {
    pub user_id: Uuid,
    pub service_name: String,
    pub price: i32,
    pub start_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NewSubscriptionByOfferId {
    pub user_id: Uuid,
    pub offer_id: Uuid,
    pub start_date: String,
}

pub struct TestApp {
    addr: String,

    pub client: Client,
    /// Backing state, when the app runs in memory
    pub transactor: Option<InMemoryTransactor>,
}

impl TestApp {
    /// Spawn the app over a fresh in-memory store
    pub async fn spawn() -> Self {
        let transactor = InMemoryTransactor::new();
        let mut app = Self::spawn_with(transactor.clone());
        app.transactor = Some(transactor);
        app
    }

    /// Spawn the app over a migrated Postgres test database
    pub async fn spawn_with_pool(pool: &PgPool) -> Self {
        Self::spawn_with(PgTransactor::new(pool.clone()))
    }

    fn spawn_with<T: Transactor>(transactor: T) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to listen on random port");
        let port = listener.local_addr().unwrap().port();

        let addr = format!("http://127.0.0.1:{}", port);

        let server =
            app::run(listener, Engine::new(transactor)).expect("Failed to spawn app instance");
        let _ = tokio::spawn(server);

        let client = Client::new();

        Self {
            addr,
            client,
            transactor: None,
        }
    }

    pub fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", &self.addr, url);
        self.client.request(method, url)
    }

    pub async fn health_check(&self) -> reqwest::Result<Response> {
        self.request(Method::GET, "health_check").send().await
    }

    pub async fn offer_create(&self, new_offer: &NewOffer) -> reqwest::Result<Response> {
        self.request(Method::POST, "offers")
            .json(new_offer)
            .send()
            .await
    }

    pub async fn offers_list(&self, query: &[(&str, &str)]) -> reqwest::Result<Response> {
        self.request(Method::GET, "offers").query(query).send().await
    }

    pub async fn offer_delete(&self, offer_id: &str) -> reqwest::Result<Response> {
        self.request(Method::DELETE, &format!("offers/{}", offer_id))
            .send()
            .await
    }

    pub async fn subscription_create_by_name(
        &self,
        new_subscription: &NewSubscriptionByName,
    ) -> reqwest::Result<Response> {
        self.request(Method::POST, "subscriptions/by_name")
            .json(new_subscription)
            .send()
            .await
    }

    pub async fn subscription_create_by_offer_id(
        &self,
        new_subscription: &NewSubscriptionByOfferId,
    ) -> reqwest::Result<Response> {
        self.request(Method::POST, "subscriptions/by_offer_id")
            .json(new_subscription)
            .send()
            .await
    }

    pub async fn subscriptions_list(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> reqwest::Result<Response> {
        let url = if path.is_empty() {
            "subscriptions".to_string()
        } else {
            format!("subscriptions/{}", path)
        };
        self.request(Method::GET, &url).query(query).send().await
    }

    pub async fn subscription_delete(&self, subscription_id: &str) -> reqwest::Result<Response> {
        self.request(Method::DELETE, &format!("subscriptions/{}", subscription_id))
            .send()
            .await
    }
}

pub fn by_name(
    user_id: Uuid,
    service_name: &str,
    price: i32,
    start_date: &str,
    end_date: Option<&str>,
) -> NewSubscriptionByName {
    NewSubscriptionByName {
        user_id,
        service_name: service_name.into(),
        price,
        start_date: start_date.into(),
        end_date: end_date.map(Into::into),
    }
}
