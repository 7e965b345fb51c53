use actix_web::dev::HttpServiceFactory;
use actix_web::{web, HttpResponse};

use chrono::NaiveDate;

use serde::{Deserialize, Serialize};

use uuid::Uuid;

use crate::domain::{Page, ServiceName};
use crate::model::{NewSubscriptionByName, SubscriptionFullInfo};
use crate::repo::Transactor;
use crate::service::Engine;

use super::error::{RestError, RestResult};
use super::paging::{PageInfo, PageQuery};

/// JSON deserialization wrapper for subscribing by service name and price
#[derive(Debug, Deserialize)]
pub struct NewSubscriptionByNameBody {
    user_id: Uuid,
    service_name: String,
    price: i32,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
}

impl TryInto<NewSubscriptionByName> for NewSubscriptionByNameBody {
    type Error = String;

    fn try_into(self) -> Result<NewSubscriptionByName, Self::Error> {
        let service_name = self.service_name.parse()?;
        let price = self.price.try_into()?;

        Ok(NewSubscriptionByName {
            user_id: self.user_id,
            service_name,
            price,
            start_date: self.start_date,
            end_date: self.end_date,
        })
    }
}

/// JSON deserialization wrapper for subscribing to an existing offer
#[derive(Debug, Deserialize)]
pub struct NewSubscriptionByOfferIdBody {
    user_id: Uuid,
    offer_id: Uuid,
    start_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct ByUserQuery {
    user_id: Uuid,
    page: Option<i64>,
    page_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ByUserAndServiceNameQuery {
    user_id: Uuid,
    service_name: String,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    page: Option<i64>,
    page_size: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionBody {
    subscription_id: Uuid,
    user_id: Uuid,
    offer_id: Uuid,
    offer_name: String,
    price: i32,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl From<SubscriptionFullInfo> for SubscriptionBody {
    fn from(info: SubscriptionFullInfo) -> Self {
        Self {
            subscription_id: info.subscription.id,
            user_id: info.subscription.user_id,
            offer_id: info.subscription.offer_id,
            offer_name: info.offer_name,
            price: info.price,
            start_date: info.subscription.start_date,
            end_date: info.subscription.end_date,
        }
    }
}

#[derive(Debug, Serialize)]
struct SubscriptionsPageBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    total_price: Option<i64>,
    subscriptions: Vec<SubscriptionBody>,
    #[serde(flatten)]
    page: PageInfo,
}

impl SubscriptionsPageBody {
    fn new(page: Page<SubscriptionFullInfo>, total_price: Option<i64>) -> Self {
        let info = PageInfo::from(&page);
        let subscriptions = page.items.into_iter().map(SubscriptionBody::from).collect();

        Self {
            total_price,
            subscriptions,
            page: info,
        }
    }
}

#[tracing::instrument(name = "List subscriptions", skip(engine))]
async fn list<T: Transactor>(
    engine: web::Data<Engine<T>>,
    query: web::Query<PageQuery>,
) -> RestResult<HttpResponse> {
    let page = engine
        .list_subscriptions(query.page(), query.page_size())
        .await?;

    Ok(HttpResponse::Ok().json(SubscriptionsPageBody::new(page, None)))
}

#[tracing::instrument(name = "List subscriptions of a user", skip(engine))]
async fn list_by_user<T: Transactor>(
    engine: web::Data<Engine<T>>,
    query: web::Query<ByUserQuery>,
) -> RestResult<HttpResponse> {
    let ByUserQuery {
        user_id,
        page,
        page_size,
    } = query.into_inner();
    let paging = PageQuery { page, page_size };

    let page = engine
        .list_subscriptions_by_user(user_id, paging.page(), paging.page_size())
        .await?;

    Ok(HttpResponse::Ok().json(SubscriptionsPageBody::new(page, None)))
}

#[tracing::instrument(name = "List subscriptions of a user by service name", skip(engine))]
async fn list_by_user_and_service_name<T: Transactor>(
    engine: web::Data<Engine<T>>,
    query: web::Query<ByUserAndServiceNameQuery>,
) -> RestResult<HttpResponse> {
    let ByUserAndServiceNameQuery {
        user_id,
        service_name,
        start_date,
        end_date,
        page,
        page_size,
    } = query.into_inner();
    let service_name: ServiceName = service_name.parse().map_err(RestError::ParseError)?;
    let paging = PageQuery { page, page_size };

    let priced = engine
        .list_subscriptions_by_user_and_service_name(
            user_id,
            service_name,
            start_date,
            end_date,
            paging.page(),
            paging.page_size(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(SubscriptionsPageBody::new(
        priced.page,
        Some(priced.total_price),
    )))
}

#[tracing::instrument(name = "Create a subscription by service name", skip(engine))]
async fn create_by_name<T: Transactor>(
    engine: web::Data<Engine<T>>,
    body: web::Json<NewSubscriptionByNameBody>,
) -> RestResult<HttpResponse> {
    let request: NewSubscriptionByName =
        body.into_inner().try_into().map_err(RestError::ParseError)?;

    let info = engine.create_subscription_by_name(request).await?;

    Ok(HttpResponse::Created().json(SubscriptionBody::from(info)))
}

#[tracing::instrument(name = "Create a subscription by offer id", skip(engine))]
async fn create_by_offer_id<T: Transactor>(
    engine: web::Data<Engine<T>>,
    body: web::Json<NewSubscriptionByOfferIdBody>,
) -> RestResult<HttpResponse> {
    let NewSubscriptionByOfferIdBody {
        user_id,
        offer_id,
        start_date,
    } = body.into_inner();

    let info = engine
        .create_subscription_by_offer_id(user_id, offer_id, start_date)
        .await?;

    Ok(HttpResponse::Created().json(SubscriptionBody::from(info)))
}

#[tracing::instrument(name = "Delete a subscription", skip(engine))]
async fn delete<T: Transactor>(
    engine: web::Data<Engine<T>>,
    path: web::Path<Uuid>,
) -> RestResult<HttpResponse> {
    engine.delete_subscription(path.into_inner()).await?;

    Ok(HttpResponse::Accepted().finish())
}

/// Subscriptions API endpoints
pub fn scope<T: Transactor>() -> impl HttpServiceFactory {
    web::scope("/subscriptions")
        .route("", web::get().to(list::<T>))
        .route("/by_user", web::get().to(list_by_user::<T>))
        .route(
            "/by_user_service_name",
            web::get().to(list_by_user_and_service_name::<T>),
        )
        .route("/by_name", web::post().to(create_by_name::<T>))
        .route("/by_offer_id", web::post().to(create_by_offer_id::<T>))
        .route("/{subscription_id}", web::delete().to(delete::<T>))
}
