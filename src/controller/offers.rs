use actix_web::dev::HttpServiceFactory;
use actix_web::{web, HttpResponse};

use chrono::NaiveDate;

use serde::{Deserialize, Serialize};

use uuid::Uuid;

use crate::model::{NewOffer, Offer};
use crate::repo::Transactor;
use crate::service::Engine;

use super::error::{RestError, RestResult};
use super::paging::{PageInfo, PageQuery};

/// JSON deserialization wrapper for parsing new offers
#[derive(Debug, Deserialize)]
pub struct NewOfferBody {
    service_name: String,
    price: i32,
    duration_months: i32,
}

impl TryInto<NewOffer> for NewOfferBody {
    type Error = String;

    fn try_into(self) -> Result<NewOffer, Self::Error> {
        let name = self.service_name.parse()?;
        let price = self.price.try_into()?;
        let duration_months = self.duration_months.try_into()?;

        Ok(NewOffer {
            name,
            price,
            duration_months,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct OfferBody {
    offer_id: Uuid,
    service_name: String,
    price: i32,
    duration_months: i32,
    created_at: NaiveDate,
}

impl From<Offer> for OfferBody {
    fn from(offer: Offer) -> Self {
        Self {
            offer_id: offer.id,
            service_name: offer.name,
            price: offer.price,
            duration_months: offer.duration_months,
            created_at: offer.created_at.date_naive(),
        }
    }
}

#[derive(Debug, Serialize)]
struct OffersPageBody {
    offers: Vec<OfferBody>,
    #[serde(flatten)]
    page: PageInfo,
}

#[tracing::instrument(name = "List offers", skip(engine))]
async fn list<T: Transactor>(
    engine: web::Data<Engine<T>>,
    query: web::Query<PageQuery>,
) -> RestResult<HttpResponse> {
    let page = engine.list_offers(query.page(), query.page_size()).await?;

    let info = PageInfo::from(&page);
    let offers = page.items.into_iter().map(OfferBody::from).collect();

    Ok(HttpResponse::Ok().json(OffersPageBody { offers, page: info }))
}

#[tracing::instrument(name = "Create a new offer", skip(engine))]
async fn create<T: Transactor>(
    engine: web::Data<Engine<T>>,
    body: web::Json<NewOfferBody>,
) -> RestResult<HttpResponse> {
    let new_offer: NewOffer = body.into_inner().try_into().map_err(RestError::ParseError)?;

    let offer = engine.create_offer(new_offer).await?;

    Ok(HttpResponse::Created().json(OfferBody::from(offer)))
}

#[tracing::instrument(name = "Delete an offer", skip(engine))]
async fn delete<T: Transactor>(
    engine: web::Data<Engine<T>>,
    path: web::Path<Uuid>,
) -> RestResult<HttpResponse> {
    engine.delete_offer(path.into_inner()).await?;

    Ok(HttpResponse::Accepted().finish())
}

/// Offers API endpoints
pub fn scope<T: Transactor>() -> impl HttpServiceFactory {
    web::scope("/offers")
        .route("", web::get().to(list::<T>))
        .route("", web::post().to(create::<T>))
        .route("/{offer_id}", web::delete().to(delete::<T>))
}
