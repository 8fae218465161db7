pub mod convert;
pub mod entities;
pub mod error;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::model::ServiceHandle;
use entities::*;
use error::{ApiError, Error};

pub struct Rest;

#[derive(Clone)]
struct Conf {
    client: reqwest::Client,
    root_url: String,
    api_key: String,
}

impl Rest {
    pub fn start(api_key: String, root_url: String) -> ServiceHandle<Request, Response> {
        let (to_service, requests) = async_channel::bounded::<Request>(100);
        let (responses, from_service) = async_channel::bounded(100);
        let conf = Conf {
            client: reqwest::Client::new(),
            root_url,
            api_key,
        };
        tokio::spawn(async move {
            while let Ok(request) = requests.recv().await {
                let conf = conf.clone();
                let responses = responses.clone();
                // each request runs on its own task, so independent fetches
                // (the four returns timeframes) are in flight concurrently
                tokio::spawn(async move {
                    let res = match send(&conf, request.clone()).await {
                        Ok(res) => res,
                        Err(e) => Response::Err(request, e),
                    };
                    let _ = responses.send(res).await;
                });
            }
        });
        ServiceHandle::new(to_service, from_service)
    }
}

async fn send(conf: &Conf, request: Request) -> Result<Response, Error> {
    Ok(match request {
        Request::Portfolio { eth_address, generation } => Response::Portfolio {
            generation,
            portfolio: get(conf, "portfolio", &[("eth_address", eth_address)]).await?,
        },
        Request::Positions { eth_address, market_id, generation } => {
            let mut query = vec![("eth_address", eth_address)];
            if let Some(market_id) = market_id {
                query.push(("market_id", market_id));
            }
            Response::Positions {
                generation,
                positions: get(conf, "positions", &query).await?,
            }
        }
        Request::Returns { eth_address, timeframe, generation } => Response::Returns {
            generation,
            timeframe,
            series: get(
                conf,
                "returns",
                &[("eth_address", eth_address), ("timeframe", timeframe.to_string())],
            )
            .await?,
        },
        Request::MarketData { eth_address, market_id } => {
            let detail: MarketDetailDto = get(
                conf,
                "market",
                &[("eth_address", eth_address), ("market_id", market_id)],
            )
            .await?;
            Response::MarketData(detail.into())
        }
        Request::MarketList { kind } => {
            let markets: Vec<MarketDto> =
                get(conf, "markets", &[("type", kind.to_string())]).await?;
            Response::MarketList {
                kind,
                markets: markets.into_iter().map(Into::into).collect(),
            }
        }
        Request::TrendingMarkets => {
            let markets: Vec<MarketDto> = get(conf, "markets/trending", &[]).await?;
            Response::TrendingMarkets(markets.into_iter().map(Into::into).collect())
        }
        Request::Orders { eth_address, order_id } => {
            let mut query = vec![("eth_address", eth_address)];
            if let Some(order_id) = order_id {
                query.push(("order_id", order_id));
            }
            let orders: Vec<OrderDto> = get(conf, "orders", &query).await?;
            Response::Orders(orders.into_iter().map(Into::into).collect())
        }
        Request::ExecuteTrade(key, intent) => {
            Response::TradeResult(key, post(conf, "trade", &intent).await?)
        }
        Request::ClosePosition(key, intent) => {
            Response::TradeResult(key, post(conf, "position/close", &intent).await?)
        }
        Request::CancelOrder(key, intent) => {
            Response::TradeResult(key, post(conf, "order/cancel", &intent).await?)
        }
    })
}

async fn get<T: DeserializeOwned>(
    conf: &Conf,
    path: &str,
    query: &[(&str, String)],
) -> Result<T, Error> {
    let response = conf
        .client
        .get(&format!("{}/{}", conf.root_url, path))
        .bearer_auth(&conf.api_key)
        .query(query)
        .send()
        .await?;
    decode(response).await
}

async fn post<B: Serialize, T: DeserializeOwned>(
    conf: &Conf,
    path: &str,
    body: &B,
) -> Result<T, Error> {
    let response = conf
        .client
        .post(&format!("{}/{}", conf.root_url, path))
        .bearer_auth(&conf.api_key)
        .json(body)
        .send()
        .await?;
    decode(response).await
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, Error> {
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(match serde_json::from_str::<ApiError>(&text) {
            Ok(body) => Error::Api {
                status: status.as_u16(),
                code: body.error.code,
                message: body.error.message,
            },
            Err(_) => Error::Api {
                status: status.as_u16(),
                code: None,
                message: text,
            },
        });
    }
    Ok(serde_json::from_str::<Payload<T>>(&text)?.payload)
}
