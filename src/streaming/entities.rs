use std::str::FromStr;

use serde::{Deserialize, Serialize};
use chrono::{DateTime, FixedOffset};

use crate::model::OrderUpdate;

#[derive(Serialize, Clone, Hash, Eq, PartialEq, Debug)]
#[serde(tag = "event")]
pub enum Request {
    #[serde(rename = "price:subscribe")]
    PriceSubscribe { market_id: String },
    #[serde(rename = "price:unsubscribe")]
    PriceUnsubscribe { market_id: String },
    #[serde(rename = "order:subscribe")]
    OrderSubscribe { eth_address: String },
    #[serde(rename = "order:unsubscribe")]
    OrderUnsubscribe { eth_address: String },
}

impl ToString for Request {
    fn to_string(&self) -> String {
        serde_json::to_string(self).unwrap()
    }
}

#[derive(Deserialize, Debug)]
#[serde(tag = "event", content = "payload")]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Price { market_id: String, close: f64 },
    Order(OrderUpdate),
    Error {
        request_id: Option<String>,
        error: String,
    },
}

#[derive(Deserialize, Debug)]
pub struct Response {
    #[serde(with = "rfc3339")]
    pub time: DateTime<FixedOffset>,
    #[serde(flatten)]
    pub kind: ResponseType,
}

impl FromStr for Response {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

mod rfc3339 {
    use chrono::{DateTime, FixedOffset};
    use serde::{self, Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
    where D: Deserializer<'de> {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Direction, OrderStatus};

    #[test]
    fn parses_price_tick() {
        let data = r#"{
            "event": "price",
            "time": "2025-11-07T15:35:00.029721253Z",
            "payload": {
                "market_id": "CRYPTO_BTC",
                "close": 64057.5
            }
        }"#;
        let v: Response = data.parse().unwrap();
        match v.kind {
            ResponseType::Price { market_id, close } => {
                assert_eq!(market_id, "CRYPTO_BTC");
                assert_eq!(close, 64057.5);
            }
            other => panic!("expected price tick, got {:?}", other),
        }
    }

    #[test]
    fn parses_order_update() {
        let data = r#"{
            "event": "order",
            "time": "2025-11-07T15:35:01Z",
            "payload": {
                "order_id": "0x6f21",
                "market_id": "STOCK_TSLA",
                "direction": "short",
                "status": "success",
                "token_amount": "5000000000000000000",
                "price": "24213000000"
            }
        }"#;
        let v: Response = data.parse().unwrap();
        match v.kind {
            ResponseType::Order(update) => {
                assert_eq!(update.order_id, "0x6f21");
                assert_eq!(update.direction, Direction::Short);
                assert_eq!(update.status, OrderStatus::Success);
                assert_eq!(update.price.as_deref(), Some("24213000000"));
                assert_eq!(update.error_code, None);
            }
            other => panic!("expected order update, got {:?}", other),
        }
    }

    #[test]
    fn parses_error_event() {
        let data = r#"{
            "event": "error",
            "time": "2025-11-07T15:35:00Z",
            "payload": {
                "request_id": "123ASD1123",
                "error": "Subscription price:subscribe. market NOOOOOOO not found"
            }
        }"#;
        let v: Response = data.parse().unwrap();
        assert!(matches!(v.kind, ResponseType::Error { .. }));
    }

    #[test]
    fn serializes_subscribe_requests() {
        let req = Request::PriceSubscribe {
            market_id: "FOREX_EURUSD".to_owned(),
        };
        assert_eq!(
            req.to_string(),
            r#"{"event":"price:subscribe","market_id":"FOREX_EURUSD"}"#
        );
        let req = Request::OrderUnsubscribe {
            eth_address: "0xabc".to_owned(),
        };
        assert_eq!(
            req.to_string(),
            r#"{"event":"order:unsubscribe","eth_address":"0xabc"}"#
        );
    }
}
