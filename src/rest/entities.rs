use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::error::Error;
use crate::model::{
    DataPoint, Direction, Market, MarketDetail, MarketStatus, MarketType, Order, OrderStatus,
    Portfolio, Position, Timeframe,
};

#[derive(Clone, Debug)]
pub enum Request {
    Portfolio {
        eth_address: String,
        generation: u64,
    },
    Positions {
        eth_address: String,
        market_id: Option<String>,
        generation: u64,
    },
    Returns {
        eth_address: String,
        timeframe: Timeframe,
        generation: u64,
    },
    MarketData {
        eth_address: String,
        market_id: String,
    },
    MarketList {
        kind: MarketType,
    },
    TrendingMarkets,
    Orders {
        eth_address: String,
        order_id: Option<String>,
    },
    ExecuteTrade(SystemTime, TradeIntent),
    ClosePosition(SystemTime, CloseIntent),
    CancelOrder(SystemTime, CancelIntent),
}

#[derive(Debug)]
pub enum Response {
    Err(Request, Error),
    Portfolio {
        generation: u64,
        portfolio: Portfolio,
    },
    Positions {
        generation: u64,
        positions: Vec<Position>,
    },
    Returns {
        generation: u64,
        timeframe: Timeframe,
        series: Vec<DataPoint>,
    },
    MarketData(MarketDetail),
    MarketList {
        kind: MarketType,
        markets: Vec<Market>,
    },
    TrendingMarkets(Vec<Market>),
    Orders(Vec<Order>),
    TradeResult(SystemTime, TradeResult),
}

#[derive(Serialize, Clone, Debug)]
pub struct TradeIntent {
    pub eth_address: String,
    pub market_id: String,
    pub direction: Direction,
    pub token_amount: String,
    pub leverage: String,
}

#[derive(Serialize, Clone, Debug)]
pub struct CloseIntent {
    pub eth_address: String,
    pub position_id: String,
}

#[derive(Serialize, Clone, Debug)]
pub struct CancelIntent {
    pub eth_address: String,
    pub order_id: String,
}

/// Completion of a trade mutation, tagged success/error by the venue.
#[derive(Deserialize, Clone, Debug)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum TradeResult {
    Success {
        order_id: String,
    },
    Error {
        code: Option<String>,
        message: Option<String>,
    },
}

/// Success envelope of 2xx responses.
#[derive(Deserialize, Debug)]
pub struct Payload<T> {
    pub payload: T,
}

#[derive(Deserialize, Debug)]
pub struct MarketDto {
    pub market_id: String,
    pub symbol: String,
    pub name: String,
    pub close: f64,
    pub change_percent: f64,
    pub status: MarketStatus,
    #[serde(rename = "type")]
    pub kind: MarketType,
}

#[derive(Deserialize, Debug)]
pub struct MarketDetailDto {
    #[serde(flatten)]
    pub market: MarketDto,
    pub min_leverage: f64,
    pub max_leverage: f64,
    pub spread: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub volume_24h: f64,
}

#[derive(Deserialize, Debug)]
pub struct OrderDto {
    pub order_id: String,
    pub market_id: String,
    pub direction: Direction,
    pub status: OrderStatus,
    pub token_amount: String,
    pub price: Option<String>,
    pub created_at: String,
}
