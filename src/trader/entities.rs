use crate::model::{
    DataPoint, Direction, Market, MarketDetail, MarketType, Order, OrderUpdate, Portfolio,
    Position, Timeframe,
};
use crate::rest::entities::TradeResult;

#[derive(Clone, Debug)]
pub enum Request {
    SetAddress(Option<String>),
    SelectMarket(Option<Market>),
    SelectMarketId(Option<String>),
    MarketList(MarketType),
    TrendingMarkets,
    Portfolio,
    Returns(Timeframe),
    Orders { order_id: Option<String> },
    Trade {
        market_id: String,
        direction: Direction,
        token_amount: String,
        leverage: String,
    },
    ClosePosition { position_id: String },
    CancelOrder { order_id: String },
}

#[derive(Debug)]
pub enum Response {
    MarketList {
        kind: MarketType,
        markets: Vec<Market>,
    },
    TrendingMarkets(Vec<Market>),
    MarketData(MarketDetail),
    Price {
        market_id: String,
        close: f64,
    },
    Portfolio(PortfolioView),
    Returns {
        timeframe: Timeframe,
        series: Vec<DataPoint>,
    },
    Orders(Vec<Order>),
    OrderUpdate(OrderUpdate),
    TradeResult(TradeResult),
    NotConnected,
}

/// Snapshot of the portfolio cache, sent after every merge.
#[derive(Debug)]
pub struct PortfolioView {
    pub portfolio: Option<Portfolio>,
    pub positions: Vec<Position>,
    pub position_value: i128,
    pub trade_complete: bool,
    pub loading: bool,
}
