use std::collections::HashMap;

use async_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};

use crate::format;
use crate::streaming::entities::Request as StreamingRequest;

pub type DateTime = chrono::DateTime<chrono::FixedOffset>;

/// A service loop ended because one of its channels closed.
#[derive(Debug)]
pub struct ChannelStopped;

impl<T> From<async_channel::SendError<T>> for ChannelStopped {
    fn from(_: async_channel::SendError<T>) -> Self {
        ChannelStopped
    }
}

impl From<async_channel::RecvError> for ChannelStopped {
    fn from(_: async_channel::RecvError) -> Self {
        ChannelStopped
    }
}

/// Request/response channel pair of a spawned service.
pub struct ServiceHandle<Req, Res> {
    sender: Sender<Req>,
    receiver: Receiver<Res>,
}

impl<Req, Res> ServiceHandle<Req, Res> {
    pub fn new(sender: Sender<Req>, receiver: Receiver<Res>) -> Self {
        Self { sender, receiver }
    }
    pub async fn send(&self, req: Req) -> Result<(), ChannelStopped> {
        self.sender.send(req).await.map_err(|_| ChannelStopped)
    }
    pub async fn recv(&self) -> Result<Res, ChannelStopped> {
        self.receiver.recv().await.map_err(|_| ChannelStopped)
    }
    pub fn receiver(&self) -> Receiver<Res> {
        self.receiver.clone()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Hash, Eq, PartialEq, strum::Display, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MarketType {
    Crypto,
    Stock,
    Forex,
    Index,
    Commodity,
}

#[derive(Deserialize, Debug, Clone, Copy, Eq, PartialEq, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MarketStatus {
    Open,
    Pre,
    After,
    Closed,
    Halted,
}

#[derive(Debug, Clone)]
pub struct Market {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub close: f64,
    pub change_percent: f64,
    pub status: MarketStatus,
    pub kind: MarketType,
}

#[derive(Debug, Clone)]
pub struct MarketDetail {
    pub market: Market,
    pub min_leverage: f64,
    pub max_leverage: f64,
    pub spread: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub volume_24h: f64,
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, strum::Display, strum::EnumString)]
pub enum Timeframe {
    #[strum(serialize = "d")]
    Day,
    #[strum(serialize = "w")]
    Week,
    #[strum(serialize = "m")]
    Month,
    #[strum(serialize = "y")]
    Year,
}

pub const TIMEFRAMES: [Timeframe; 4] = [
    Timeframe::Day,
    Timeframe::Week,
    Timeframe::Month,
    Timeframe::Year,
];

/// One point of a returns series, timestamp in unix milliseconds.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct DataPoint {
    pub timestamp: i64,
    pub value: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq, strum::Display, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

#[derive(Deserialize, Debug, Clone, Copy, Eq, PartialEq, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Success,
    Cancelled,
    Error,
}

/// Holder-level aggregates, 10^18-scaled integer strings.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub total_portfolio_value: String,
    pub cash_balance: String,
    pub positions_count: u32,
    pub unrealized_pnl: String,
}

impl Portfolio {
    /// The defined state of an address the venue knows nothing about.
    pub fn zero() -> Self {
        Self {
            total_portfolio_value: "0".to_owned(),
            cash_balance: "0".to_owned(),
            positions_count: 0,
            unrealized_pnl: "0".to_owned(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Position {
    pub position_id: String,
    pub market_id: String,
    pub direction: Direction,
    pub average_price: String,
    pub average_leverage: String,
    pub value: String,
    pub total_return: String,
    pub total_return_percent: f64,
}

#[derive(Debug, Clone)]
pub struct Order {
    pub order_id: String,
    pub market_id: String,
    pub direction: Direction,
    pub status: OrderStatus,
    pub token_amount: String,
    pub price: Option<String>,
    pub created_at: DateTime,
}

/// Lifecycle update of a single order, pushed over the stream.
#[derive(Deserialize, Debug, Clone)]
pub struct OrderUpdate {
    pub order_id: String,
    pub market_id: String,
    pub direction: Direction,
    pub status: OrderStatus,
    pub token_amount: String,
    pub price: Option<String>,
    pub error_code: Option<String>,
}

/// Selected market, market directory and live quotes.
///
/// Setters return the wire requests the owner must issue, so subscription
/// bookkeeping stays checkable without a socket.
#[derive(Default)]
pub struct MarketState {
    pub selected: Option<Market>,
    pub selected_id: Option<String>,
    pub list: HashMap<MarketType, Vec<Market>>,
    pub list_all: Vec<Market>,
    pub live_prices: HashMap<String, f64>,
}

impl MarketState {
    /// Replaces the selection. Seeds the live quote from the last known close
    /// and swaps the price subscription: at most one is active at a time.
    pub fn set_selected_market(&mut self, market: Option<Market>) -> Vec<StreamingRequest> {
        let mut wire = Vec::new();
        if let Some(prev) = self.selected.take() {
            wire.push(StreamingRequest::PriceUnsubscribe { market_id: prev.id });
        }
        if let Some(market) = market {
            self.live_prices.insert(market.id.clone(), market.close);
            wire.push(StreamingRequest::PriceSubscribe {
                market_id: market.id.clone(),
            });
            self.selected = Some(market);
        }
        wire
    }

    pub fn set_selected_market_id(&mut self, id: Option<String>) {
        self.selected_id = id;
    }

    /// Merges a pushed quote. Ticks for anything but the subscribed market are
    /// dropped, so a stale subscription cannot touch the map after a switch.
    pub fn apply_price(&mut self, market_id: &str, close: f64) -> bool {
        match &self.selected {
            Some(market) if market.id == market_id => {
                self.live_prices.insert(market_id.to_owned(), close);
                true
            }
            _ => false,
        }
    }

    pub fn set_market_list(&mut self, kind: MarketType, markets: Vec<Market>) {
        self.list.insert(kind, markets);
    }

    pub fn set_market_list_all(&mut self, markets: Vec<Market>) {
        self.list_all = markets;
    }

    pub fn resolve(&self, id: &str) -> Option<&Market> {
        self.list_all
            .iter()
            .chain(self.list.values().flatten())
            .find(|market| market.id == id)
    }

    pub fn quote(&self, market_id: &str) -> Option<f64> {
        self.live_prices.get(market_id).copied()
    }
}

/// Effect of an address change, to be executed by the owning service.
#[derive(Debug, PartialEq)]
pub enum AddressChange {
    Refetch {
        unsubscribe: Option<String>,
        address: String,
        generation: u64,
    },
    Teardown {
        unsubscribe: Option<String>,
    },
}

/// Wallet-scoped mirror of venue state: summary, positions, returns and the
/// last order event. Refetched wholesale, never patched in place.
#[derive(Default)]
pub struct PortfolioState {
    pub eth_address: Option<String>,
    pub portfolio: Option<Portfolio>,
    pub positions: Vec<Position>,
    pub position_value: i128,
    pub returns: HashMap<Timeframe, Vec<DataPoint>>,
    pub last_order_update: Option<OrderUpdate>,
    pub trade_complete: bool,
    pub loading: bool,
    generation: u64,
}

impl PortfolioState {
    /// Repeated calls with the current address are a no-op, so upstream
    /// re-renders cannot cause fetch storms.
    pub fn set_eth_address(&mut self, address: Option<String>) -> Option<AddressChange> {
        if self.eth_address == address {
            return None;
        }
        let prev = std::mem::replace(&mut self.eth_address, address.clone());
        match address {
            Some(address) => {
                self.loading = true;
                self.generation += 1;
                Some(AddressChange::Refetch {
                    unsubscribe: prev,
                    address,
                    generation: self.generation,
                })
            }
            None => {
                self.portfolio = None;
                self.positions = Vec::new();
                self.position_value = 0;
                self.returns = HashMap::new();
                self.trade_complete = false;
                self.loading = false;
                Some(AddressChange::Teardown { unsubscribe: prev })
            }
        }
    }

    /// Opens a new fetch round for the current address. Responses from earlier
    /// rounds fail the `is_current` check and must be dropped before merging.
    pub fn begin_refresh(&mut self) -> Option<(String, u64)> {
        let address = self.eth_address.clone()?;
        self.loading = true;
        self.generation += 1;
        Some((address, self.generation))
    }

    pub fn current_generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    pub fn set_portfolio(&mut self, portfolio: Portfolio) {
        self.portfolio = Some(portfolio);
        self.loading = false;
    }

    /// Degradation path for an address the venue has no portfolio for.
    pub fn set_empty_portfolio(&mut self) {
        self.portfolio = Some(Portfolio::zero());
        self.positions = Vec::new();
        self.position_value = 0;
        self.loading = false;
    }

    /// Unknown-failure path: drop everything, surface "no data".
    pub fn clear_portfolio(&mut self) {
        self.portfolio = None;
        self.returns = HashMap::new();
        self.loading = false;
    }

    /// Wholesale replacement; recomputes the aggregate value eagerly.
    pub fn set_position_list(&mut self, positions: Vec<Position>) {
        let mut total = 0i128;
        for position in &positions {
            match format::parse_fixed(&position.value) {
                Some(value) => total += value,
                None => log::warn!(
                    "unparsable value {} for position {}",
                    position.value,
                    position.position_id
                ),
            }
        }
        self.position_value = total;
        self.positions = positions;
    }

    /// Replaces one timeframe bucket, the others stay untouched.
    pub fn set_returns(&mut self, timeframe: Timeframe, series: Vec<DataPoint>) {
        self.returns.insert(timeframe, series);
    }

    pub fn set_order_update(&mut self, update: OrderUpdate) {
        self.last_order_update = Some(update);
    }

    pub fn set_trade_complete(&mut self, complete: bool) {
        self.trade_complete = complete;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market(id: &str, close: f64) -> Market {
        Market {
            id: id.to_owned(),
            symbol: id.to_owned(),
            name: id.to_owned(),
            close,
            change_percent: 0.0,
            status: MarketStatus::Open,
            kind: MarketType::Crypto,
        }
    }

    fn position(id: &str, value: &str) -> Position {
        Position {
            position_id: id.to_owned(),
            market_id: "CRYPTO_BTC".to_owned(),
            direction: Direction::Long,
            average_price: "6500000000000".to_owned(),
            average_leverage: "200000000".to_owned(),
            value: value.to_owned(),
            total_return: "0".to_owned(),
            total_return_percent: 0.0,
        }
    }

    #[test]
    fn address_setter_is_idempotent() {
        let mut state = PortfolioState::default();
        let first = state.set_eth_address(Some("0xabc".to_owned()));
        assert!(matches!(
            first,
            Some(AddressChange::Refetch { generation: 1, .. })
        ));
        assert!(state.loading);
        // same address again: no second fetch round
        assert!(state.set_eth_address(Some("0xabc".to_owned())).is_none());
        assert_eq!(state.current_generation(), 1);
    }

    #[test]
    fn address_change_supersedes_older_round() {
        let mut state = PortfolioState::default();
        state.set_eth_address(Some("0xabc".to_owned()));
        let old = state.current_generation();
        state.set_eth_address(Some("0xdef".to_owned()));
        assert!(!state.is_current(old));
        assert!(state.is_current(state.current_generation()));
    }

    #[test]
    fn clearing_address_drops_wallet_state() {
        let mut state = PortfolioState::default();
        state.set_eth_address(Some("0xabc".to_owned()));
        state.set_portfolio(Portfolio::zero());
        state.set_returns(Timeframe::Day, vec![DataPoint { timestamp: 0, value: 1.0 }]);
        let change = state.set_eth_address(None);
        assert_eq!(
            change,
            Some(AddressChange::Teardown {
                unsubscribe: Some("0xabc".to_owned())
            })
        );
        assert!(state.portfolio.is_none());
        assert!(state.returns.is_empty());
        assert!(!state.loading);
    }

    #[test]
    fn position_list_sums_fixed_point_values() {
        let mut state = PortfolioState::default();
        state.set_position_list(vec![
            position("p1", "1000000000000000000"),
            position("p2", "2000000000000000000"),
        ]);
        assert_eq!(state.position_value, 3_000_000_000_000_000_000);
        // wholesale replacement recomputes, not accumulates
        state.set_position_list(vec![position("p3", "500000000000000000")]);
        assert_eq!(state.position_value, 500_000_000_000_000_000);
    }

    #[test]
    fn returns_buckets_are_independent() {
        let mut state = PortfolioState::default();
        let week = vec![DataPoint { timestamp: 1, value: 10.0 }];
        let month = vec![DataPoint { timestamp: 2, value: 20.0 }];
        state.set_returns(Timeframe::Week, week.clone());
        state.set_returns(Timeframe::Month, month);
        assert_eq!(state.returns.get(&Timeframe::Week), Some(&week));
    }

    #[test]
    fn known_empty_portfolio_degrades_to_zero_default() {
        let mut state = PortfolioState::default();
        state.set_eth_address(Some("0xabc".to_owned()));
        state.set_empty_portfolio();
        assert_eq!(state.portfolio, Some(Portfolio::zero()));
        assert!(!state.loading);
    }

    #[test]
    fn unknown_failure_clears_portfolio_and_returns() {
        let mut state = PortfolioState::default();
        state.set_eth_address(Some("0xabc".to_owned()));
        state.set_returns(Timeframe::Day, vec![DataPoint { timestamp: 0, value: 1.0 }]);
        state.clear_portfolio();
        assert!(state.portfolio.is_none());
        assert!(state.returns.is_empty());
        assert!(!state.loading);
    }

    #[test]
    fn switching_markets_swaps_the_subscription() {
        let mut state = MarketState::default();
        let wire = state.set_selected_market(Some(market("CRYPTO_BTC", 65000.0)));
        assert_eq!(
            wire,
            vec![StreamingRequest::PriceSubscribe {
                market_id: "CRYPTO_BTC".to_owned()
            }]
        );
        assert_eq!(state.quote("CRYPTO_BTC"), Some(65000.0));

        let wire = state.set_selected_market(Some(market("CRYPTO_ETH", 3500.0)));
        assert_eq!(
            wire,
            vec![
                StreamingRequest::PriceUnsubscribe {
                    market_id: "CRYPTO_BTC".to_owned()
                },
                StreamingRequest::PriceSubscribe {
                    market_id: "CRYPTO_ETH".to_owned()
                },
            ]
        );

        // a residual tick for the old market must not touch the map
        assert!(!state.apply_price("CRYPTO_BTC", 66000.0));
        assert_eq!(state.quote("CRYPTO_BTC"), Some(65000.0));
        assert!(state.apply_price("CRYPTO_ETH", 3510.0));
        assert_eq!(state.quote("CRYPTO_ETH"), Some(3510.0));
    }

    #[test]
    fn clearing_selection_tears_down_only() {
        let mut state = MarketState::default();
        state.set_selected_market(Some(market("CRYPTO_BTC", 65000.0)));
        let wire = state.set_selected_market(None);
        assert_eq!(
            wire,
            vec![StreamingRequest::PriceUnsubscribe {
                market_id: "CRYPTO_BTC".to_owned()
            }]
        );
        assert!(!state.apply_price("CRYPTO_BTC", 1.0));
    }

    #[test]
    fn market_lists_replace_wholesale() {
        let mut state = MarketState::default();
        state.set_market_list(MarketType::Crypto, vec![market("CRYPTO_BTC", 1.0)]);
        state.set_market_list(MarketType::Crypto, vec![market("CRYPTO_ETH", 2.0)]);
        assert_eq!(state.list.get(&MarketType::Crypto).map(Vec::len), Some(1));
        state.set_market_list_all(vec![market("CRYPTO_ETH", 2.0)]);
        assert!(state.resolve("CRYPTO_ETH").is_some());
        assert!(state.resolve("CRYPTO_BTC").is_none());
    }
}
