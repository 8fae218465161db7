pub mod entities;

use std::time::SystemTime;

use async_channel::{Receiver, Sender};
use entities::{PortfolioView, Request, Response};

use crate::model::{
    AddressChange, ChannelStopped, Market, MarketState, PortfolioState, ServiceHandle, TIMEFRAMES,
};
use crate::rest::entities::{
    CancelIntent, CloseIntent, Request as RestRequest, Response as RestResponse, TradeIntent,
    TradeResult,
};
use crate::rest::{error::Error as RestError, Rest};
use crate::streaming;
use crate::streaming::entities::{
    Request as StreamingRequest, Response as StreamingResponse, ResponseType,
};

pub struct TraderConf {
    pub rest_uri: String,
    pub streaming_uri: String,
    pub api_key: String,
}

/// Owns the market and portfolio caches and keeps them in sync with the venue:
/// rest responses and stream pushes come in, cache snapshots go out.
pub struct Trader {
    sender: Sender<Response>,
    receiver: Receiver<Request>,
    streaming: ServiceHandle<StreamingRequest, StreamingResponse>,
    rest: ServiceHandle<RestRequest, RestResponse>,
    market: MarketState,
    portfolio: PortfolioState,
}

impl Trader {
    pub fn start(conf: TraderConf) -> ServiceHandle<Request, Response> {
        let (sender, r) = async_channel::bounded(1000);
        let (s, receiver) = async_channel::bounded(1000);
        let TraderConf { rest_uri, streaming_uri, api_key } = conf;
        let trader = Self {
            sender,
            receiver,
            streaming: streaming::Service::start(streaming_uri, api_key.clone()),
            rest: Rest::start(api_key, rest_uri),
            market: Default::default(),
            portfolio: Default::default(),
        };
        tokio::spawn(async move {
            match trader.run().await {
                Ok(()) => log::error!("trader loop returned without error, channels still open?"),
                Err(_) => log::info!("trader stopped because channel is closed"),
            };
        });

        ServiceHandle::new(s, r)
    }

    async fn run(mut self) -> Result<(), ChannelStopped> {
        log::info!("trader started");
        loop {
            tokio::select! {
                msg = self.streaming.recv() => {
                    self.on_streaming(msg?).await?;
                }
                msg = self.rest.recv() => {
                    self.on_rest(msg?).await?;
                }
                msg = self.receiver.recv() => {
                    let msg = msg.map_err(|_| ChannelStopped)?;
                    self.on_request(msg).await?;
                }
            }
        }
    }

    async fn on_request(&mut self, request: Request) -> Result<(), ChannelStopped> {
        match request {
            Request::SetAddress(address) => match self.portfolio.set_eth_address(address) {
                Some(AddressChange::Refetch { unsubscribe, address, generation }) => {
                    if let Some(eth_address) = unsubscribe {
                        self.streaming
                            .send(StreamingRequest::OrderUnsubscribe { eth_address })
                            .await?;
                    }
                    self.streaming
                        .send(StreamingRequest::OrderSubscribe {
                            eth_address: address.clone(),
                        })
                        .await?;
                    self.fetch_portfolio_data(address, generation).await?;
                }
                Some(AddressChange::Teardown { unsubscribe }) => {
                    if let Some(eth_address) = unsubscribe {
                        self.streaming
                            .send(StreamingRequest::OrderUnsubscribe { eth_address })
                            .await?;
                    }
                    self.send_portfolio_view().await?;
                }
                None => {}
            },
            Request::SelectMarket(market) => {
                self.market
                    .set_selected_market_id(market.as_ref().map(|m| m.id.clone()));
                self.select_market(market).await?;
            }
            Request::SelectMarketId(id) => {
                self.market.set_selected_market_id(id);
                let market = self
                    .market
                    .selected_id
                    .as_ref()
                    .and_then(|id| self.market.resolve(id))
                    .cloned();
                self.select_market(market).await?;
                if let (Some(market_id), Some(eth_address)) = (
                    self.market.selected_id.clone(),
                    self.portfolio.eth_address.clone(),
                ) {
                    self.rest
                        .send(RestRequest::MarketData { eth_address, market_id })
                        .await?;
                }
            }
            Request::MarketList(kind) => {
                self.rest.send(RestRequest::MarketList { kind }).await?;
            }
            Request::TrendingMarkets => {
                self.rest.send(RestRequest::TrendingMarkets).await?;
            }
            Request::Portfolio => self.send_portfolio_view().await?,
            Request::Returns(timeframe) => {
                // one fetch per timeframe per session, served from cache after
                if let Some(series) = self.portfolio.returns.get(&timeframe) {
                    let series = series.clone();
                    self.sender.send(Response::Returns { timeframe, series }).await?;
                } else if let Some(eth_address) = self.portfolio.eth_address.clone() {
                    self.rest
                        .send(RestRequest::Returns {
                            eth_address,
                            timeframe,
                            generation: self.portfolio.current_generation(),
                        })
                        .await?;
                } else {
                    self.sender.send(Response::NotConnected).await?;
                }
            }
            Request::Orders { order_id } => match self.portfolio.eth_address.clone() {
                Some(eth_address) => {
                    self.rest.send(RestRequest::Orders { eth_address, order_id }).await?;
                }
                None => self.sender.send(Response::NotConnected).await?,
            },
            Request::Trade { market_id, direction, token_amount, leverage } => {
                match self.portfolio.eth_address.clone() {
                    Some(eth_address) => {
                        let intent = TradeIntent {
                            eth_address,
                            market_id,
                            direction,
                            token_amount,
                            leverage,
                        };
                        self.rest
                            .send(RestRequest::ExecuteTrade(SystemTime::now(), intent))
                            .await?;
                    }
                    None => self.sender.send(Response::NotConnected).await?,
                }
            }
            Request::ClosePosition { position_id } => match self.portfolio.eth_address.clone() {
                Some(eth_address) => {
                    let intent = CloseIntent { eth_address, position_id };
                    self.rest
                        .send(RestRequest::ClosePosition(SystemTime::now(), intent))
                        .await?;
                }
                None => self.sender.send(Response::NotConnected).await?,
            },
            Request::CancelOrder { order_id } => match self.portfolio.eth_address.clone() {
                Some(eth_address) => {
                    let intent = CancelIntent { eth_address, order_id };
                    self.rest
                        .send(RestRequest::CancelOrder(SystemTime::now(), intent))
                        .await?;
                }
                None => self.sender.send(Response::NotConnected).await?,
            },
        };
        Ok(())
    }

    async fn select_market(&mut self, market: Option<Market>) -> Result<(), ChannelStopped> {
        for wire in self.market.set_selected_market(market) {
            self.streaming.send(wire).await?;
        }
        Ok(())
    }

    async fn on_streaming(&mut self, msg: StreamingResponse) -> Result<(), ChannelStopped> {
        let StreamingResponse { time: _, kind } = msg;
        match kind {
            ResponseType::Price { market_id, close } => {
                if self.market.apply_price(&market_id, close) {
                    self.sender.send(Response::Price { market_id, close }).await?;
                }
            }
            ResponseType::Order(update) => {
                self.portfolio.set_order_update(update.clone());
                self.sender.send(Response::OrderUpdate(update)).await?;
                // consistency via full refresh instead of patching in place
                self.refresh_portfolio().await?;
            }
            ResponseType::Error { request_id, error } => {
                log::error!("streaming error (request {:?}): {}", request_id, error);
            }
        }
        Ok(())
    }

    async fn on_rest(&mut self, msg: RestResponse) -> Result<(), ChannelStopped> {
        match msg {
            RestResponse::Err(request, e) => self.on_rest_error(request, e).await?,
            RestResponse::Portfolio { generation, portfolio } => {
                if self.portfolio.is_current(generation) {
                    self.portfolio.set_portfolio(portfolio);
                    self.send_portfolio_view().await?;
                }
            }
            RestResponse::Positions { generation, positions } => {
                if self.portfolio.is_current(generation) {
                    self.portfolio.set_position_list(positions);
                    self.send_portfolio_view().await?;
                }
            }
            RestResponse::Returns { generation, timeframe, series } => {
                if self.portfolio.is_current(generation) {
                    self.portfolio.set_returns(timeframe, series.clone());
                    self.sender.send(Response::Returns { timeframe, series }).await?;
                }
            }
            RestResponse::MarketData(detail) => {
                self.sender.send(Response::MarketData(detail)).await?;
            }
            RestResponse::MarketList { kind, markets } => {
                self.market.set_market_list(kind, markets.clone());
                let all = self.market.list.values().flatten().cloned().collect();
                self.market.set_market_list_all(all);
                self.sender.send(Response::MarketList { kind, markets }).await?;
            }
            RestResponse::TrendingMarkets(markets) => {
                self.sender.send(Response::TrendingMarkets(markets)).await?;
            }
            RestResponse::Orders(orders) => {
                self.sender.send(Response::Orders(orders)).await?;
            }
            RestResponse::TradeResult(_key, result) => {
                if matches!(result, TradeResult::Success { .. }) {
                    self.portfolio.set_trade_complete(true);
                    self.refresh_portfolio().await?;
                }
                self.sender.send(Response::TradeResult(result)).await?;
            }
        }
        Ok(())
    }

    async fn on_rest_error(&mut self, request: RestRequest, e: RestError) -> Result<(), ChannelStopped> {
        match request {
            RestRequest::Portfolio { generation, .. } => {
                if !self.portfolio.is_current(generation) {
                    return Ok(());
                }
                if e.is_no_portfolio() {
                    // fresh wallet, nothing on chain yet
                    self.portfolio.set_empty_portfolio();
                } else {
                    log::error!("portfolio fetch failed: {:?}", e);
                    self.portfolio.clear_portfolio();
                }
                self.send_portfolio_view().await?;
            }
            RestRequest::Positions { generation, .. } => {
                if self.portfolio.is_current(generation) {
                    log::error!("positions fetch failed: {:?}", e);
                }
            }
            RestRequest::Returns { timeframe, generation, .. } => {
                // a failed timeframe leaves its bucket alone, the other three
                // complete independently
                if self.portfolio.is_current(generation) {
                    log::warn!("returns fetch failed for {}: {:?}", timeframe, e);
                }
            }
            RestRequest::ExecuteTrade(..) | RestRequest::ClosePosition(..) | RestRequest::CancelOrder(..) => {
                let result = match e {
                    RestError::Api { code, message, .. } => TradeResult::Error {
                        code,
                        message: Some(message),
                    },
                    e => {
                        log::error!("trade request failed: {:?}", e);
                        TradeResult::Error { code: None, message: None }
                    }
                };
                self.sender.send(Response::TradeResult(result)).await?;
            }
            request => log::error!("request {:?} failed: {:?}", request, e),
        }
        Ok(())
    }

    async fn refresh_portfolio(&mut self) -> Result<(), ChannelStopped> {
        if let Some((address, generation)) = self.portfolio.begin_refresh() {
            self.fetch_portfolio_data(address, generation).await?;
        }
        Ok(())
    }

    /// Issues the whole wallet fetch round: summary, positions and all four
    /// returns timeframes, each completing on its own.
    async fn fetch_portfolio_data(&mut self, address: String, generation: u64) -> Result<(), ChannelStopped> {
        self.rest
            .send(RestRequest::Portfolio {
                eth_address: address.clone(),
                generation,
            })
            .await?;
        self.rest
            .send(RestRequest::Positions {
                eth_address: address.clone(),
                market_id: None,
                generation,
            })
            .await?;
        for &timeframe in TIMEFRAMES.iter() {
            self.rest
                .send(RestRequest::Returns {
                    eth_address: address.clone(),
                    timeframe,
                    generation,
                })
                .await?;
        }
        Ok(())
    }

    async fn send_portfolio_view(&mut self) -> Result<(), ChannelStopped> {
        let view = PortfolioView {
            portfolio: self.portfolio.portfolio.clone(),
            positions: self.portfolio.positions.clone(),
            position_value: self.portfolio.position_value,
            trade_complete: self.portfolio.trade_complete,
            loading: self.portfolio.loading,
        };
        self.sender.send(Response::Portfolio(view)).await?;
        Ok(())
    }
}
