use std::str::FromStr;

use tokio::io::{stdin, AsyncBufReadExt, BufReader};

use crate::format;
use crate::model::{Direction, MarketType, Timeframe};
use crate::trader::entities::{PortfolioView, Request, Response};
use crate::trader::{Trader, TraderConf};

pub async fn start_bot() {
    let conf = retrieve_conf();
    let handle = Trader::start(conf);

    if let Ok(address) = std::env::var("ETH_ADDRESS") {
        if handle.send(Request::SetAddress(Some(address))).await.is_err() {
            return;
        }
    }

    print_help();
    let responses = handle.receiver();
    let mut lines = BufReader::new(stdin()).lines();
    loop {
        tokio::select! {
            msg = responses.recv() => {
                match msg {
                    Ok(msg) => display(msg),
                    Err(_) => {
                        log::error!("trader stopped");
                        break;
                    }
                }
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    _ => break,
                };
                match parse_command(&line) {
                    Command::Quit => break,
                    Command::Help => print_help(),
                    Command::Empty => {}
                    Command::Invalid(reason) => println!("{}", reason),
                    Command::Send(request) => {
                        if handle.send(request).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }
}

fn retrieve_conf() -> TraderConf {
    let rest_uri = std::env::var("MORPHER_API_URL")
        .unwrap_or_else(|_| "https://api.morpher.com/v2".to_owned());
    let streaming_uri = std::env::var("MORPHER_WS_URL")
        .unwrap_or_else(|_| "wss://stream.morpher.com/v2/feed".to_owned());
    let api_key = std::env::var("MORPHER_API_KEY").expect("MORPHER_API_KEY not set");
    TraderConf { rest_uri, streaming_uri, api_key }
}

#[derive(Debug)]
enum Command {
    Quit,
    Help,
    Empty,
    Invalid(String),
    Send(Request),
}

fn parse_command(line: &str) -> Command {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        [] => Command::Empty,
        ["quit"] | ["exit"] => Command::Quit,
        ["help"] => Command::Help,
        ["markets", kind] => match MarketType::from_str(kind) {
            Ok(kind) => Command::Send(Request::MarketList(kind)),
            Err(_) => Command::Invalid(format!("unknown market type: {}", kind)),
        },
        ["trending"] => Command::Send(Request::TrendingMarkets),
        ["select", "-"] => Command::Send(Request::SelectMarketId(None)),
        ["select", id] => Command::Send(Request::SelectMarketId(Some((*id).to_owned()))),
        ["address", "-"] => Command::Send(Request::SetAddress(None)),
        ["address", address] => Command::Send(Request::SetAddress(Some((*address).to_owned()))),
        ["portfolio"] => Command::Send(Request::Portfolio),
        ["returns", timeframe] => match Timeframe::from_str(timeframe) {
            Ok(timeframe) => Command::Send(Request::Returns(timeframe)),
            Err(_) => Command::Invalid("timeframe is one of: d w m y".to_owned()),
        },
        ["orders"] => Command::Send(Request::Orders { order_id: None }),
        ["orders", id] => Command::Send(Request::Orders {
            order_id: Some((*id).to_owned()),
        }),
        [direction @ ("long" | "short"), market_id, amount, leverage] => {
            let direction = match Direction::from_str(direction) {
                Ok(direction) => direction,
                Err(_) => unreachable!(),
            };
            let token_amount = match format::to_fixed(amount, format::TOKEN_DECIMALS) {
                Some(amount) if amount > 0 => amount.to_string(),
                _ => return Command::Invalid(format!("bad amount: {}", amount)),
            };
            let leverage = match format::to_fixed(leverage, format::PRICE_DECIMALS) {
                Some(leverage) if leverage > 0 => leverage.to_string(),
                _ => return Command::Invalid(format!("bad leverage: {}", leverage)),
            };
            Command::Send(Request::Trade {
                market_id: (*market_id).to_owned(),
                direction,
                token_amount,
                leverage,
            })
        }
        ["close", position_id] => Command::Send(Request::ClosePosition {
            position_id: (*position_id).to_owned(),
        }),
        ["cancel", order_id] => Command::Send(Request::CancelOrder {
            order_id: (*order_id).to_owned(),
        }),
        _ => Command::Invalid("unknown command, try: help".to_owned()),
    }
}

fn print_help() {
    println!("commands:");
    println!("  markets <crypto|stock|forex|index|commodity>");
    println!("  trending");
    println!("  select <market_id | ->");
    println!("  address <0x... | ->");
    println!("  portfolio");
    println!("  returns <d|w|m|y>");
    println!("  orders [order_id]");
    println!("  long|short <market_id> <amount> <leverage>");
    println!("  close <position_id>");
    println!("  cancel <order_id>");
    println!("  quit");
}

fn display(response: Response) {
    match response {
        Response::MarketList { kind, markets } => {
            println!("{} markets:", kind);
            for market in &markets {
                print_market_row(market);
            }
        }
        Response::TrendingMarkets(markets) => {
            println!("trending:");
            for market in &markets {
                print_market_row(market);
            }
        }
        Response::MarketData(detail) => {
            print_market_row(&detail.market);
            println!(
                "  leverage {:.1}x..{:.1}x, spread {:.4}, 24h {:.2}..{:.2}, volume {:.0}",
                detail.min_leverage,
                detail.max_leverage,
                detail.spread,
                detail.low_24h,
                detail.high_24h,
                detail.volume_24h,
            );
        }
        Response::Price { market_id, close } => {
            println!("{} {}", market_id, format::format_quote(close));
        }
        Response::Portfolio(view) => print_portfolio(view),
        Response::Returns { timeframe, series } => {
            println!("returns ({}):", timeframe);
            for point in &series {
                println!("  {} {:.2}", format_timestamp(point.timestamp), point.value);
            }
        }
        Response::Orders(orders) => {
            for order in &orders {
                println!(
                    "{} {} {:<12} {:<6} {:<9} {} @ {}",
                    order.order_id,
                    order.created_at.format("%Y-%m-%d %H:%M"),
                    order.market_id,
                    order.direction,
                    order.status,
                    format::format_token(&order.token_amount),
                    order.price.as_deref().map(format::format_price).unwrap_or_else(|| "-".to_owned()),
                );
            }
        }
        Response::OrderUpdate(update) => {
            println!(
                "order {} ({} {} {} MPH): {}",
                update.order_id,
                update.market_id,
                update.direction,
                format::format_token(&update.token_amount),
                update.status,
            );
            if let Some(price) = update.price.as_deref() {
                println!("  filled at {}", format::format_price(price));
            }
            if let Some(code) = update.error_code.as_deref() {
                println!("  {}", error_message(Some(code)));
            }
        }
        Response::TradeResult(result) => {
            use crate::rest::entities::TradeResult;
            match result {
                TradeResult::Success { order_id } => println!("order accepted: {}", order_id),
                TradeResult::Error { code, message } => {
                    println!("{}", error_message(code.as_deref()));
                    if let Some(message) = message {
                        log::info!("venue said: {}", message);
                    }
                }
            }
        }
        Response::NotConnected => println!("no wallet connected, use: address 0x..."),
    }
}

fn print_market_row(market: &crate::model::Market) {
    println!(
        "{:<20} {:<8} {:<24} {:>12} {:>9} {:<9} {}",
        market.id,
        market.symbol,
        market.name,
        format::format_quote(market.close),
        format::format_percent(market.change_percent),
        market.status,
        market.kind,
    );
}

fn print_portfolio(view: PortfolioView) {
    if view.loading {
        println!("loading...");
        return;
    }
    let portfolio = match view.portfolio {
        Some(portfolio) => portfolio,
        None => {
            println!("no data");
            return;
        }
    };
    println!(
        "portfolio: total {} MPH, cash {} MPH, unrealized {} MPH, {} position(s)",
        format::format_token(&portfolio.total_portfolio_value),
        format::format_token(&portfolio.cash_balance),
        format::format_token(&portfolio.unrealized_pnl),
        portfolio.positions_count,
    );
    for position in &view.positions {
        println!(
            "  {} {:<20} {:<6} {:>12} MPH  in @ {}  {}x  {} MPH ({})",
            position.position_id,
            position.market_id,
            position.direction,
            format::format_token(&position.value),
            format::format_price(&position.average_price),
            format::format_price(&position.average_leverage),
            format::format_token(&position.total_return),
            format::format_percent(position.total_return_percent),
        );
    }
    println!(
        "  open position value: {} MPH",
        format::format_fixed(view.position_value, format::TOKEN_DECIMALS, 2)
    );
    if view.trade_complete {
        println!("  last trade settled");
    }
}

fn format_timestamp(millis: i64) -> String {
    match chrono::DateTime::from_timestamp_millis(millis) {
        Some(time) => time.format("%Y-%m-%d %H:%M").to_string(),
        None => millis.to_string(),
    }
}

fn error_message(code: Option<&str>) -> &'static str {
    match code {
        Some("insufficient_funds") => "not enough balance for this trade",
        Some("market_closed") => "this market is currently closed",
        Some("market_halted") => "trading is halted on this market",
        Some("leverage_too_high") => "requested leverage exceeds the market maximum",
        Some("order_not_found") => "order not found or already settled",
        Some("position_not_found") => "position not found or already closed",
        _ => "something went wrong, please try again",
    }
}
