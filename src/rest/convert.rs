use crate::model::{DateTime, Market, MarketDetail, Order};
use super::entities::{MarketDetailDto, MarketDto, OrderDto};

impl From<MarketDto> for Market {
    fn from(dto: MarketDto) -> Self {
        let MarketDto { market_id, symbol, name, close, change_percent, status, kind } = dto;
        Market {
            id: market_id,
            symbol,
            name,
            close,
            change_percent,
            status,
            kind,
        }
    }
}

impl From<MarketDetailDto> for MarketDetail {
    fn from(dto: MarketDetailDto) -> Self {
        MarketDetail {
            market: dto.market.into(),
            min_leverage: dto.min_leverage,
            max_leverage: dto.max_leverage,
            spread: dto.spread,
            high_24h: dto.high_24h,
            low_24h: dto.low_24h,
            volume_24h: dto.volume_24h,
        }
    }
}

impl From<OrderDto> for Order {
    fn from(dto: OrderDto) -> Self {
        let OrderDto { order_id, market_id, direction, status, token_amount, price, created_at } = dto;
        let created_at = DateTime::parse_from_rfc3339(&created_at).unwrap_or_else(|e| {
            log::warn!("bad order timestamp {}: {}", created_at, e);
            chrono::DateTime::<chrono::Utc>::from(std::time::UNIX_EPOCH).into()
        });
        Order {
            order_id,
            market_id,
            direction,
            status,
            token_amount,
            price,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Direction, MarketStatus, MarketType, OrderStatus};

    #[test]
    fn market_dto_maps_into_model() {
        let data = r#"{
            "market_id": "COMMODITY_GOLD",
            "symbol": "XAU",
            "name": "Gold",
            "close": 2411.2,
            "change_percent": -0.34,
            "status": "open",
            "type": "commodity"
        }"#;
        let dto: MarketDto = serde_json::from_str(data).unwrap();
        let market: Market = dto.into();
        assert_eq!(market.id, "COMMODITY_GOLD");
        assert_eq!(market.kind, MarketType::Commodity);
        assert_eq!(market.status, MarketStatus::Open);
    }

    #[test]
    fn order_dto_maps_into_model() {
        let data = r#"{
            "order_id": "0x6f21",
            "market_id": "INDEX_SPX",
            "direction": "long",
            "status": "pending",
            "token_amount": "1000000000000000000",
            "created_at": "2025-11-07T15:35:00Z"
        }"#;
        let dto: OrderDto = serde_json::from_str(data).unwrap();
        let order: Order = dto.into();
        assert_eq!(order.direction, Direction::Long);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.created_at.timestamp(), 1762529700);
        assert_eq!(order.price, None);
    }
}
