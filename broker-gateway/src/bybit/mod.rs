//! Bybit v2 inverse-perpetual REST client.

pub mod auth;
pub mod response;

pub use auth::{Credentials, Params};

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use reqwest::{Client, Response};
use response::{
    best_of_side, decode_envelope, wallet_balances, RawBookLevel, RawFunding, RawOrder,
    RawOrderAck, RawPosition, RawPositionEntry, RawSymbol, RawWallets,
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use trading::{
    Exchange, ExchangeError, FundingRate, OrderId, OrderRequest, OrderSnapshot, Position, Side,
    SymbolInfo, WalletBalance,
};

pub const MAINNET_API: &str = "https://api.bybit.com";
pub const TESTNET_API: &str = "https://api-testnet.bybit.com";

type Result<T> = std::result::Result<T, ExchangeError>;

/// Which Bybit environment to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn base_url(&self) -> &'static str {
        match self {
            Network::Mainnet => MAINNET_API,
            Network::Testnet => TESTNET_API,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "MAINNET"),
            Network::Testnet => write!(f, "TESTNET"),
        }
    }
}

fn transport(e: reqwest::Error) -> ExchangeError {
    ExchangeError::Transport(e.to_string())
}

pub struct BybitClient {
    http: Client,
    credentials: Credentials,
    base_url: String,
}

impl BybitClient {
    pub fn new(credentials: Credentials, network: Network, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport)?;
        Ok(Self {
            http,
            credentials,
            base_url: network.base_url().to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read(response: Response) -> Result<String> {
        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        if !status.is_success() {
            return Err(ExchangeError::Http {
                status: status.as_u16(),
                body,
            });
        }
        debug!("Response body: {}", body);
        Ok(body)
    }

    async fn public_get<T: DeserializeOwned>(&self, path: &str, params: Params) -> Result<T> {
        let mut url = self.url(path);
        if !params.is_empty() {
            url = format!("{}?{}", url, auth::query_string(&params));
        }
        debug!("GET {}", url);
        let response = self.http.get(&url).send().await.map_err(transport)?;
        decode_envelope(&Self::read(response).await?)
    }

    async fn private_get<T: DeserializeOwned>(&self, path: &str, params: Params) -> Result<T> {
        let signed = self
            .credentials
            .authorize(params, Utc::now().timestamp_millis())?;
        let url = format!("{}?{}", self.url(path), auth::query_string(&signed));
        debug!("GET {}{}", self.base_url, path);
        let response = self.http.get(&url).send().await.map_err(transport)?;
        decode_envelope(&Self::read(response).await?)
    }

    async fn private_post<T: DeserializeOwned>(&self, path: &str, params: Params) -> Result<T> {
        let signed = self
            .credentials
            .authorize(params, Utc::now().timestamp_millis())?;
        let url = self.url(path);
        debug!("POST {} {:?}", url, signed.get("symbol"));
        let response = self
            .http
            .post(&url)
            .json(&signed)
            .send()
            .await
            .map_err(transport)?;
        decode_envelope(&Self::read(response).await?)
    }
}

fn symbol_params(symbol: &str) -> Params {
    let mut params = Params::new();
    params.insert("symbol".to_string(), symbol.to_string());
    params
}

fn order_params(symbol: &str, order_id: &OrderId) -> Params {
    let mut params = symbol_params(symbol);
    params.insert("order_id".to_string(), order_id.to_string());
    params
}

/// Body of `/v2/private/order/create` for a limit order.
pub fn create_order_params(request: &OrderRequest) -> Params {
    let mut params = symbol_params(request.symbol());
    params.insert("side".to_string(), request.side().to_string());
    params.insert("order_type".to_string(), "Limit".to_string());
    params.insert("qty".to_string(), request.quantity().to_string());
    params.insert("price".to_string(), request.price().to_string());
    let tif = if request.is_post_only() {
        "PostOnly"
    } else {
        "GoodTillCancel"
    };
    params.insert("time_in_force".to_string(), tif.to_string());
    params
}

#[async_trait]
impl Exchange for BybitClient {
    async fn symbols(&self) -> Result<Vec<SymbolInfo>> {
        let raw: Vec<RawSymbol> = self.public_get("/v2/public/symbols", Params::new()).await?;
        Ok(raw.into_iter().map(SymbolInfo::from).collect())
    }

    async fn previous_funding(&self, symbol: &str) -> Result<FundingRate> {
        let raw: RawFunding = self
            .public_get("/v2/public/funding/prev-funding-rate", symbol_params(symbol))
            .await?;
        FundingRate::try_from(raw)
    }

    async fn best_price(&self, symbol: &str, side: Side) -> Result<Decimal> {
        let levels: Vec<RawBookLevel> = self
            .public_get("/v2/public/orderBook/L2", symbol_params(symbol))
            .await?;
        best_of_side(&levels, side)
    }

    async fn position(&self, symbol: &str) -> Result<Position> {
        let raw: RawPosition = self
            .private_get("/v2/private/position/list", symbol_params(symbol))
            .await?;
        Ok(raw.into())
    }

    async fn positions(&self) -> Result<Vec<Position>> {
        let raw: Vec<RawPositionEntry> = self
            .private_get("/v2/private/position/list", Params::new())
            .await?;
        Ok(raw.into_iter().map(|entry| entry.data.into()).collect())
    }

    async fn balance(&self, coin: &str) -> Result<Decimal> {
        self.wallet()
            .await?
            .into_iter()
            .find(|w| w.coin == coin)
            .map(|w| w.available_balance)
            .ok_or_else(|| ExchangeError::Decode(format!("no wallet entry for {}", coin)))
    }

    async fn wallet(&self) -> Result<Vec<WalletBalance>> {
        let raw: RawWallets = self
            .private_get("/v2/private/wallet/balance", Params::new())
            .await?;
        Ok(wallet_balances(raw))
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<OrderId> {
        let ack: RawOrderAck = self
            .private_post("/v2/private/order/create", create_order_params(request))
            .await?;
        Ok(OrderId::new(ack.order_id))
    }

    async fn order(&self, symbol: &str, order_id: &OrderId) -> Result<OrderSnapshot> {
        let raw: RawOrder = self
            .private_get("/v2/private/order", order_params(symbol, order_id))
            .await?;
        Ok(raw.into())
    }

    async fn cancel_order(&self, symbol: &str, order_id: &OrderId) -> Result<()> {
        let _: Value = self
            .private_post("/v2/private/order/cancel", order_params(symbol, order_id))
            .await?;
        Ok(())
    }

    async fn amend_order(
        &self,
        symbol: &str,
        order_id: &OrderId,
        quantity: u64,
        price: Decimal,
    ) -> Result<OrderId> {
        let mut params = order_params(symbol, order_id);
        params.insert("p_r_qty".to_string(), quantity.to_string());
        params.insert("p_r_price".to_string(), price.to_string());
        let ack: RawOrderAck = self
            .private_post("/v2/private/order/replace", params)
            .await?;
        Ok(OrderId::new(ack.order_id))
    }

    async fn cancel_all_orders(&self, symbol: &str) -> Result<()> {
        let _: Value = self
            .private_post("/v2/private/order/cancelAll", symbol_params(symbol))
            .await?;
        Ok(())
    }
}
