//! Tool dispatch over a [`WalletSession`].

use sdk::session::{WalletSession, parse_amount};
use sdk::{SdkError, WalletBackend};
use sdk_core::Seed;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::protocol::{
    INVALID_PARAMS, JsonRpcRequest, JsonRpcResponse, METHOD_NOT_FOUND, ToolResult,
};

pub const SERVER_NAME: &str = "wallet-mcp";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

const SEED_NOT_SET: &str = "Seed not set. Please call set_seed first.";

/// Tool catalogue returned by `tools/list`.
pub fn tool_definitions() -> Value {
    json!([
        {
            "name": "set_seed",
            "title": "Set active wallet seed",
            "description": "Stores the provided seed and builds the associated wallet, making it available for subsequent operations.",
            "inputSchema": {
                "type": "object",
                "properties": { "seed": { "type": "string" } },
                "required": ["seed"]
            }
        },
        {
            "name": "get_balance",
            "title": "Get wallet balance",
            "description": "Returns the native token balance for the wallet derived from the previously provided seed.",
            "inputSchema": { "type": "object", "properties": {} }
        },
        {
            "name": "get_address",
            "title": "Get wallet address",
            "description": "Returns the wallet address derived from the previously provided seed.",
            "inputSchema": { "type": "object", "properties": {} }
        },
        {
            "name": "transfer_funds",
            "title": "Transfer funds",
            "description": "Transfers native tokens from the active wallet (seed must have been set via set_seed) to the specified recipient address.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "recipient": { "type": "string" },
                    "amount": { "type": "string", "pattern": "^[0-9]+$" }
                },
                "required": ["recipient", "amount"]
            }
        }
    ])
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct SetSeedArgs {
    seed: String,
}

#[derive(Debug, Deserialize)]
struct TransferArgs {
    recipient: String,
    amount: String,
}

/// Routes JSON-RPC requests to the session.
pub struct ToolServer<B: WalletBackend> {
    session: WalletSession<B>,
}

impl<B: WalletBackend> ToolServer<B> {
    pub fn new(session: WalletSession<B>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &WalletSession<B> {
        &self.session
    }

    /// Handles one request. Notifications get `None`.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, "request");
        if request.is_notification() {
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION"),
                    }
                }),
            ),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": tool_definitions() })),
            "tools/call" => {
                let params = request.params.unwrap_or(Value::Null);
                match serde_json::from_value::<CallParams>(params) {
                    Ok(call) => JsonRpcResponse::success(id, self.call(call).await.into_value()),
                    Err(e) => JsonRpcResponse::error(
                        id,
                        INVALID_PARAMS,
                        format!("invalid tool call: {e}"),
                    ),
                }
            }
            other => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("method not found: {other}"),
            ),
        };
        Some(response)
    }

    async fn call(&self, call: CallParams) -> ToolResult {
        info!(tool = %call.name, "tool call");
        match call.name.as_str() {
            "set_seed" => match serde_json::from_value::<SetSeedArgs>(call.arguments) {
                Ok(args) => self.set_seed(args).await,
                Err(e) => ToolResult::failure(format!("invalid arguments: {e}")),
            },
            "get_balance" => match self.session.balance().await {
                Ok(balance) => ToolResult::ok(
                    format!("Balance: {balance}"),
                    json!({ "balance": balance.to_string() }),
                ),
                Err(e) => failure(&e),
            },
            "get_address" => match self.session.address().await {
                Ok(address) => ToolResult::ok(
                    format!("Wallet address: {address}"),
                    json!({ "address": address }),
                ),
                Err(e) => failure(&e),
            },
            "transfer_funds" => match serde_json::from_value::<TransferArgs>(call.arguments) {
                Ok(args) => self.transfer(args).await,
                Err(e) => ToolResult::failure(format!("invalid arguments: {e}")),
            },
            other => ToolResult::failure(format!("unknown tool: {other}")),
        }
    }

    async fn set_seed(&self, args: SetSeedArgs) -> ToolResult {
        match self.session.set_seed(Seed::new(args.seed)).await {
            Ok(()) => ToolResult::ok(
                "Seed stored and wallet initialized",
                json!({ "success": true }),
            ),
            Err(e) => failure(&e),
        }
    }

    async fn transfer(&self, args: TransferArgs) -> ToolResult {
        if !self.session.has_wallet().await {
            return failure(&SdkError::NoActiveWallet);
        }
        if parse_amount(&args.amount).is_err() {
            return ToolResult::failure("amount must be an integer represented as a string");
        }
        match self.session.transfer(&args.recipient, &args.amount).await {
            Ok(receipt) => ToolResult::ok(
                format!("Transferred {} to {}", args.amount, args.recipient),
                json!({ "success": true, "txId": receipt.tx_id.as_str() }),
            ),
            Err(e) => failure(&e),
        }
    }
}

fn failure(error: &SdkError) -> ToolResult {
    match error {
        SdkError::NoActiveWallet => ToolResult::failure(SEED_NOT_SET),
        other => {
            warn!(error = %other, "tool failed");
            ToolResult::failure(other.to_string())
        }
    }
}
