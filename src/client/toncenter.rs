//! Toncenter-style JSON-RPC transport.
//!
//! A concrete [`HttpTransport`] over the widely deployed toncenter v2 API:
//! `getAddressInformation`, `runGetMethod`, `sendBoc`. Stack values cross
//! the wire as tagged JSON pairs, cells as base64 bag-of-cells blobs.

use anyhow::{anyhow, bail, Context};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use tracing::debug;

use super::transport::{AccountStatus, HttpTransport, RawAccountState, RunResult};
use crate::address::Address;
use crate::boc;
use crate::tuple::TupleItem;

pub struct TonCenterTransport {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl TonCenterTransport {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        TonCenterTransport {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
        }
    }

    async fn call(&self, method: &str, params: Value) -> anyhow::Result<Value> {
        let payload = json!({
            "id": "1",
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });
        debug!(method, "json-rpc request");

        let mut request = self.http.post(&self.endpoint).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }
        let response: Value = request
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.endpoint))?
            .json()
            .await
            .context("response body is not json")?;

        if let Some(err) = response.get("error") {
            bail!("json-rpc error from {method}: {err}");
        }
        response
            .get("result")
            .cloned()
            .ok_or_else(|| anyhow!("json-rpc response has no result"))
    }
}

fn parse_status(raw: &str) -> anyhow::Result<AccountStatus> {
    Ok(match raw {
        "active" => AccountStatus::Active,
        "frozen" => AccountStatus::Frozen,
        "uninitialized" | "uninit" => AccountStatus::Uninitialized,
        "nonexist" | "nonexistent" => AccountStatus::Nonexistent,
        other => bail!("unknown account state {other:?}"),
    })
}

fn parse_balance(value: &Value) -> anyhow::Result<u128> {
    match value {
        Value::String(s) => s.parse().context("balance is not an integer"),
        Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| anyhow!("balance is not an unsigned integer")),
        other => bail!("unexpected balance value: {other}"),
    }
}

fn encode_stack(args: &[TupleItem]) -> anyhow::Result<Value> {
    let mut out = Vec::with_capacity(args.len());
    for item in args {
        out.push(match item {
            TupleItem::Int(i) => {
                let text = if *i < 0 {
                    format!("-0x{:x}", i.unsigned_abs())
                } else {
                    format!("0x{i:x}")
                };
                json!(["num", text])
            }
            TupleItem::Cell(c) => json!(["tvm.Cell", STANDARD.encode(boc::serialize(c))]),
            TupleItem::Slice(c) => json!(["tvm.Slice", STANDARD.encode(boc::serialize(c))]),
            TupleItem::Null => bail!("null arguments are not supported by this api"),
        });
    }
    Ok(Value::Array(out))
}

fn decode_num(value: &Value) -> anyhow::Result<i128> {
    let text = value.as_str().ok_or_else(|| anyhow!("num entry is not a string"))?;
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let digits = digits.strip_prefix("0x").unwrap_or(digits);
    let magnitude = i128::from_str_radix(digits, 16).context("bad num entry")?;
    Ok(if negative { -magnitude } else { magnitude })
}

fn decode_cell(value: &Value) -> anyhow::Result<crate::cell::Cell> {
    let bytes = value
        .get("bytes")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("cell entry has no bytes field"))?;
    let raw = STANDARD.decode(bytes).context("cell entry is not base64")?;
    boc::deserialize(&raw).context("cell entry is not a valid bag of cells")
}

fn decode_stack(raw: &Value) -> anyhow::Result<Vec<TupleItem>> {
    let entries = raw
        .as_array()
        .ok_or_else(|| anyhow!("result stack is not an array"))?;
    let mut stack = Vec::with_capacity(entries.len());
    for entry in entries {
        let pair = entry
            .as_array()
            .filter(|p| p.len() == 2)
            .ok_or_else(|| anyhow!("stack entry is not a [kind, value] pair"))?;
        let kind = pair[0].as_str().unwrap_or_default();
        stack.push(match kind {
            "num" => TupleItem::Int(decode_num(&pair[1])?),
            "cell" | "tvm.Cell" => TupleItem::Cell(decode_cell(&pair[1])?),
            "slice" | "tvm.Slice" => TupleItem::Slice(decode_cell(&pair[1])?),
            "null" => TupleItem::Null,
            other => bail!("unsupported stack entry kind {other:?}"),
        });
    }
    Ok(stack)
}

impl HttpTransport for TonCenterTransport {
    async fn account_state(&self, address: &Address) -> anyhow::Result<RawAccountState> {
        let result = self
            .call("getAddressInformation", json!({ "address": address.to_raw() }))
            .await?;
        let status = result
            .get("state")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("account info has no state field"))?;
        let balance = result
            .get("balance")
            .map(parse_balance)
            .transpose()?
            .unwrap_or(0);
        Ok(RawAccountState {
            status: parse_status(status)?,
            balance,
        })
    }

    async fn run_method(
        &self,
        address: &Address,
        method: &str,
        args: Vec<TupleItem>,
    ) -> anyhow::Result<RunResult> {
        let result = self
            .call(
                "runGetMethod",
                json!({
                    "address": address.to_raw(),
                    "method": method,
                    "stack": encode_stack(&args)?,
                }),
            )
            .await?;
        let exit_code = result
            .get("exit_code")
            .and_then(Value::as_i64)
            .ok_or_else(|| anyhow!("run result has no exit code"))? as i32;
        let stack = match result.get("stack") {
            Some(raw) => decode_stack(raw)?,
            None => Vec::new(),
        };
        Ok(RunResult { exit_code, stack })
    }

    async fn send_message(&self, boc: &[u8]) -> anyhow::Result<()> {
        self.call("sendBoc", json!({ "boc": STANDARD.encode(boc) }))
            .await?;
        Ok(())
    }
}
