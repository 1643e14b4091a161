//! Script Hook — the optional user-supplied admission predicate that, when
//! enabled, fully replaces the to-address / value / tx-hash / whitelist
//! rules in the policy engine.
//!
//! Grounded on the upstream `Filter.CheckTx`: a fresh Lua interpreter per
//! call, the hook given lowercase no-`0x` hex strings (or `nil`/`None` for
//! absent fields), and a bare integer status code as its return value. We
//! add an external-subprocess variant as a language-neutral alternative to
//! embedding Lua, talking newline-delimited JSON over stdin/stdout.

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::error;

use crate::status::{
    STATUS_INTERNAL_ERROR, STATUS_LUA_CALL_ERROR, STATUS_LUA_FILE_NOT_DO_ERROR,
    STATUS_LUA_INIT_ERROR, STATUS_LUA_RETURN_ERROR,
};

#[async_trait]
pub trait ScriptHook: Send + Sync {
    async fn call(&self, hash: &B256, from: Option<&Address>, to: Option<&Address>) -> u16;
}

/// The no-op hook used when `enable_script` is off. The policy engine never
/// reaches it, since the whole rule is skipped, but every config needs a
/// concrete hook to hand the policy engine.
pub struct DisabledScript;

#[async_trait]
impl ScriptHook for DisabledScript {
    async fn call(&self, _hash: &B256, _from: Option<&Address>, _to: Option<&Address>) -> u16 {
        STATUS_INTERNAL_ERROR
    }
}

fn lower_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

pub struct LuaScript {
    pub script_path: String,
    pub call_function_name: String,
}

#[async_trait]
impl ScriptHook for LuaScript {
    async fn call(&self, hash: &B256, from: Option<&Address>, to: Option<&Address>) -> u16 {
        let script_path = self.script_path.clone();
        let function_name = self.call_function_name.clone();
        let hash_hex = lower_hex(hash.as_slice());
        let from_hex = from.map(|a| lower_hex(a.as_slice()));
        let to_hex = to.map(|a| lower_hex(a.as_slice()));

        let outcome = tokio::task::spawn_blocking(move || {
            run_lua(&script_path, &function_name, &hash_hex, from_hex.as_deref(), to_hex.as_deref())
        })
        .await;

        match outcome {
            Ok(Ok(code)) => code,
            Ok(Err(code)) => code,
            Err(err) => {
                error!(%err, "lua call panicked");
                STATUS_LUA_CALL_ERROR
            }
        }
    }
}

/// Runs on a blocking thread: `mlua::Lua` is not `Send`-friendly across
/// `.await` points, and a fresh interpreter is loaded for every call anyway,
/// matching `lua.NewState()` per invocation in the original.
fn run_lua(
    script_path: &str,
    function_name: &str,
    hash_hex: &str,
    from_hex: Option<&str>,
    to_hex: Option<&str>,
) -> Result<u16, u16> {
    let lua = mlua::Lua::new();
    lua.load(std::path::Path::new(script_path))
        .exec()
        .map_err(|err| {
            error!(%err, "lua DoFile error");
            STATUS_LUA_FILE_NOT_DO_ERROR
        })?;

    if function_name.is_empty() {
        return Err(STATUS_LUA_CALL_ERROR);
    }

    let func: mlua::Function = lua
        .globals()
        .get(function_name)
        .map_err(|_| STATUS_LUA_CALL_ERROR)?;

    let result: mlua::Value = func
        .call((hash_hex.to_string(), from_hex.map(str::to_string), to_hex.map(str::to_string)))
        .map_err(|err| {
            error!(%err, "lua call error");
            STATUS_LUA_CALL_ERROR
        })?;

    match result {
        mlua::Value::Integer(i) => Ok(i as u16),
        mlua::Value::Number(n) => Ok(n as u16),
        _ => Err(STATUS_LUA_RETURN_ERROR),
    }
}

#[derive(Serialize)]
struct ScriptRequest<'a> {
    hash: &'a str,
    from: Option<&'a str>,
    to: Option<&'a str>,
}

#[derive(Deserialize)]
struct ScriptResponse {
    status: u16,
}

pub struct ExternalProcess {
    pub script_path: String,
}

#[async_trait]
impl ScriptHook for ExternalProcess {
    async fn call(&self, hash: &B256, from: Option<&Address>, to: Option<&Address>) -> u16 {
        let hash_hex = lower_hex(hash.as_slice());
        let from_hex = from.map(|a| lower_hex(a.as_slice()));
        let to_hex = to.map(|a| lower_hex(a.as_slice()));

        match self.invoke(&hash_hex, from_hex.as_deref(), to_hex.as_deref()).await {
            Ok(status) => status,
            Err(err) => {
                error!(%err, "external script process failed");
                STATUS_LUA_INIT_ERROR
            }
        }
    }
}

impl ExternalProcess {
    async fn invoke(
        &self,
        hash_hex: &str,
        from_hex: Option<&str>,
        to_hex: Option<&str>,
    ) -> anyhow::Result<u16> {
        let mut child = Command::new(&self.script_path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .spawn()?;

        let request = ScriptRequest { hash: hash_hex, from: from_hex, to: to_hex };
        let mut line = serde_json::to_string(&request)?;
        line.push('\n');

        let mut stdin = child.stdin.take().expect("piped stdin");
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;
        drop(stdin);

        let stdout = child.stdout.take().expect("piped stdout");
        let mut reader = BufReader::new(stdout);
        let mut response_line = String::new();
        reader.read_line(&mut response_line).await?;

        child.wait().await?;

        let response: ScriptResponse = serde_json::from_str(response_line.trim())?;
        Ok(response.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_hook_never_grants_access_silently() {
        let hash = B256::ZERO;
        let status = DisabledScript.call(&hash, None, None).await;
        assert_eq!(status, STATUS_INTERNAL_ERROR);
    }
}
