//! Zabbix JSON-RPC client
//!
//! Implements the `TargetClient` capability against the Zabbix frontend API.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use dirsync_core::error::{SyncError, SyncResult};
use dirsync_core::ids::{AccountId, GroupId, MediaTypeId};
use dirsync_core::traits::TargetClient;
use dirsync_core::types::{ApiVersion, NewAccount, TargetAccount, TargetGroup};

use crate::capabilities::ApiCapabilities;
use crate::config::{AuthMethod, ZabbixConfig};

/// Negotiated state after a successful login.
#[derive(Debug, Clone)]
struct Session {
    token: String,
    version: ApiVersion,
    caps: ApiCapabilities,
}

/// Target client over the Zabbix JSON-RPC API.
pub struct ZabbixClient {
    config: ZabbixConfig,
    endpoint: String,
    http: Client,
    request_id: AtomicU64,
    session: RwLock<Option<Session>>,
}

impl std::fmt::Debug for ZabbixClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZabbixClient")
            .field("config", &self.config)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Methods that are called before or during authentication and therefore
/// must not carry a session token.
fn is_auth_exempt(method: &str) -> bool {
    matches!(method, "apiinfo.version" | "user.login")
}

impl ZabbixClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ZabbixConfig) -> SyncResult<Self> {
        config.validate()?;

        let mut builder = Client::builder();
        if config.ignore_tls_errors {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder.build().map_err(|e| {
            SyncError::invalid_configuration(format!("failed to build HTTP client: {e}"))
        })?;

        let endpoint = config.endpoint();
        Ok(Self {
            config,
            endpoint,
            http,
            request_id: AtomicU64::new(1),
            session: RwLock::new(None),
        })
    }

    /// The negotiated session, or an error before `login`.
    async fn session(&self) -> SyncResult<Session> {
        self.session.read().await.clone().ok_or(SyncError::NotConnected {
            system: "zabbix".to_string(),
        })
    }

    /// Issue one JSON-RPC call and unwrap its `result`.
    async fn call(&self, method: &str, params: Value) -> SyncResult<Value> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let mut body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });
        if !is_auth_exempt(method) {
            let session = self.session().await?;
            body["auth"] = Value::String(session.token);
        }

        debug!(method = %method, "calling Zabbix API");
        let mut request = self.http.post(&self.endpoint).json(&body);
        if self.config.auth == AuthMethod::Http {
            request = request.basic_auth(&self.config.username, Some(&self.config.password));
        }

        let response = request.send().await.map_err(|e| {
            SyncError::connection_failed_with_source(
                format!("request to {} failed", self.endpoint),
                e,
            )
        })?;
        let payload: Value = response.json().await.map_err(|e| {
            SyncError::malformed_response(method, format!("body is not JSON: {e}"))
        })?;

        if let Some(error) = payload.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            let data = error.get("data").and_then(Value::as_str).unwrap_or("");
            return Err(SyncError::api_failure(
                method,
                format!("{message} {data}").trim().to_string(),
            ));
        }

        payload
            .get("result")
            .cloned()
            .ok_or_else(|| SyncError::malformed_response(method, "missing 'result'"))
    }

    /// All user rows with their account ids.
    async fn fetch_accounts(&self) -> SyncResult<Vec<TargetAccount>> {
        let session = self.session().await?;
        let result = self.call("user.get", json!({"output": "extend"})).await?;
        let rows = as_array("user.get", &result)?;

        let mut accounts = Vec::with_capacity(rows.len());
        for row in rows {
            accounts.push(TargetAccount {
                username: str_field("user.get", row, session.caps.username_field)?,
                id: AccountId::new(str_field("user.get", row, "userid")?),
            });
        }
        Ok(accounts)
    }

    /// Account ids currently in a group.
    async fn group_member_ids(&self, group: &GroupId) -> SyncResult<BTreeSet<String>> {
        let result = self
            .call(
                "usergroup.get",
                json!({"usrgrpids": [group.as_str()], "selectUsers": "extended"}),
            )
            .await?;
        let groups = as_array("usergroup.get", &result)?;
        let users = groups
            .first()
            .and_then(|g| g.get("users"))
            .and_then(Value::as_array)
            .ok_or_else(|| SyncError::malformed_response("usergroup.get", "missing 'users'"))?;

        users
            .iter()
            .map(|u| str_field("usergroup.get", u, "userid"))
            .collect()
    }

    /// Replace a group's member set.
    async fn replace_group_members(
        &self,
        group: &GroupId,
        members: BTreeSet<String>,
    ) -> SyncResult<()> {
        let userids: Vec<Value> = members.into_iter().map(Value::String).collect();
        self.call(
            "usergroup.update",
            json!({"usrgrpid": group.as_str(), "userids": userids}),
        )
        .await?;
        Ok(())
    }

    /// Remove every existing media entry of one type from an account.
    /// Needed on servers that predate the `user_medias` update.
    async fn delete_media_by_type(
        &self,
        account: &AccountId,
        media_type: &MediaTypeId,
    ) -> SyncResult<()> {
        let result = self
            .call(
                "user.get",
                json!({
                    "output": "extend",
                    "userids": [account.as_str()],
                    "selectMedias": ["mediatypeid", "mediaid"],
                }),
            )
            .await?;
        let rows = as_array("user.get", &result)?;
        let medias = rows
            .first()
            .and_then(|u| u.get("medias"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        for media in medias {
            let type_id = str_field("user.get", &media, "mediatypeid")?;
            if type_id == media_type.as_str() {
                let media_id = str_field("user.get", &media, "mediaid")?;
                info!(account = %account, media_type = %media_type, "removing existing media entry");
                self.call("user.deletemedia", json!([media_id])).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TargetClient for ZabbixClient {
    async fn login(&self) -> SyncResult<()> {
        let raw = self.call("apiinfo.version", json!([])).await?;
        let version: ApiVersion = raw
            .as_str()
            .ok_or_else(|| SyncError::malformed_response("apiinfo.version", "expected string"))?
            .parse()
            .map_err(|e: String| SyncError::malformed_response("apiinfo.version", e))?;
        let caps = ApiCapabilities::for_version(version);

        let mut params = Map::new();
        params.insert(
            caps.login_field.to_string(),
            Value::String(self.config.username.clone()),
        );
        params.insert(
            "password".to_string(),
            Value::String(self.config.password.clone()),
        );

        let token = match self.call("user.login", Value::Object(params)).await {
            Ok(value) => value
                .as_str()
                .ok_or_else(|| SyncError::malformed_response("user.login", "expected token string"))?
                .to_string(),
            Err(SyncError::ApiFailure { message, .. }) => {
                warn!(message = %message, "Zabbix login rejected");
                return Err(SyncError::AuthenticationFailed {
                    system: "zabbix".to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        info!(version = %version, "connected to Zabbix API");
        *self.session.write().await = Some(Session {
            token,
            version,
            caps,
        });
        Ok(())
    }

    async fn api_version(&self) -> SyncResult<ApiVersion> {
        Ok(self.session().await?.version)
    }

    async fn list_accounts(&self) -> SyncResult<Vec<TargetAccount>> {
        self.fetch_accounts().await
    }

    async fn get_account_id(&self, username: &str) -> SyncResult<Option<AccountId>> {
        let accounts = self.fetch_accounts().await?;
        Ok(find_account(&accounts, username).map(|a| a.id.clone()))
    }

    async fn list_groups(&self) -> SyncResult<Vec<TargetGroup>> {
        let result = self.call("usergroup.get", json!({"output": "extend"})).await?;
        let rows = as_array("usergroup.get", &result)?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            groups.push(TargetGroup {
                name: str_field("usergroup.get", row, "name")?,
                id: GroupId::new(str_field("usergroup.get", row, "usrgrpid")?),
            });
        }
        Ok(groups)
    }

    async fn create_group(&self, name: &str) -> SyncResult<GroupId> {
        let result = self.call("usergroup.create", json!({"name": name})).await?;
        let id = first_id("usergroup.create", &result, "usrgrpids")?;
        Ok(GroupId::new(id))
    }

    async fn list_group_members(&self, group: &GroupId) -> SyncResult<Vec<String>> {
        let session = self.session().await?;
        let result = self
            .call(
                "user.get",
                json!({"output": "extend", "usrgrpids": [group.as_str()]}),
            )
            .await?;
        let rows = as_array("user.get", &result)?;
        rows.iter()
            .map(|row| str_field("user.get", row, session.caps.username_field))
            .collect()
    }

    async fn create_account(&self, account: &NewAccount) -> SyncResult<AccountId> {
        let session = self.session().await?;

        let mut user = Map::new();
        user.insert(
            session.caps.username_field.to_string(),
            Value::String(account.username.clone()),
        );
        user.insert("name".to_string(), Value::String(account.given_name.clone()));
        user.insert(
            "surname".to_string(),
            Value::String(account.surname.clone()),
        );
        user.insert("autologin".to_string(), json!(0));
        user.insert(
            "usrgrps".to_string(),
            json!([{"usrgrpid": account.group_id.as_str()}]),
        );
        user.insert(
            "passwd".to_string(),
            Value::String(account.password.clone()),
        );
        for (key, value) in &account.options {
            user.insert(key.clone(), Value::String(value.clone()));
        }
        if let Some(role) = &account.role_id {
            let role: i64 = role.parse().map_err(|_| {
                SyncError::invalid_configuration(format!("role id '{role}' is not numeric"))
            })?;
            user.insert(session.caps.role_field.to_string(), json!(role));
        }

        let result = self.call("user.create", Value::Object(user)).await?;
        let id = first_id("user.create", &result, "userids")?;
        Ok(AccountId::new(id))
    }

    async fn delete_account(&self, id: &AccountId) -> SyncResult<()> {
        self.call("user.delete", json!([id.as_str()])).await?;
        Ok(())
    }

    async fn add_to_group(&self, group: &GroupId, account: &AccountId) -> SyncResult<()> {
        let session = self.session().await?;
        if session.caps.replace_membership {
            let mut members = self.group_member_ids(group).await?;
            members.insert(account.as_str().to_string());
            self.replace_group_members(group, members).await
        } else {
            self.call(
                "usergroup.massadd",
                json!({"usrgrpids": [group.as_str()], "userids": [account.as_str()]}),
            )
            .await?;
            Ok(())
        }
    }

    async fn remove_from_group(&self, group: &GroupId, account: &AccountId) -> SyncResult<()> {
        let session = self.session().await?;
        if session.caps.replace_membership {
            let mut members = self.group_member_ids(group).await?;
            members.remove(account.as_str());
            self.replace_group_members(group, members).await
        } else {
            // The old API had no non-destructive removal primitive.
            warn!(
                group = %group,
                account = %account,
                version = %session.version,
                "group removal is unsupported on this API version, skipping"
            );
            Ok(())
        }
    }

    async fn resolve_media_type_id(&self, description: &str) -> SyncResult<MediaTypeId> {
        let result = self
            .call(
                "mediatype.get",
                json!({"filter": {"name": description.trim()}}),
            )
            .await?;
        let rows = as_array("mediatype.get", &result)?;

        match rows.len() {
            0 => Err(SyncError::MediaTypeNotFound {
                description: description.to_string(),
            }),
            1 => Ok(MediaTypeId::new(str_field(
                "mediatype.get",
                &rows[0],
                "mediatypeid",
            )?)),
            matches => Err(SyncError::AmbiguousMediaType {
                description: description.to_string(),
                matches,
            }),
        }
    }

    async fn upsert_media(
        &self,
        account: &AccountId,
        media_type: &MediaTypeId,
        sendto: &str,
        options: &[(String, String)],
    ) -> SyncResult<()> {
        let session = self.session().await?;

        let mut media = Map::new();
        media.insert(
            "mediatypeid".to_string(),
            Value::String(media_type.as_str().to_string()),
        );
        media.insert("sendto".to_string(), Value::String(sendto.to_string()));
        media.insert("active".to_string(), Value::String("0".to_string()));
        media.insert("severity".to_string(), Value::String("63".to_string()));
        media.insert(
            "period".to_string(),
            Value::String("1-7,00:00-24:00".to_string()),
        );
        for (key, value) in options {
            media.insert(key.clone(), Value::String(value.clone()));
        }

        if session.caps.media_via_user_update {
            self.call(
                "user.update",
                json!({"userid": account.as_str(), "user_medias": [Value::Object(media)]}),
            )
            .await?;
        } else {
            self.delete_media_by_type(account, media_type).await?;
            self.call(
                "user.updatemedia",
                json!({
                    "users": [{"userid": account.as_str()}],
                    "medias": Value::Object(media),
                }),
            )
            .await?;
        }
        Ok(())
    }
}

/// Find an account by username. An exact match wins; the case-insensitive
/// fallback serves folded lookups against servers that preserved the
/// original casing. With preserved account ids, distinctly-cased accounts
/// coexist and must never shadow each other.
fn find_account<'a>(accounts: &'a [TargetAccount], username: &str) -> Option<&'a TargetAccount> {
    accounts
        .iter()
        .find(|a| a.username == username)
        .or_else(|| {
            accounts
                .iter()
                .find(|a| a.username.eq_ignore_ascii_case(username))
        })
}

/// Interpret a result as an array of rows.
fn as_array<'a>(method: &str, value: &'a Value) -> SyncResult<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| SyncError::malformed_response(method, "expected array"))
}

/// Read a string field, accepting the numeric ids some server versions emit.
fn str_field(method: &str, row: &Value, key: &str) -> SyncResult<String> {
    match row.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(SyncError::malformed_response(
            method,
            format!("missing field '{key}'"),
        )),
    }
}

/// The first id of an id-array result (e.g. `usrgrpids`, `userids`).
fn first_id(method: &str, result: &Value, key: &str) -> SyncResult<String> {
    result
        .get(key)
        .and_then(Value::as_array)
        .and_then(|ids| ids.first())
        .map(|id| match id {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            _ => Err(SyncError::malformed_response(method, "non-scalar id")),
        })
        .transpose()?
        .ok_or_else(|| SyncError::malformed_response(method, format!("missing '{key}'")))
}
