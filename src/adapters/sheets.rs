// Google Sheets report sink. Authenticates as a service account with an
// RS256 JWT bearer grant and replaces a tab's contents on every publish.

use crate::core::{ReportSink, ReportTable};
use crate::utils::error::{Result, TrackerError};
use crate::utils::validation::{validate_url, Validate};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use url::Url;

const SCOPES: &str = "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the token actually expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);
const NEW_TAB_ROWS: u32 = 1000;
const NEW_TAB_COLS: u32 = 20;

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// The subset of a service-account `credentials.json` the tracker needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub sheets_base: String,
    pub drive_base: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            sheets_base: "https://sheets.googleapis.com".to_string(),
            drive_base: "https://www.googleapis.com".to_string(),
        }
    }
}

impl Validate for GoogleEndpoints {
    fn validate(&self) -> Result<()> {
        validate_url("sheets_base", &self.sheets_base)?;
        validate_url("drive_base", &self.drive_base)?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Exchanges signed assertions for access tokens and caches the result.
pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    client: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn new(key: ServiceAccountKey, client: Client) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        Ok(Self {
            key,
            encoding_key,
            client,
            cached: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    fn signed_assertion(&self) -> Result<String> {
        let iat = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: SCOPES,
            aud: &self.key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        tracing::debug!("Requesting access token for {}", self.key.client_email);
        let assertion = self.signed_assertion()?;
        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let token: TokenResponse = check_status(response).await?.json().await?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(TrackerError::ApiError {
            status: status.as_u16(),
            body,
        })
    }
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedSpreadsheet {
    spreadsheet_id: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetSheets {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

/// A1 notation for a whole tab; quotes in the title are doubled.
pub fn tab_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

fn drive_query(title: &str) -> String {
    let escaped = title.replace('\\', "\\\\").replace('\'', "\\'");
    format!(
        "name = '{}' and mimeType = '{}' and trashed = false",
        escaped, SPREADSHEET_MIME
    )
}

pub struct GoogleSheetsSink {
    client: Client,
    auth: ServiceAccountAuth,
    endpoints: GoogleEndpoints,
    spreadsheet_title: String,
    spreadsheet_id: Mutex<Option<String>>,
}

impl GoogleSheetsSink {
    pub fn new(
        key: ServiceAccountKey,
        spreadsheet_title: impl Into<String>,
        endpoints: GoogleEndpoints,
    ) -> Result<Self> {
        endpoints.validate()?;
        validate_url("token_uri", &key.token_uri)?;
        let client = Client::new();
        let auth = ServiceAccountAuth::new(key, client.clone())?;
        Ok(Self {
            client,
            auth,
            endpoints,
            spreadsheet_title: spreadsheet_title.into(),
            spreadsheet_id: Mutex::new(None),
        })
    }

    pub fn from_credentials_file<P: AsRef<Path>>(
        path: P,
        spreadsheet_title: impl Into<String>,
    ) -> Result<Self> {
        let key = ServiceAccountKey::from_file(path)?;
        Self::new(key, spreadsheet_title, GoogleEndpoints::default())
    }

    fn api_url(&self, base: &str, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(base).map_err(|e| TrackerError::InvalidConfigValueError {
            field: "google_api_base".to_string(),
            value: base.to_string(),
            reason: e.to_string(),
        })?;
        url.path_segments_mut()
            .map_err(|_| TrackerError::config(format!("{} cannot be a base URL", base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn find_spreadsheet(&self, token: &str) -> Result<Option<String>> {
        let url = self.api_url(&self.endpoints.drive_base, &["drive", "v3", "files"])?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(&[
                ("q", drive_query(&self.spreadsheet_title).as_str()),
                ("fields", "files(id,name)"),
            ])
            .send()
            .await?;
        let list: DriveFileList = check_status(response).await?.json().await?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    async fn create_spreadsheet(&self, token: &str) -> Result<String> {
        let url = self.api_url(&self.endpoints.sheets_base, &["v4", "spreadsheets"])?;
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&json!({ "properties": { "title": self.spreadsheet_title } }))
            .send()
            .await?;
        let created: CreatedSpreadsheet = check_status(response).await?.json().await?;
        tracing::info!("✔ Created spreadsheet: {}", self.spreadsheet_title);
        Ok(created.spreadsheet_id)
    }

    async fn spreadsheet_id(&self, token: &str) -> Result<String> {
        let mut cached = self.spreadsheet_id.lock().await;
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }

        let id = match self.find_spreadsheet(token).await? {
            Some(id) => id,
            None => self.create_spreadsheet(token).await?,
        };
        *cached = Some(id.clone());
        Ok(id)
    }

    /// Drops the cached id so the next lookup goes back to Drive.
    async fn forget_spreadsheet(&self, spreadsheet_id: &str) {
        let mut cached = self.spreadsheet_id.lock().await;
        if cached.as_deref() == Some(spreadsheet_id) {
            *cached = None;
        }
    }

    async fn write_table(&self, token: &str, spreadsheet_id: &str, table: &ReportTable) -> Result<()> {
        self.ensure_worksheet(token, spreadsheet_id, &table.title).await?;
        self.replace_values(token, spreadsheet_id, table).await
    }

    async fn ensure_worksheet(&self, token: &str, spreadsheet_id: &str, title: &str) -> Result<()> {
        let url = self.api_url(
            &self.endpoints.sheets_base,
            &["v4", "spreadsheets", spreadsheet_id],
        )?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(&[("fields", "sheets.properties")])
            .send()
            .await?;
        let sheets: SpreadsheetSheets = check_status(response).await?.json().await?;

        if sheets.sheets.iter().any(|s| s.properties.title == title) {
            tracing::debug!("Using existing sheet tab: {}", title);
            return Ok(());
        }

        let url = self.api_url(
            &self.endpoints.sheets_base,
            &["v4", "spreadsheets", &format!("{}:batchUpdate", spreadsheet_id)],
        )?;
        let body = json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": { "rowCount": NEW_TAB_ROWS, "columnCount": NEW_TAB_COLS }
                    }
                }
            }]
        });
        let response = self.client.post(url).bearer_auth(token).json(&body).send().await?;
        check_status(response).await?;
        tracing::info!("✔ Created new tab: {}", title);
        Ok(())
    }

    async fn replace_values(&self, token: &str, spreadsheet_id: &str, table: &ReportTable) -> Result<()> {
        let range = tab_range(&table.title);

        let clear_url = self.api_url(
            &self.endpoints.sheets_base,
            &["v4", "spreadsheets", spreadsheet_id, "values", &format!("{}:clear", range)],
        )?;
        let response = self
            .client
            .post(clear_url)
            .bearer_auth(token)
            .json(&json!({}))
            .send()
            .await?;
        check_status(response).await?;

        let append_url = self.api_url(
            &self.endpoints.sheets_base,
            &["v4", "spreadsheets", spreadsheet_id, "values", &format!("{}:append", range)],
        )?;
        let response = self
            .client
            .post(append_url)
            .bearer_auth(token)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({ "range": range, "majorDimension": "ROWS", "values": table.values() }))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl ReportSink for GoogleSheetsSink {
    async fn publish(&self, table: &ReportTable) -> Result<String> {
        let token = self.auth.access_token().await?;
        let spreadsheet_id = self.spreadsheet_id(&token).await?;

        match self.write_table(&token, &spreadsheet_id, table).await {
            Err(TrackerError::ApiError { status: 404, .. }) => {
                tracing::warn!(
                    "⚠ Spreadsheet {} no longer exists; looking up '{}' again",
                    spreadsheet_id,
                    self.spreadsheet_title
                );
                self.forget_spreadsheet(&spreadsheet_id).await;
                let spreadsheet_id = self.spreadsheet_id(&token).await?;
                self.write_table(&token, &spreadsheet_id, table).await?;
            }
            other => other?,
        }

        tracing::debug!(
            "Uploaded {} rows to {} as {}",
            table.rows.len(),
            table.title,
            self.auth.client_email()
        );
        Ok(format!("{} / {}", self.spreadsheet_title, table.title))
    }
}
