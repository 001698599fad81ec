// wap-core/src/infrastructure/adapters/http.rs
//
// REST client for a remote branching lakehouse.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::WapError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::lakehouse::{Lakehouse, MergeReceipt, ScanResult, TableRef};

pub struct HttpLakehouse {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

// --- Payloads ---

#[derive(Serialize)]
struct CreateBranchRequest<'a> {
    name: &'a str,
    from_ref: &'a str,
}

#[derive(Serialize)]
struct CreateNamespaceRequest<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct CreateTableRequest<'a> {
    namespace: &'a str,
    table: &'a str,
    search_uri: &'a str,
    replace: bool,
}

#[derive(Serialize)]
struct ImportRequest<'a> {
    namespace: &'a str,
    table: &'a str,
    search_uri: &'a str,
}

#[derive(Deserialize)]
struct ImportResponse {
    imported: bool,
}

#[derive(Serialize)]
struct ScanRequest<'a> {
    namespace: &'a str,
    table: &'a str,
    columns: &'a [String],
}

#[derive(Serialize)]
struct MergeRequest<'a> {
    source_ref: &'a str,
}

#[derive(Deserialize)]
struct MergeResponse {
    #[serde(default)]
    commit: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "message")]
    error: String,
}

impl HttpLakehouse {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, InfrastructureError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, WapError> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(InfrastructureError::Http)?;
        Ok(response)
    }

    /// 2xx passes through, anything else becomes an `Api` error with the body's message.
    async fn expect_success(response: Response) -> Result<Response, WapError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.error)
            .unwrap_or(text);
        Err(InfrastructureError::Api {
            status: status.as_u16(),
            message,
        }
        .into())
    }

    /// Existence checks: 200 → true, 404 → false.
    async fn exists(&self, path: &str) -> Result<bool, WapError> {
        let response = self.send(self.client.get(self.url(path))).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Self::expect_success(response).await?;
        Ok(true)
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Response, WapError> {
        debug!(path, "POST");
        let response = self
            .send(self.client.post(self.url(path)).json(body))
            .await?;
        Self::expect_success(response).await
    }
}

#[async_trait]
impl Lakehouse for HttpLakehouse {
    async fn has_branch(&self, branch: &str) -> Result<bool, WapError> {
        self.exists(&format!("branches/{}", branch)).await
    }

    async fn create_branch(&self, branch: &str, from_ref: &str) -> Result<(), WapError> {
        self.post_json(
            "branches",
            &CreateBranchRequest {
                name: branch,
                from_ref,
            },
        )
        .await?;
        Ok(())
    }

    async fn delete_branch(&self, branch: &str) -> Result<bool, WapError> {
        let url = self.url(&format!("branches/{}", branch));
        let response = self.send(self.client.delete(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Self::expect_success(response).await?;
        Ok(true)
    }

    async fn merge_branch(
        &self,
        source_ref: &str,
        into_branch: &str,
    ) -> Result<MergeReceipt, WapError> {
        let response = self
            .post_json(
                &format!("branches/{}/merges", into_branch),
                &MergeRequest { source_ref },
            )
            .await?;
        let body: MergeResponse = response.json().await.map_err(InfrastructureError::Http)?;

        Ok(MergeReceipt {
            source_ref: source_ref.to_string(),
            into_branch: into_branch.to_string(),
            commit: body.commit,
        })
    }

    async fn has_namespace(&self, namespace: &str, reference: &str) -> Result<bool, WapError> {
        self.exists(&format!("refs/{}/namespaces/{}", reference, namespace))
            .await
    }

    async fn create_namespace(&self, namespace: &str, branch: &str) -> Result<(), WapError> {
        self.post_json(
            &format!("branches/{}/namespaces", branch),
            &CreateNamespaceRequest { name: namespace },
        )
        .await?;
        Ok(())
    }

    async fn create_table(
        &self,
        table: &TableRef,
        search_uri: &str,
        branch: &str,
        replace: bool,
    ) -> Result<(), WapError> {
        self.post_json(
            &format!("branches/{}/tables", branch),
            &CreateTableRequest {
                namespace: &table.namespace,
                table: &table.name,
                search_uri,
                replace,
            },
        )
        .await?;
        Ok(())
    }

    async fn has_table(&self, table: &TableRef, reference: &str) -> Result<bool, WapError> {
        self.exists(&format!("refs/{}/tables/{}", reference, table.fq_name()))
            .await
    }

    async fn import_data(
        &self,
        table: &TableRef,
        search_uri: &str,
        branch: &str,
    ) -> Result<bool, WapError> {
        let response = self
            .post_json(
                &format!("branches/{}/imports", branch),
                &ImportRequest {
                    namespace: &table.namespace,
                    table: &table.name,
                    search_uri,
                },
            )
            .await?;
        let body: ImportResponse = response.json().await.map_err(InfrastructureError::Http)?;
        Ok(body.imported)
    }

    async fn scan(
        &self,
        table: &TableRef,
        reference: &str,
        columns: &[String],
    ) -> Result<ScanResult, WapError> {
        let response = self
            .post_json(
                &format!("refs/{}/scan", reference),
                &ScanRequest {
                    namespace: &table.namespace,
                    table: &table.name,
                    columns,
                },
            )
            .await?;
        let result: ScanResult = response.json().await.map_err(InfrastructureError::Http)?;
        Ok(result)
    }

    fn backend_name(&self) -> &str {
        "remote"
    }
}
