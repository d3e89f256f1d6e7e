pub mod wire;

use log::info;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE } };
use thiserror::Error;

use crate::cli::Args;
use wire::{
    AgentResource,
    AttachFileRequest,
    CreateAgentRequest,
    CreateMessageRequest,
    CreateRunRequest,
    CreateVectorStoreRequest,
    FileResource,
    MessageList,
    MessageResource,
    RunResource,
    ThreadResource,
    VectorStoreResource,
};

#[derive(Debug, Error)]
pub enum FoundryError {
    #[error("foundry request failed: {0}")] Http(#[from] reqwest::Error),
    #[error("invalid foundry configuration: {0}")] Config(String),
}

impl FoundryError {
    /// True when the remote API rejected the request with 404, i.e. the
    /// addressed resource does not exist (as opposed to a transport or
    /// server-side failure).
    pub fn is_not_found(&self) -> bool {
        match self {
            FoundryError::Http(e) => e.status().map(|s| s.as_u16()) == Some(404),
            FoundryError::Config(_) => false,
        }
    }
}

/// Thin REST client for the managed-agent API: agents, threads, messages,
/// runs, vector stores. Auth and api-version are applied to every request.
#[derive(Clone)]
pub struct FoundryClient {
    http: HttpClient,
    base_url: String,
    api_version: String,
}

impl FoundryClient {
    pub fn new(endpoint: &str, api_key: &str, api_version: &str) -> Result<Self, FoundryError> {
        if endpoint.is_empty() {
            return Err(FoundryError::Config("endpoint is empty".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if !api_key.is_empty() {
            headers.insert(
                "api-key",
                HeaderValue::from_str(api_key).map_err(|e|
                    FoundryError::Config(format!("invalid API key: {}", e))
                )?
            );
        }

        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            base_url: endpoint.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
        })
    }

    pub fn from_args(args: &Args) -> Result<Self, FoundryError> {
        Self::new(&args.foundry_endpoint, &args.foundry_api_key, &args.foundry_api_version)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}?api-version={}", self.base_url, path, self.api_version)
    }

    pub async fn create_agent(&self, req: &CreateAgentRequest) -> Result<AgentResource, FoundryError> {
        let agent: AgentResource = self.http
            .post(self.url("/assistants"))
            .json(req)
            .send().await?
            .error_for_status()?
            .json().await?;
        info!("Created remote agent: {}", agent.id);
        Ok(agent)
    }

    pub async fn get_agent(&self, agent_id: &str) -> Result<AgentResource, FoundryError> {
        let agent: AgentResource = self.http
            .get(self.url(&format!("/assistants/{}", agent_id)))
            .send().await?
            .error_for_status()?
            .json().await?;
        Ok(agent)
    }

    pub async fn delete_agent(&self, agent_id: &str) -> Result<(), FoundryError> {
        self.http
            .delete(self.url(&format!("/assistants/{}", agent_id)))
            .send().await?
            .error_for_status()?;
        info!("Deleted remote agent: {}", agent_id);
        Ok(())
    }

    pub async fn create_thread(&self) -> Result<ThreadResource, FoundryError> {
        let thread: ThreadResource = self.http
            .post(self.url("/threads"))
            .json(&serde_json::json!({}))
            .send().await?
            .error_for_status()?
            .json().await?;
        info!("Created thread: {}", thread.id);
        Ok(thread)
    }

    pub async fn create_message(
        &self,
        thread_id: &str,
        content: &str
    ) -> Result<MessageResource, FoundryError> {
        let req = CreateMessageRequest {
            role: "user".to_string(),
            content: content.to_string(),
        };
        let message: MessageResource = self.http
            .post(self.url(&format!("/threads/{}/messages", thread_id)))
            .json(&req)
            .send().await?
            .error_for_status()?
            .json().await?;
        Ok(message)
    }

    /// Messages newest first, as the remote API orders them.
    pub async fn list_messages(&self, thread_id: &str) -> Result<Vec<MessageResource>, FoundryError> {
        let list: MessageList = self.http
            .get(self.url(&format!("/threads/{}/messages", thread_id)))
            .send().await?
            .error_for_status()?
            .json().await?;
        Ok(list.data)
    }

    /// Most recent message posted by the assistant role, if any.
    pub async fn last_assistant_message(
        &self,
        thread_id: &str
    ) -> Result<Option<MessageResource>, FoundryError> {
        let messages = self.list_messages(thread_id).await?;
        Ok(messages.into_iter().find(|m| m.role == "assistant"))
    }

    pub async fn create_run(
        &self,
        thread_id: &str,
        agent_id: &str
    ) -> Result<RunResource, FoundryError> {
        let req = CreateRunRequest {
            assistant_id: agent_id.to_string(),
        };
        let run: RunResource = self.http
            .post(self.url(&format!("/threads/{}/runs", thread_id)))
            .json(&req)
            .send().await?
            .error_for_status()?
            .json().await?;
        Ok(run)
    }

    pub async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<RunResource, FoundryError> {
        let run: RunResource = self.http
            .get(self.url(&format!("/threads/{}/runs/{}", thread_id, run_id)))
            .send().await?
            .error_for_status()?
            .json().await?;
        Ok(run)
    }

    pub async fn create_vector_store(&self, name: &str) -> Result<VectorStoreResource, FoundryError> {
        let req = CreateVectorStoreRequest {
            name: name.to_string(),
            expires_after: Some(serde_json::json!({ "anchor": "last_active_at", "days": 7 })),
        };
        let store: VectorStoreResource = self.http
            .post(self.url("/vector_stores"))
            .json(&req)
            .send().await?
            .error_for_status()?
            .json().await?;
        info!("Created vector store: {}", store.id);
        Ok(store)
    }

    pub async fn upload_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>
    ) -> Result<FileResource, FoundryError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form
            ::new()
            .text("purpose", "assistants")
            .part("file", part);
        let file: FileResource = self.http
            .post(self.url("/files"))
            .multipart(form)
            .send().await?
            .error_for_status()?
            .json().await?;
        Ok(file)
    }

    pub async fn attach_file(
        &self,
        vector_store_id: &str,
        file_id: &str
    ) -> Result<(), FoundryError> {
        let req = AttachFileRequest {
            file_id: file_id.to_string(),
        };
        self.http
            .post(self.url(&format!("/vector_stores/{}/files", vector_store_id)))
            .json(&req)
            .send().await?
            .error_for_status()?;
        Ok(())
    }
}
