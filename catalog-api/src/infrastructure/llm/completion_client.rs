//! 流式 chat-completion 客户端，用于生成商品描述
//!
//! 响应体先按换行切分成行，每行即一个 SSE 事件块，最多提取一个 `"content":"` 片段，
//! 行与行之间不共享状态。同一次网络读取里的多个事件逐行处理，被读取边界切开的行会先拼完整。
//! 任何传输层失败都返回以 `~ Error: Chat Completion API ` 开头的文本，不向调用方抛错。

use std::io;
use std::pin::pin;

use futures_util::{Stream, StreamExt, TryStreamExt};
use reqwest::header::ACCEPT;
use serde::Serialize;
use tokio_util::bytes::Buf;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, FramedRead};
use tokio_util::io::StreamReader;

use super::error::CompletionError;
use crate::config::LlmConfig;

pub const DEFAULT_BASE_URL: &str = "https://integrate.api.nvidia.com";
pub const CHAT_COMPLETION_PATH: &str = "/v1/chat/completions";

const MODEL: &str = "meta/llama-3.1-405b-instruct";
const INSTRUCTION: &str = "You are an AI that helps sellers create product descriptions. \
The user will provide a product name, and you will return a short, precise, and customer-focused \
product description. Just return the product description without quoting the response.\n\nProduct name: ";

const CONTENT_MARKER: &str = "\"content\":\"";
const ERROR_PREFIX: &str = "~ Error: Chat Completion API ";

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

/// 生成参数固定，不对调用方开放
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    messages: Vec<ChatMessage>,
    model: &'static str,
    temperature: f64,
    top_p: f64,
    frequency_penalty: f64,
    presence_penalty: f64,
    max_tokens: u32,
    stream: bool,
}

impl ChatCompletionRequest {
    fn for_product(product_name: &str) -> Self {
        Self {
            messages: vec![ChatMessage {
                role: "user",
                content: format!("{}{}", INSTRUCTION, product_name),
            }],
            model: MODEL,
            temperature: 0.2,
            top_p: 0.7,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            max_tokens: 1024,
            stream: true,
        }
    }
}

#[derive(Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl CompletionClient {
    pub fn new(config: &LlmConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(http: reqwest::Client, config: &LlmConfig) -> Self {
        let endpoint = format!(
            "{}{}",
            config.base_url.trim_end_matches('/'),
            CHAT_COMPLETION_PATH
        );

        Self {
            http,
            endpoint,
            api_key: config.api_key.clone(),
        }
    }

    /// 返回值总是可以直接当作描述文本使用，失败时为错误提示文本
    pub async fn generate_description(&self, product_name: &str) -> String {
        match self.stream_completion(product_name).await {
            Ok(content) => {
                tracing::debug!(product_name, len = content.len(), "completion finished");
                content
            }
            Err(err) => {
                tracing::warn!(product_name, error = %err, "chat completion failed");
                format!("{}{}", ERROR_PREFIX, err)
            }
        }
    }

    async fn stream_completion(&self, product_name: &str) -> Result<String, CompletionError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "application/json")
            .json(&ChatCompletionRequest::for_product(product_name))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompletionError::Status {
                status,
                url: self.endpoint.clone(),
            });
        }

        let body = response.bytes_stream().map_err(io::Error::other);
        let content = accumulate_fragments(frame_lines(body)).await?;
        Ok(content)
    }
}

/// 把任意切分的字节流重新切成行，不含换行符
///
/// 按字节切分，非法 UTF-8 留给逐行的有损解码处理。
pub fn frame_lines<S, B, E>(stream: S) -> impl Stream<Item = Result<impl AsRef<[u8]>, AnyDelimiterCodecError>>
where
    S: Stream<Item = Result<B, E>>,
    B: Buf,
    E: Into<io::Error>,
{
    FramedRead::new(
        StreamReader::new(stream),
        AnyDelimiterCodec::new(b"\n".to_vec(), Vec::new()),
    )
}

/// 依次消费所有行并拼接提取到的片段，遇到第一个错误即返回
pub async fn accumulate_fragments<S, B, E>(stream: S) -> Result<String, E>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    let mut stream = pin!(stream);
    let mut content = String::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let text = String::from_utf8_lossy(chunk.as_ref());
        if let Some(fragment) = extract_fragment(&text) {
            content.push_str(fragment);
        }
    }

    Ok(content)
}

/// 取第一个 `"content":"` 之后到下一个未转义 `"` 之间的原始文本
///
/// 没有标记或标记后没有结束引号时返回 `None`。片段不做反转义。
pub fn extract_fragment(chunk: &str) -> Option<&str> {
    let start = chunk.find(CONTENT_MARKER)? + CONTENT_MARKER.len();
    let rest = &chunk[start..];

    let mut escaped = false;
    for (index, byte) in rest.bytes().enumerate() {
        match byte {
            _ if escaped => escaped = false,
            b'\\' => escaped = true,
            b'"' => return Some(&rest[..index]),
            _ => {}
        }
    }

    None
}
