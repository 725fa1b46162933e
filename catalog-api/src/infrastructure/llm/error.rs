use reqwest::StatusCode;
use thiserror::Error;
use tokio_util::codec::AnyDelimiterCodecError;

/// 调用 LLM 服务商失败的原因，只在客户端内部使用，对外转换为错误文本
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("{status} from POST {url}")]
    Status { status: StatusCode, url: String },

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// 读取或切分响应体时失败
    #[error("{0}")]
    Stream(#[from] AnyDelimiterCodecError),
}
