//! 错误类型定义
//!
//! 查询层的错误分为可恢复（按"无应答"处理）与致命两类，
//! 扫描层的错误一律终止本次扫描。

use std::path::PathBuf;

use thiserror::Error;
use trust_dns_client::error::ClientError;
use trust_dns_resolver::proto::error::ProtoError;
use trust_dns_resolver::proto::op::ResponseCode;

/// 单次DNS查询的错误
#[derive(Error, Debug)]
pub enum ResolveError {
    /// 域名不存在 (NXDOMAIN)
    #[error("name does not exist: {0}")]
    NxDomain(String),

    /// 所有名称服务器都没有给出可用应答
    #[error("no nameservers could answer the query for {0}")]
    NoNameservers(String),

    /// 查询超时
    #[error("query for {0} timed out")]
    Timeout(String),

    /// 客户端无法建立（如本地套接字绑定失败）或报文编码错误
    #[error("DNS protocol error: {0}")]
    Proto(#[from] ProtoError),
}

impl ResolveError {
    /// 是否可以当作"无应答"处理
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ResolveError::NxDomain(_)
                | ResolveError::NoNameservers(_)
                | ResolveError::Timeout(_)
        )
    }
}

/// 区域传送失败原因，调用方统一视为"失败"
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("zone transfer timed out")]
    Timeout,

    #[error("zone transfer refused: {0}")]
    Refused(ResponseCode),

    #[error("malformed zone transfer stream: {0}")]
    Malformed(String),

    #[error("zone transfer protocol error: {0}")]
    Proto(#[from] ProtoError),

    #[error("zone transfer client error: {0}")]
    Client(#[from] ClientError),
}

/// 扫描过程中的致命错误
#[derive(Error, Debug)]
pub enum ScanError {
    /// 字典或名称服务器列表文件无法读取
    #[error("could not open file {path:?}: {source}")]
    WordList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CIDR 格式错误
    #[error("invalid IPv4 CIDR: {0:?}")]
    InvalidCidr(String),

    /// 名称服务器地址格式错误
    #[error("invalid IPv4 nameserver address: {0:?}")]
    InvalidNameserver(String),

    /// 目标域名格式错误
    #[error("invalid domain {domain:?}: {reason}")]
    InvalidDomain { domain: String, reason: String },

    /// NS/SOA 均无法解析
    #[error("failed to lookup NS/SOA, domain {0} does not exist")]
    DomainNotFound(String),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("HTTP client initialization error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to export results: {0}")]
    Export(String),
}
