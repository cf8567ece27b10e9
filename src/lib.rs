//! # rfierce
//!
//! 一个基于Rust实现的DNS侦察工具库，用于定位不连续的IP空间。
//!
//! ## 特性
//!
//! - 🔎 **委派跟随**: 手动跟随 NS 委派，逐级向上查找 NS/SOA
//! - 📜 **区域传送**: 对 SOA 主服务器尝试 AXFR，成功即输出整个区域
//! - 🃏 **泛解析检测**: 用随机子域名识别泛解析地址并过滤
//! - 🌐 **邻近反查**: 对发现的地址按策略扩展后并发做 PTR 反查
//! - 📊 **多格式输出**: 支持JSON、CSV、TXT三种导出格式
//!
//! ## 快速开始
//!
//! ```rust,no_run
//! use rfierce::scan_domain;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let subdomains = vec!["www".to_string(), "mail".to_string()];
//!     let report = scan_domain("example.com", subdomains).await?;
//!
//!     println!("发现 {} 个子域名", report.findings.len());
//!     for finding in &report.findings {
//!         println!("  {} -> {}", finding.name, finding.ip);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## 高级配置
//!
//! ```rust,no_run
//! use rfierce::{Expander, ScanConfig, Scanner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScanConfig {
//!         domain: Some("example.com".to_string()),
//!         subdomains: vec!["www".to_string()],
//!         expander: Expander::Wide,     // 反查整个 /24
//!         nameservers: vec!["8.8.8.8".parse()?],
//!         ..Default::default()
//!     };
//!
//!     let report = Scanner::from_config(config)?.run().await?;
//!
//!     // 处理结果...
//!     # let _ = report;
//!
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod api;
pub mod dns_resolver;
pub mod error;
pub mod expander;
pub mod input;
pub mod logger;
pub mod names;
pub mod nearby;
pub mod output;
pub mod query;
pub mod subdata;
pub mod verify;
pub mod visited;
pub mod wildcard;
pub mod zone_transfer;

// 重新导出主要的公共API
pub use api::{scan_domain, Finding, ScanConfig, ScanOutcome, ScanReport, Scanner, SoaInfo};

// 导出其他有用的类型
pub use dns_resolver::{NetworkResolver, ResolverClient, Transport};
pub use error::{ResolveError, ScanError, TransferError};
pub use expander::Expander;
pub use input::{OutputFormat, Opts};
pub use nearby::{NearbyFinder, NearbyResult, SearchFilter};
pub use output::export_report;
pub use visited::VisitedTracker;
pub use wildcard::WildcardDetector;
pub use zone_transfer::{ZoneRecord, ZoneTransferClient};
