use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use ipnetwork::Ipv4Network;
use log::{info, warn};
use trust_dns_resolver::proto::rr::{Name, RecordType};

use crate::dns_resolver::{NetworkResolver, ResolverClient, Transport};
use crate::error::ScanError;
use crate::expander::Expander;
use crate::names::{build_name, parse_domain};
use crate::nearby::{NearbyFinder, NearbyResult, SearchFilter};
use crate::output;
use crate::query::{ancestor_query, referral_query};
use crate::verify::{is_private_range, HttpProbe};
use crate::visited::VisitedTracker;
use crate::wildcard::{is_wildcard_result, WildcardDetector};
use crate::zone_transfer::{attempt_zone_transfer, ZoneRecord, ZoneTransferClient};

/// 默认单次查询超时
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// 扫描配置
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// 目标域名，为空时只扫描内网网段
    pub domain: Option<String>,
    /// 待枚举的子域名
    pub subdomains: Vec<String>,
    /// 名称服务器，为空时使用系统配置
    pub nameservers: Vec<Ipv4Addr>,
    /// 每个发现地址的扩展策略
    pub expander: Expander,
    /// 扫描开始时单独反查的网段
    pub range: Option<Ipv4Network>,
    /// 反向域名过滤关键字
    pub search: Option<SearchFilter>,
    /// 是否对公网地址做 HTTP 探测
    pub connect: bool,
    /// 每个发现之后的等待时间
    pub delay: Option<Duration>,
    pub transport: Transport,
    pub query_timeout: Duration,
    /// 反查并发上限，为空时按CPU核数计算
    pub concurrency: Option<usize>,
    /// 是否静默模式
    pub silent: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            domain: None,
            subdomains: Vec::new(),
            nameservers: Vec::new(),
            expander: Expander::Traverse(5),
            range: None,
            search: None,
            connect: false,
            delay: None,
            transport: Transport::Udp,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            concurrency: None,
            silent: false,
        }
    }
}

/// SOA 信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoaInfo {
    pub mname: String,
    pub master: Option<Ipv4Addr>,
}

/// 一个子域名发现
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub name: String,
    pub ip: Ipv4Addr,
    pub http_headers: Option<Vec<(String, String)>>,
    pub nearby: NearbyResult,
}

/// 扫描的结束方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanOutcome {
    /// 子域名枚举完成
    #[default]
    Completed,
    /// 区域传送成功，区域已完整公开
    ZoneDisclosed,
}

/// 扫描结果
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub domain: Option<String>,
    pub range_nearby: Option<NearbyResult>,
    /// `None` 表示 NS 查询失败
    pub nameservers: Option<Vec<String>>,
    pub soa: Option<SoaInfo>,
    pub zone: Option<Vec<ZoneRecord>>,
    pub wildcard: BTreeSet<Ipv4Addr>,
    pub findings: Vec<Finding>,
    pub outcome: ScanOutcome,
}

/// 扫描引擎
///
/// 按顺序执行：NS/SOA 解析、区域传送、泛解析检测、子域名枚举，
/// 每个发现之后做地址扩展与反查。只有反查阶段是并发的。
pub struct Scanner {
    config: ScanConfig,
    resolver: Arc<dyn ResolverClient>,
    transfer: Arc<dyn ZoneTransferClient>,
    probe: Option<HttpProbe>,
}

impl Scanner {
    /// 使用指定的解析器与区域传送客户端创建引擎
    pub fn new(
        config: ScanConfig,
        resolver: Arc<dyn ResolverClient>,
        transfer: Arc<dyn ZoneTransferClient>,
    ) -> Result<Self, ScanError> {
        let probe = if config.connect {
            Some(HttpProbe::new()?)
        } else {
            None
        };

        Ok(Scanner {
            config,
            resolver,
            transfer,
            probe,
        })
    }

    /// 替换 HTTP 探测器，仅在 `connect` 打开时生效
    pub fn with_http_probe(mut self, probe: HttpProbe) -> Self {
        if self.probe.is_some() {
            self.probe = Some(probe);
        }
        self
    }

    /// 按配置创建基于网络的引擎
    pub fn from_config(config: ScanConfig) -> Result<Self, ScanError> {
        let resolver = if config.nameservers.is_empty() {
            NetworkResolver::from_system(config.query_timeout)
        } else {
            NetworkResolver::new(config.nameservers.clone(), config.query_timeout)
        };
        info!("using nameservers {:?}", resolver.nameservers());

        let resolver = Arc::new(resolver);
        Self::new(config, resolver.clone(), resolver)
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    fn emit(&self, text: &str) {
        if !self.config.silent {
            println!("{}", text);
        }
    }

    fn nearby_finder(&self) -> NearbyFinder {
        let finder = NearbyFinder::new(Arc::clone(&self.resolver), self.config.transport);
        match self.config.concurrency {
            Some(n) => finder.with_concurrency(n),
            None => finder,
        }
    }

    /// 执行一次完整扫描
    pub async fn run(&self) -> Result<ScanReport, ScanError> {
        let mut report = ScanReport::default();
        let finder = self.nearby_finder();
        let transport = self.config.transport;

        if let Some(range) = &self.config.range {
            let ips: Vec<Ipv4Addr> = range.iter().collect();
            info!("reverse scanning {} addresses in range", ips.len());
            let nearby = finder.find(&ips, None).await;
            if !nearby.is_empty() {
                self.emit(&output::format_nearby(&nearby));
            }
            report.range_nearby = Some(nearby);
        }

        let Some(domain_text) = &self.config.domain else {
            return Ok(report);
        };
        let domain = parse_domain(domain_text)?;
        report.domain = Some(domain.to_string());

        let ns = ancestor_query(self.resolver.as_ref(), &domain, RecordType::NS, transport)
            .await?
            .map(|answer| answer.ns_names())
            .filter(|names| !names.is_empty());
        self.emit(&output::format_ns(ns.as_deref()));
        report.nameservers = ns;

        let soa = ancestor_query(self.resolver.as_ref(), &domain, RecordType::SOA, transport).await?;
        let Some(mname) = soa.and_then(|answer| answer.soa_mname()) else {
            self.emit(&output::format_soa(None));
            return Err(ScanError::DomainNotFound(domain.to_string()));
        };

        let master = referral_query(self.resolver.as_ref(), &mname, RecordType::A, transport)
            .await?
            .and_then(|answer| answer.ipv4_addrs().first().copied());
        let soa = SoaInfo {
            mname: mname.to_string(),
            master,
        };
        self.emit(&output::format_soa(Some(&soa)));
        report.soa = Some(soa);

        let zone = match master {
            Some(master) => attempt_zone_transfer(self.transfer.as_ref(), master, &domain).await,
            None => None,
        };
        self.emit(&output::format_zone(zone.as_deref()));
        if let Some(records) = zone {
            report.zone = Some(records);
            report.outcome = ScanOutcome::ZoneDisclosed;
            return Ok(report);
        }

        let wildcard = WildcardDetector::new(Arc::clone(&self.resolver), transport)
            .detect(&domain)
            .await?;
        self.emit(&output::format_wildcard(&wildcard));
        report.wildcard = wildcard;

        let mut visited = VisitedTracker::new();
        for subdomain in &self.config.subdomains {
            if let Some(finding) = self
                .probe_subdomain(&domain, subdomain, &report.wildcard, &mut visited, &finder)
                .await?
            {
                self.emit(&output::format_finding(&finding));
                report.findings.push(finding);

                if let Some(delay) = self.config.delay {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        info!(
            "scan finished: {} findings, {} addresses visited",
            report.findings.len(),
            visited.len()
        );
        Ok(report)
    }

    /// 解析单个子域名，命中时完成地址扩展与反查
    async fn probe_subdomain(
        &self,
        domain: &Name,
        subdomain: &str,
        wildcard: &BTreeSet<Ipv4Addr>,
        visited: &mut VisitedTracker,
        finder: &NearbyFinder,
    ) -> Result<Option<Finding>, ScanError> {
        let url = match build_name(domain, &[subdomain]) {
            Ok(url) => url,
            Err(e) => {
                warn!("skipping subdomain {:?}: {}", subdomain, e);
                return Ok(None);
            }
        };

        let Some(answer) = referral_query(self.resolver.as_ref(), &url, RecordType::A, self.config.transport).await?
        else {
            return Ok(None);
        };
        let ips = answer.ipv4_addrs();
        if ips.is_empty() || is_wildcard_result(wildcard, &ips) {
            return Ok(None);
        }
        let ip = ips[0];

        let http_headers = match &self.probe {
            Some(probe) if !is_private_range(ip) => Some(probe.head_request(ip).await),
            _ => None,
        }
        .filter(|headers| !headers.is_empty());

        let unvisited = visited.filter_new(&self.config.expander.expand(ip));
        let nearby = finder.find(&unvisited, self.config.search.as_ref()).await;

        Ok(Some(Finding {
            name: url.to_string(),
            ip,
            http_headers,
            nearby,
        }))
    }
}

/// 便捷的扫描函数，使用系统名称服务器
pub async fn scan_domain(domain: &str, subdomains: Vec<String>) -> Result<ScanReport, ScanError> {
    let config = ScanConfig {
        domain: Some(domain.to_string()),
        subdomains,
        ..Default::default()
    };
    Scanner::from_config(config)?.run().await
}
