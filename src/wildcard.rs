use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::sync::Arc;

use log::debug;
use rand::Rng;
use trust_dns_resolver::proto::rr::{Name, RecordType};

use crate::dns_resolver::{ResolverClient, Transport};
use crate::error::ScanError;
use crate::names::build_name;
use crate::query::referral_query;

/// 随机探测标签的取值范围，足够大以避免与真实子域名碰撞
const PROBE_LABEL_RANGE: std::ops::Range<u64> = 10_000_000_000..100_000_000_000;

/// 泛解析检测器
pub struct WildcardDetector {
    resolver: Arc<dyn ResolverClient>,
    transport: Transport,
}

impl WildcardDetector {
    pub fn new(resolver: Arc<dyn ResolverClient>, transport: Transport) -> Self {
        WildcardDetector { resolver, transport }
    }

    /// 查询一个几乎不可能存在的随机子域名，返回其解析到的地址集合
    ///
    /// 集合为空表示没有泛解析。
    pub async fn detect(&self, domain: &Name) -> Result<BTreeSet<Ipv4Addr>, ScanError> {
        let probe = build_name(domain, &[Self::random_label()])?;
        let answer = referral_query(self.resolver.as_ref(), &probe, RecordType::A, self.transport).await?;
        let ips: BTreeSet<Ipv4Addr> = answer
            .map(|answer| answer.ipv4_addrs().into_iter().collect())
            .unwrap_or_default();
        debug!("wildcard probe {} -> {:?}", probe, ips);
        Ok(ips)
    }

    /// 生成随机的数字标签
    fn random_label() -> String {
        rand::thread_rng().gen_range(PROBE_LABEL_RANGE).to_string()
    }
}

/// 子域名解析结果是否与泛解析结果完全相同
///
/// 只比较集合相等；包含泛解析地址的超集仍视为有效结果。
pub fn is_wildcard_result(wildcard: &BTreeSet<Ipv4Addr>, ips: &[Ipv4Addr]) -> bool {
    let resolved: BTreeSet<Ipv4Addr> = ips.iter().copied().collect();
    *wildcard == resolved
}
