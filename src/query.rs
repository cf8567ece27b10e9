//! 引用跟随查询与逐级向上的祖先域查询

use std::net::Ipv4Addr;

use log::{debug, warn};
use trust_dns_resolver::proto::op::Message;
use trust_dns_resolver::proto::rr::{Name, RData, Record, RecordType};

use crate::dns_resolver::{ResolverClient, Transport};
use crate::error::ResolveError;
use crate::names::{parent_name, reverse_name};

/// 引用跟随的最大次数，防止错误配置的委派链造成死循环
pub const MAX_REFERRAL_DEPTH: usize = 10;

/// 非空的查询应答
#[derive(Debug, Clone)]
pub struct Answer {
    message: Message,
}

impl Answer {
    pub fn new(message: Message) -> Self {
        Answer { message }
    }

    /// 应答段中的全部记录
    pub fn records(&self) -> &[Record] {
        self.message.answers()
    }

    /// 应答段中的 A 记录地址，保持报文中的顺序
    pub fn ipv4_addrs(&self) -> Vec<Ipv4Addr> {
        self.records()
            .iter()
            .filter_map(|record| match record.data() {
                Some(RData::A(a)) => Some(a.0),
                _ => None,
            })
            .collect()
    }

    /// 应答段中的 NS 主机名
    pub fn ns_names(&self) -> Vec<String> {
        self.records()
            .iter()
            .filter_map(|record| match record.data() {
                Some(RData::NS(ns)) => Some(ns.0.to_string()),
                _ => None,
            })
            .collect()
    }

    /// 第一条 SOA 记录中的主名称服务器
    pub fn soa_mname(&self) -> Option<Name> {
        self.records().iter().find_map(|record| match record.data() {
            Some(RData::SOA(soa)) => Some(soa.mname().clone()),
            _ => None,
        })
    }

    /// 第一条记录数据的文本形式，PTR 优先
    pub fn first_text(&self) -> Option<String> {
        let ptr = self.records().iter().find_map(|record| match record.data() {
            Some(RData::PTR(ptr)) => Some(ptr.0.to_string()),
            _ => None,
        });
        ptr.or_else(|| {
            self.records()
                .iter()
                .find_map(|record| record.data().map(|data| data.to_string()))
        })
    }

    pub fn message(&self) -> &Message {
        &self.message
    }
}

/// 从委派应答的附加段里取出名称服务器地址
fn referral_addresses(message: &Message) -> Vec<Ipv4Addr> {
    let mut addresses = Vec::new();
    for record in message.additionals() {
        if let Some(RData::A(a)) = record.data() {
            if !addresses.contains(&a.0) {
                addresses.push(a.0);
            }
        }
    }
    addresses
}

/// 发出查询并跟随引用
///
/// 应答段非空时返回应答；只带有权威段和附加段的响应视为委派，
/// 改向委派的服务器重试。NXDOMAIN、无可用服务器、超时以及非法域名
/// 都按"无应答"返回 `Ok(None)`，其余错误原样向上传递。
pub async fn referral_query(
    resolver: &dyn ResolverClient,
    name: &Name,
    record_type: RecordType,
    transport: Transport,
) -> Result<Option<Answer>, ResolveError> {
    let mut nameservers = resolver.nameservers();

    for depth in 0..=MAX_REFERRAL_DEPTH {
        let message = match resolver.query(name, record_type, transport, &nameservers).await {
            Ok(message) => message,
            Err(e) if e.is_recoverable() => {
                debug!("{} {}: {}", name, record_type, e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if !message.answers().is_empty() {
            return Ok(Some(Answer::new(message)));
        }

        if message.additionals().is_empty() || message.name_servers().is_empty() {
            return Ok(None);
        }

        let delegated = referral_addresses(&message);
        if delegated.is_empty() || delegated == nameservers {
            return Ok(None);
        }
        debug!("{} {}: referral #{} to {:?}", name, record_type, depth + 1, delegated);
        nameservers = delegated;
    }

    warn!(
        "{} {}: gave up after {} referrals",
        name, record_type, MAX_REFERRAL_DEPTH
    );
    Ok(None)
}

/// 从完整域名开始逐级去掉最左标签查询，直到得到应答或到达根
pub async fn ancestor_query(
    resolver: &dyn ResolverClient,
    name: &Name,
    record_type: RecordType,
    transport: Transport,
) -> Result<Option<Answer>, ResolveError> {
    let mut current = name.clone();
    current.set_fqdn(true);

    loop {
        if let Some(answer) = referral_query(resolver, &current, record_type, transport).await? {
            return Ok(Some(answer));
        }
        if current.is_root() {
            return Ok(None);
        }
        current = parent_name(&current);
    }
}

/// PTR 反向查询
pub async fn reverse_query(
    resolver: &dyn ResolverClient,
    ip: Ipv4Addr,
    transport: Transport,
) -> Result<Option<Answer>, ResolveError> {
    referral_query(resolver, &reverse_name(ip), RecordType::PTR, transport).await
}
