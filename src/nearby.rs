use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::Semaphore;

use crate::dns_resolver::{ResolverClient, Transport};
use crate::query::reverse_query;

/// 反查结果：地址 -> 反向域名
pub type NearbyResult = BTreeMap<Ipv4Addr, String>;

/// 每个CPU核心允许的并发反查数
const LOOKUPS_PER_CPU: usize = 5;

/// 默认并发上限
pub fn default_concurrency() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    cpus * LOOKUPS_PER_CPU
}

/// 按关键字过滤反向域名
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    terms: Vec<String>,
}

impl SearchFilter {
    pub fn new(terms: Vec<String>) -> Self {
        SearchFilter { terms }
    }

    /// 反向域名包含任一关键字时保留
    pub fn accepts(&self, name: &str) -> bool {
        self.terms.iter().any(|term| name.contains(term.as_str()))
    }
}

/// 并发反查一组地址
pub struct NearbyFinder {
    resolver: Arc<dyn ResolverClient>,
    transport: Transport,
    concurrency: usize,
}

impl NearbyFinder {
    pub fn new(resolver: Arc<dyn ResolverClient>, transport: Transport) -> Self {
        NearbyFinder {
            resolver,
            transport,
            concurrency: default_concurrency(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// 对每个地址做一次 PTR 查询
    ///
    /// 同时进行的查询数不超过并发上限；查询失败的地址直接丢弃，
    /// 不影响其他地址。提供 `filter` 时只保留它接受的反向域名。
    pub async fn find(&self, ips: &[Ipv4Addr], filter: Option<&SearchFilter>) -> NearbyResult {
        let mut result = NearbyResult::new();
        if ips.is_empty() {
            return result;
        }

        // 信号量只在本次调用期间存在
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = Vec::with_capacity(ips.len());

        for &ip in ips {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let resolver = Arc::clone(&self.resolver);
            let transport = self.transport;

            tasks.push(tokio::spawn(async move {
                let _permit = permit;
                let answer = reverse_query(resolver.as_ref(), ip, transport).await;
                (ip, answer)
            }));
        }

        for task in tasks {
            match task.await {
                Ok((ip, Ok(Some(answer)))) => {
                    if let Some(name) = answer.first_text() {
                        result.insert(ip, name);
                    }
                }
                Ok((ip, Ok(None))) => debug!("no PTR for {}", ip),
                Ok((ip, Err(e))) => warn!("reverse lookup of {} failed: {}", ip, e),
                Err(e) => warn!("reverse lookup task failed: {}", e),
            }
        }

        if let Some(filter) = filter {
            result.retain(|_, name| filter.accepts(name));
        }
        result
    }
}
