use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use async_trait::async_trait;
use futures::StreamExt;
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use trust_dns_client::client::ClientHandle;
use trust_dns_resolver::proto::op::ResponseCode;
use trust_dns_resolver::proto::rr::{Name, Record, RecordType};

use crate::dns_resolver::NetworkResolver;
use crate::error::TransferError;

/// 区域传送得到的一条记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRecord {
    pub name: String,
    pub record_type: String,
    pub value: String,
}

impl From<&Record> for ZoneRecord {
    fn from(record: &Record) -> Self {
        ZoneRecord {
            name: record.name().to_string(),
            record_type: record.record_type().to_string(),
            value: record.data().map(|data| data.to_string()).unwrap_or_default(),
        }
    }
}

/// 区域传送能力
#[async_trait]
pub trait ZoneTransferClient: Send + Sync {
    /// 向主服务器请求完整的区域数据
    async fn transfer(&self, master: Ipv4Addr, zone: &Name) -> Result<Vec<ZoneRecord>, TransferError>;
}

#[async_trait]
impl ZoneTransferClient for NetworkResolver {
    async fn transfer(&self, master: Ipv4Addr, zone: &Name) -> Result<Vec<ZoneRecord>, TransferError> {
        let server = SocketAddr::new(IpAddr::V4(master), self.port());

        let mut client = match timeout(self.timeout(), self.tcp_client(server)).await {
            Ok(client) => client?,
            Err(_) => return Err(TransferError::Timeout),
        };

        let mut responses = Box::pin(client.zone_transfer(zone.clone(), None));
        let mut records = Vec::new();
        let mut soa_count = 0;
        while soa_count < 2 {
            let response = match timeout(self.timeout(), responses.next()).await {
                Ok(Some(response)) => response?,
                Ok(None) => break,
                Err(_) => return Err(TransferError::Timeout),
            };
            if response.response_code() != ResponseCode::NoError {
                return Err(TransferError::Refused(response.response_code()));
            }
            if response.answers().is_empty() {
                return Err(TransferError::Malformed("empty transfer message".to_string()));
            }

            for record in response.answers() {
                if records.is_empty() && record.record_type() != RecordType::SOA {
                    return Err(TransferError::Malformed("transfer does not start with SOA".to_string()));
                }
                if record.record_type() == RecordType::SOA {
                    soa_count += 1;
                }
                records.push(ZoneRecord::from(record));
                // 第二条 SOA 表示传送结束
                if soa_count == 2 {
                    break;
                }
            }
        }

        if soa_count < 2 {
            return Err(TransferError::Malformed("transfer ended before closing SOA".to_string()));
        }
        debug!("received {} records from {} for {}", records.len(), server, zone);
        Ok(records)
    }
}

/// 尝试区域传送，任何失败都只返回 `None`
pub async fn attempt_zone_transfer(
    client: &dyn ZoneTransferClient,
    master: Ipv4Addr,
    zone: &Name,
) -> Option<Vec<ZoneRecord>> {
    match client.transfer(master, zone).await {
        Ok(records) if !records.is_empty() => Some(records),
        Ok(_) => None,
        Err(e) => {
            debug!("zone transfer of {} from {} failed: {}", zone, master, e);
            None
        }
    }
}

/// 按名称归并区域记录，便于输出
pub fn group_by_name(records: &[ZoneRecord]) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for record in records {
        grouped
            .entry(record.name.clone())
            .or_default()
            .push(format!("{} {}", record.record_type, record.value));
    }
    grouped
}
