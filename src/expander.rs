//! 由一个已发现的地址扩展出待反查的相邻地址

use std::net::Ipv4Addr;
use std::str::FromStr;

use ipnetwork::Ipv4Network;

use crate::error::ScanError;

/// 地址扩展策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expander {
    /// 只返回地址本身
    Default,
    /// 前后各 n 个地址，不跨出所在的 /24
    Traverse(u32),
    /// 所在 /24 的全部 256 个地址
    Wide,
    /// 给定网段内的全部地址，与输入地址无关
    Range(Ipv4Network),
}

impl Expander {
    /// 严格解析 CIDR；主机位非零或格式错误都视为致命错误
    pub fn range(cidr: &str) -> Result<Self, ScanError> {
        parse_cidr(cidr).map(Expander::Range)
    }

    pub fn expand(&self, ip: Ipv4Addr) -> Vec<Ipv4Addr> {
        match self {
            Expander::Default => vec![ip],
            Expander::Traverse(n) => traverse(ip, *n),
            Expander::Wide => class_c(ip).iter().collect(),
            Expander::Range(network) => network.iter().collect(),
        }
    }
}

/// 地址所在的 /24 网段
pub fn class_c(ip: Ipv4Addr) -> Ipv4Network {
    let floor = u32::from(ip) & 0xffff_ff00;
    // 前缀 24 恒合法
    Ipv4Network::new(Ipv4Addr::from(floor), 24).unwrap_or_else(|_| Ipv4Network::from(ip))
}

fn traverse(ip: Ipv4Addr, n: u32) -> Vec<Ipv4Addr> {
    let ip = u32::from(ip);
    let floor = ip & 0xffff_ff00;
    let ceiling = floor | 0xff;

    let low = ip.saturating_sub(n).max(floor);
    let high = ip.saturating_add(n).min(ceiling);
    (low..=high).map(Ipv4Addr::from).collect()
}

pub fn parse_cidr(cidr: &str) -> Result<Ipv4Network, ScanError> {
    let network = Ipv4Network::from_str(cidr.trim()).map_err(|_| ScanError::InvalidCidr(cidr.to_string()))?;
    if network.ip() != network.network() {
        return Err(ScanError::InvalidCidr(cidr.to_string()));
    }
    Ok(network)
}
