use std::net::Ipv4Addr;
use std::time::Duration;

use log::debug;
use reqwest::Client;

/// HEAD 探测的固定超时
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// 对已发现地址做 HTTP HEAD 探测，仅用于展示
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    port: u16,
}

impl HttpProbe {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(PROBE_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(HttpProbe { client, port: 80 })
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// 请求 `http://<ip>:<port>/`（默认 80），返回响应头；任何失败都返回空列表
    pub async fn head_request(&self, ip: Ipv4Addr) -> Vec<(String, String)> {
        let url = format!("http://{}:{}/", ip, self.port);
        match self.client.head(&url).send().await {
            Ok(response) => response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).to_string(),
                    )
                })
                .collect(),
            Err(e) => {
                debug!("HEAD {} failed: {}", url, e);
                Vec::new()
            }
        }
    }
}

/// 私有或保留地址，不做 HTTP 探测
pub fn is_private_range(ip: Ipv4Addr) -> bool {
    let [a, b, c, _] = ip.octets();
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_documentation()
        // 0.0.0.0/8 本网络
        || a == 0
        // 192.0.0.0/24 IETF 协议分配
        || (a == 192 && b == 0 && c == 0)
        // 100.64.0.0/10 运营商级NAT
        || (a == 100 && (64..128).contains(&b))
        // 198.18.0.0/15 基准测试
        || (a == 198 && (b == 18 || b == 19))
        // 240.0.0.0/4 保留
        || a >= 240
}
